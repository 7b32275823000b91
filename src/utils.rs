//! Small helpers shared by the converter and the sender.

use crate::constants::{PROGRESS_SPINNER_TEMPLATE, SUPPORTED_IMAGE_EXTENSIONS};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;

/// Whether the walker should pick `path` up. Extensions match in any case.
pub fn is_image_file(path: &Path) -> bool {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return false;
    };
    SUPPORTED_IMAGE_EXTENSIONS
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}

/// Spinner for a batch run; hidden when `visible` is false (quiet mode, tests).
pub fn create_progress_spinner(message: &str, visible: bool) -> ProgressBar {
    if !visible {
        return ProgressBar::hidden();
    }

    let pb = ProgressBar::new_spinner();
    let style = ProgressStyle::default_spinner()
        .template(PROGRESS_SPINNER_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_spinner());
    pb.set_style(style);
    pb.set_message(message.to_string());
    pb
}

/// `512 B`, `1.5 KB`, `5.0 MB`. Whole bytes below 1 KiB, one decimal above.
pub fn format_file_size(bytes: u64) -> String {
    const SCALED: [&str; 4] = ["KB", "MB", "GB", "TB"];

    if bytes < 1024 {
        return format!("{} B", bytes);
    }

    let mut value = bytes as f64 / 1024.0;
    let mut unit = SCALED[0];
    for next in &SCALED[1..] {
        if value < 1024.0 {
            break;
        }
        value /= 1024.0;
        unit = *next;
    }
    format!("{:.1} {}", value, unit)
}

/// Optimized size divided by original size. `0.0` when the original is empty.
pub fn compression_ratio(original_size: u64, optimized_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    optimized_size as f64 / original_size as f64
}

/// Size reduction as a percentage (positive means smaller, negative means larger)
pub fn size_reduction_percent(original_size: u64, optimized_size: u64) -> f64 {
    if original_size == 0 {
        return 0.0;
    }
    (1.0 - compression_ratio(original_size, optimized_size)) * 100.0
}
