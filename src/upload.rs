use crate::batch::{run_batch, walk_inputs, BatchReport, ConversionSummary, WorkItem};
use crate::client::{response_path_for, save_response, ApiClient};
use crate::error::{PrepError, Result};
use crate::payload::PayloadEncoder;
use crate::processing::{transform_file, write_result, ConversionOptions};
use crate::utils::{create_progress_spinner, format_file_size};
use crate::validation::ensure_not_source;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Where the sender keeps local copies of what it sent and received.
#[derive(Debug, Clone, Default)]
pub struct SendOptions {
    pub conversion: ConversionOptions,
    pub save_optimized: Option<PathBuf>,
    pub save_response: Option<PathBuf>,
}

/// Transforms every image under `input` in memory and posts each one to the
/// API. Files are handled one at a time; a failure is recorded in the report
/// and the next file is attempted.
///
/// # Errors
/// Fails up front when `input` can't be resolved or holds no images.
pub fn send_images(
    input: &Path,
    options: &SendOptions,
    encoder: &PayloadEncoder,
    client: &ApiClient,
    show_progress: bool,
) -> Result<BatchReport> {
    info!("🚀 Sending images to {}", client.endpoint());
    info!("📁 Input: {}", input.display());

    let started = Instant::now();
    let conversion = &options.conversion;
    let mut items = walk_inputs(input, conversion.format, conversion.recursive)?;
    if let Some(dir) = &options.save_optimized {
        items = items.excluding(dir);
    }

    let mut items = items.peekable();
    if items.peek().is_none() {
        return Err(PrepError::NoImageFilesFound(input.display().to_string()));
    }

    let progress = create_progress_spinner("Sending...", show_progress);
    let report = run_batch(items, &progress, |item| {
        send_one(item, options, encoder, client)
    });
    progress.finish_and_clear();

    report.log_summary("Send", started);
    Ok(report)
}

/// One file through transform -> (save) -> encode -> POST -> (save response).
pub fn send_one(
    item: &WorkItem,
    options: &SendOptions,
    encoder: &PayloadEncoder,
    client: &ApiClient,
) -> Result<ConversionSummary> {
    let output_path = options
        .save_optimized
        .as_deref()
        .map(|dir| item.output_path(dir));

    let result = transform_file(&item.input, output_path.clone(), &options.conversion)?;
    debug!(
        "Prepared {}x{} {} ({})",
        result.width,
        result.height,
        result.format,
        format_file_size(result.optimized_size as u64)
    );

    if let Some(path) = &output_path {
        ensure_not_source(&item.input, path)?;
        write_result(&result, path)?;
        debug!("Saved optimized copy to {}", path.display());
    }

    let request = encoder.encode(&result, &item.input, output_path.as_deref());
    let response = client.send(&request)?;
    info!("📥 API answered {}", response.status);

    if let Some(target) = &options.save_response {
        let path = response_path_for(target, &item.input);
        // the image already reached the API; a local write failure doesn't undo that
        match save_response(&response, &path) {
            Ok(()) => debug!("Saved response to {}", path.display()),
            Err(e) => warn!("⚠️  Could not save response to {}: {}", path.display(), e),
        }
    }

    Ok(ConversionSummary::new(&item.input, &result))
}
