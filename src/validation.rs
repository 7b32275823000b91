use crate::error::{PrepError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// True when `path` reads like a glob pattern rather than a literal path.
pub fn looks_like_glob(path: &Path) -> bool {
    path.to_string_lossy().contains(&['*', '?', '['][..])
}

/// Input must be an existing file or directory, or a glob pattern.
pub fn validate_input_path(path: &Path) -> Result<()> {
    if path.exists() || looks_like_glob(path) {
        Ok(())
    } else {
        Err(PrepError::FileNotFound(path.to_path_buf()))
    }
}

/// Refuses an output path that resolves to the input file itself. A path that
/// doesn't exist yet can't be the source.
pub fn ensure_not_source(input: &Path, output: &Path) -> Result<()> {
    let same = match (input.canonicalize(), output.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    };
    if same {
        return Err(PrepError::InvalidOption(format!(
            "refusing to overwrite source image {}",
            input.display()
        )));
    }
    Ok(())
}

/// Creates the output directory if needed and returns it.
///
/// Refuses a path that is an existing file, and refuses the input directory
/// itself, since same-format conversion would overwrite the sources.
pub fn prepare_output_dir(output: &Path, input: &Path) -> Result<PathBuf> {
    if output.exists() && !output.is_dir() {
        return Err(PrepError::InvalidOption(format!(
            "output {} exists and is not a directory",
            output.display()
        )));
    }

    fs::create_dir_all(output)
        .map_err(|_| PrepError::DirectoryCreationFailed(output.to_path_buf()))?;

    if input.is_dir() {
        let same = match (input.canonicalize(), output.canonicalize()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        };
        if same {
            return Err(PrepError::InvalidOption(
                "output directory must differ from the input directory".to_string(),
            ));
        }
    }

    Ok(output.to_path_buf())
}
