use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PrepError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot decode image: {0}")]
    Decode(String),

    #[error("Image encoding error: {0}")]
    Encode(String),

    #[error("PNG optimization error: {0}")]
    PngOptimization(String),

    #[error("Invalid option: {0}")]
    InvalidOption(String),

    #[error("Invalid quality value: {0}. Must be between 0 and 100")]
    InvalidQuality(u8),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to create output directory: {0}")]
    DirectoryCreationFailed(PathBuf),

    #[error("No image files found in input path: {0}")]
    NoImageFilesFound(String),

    #[error("Walkdir error: {0}")]
    WalkdirError(#[from] walkdir::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{}", describe_api_failure(.status, .body))]
    Api { status: u16, body: Option<String> },
}

impl PrepError {
    /// Decode failures are skipped by the walker; everything else counts as
    /// a failed file.
    pub fn is_skip(&self) -> bool {
        matches!(self, PrepError::Decode(_))
    }
}

impl From<image::ImageError> for PrepError {
    fn from(err: image::ImageError) -> Self {
        match err {
            image::ImageError::IoError(e) => PrepError::Io(e),
            image::ImageError::Encoding(e) => PrepError::Encode(e.to_string()),
            image::ImageError::Parameter(e) => PrepError::Encode(e.to_string()),
            other => PrepError::Decode(other.to_string()),
        }
    }
}

const MAX_LOGGED_BODY: usize = 1000;

fn describe_api_failure(status: &u16, body: &Option<String>) -> String {
    let headline = match *status {
        401 => "API rejected the request: an API key is required (401)".to_string(),
        403 => "API rejected the request: the API key is not valid (403)".to_string(),
        _ => format!("API returned status {}", status),
    };
    match body.as_deref().filter(|b| !b.is_empty()) {
        Some(body) => {
            let shown: String = body.chars().take(MAX_LOGGED_BODY).collect();
            format!("{}: {}", headline, shown)
        }
        None => headline,
    }
}

pub type Result<T> = std::result::Result<T, PrepError>;
