//! Startup configuration: `.env` loading and API settings.
//!
//! Everything here is resolved once in `main` and passed down by reference.
//! Per-option precedence (flag > environment > default) is handled by clap's
//! `env` support in [`crate::cli`]; this module covers what clap can't.

use crate::constants::{DEFAULT_API_HOST, DEFAULT_API_TIMEOUT_SECS, DEFAULT_REGISTER_IMAGE_ENDPOINT};
use crate::error::{PrepError, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tracing::debug;

pub const ENV_FORMAT: &str = "IMG_PREP_FORMAT";
pub const ENV_QUALITY: &str = "IMG_PREP_QUALITY";
pub const ENV_MAX_SIZE: &str = "IMG_PREP_MAX_SIZE";
pub const ENV_RECURSIVE: &str = "IMG_PREP_RECURSIVE";
pub const ENV_API_ENDPOINT: &str = "API_ENDPOINT";
pub const ENV_API_HOST: &str = "API_HOST";
pub const ENV_REGISTER_IMAGE_ENDPOINT: &str = "REGISTER_IMAGE_ENDPOINT";
pub const ENV_API_KEY: &str = "API_KEY";
pub const ENV_API_TIMEOUT: &str = "API_TIMEOUT";

/// Loads `.env` from the working directory (or a parent) into the process
/// environment. Variables that are already set are left alone.
pub fn load_env_file() -> Option<PathBuf> {
    dotenv::dotenv().ok()
}

/// Where, how, and how long to talk to the image API.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiSettings {
    pub endpoint: String,
    pub api_key: String,
    pub timeout: Duration,
}

impl ApiSettings {
    pub fn new(endpoint: String, api_key: String, timeout: Duration) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(PrepError::InvalidOption(format!(
                "no API key configured; pass --api-key or set {}",
                ENV_API_KEY
            )));
        }

        reqwest::Url::parse(&endpoint).map_err(|e| {
            PrepError::InvalidOption(format!("invalid API endpoint {}: {}", endpoint, e))
        })?;

        if timeout.is_zero() {
            return Err(PrepError::InvalidOption(
                "timeout must be at least one second".to_string(),
            ));
        }

        Ok(Self {
            endpoint,
            api_key,
            timeout,
        })
    }

    /// Resolves settings from CLI values (which already include `API_ENDPOINT`,
    /// `API_KEY` and `API_TIMEOUT` through clap), falling back to
    /// `API_HOST` + `REGISTER_IMAGE_ENDPOINT` for the endpoint.
    pub fn from_args(
        api_url: Option<String>,
        api_key: Option<String>,
        timeout_secs: Option<u64>,
    ) -> Result<Self> {
        let host = env::var(ENV_API_HOST).ok();
        let path = env::var(ENV_REGISTER_IMAGE_ENDPOINT).ok();
        let endpoint = resolve_endpoint(api_url.as_deref(), host.as_deref(), path.as_deref());
        debug!("API endpoint resolved to {}", endpoint);

        Self::new(
            endpoint,
            api_key.unwrap_or_default(),
            Duration::from_secs(timeout_secs.unwrap_or(DEFAULT_API_TIMEOUT_SECS)),
        )
    }
}

/// An explicit URL wins; otherwise `host` and `path` are joined, each falling
/// back to its default.
pub fn resolve_endpoint(explicit: Option<&str>, host: Option<&str>, path: Option<&str>) -> String {
    if let Some(url) = explicit.map(str::trim).filter(|u| !u.is_empty()) {
        return url.to_string();
    }

    let host = host
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .unwrap_or(DEFAULT_API_HOST);
    let path = path
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_REGISTER_IMAGE_ENDPOINT);

    format!(
        "{}/{}",
        host.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}
