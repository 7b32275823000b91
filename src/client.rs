use crate::config::ApiSettings;
use crate::error::{PrepError, Result};
use crate::payload::ApiRequest;
use reqwest::blocking::Client;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Parsed body of a successful API call, kept verbatim.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub status: u16,
    pub body: Value,
}

/// Blocking client that POSTs one payload per call. No retries.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: Client,
    settings: ApiSettings,
}

impl ApiClient {
    pub fn new(settings: ApiSettings) -> Result<Self> {
        let http = Client::builder().timeout(settings.timeout).build()?;
        Ok(Self { http, settings })
    }

    pub fn endpoint(&self) -> &str {
        &self.settings.endpoint
    }

    /// Sends `request` as JSON. Network failures come back as
    /// [`PrepError::Http`], non-2xx statuses as [`PrepError::Api`].
    pub fn send(&self, request: &ApiRequest) -> Result<ApiResponse> {
        info!("📤 Sending {} to {}", request.content_type, self.settings.endpoint);

        let response = self
            .http
            .post(&self.settings.endpoint)
            .header("api-key", &self.settings.api_key)
            .bearer_auth(&self.settings.api_key)
            .json(request)
            .send()?;

        let status = response.status().as_u16();
        let text = response.text()?;
        debug!("API answered {} with {} bytes", status, text.len());

        if !(200..300).contains(&status) {
            return Err(PrepError::Api {
                status,
                body: Some(text),
            });
        }

        let body = serde_json::from_str(&text).map_err(|e| PrepError::Api {
            status,
            body: Some(format!("response is not valid JSON ({}): {}", e, text)),
        })?;

        Ok(ApiResponse { status, body })
    }
}

/// Where the response for `input` goes. An existing directory, or a path
/// without an extension, gets one `<stem>_response.json` per input; any other
/// path is used as is.
pub fn response_path_for(save_response: &Path, input: &Path) -> PathBuf {
    if save_response.is_dir() || save_response.extension().is_none() {
        let stem = input
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        save_response.join(format!("{}_response.json", stem))
    } else {
        save_response.to_path_buf()
    }
}

/// Writes the response body as pretty-printed JSON, creating parent directories.
pub fn save_response(response: &ApiResponse, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|_| PrepError::DirectoryCreationFailed(parent.to_path_buf()))?;
    }
    let json = serde_json::to_string_pretty(&response.body)?;
    fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::time::Duration;
    use tempfile::TempDir;

    #[test]
    fn test_response_path_for_directory() {
        let temp_dir = TempDir::new().unwrap();
        let path = response_path_for(temp_dir.path(), Path::new("/in/cat.png"));
        assert_eq!(path, temp_dir.path().join("cat_response.json"));
    }

    #[test]
    fn test_response_path_for_extensionless_path() {
        let path = response_path_for(Path::new("responses"), Path::new("dog.jpg"));
        assert_eq!(path, PathBuf::from("responses/dog_response.json"));
    }

    #[test]
    fn test_response_path_for_file() {
        let path = response_path_for(Path::new("out/resp.json"), Path::new("dog.jpg"));
        assert_eq!(path, PathBuf::from("out/resp.json"));
    }

    #[test]
    fn test_save_response_writes_pretty_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nested/response.json");
        let response = ApiResponse {
            status: 200,
            body: json!({"id": "abc", "label": "猫"}),
        };

        save_response(&response, &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert!(written.contains('\n'));
        assert!(written.contains("猫"));
        let parsed: Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed, response.body);
    }

    #[test]
    fn test_client_reports_connection_failure() {
        // nothing listens on port 9 on a test machine
        let settings = ApiSettings::new(
            "http://127.0.0.1:9/image-embed".to_string(),
            "key".to_string(),
            Duration::from_secs(2),
        )
        .unwrap();
        let client = ApiClient::new(settings).unwrap();
        assert_eq!(client.endpoint(), "http://127.0.0.1:9/image-embed");

        let request = ApiRequest {
            content_type: "image/jpeg".to_string(),
            image_base64: String::new(),
            metadata: Default::default(),
        };
        let result = client.send(&request);
        assert!(matches!(result, Err(PrepError::Http(_))));
    }
}
