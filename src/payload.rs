//! Request bodies for the image API.

use crate::error::{PrepError, Result};
use crate::processing::ConversionResult;
use base64::{engine::general_purpose, Engine as _};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::Path;

/// Keys the tool writes itself. User metadata may not use them.
pub const RESERVED_KEYS: &[&str] = &[
    "content_type",
    "image_base64",
    "metadata",
    "filename",
    "original_format",
    "optimized_path",
];

/// User-supplied fields merged into every payload's `metadata` object.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MetadataDocument {
    fields: Map<String, Value>,
}

impl MetadataDocument {
    pub fn from_map(fields: Map<String, Value>) -> Result<Self> {
        if let Some(key) = fields.keys().find(|k| RESERVED_KEYS.contains(&k.as_str())) {
            return Err(PrepError::InvalidOption(format!(
                "metadata key `{}` is reserved (reserved keys: {})",
                key,
                RESERVED_KEYS.join(", ")
            )));
        }
        Ok(Self { fields })
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)
            .map_err(|e| PrepError::InvalidOption(format!("metadata is not valid JSON: {}", e)))?;
        match value {
            Value::Object(fields) => Self::from_map(fields),
            other => Err(PrepError::InvalidOption(format!(
                "metadata must be a JSON object, got {}",
                json_kind(&other)
            ))),
        }
    }

    /// Loads and validates a metadata file. Called once at startup so a bad
    /// file stops the run before any image is touched.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path).map_err(|e| {
            PrepError::InvalidOption(format!(
                "cannot read metadata file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&json).map_err(|e| match e {
            PrepError::InvalidOption(msg) => {
                PrepError::InvalidOption(format!("{}: {}", path.display(), msg))
            }
            other => other,
        })
    }

    pub fn load_optional(path: Option<&Path>) -> Result<Self> {
        path.map_or_else(|| Ok(Self::default()), Self::load)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// JSON body posted to the API.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ApiRequest {
    pub content_type: String,
    pub image_base64: String,
    pub metadata: Map<String, Value>,
}

/// Standard, padded base64.
pub fn encode_base64(bytes: &[u8]) -> String {
    general_purpose::STANDARD.encode(bytes)
}

/// Builds [`ApiRequest`]s from transformed images.
#[derive(Debug, Clone, Default)]
pub struct PayloadEncoder {
    metadata: MetadataDocument,
    include_base64_in_metadata: bool,
}

impl PayloadEncoder {
    pub fn new(metadata: MetadataDocument, include_base64_in_metadata: bool) -> Self {
        Self {
            metadata,
            include_base64_in_metadata,
        }
    }

    /// `input` is the source file (for `filename` and `original_format`);
    /// `saved_path` is where the optimized copy was written, if anywhere.
    pub fn encode(
        &self,
        result: &ConversionResult,
        input: &Path,
        saved_path: Option<&Path>,
    ) -> ApiRequest {
        let image_base64 = encode_base64(&result.output_bytes);

        let mut metadata = self.metadata.fields.clone();
        if let Some(name) = input.file_name() {
            metadata.insert(
                "filename".to_string(),
                Value::String(name.to_string_lossy().into_owned()),
            );
        }
        let original_format = input
            .extension()
            .map(|ext| ext.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        metadata.insert(
            "original_format".to_string(),
            Value::String(original_format),
        );
        if let Some(saved) = saved_path {
            metadata.insert(
                "optimized_path".to_string(),
                Value::String(saved.display().to_string()),
            );
        }
        if self.include_base64_in_metadata {
            metadata.insert(
                "image_base64".to_string(),
                Value::String(image_base64.clone()),
            );
        }

        ApiRequest {
            content_type: result.media_type().to_string(),
            image_base64,
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::TargetFormat;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn result_with_bytes(bytes: Vec<u8>, format: TargetFormat) -> ConversionResult {
        ConversionResult {
            optimized_size: bytes.len(),
            output_bytes: bytes,
            output_path: None,
            format,
            original_size: 10,
            compression_ratio: 0.5,
            width: 1,
            height: 1,
        }
    }

    #[test]
    fn test_base64_round_trip() {
        let bytes: Vec<u8> = (0..=255).collect();
        let encoded = encode_base64(&bytes);
        let decoded = general_purpose::STANDARD.decode(encoded).unwrap();
        assert_eq!(decoded, bytes);
    }

    #[test]
    fn test_metadata_rejects_reserved_keys() {
        for key in RESERVED_KEYS {
            let json = format!(r#"{{"{}": 1}}"#, key);
            let result = MetadataDocument::from_json_str(&json);
            assert!(
                matches!(result, Err(PrepError::InvalidOption(ref m)) if m.contains(key)),
                "{} was accepted",
                key
            );
        }
    }

    #[test]
    fn test_metadata_must_be_object() {
        assert!(matches!(
            MetadataDocument::from_json_str("[1, 2]"),
            Err(PrepError::InvalidOption(_))
        ));
        assert!(matches!(
            MetadataDocument::from_json_str("{not json"),
            Err(PrepError::InvalidOption(_))
        ));
    }

    #[test]
    fn test_metadata_load_from_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("meta.json");
        fs::write(&path, r#"{"album": "trip", "tags": ["a", "b"]}"#).unwrap();

        let metadata = MetadataDocument::load(&path).unwrap();
        assert_eq!(metadata.len(), 2);
        assert_eq!(metadata.get("album"), Some(&json!("trip")));

        let missing = MetadataDocument::load(&temp_dir.path().join("nope.json"));
        assert!(matches!(missing, Err(PrepError::InvalidOption(_))));

        assert!(MetadataDocument::load_optional(None).unwrap().is_empty());
    }

    #[test]
    fn test_encode_request_body() {
        let metadata = MetadataDocument::from_json_str(r#"{"album": "trip"}"#).unwrap();
        let encoder = PayloadEncoder::new(metadata, false);
        let result = result_with_bytes(vec![1, 2, 3], TargetFormat::WebP);
        let saved = PathBuf::from("out/photo.webp");

        let request = encoder.encode(&result, Path::new("in/Photo.PNG"), Some(&saved));
        assert_eq!(request.content_type, "image/webp");
        assert_eq!(request.image_base64, "AQID");

        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(
            body,
            json!({
                "content_type": "image/webp",
                "image_base64": "AQID",
                "metadata": {
                    "album": "trip",
                    "filename": "Photo.PNG",
                    "original_format": "png",
                    "optimized_path": "out/photo.webp"
                }
            })
        );
    }

    #[test]
    fn test_encode_can_copy_base64_into_metadata() {
        let encoder = PayloadEncoder::new(MetadataDocument::default(), true);
        let result = result_with_bytes(vec![0xff], TargetFormat::Jpeg);

        let request = encoder.encode(&result, Path::new("a.jpg"), None);
        assert_eq!(request.content_type, "image/jpeg");
        assert_eq!(request.metadata.get("image_base64"), Some(&json!("/w==")));
        assert!(request.metadata.get("optimized_path").is_none());
    }
}
