pub mod batch;
pub mod cli;
pub mod client;
pub mod config;
pub mod constants;
pub mod error;
pub mod formats;
pub mod logger;
pub mod payload;
pub mod processing;
pub mod upload;
pub mod utils;
pub mod validation;

pub use batch::{
    batch_convert_images, mirrored_path, run_batch, walk_inputs, BatchReport, ConversionSummary,
    FileOutcome, WorkItem, WorkItems,
};
pub use client::{response_path_for, save_response, ApiClient, ApiResponse};
pub use config::ApiSettings;
pub use error::{PrepError, Result};
pub use formats::TargetFormat;
pub use payload::{encode_base64, ApiRequest, MetadataDocument, PayloadEncoder, RESERVED_KEYS};
pub use processing::{
    encode_image, flatten_onto_white, process_image_pipeline, resize_to_fit, target_dimensions,
    transform, transform_file, write_result, ConversionOptions, ConversionResult, ImageAsset,
};
pub use upload::{send_images, send_one, SendOptions};
pub use utils::is_image_file;
