pub const DEFAULT_QUALITY: u8 = 90;
pub const MIN_QUALITY: u8 = 0;
pub const MAX_QUALITY: u8 = 100;

/// Longest edge the image API accepts without downscaling on its side.
pub const DEFAULT_MAX_LONG_EDGE: u32 = 1568;

/// Soft upload limit. Larger outputs are logged, not rejected.
pub const MAX_OUTPUT_BYTES: usize = 5 * 1024 * 1024;

pub const ZOPFLI_ITERATIONS: u8 = 15;
pub const LIBDEFLATER_HIGH_LEVEL: u8 = 12;
pub const LIBDEFLATER_LOW_LEVEL: u8 = 8;
pub const OXIPNG_PRESET: u8 = 4;

pub const SUPPORTED_IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp"];

pub const DEFAULT_API_HOST: &str = "http://localhost:1880";
pub const DEFAULT_REGISTER_IMAGE_ENDPOINT: &str = "/image-embed";
pub const DEFAULT_API_TIMEOUT_SECS: u64 = 30;

pub const PROGRESS_SPINNER_TEMPLATE: &str = "{spinner:.green} [{pos}] {msg}";
