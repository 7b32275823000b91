use crate::constants::{
    DEFAULT_MAX_LONG_EDGE, DEFAULT_QUALITY, LIBDEFLATER_HIGH_LEVEL, LIBDEFLATER_LOW_LEVEL,
    MAX_OUTPUT_BYTES, MAX_QUALITY, MIN_QUALITY, OXIPNG_PRESET, ZOPFLI_ITERATIONS,
};
use crate::error::{PrepError, Result};
use crate::formats::TargetFormat;
use crate::utils::{compression_ratio, format_file_size};
use crate::validation::ensure_not_source;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, GenericImageView, ImageFormat, Rgb, RgbImage};
use oxipng::{Deflaters, Options, StripChunks};
use std::fs;
use std::io::Cursor;
use std::num::NonZeroU8;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Settings shared by every file of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionOptions {
    pub format: TargetFormat,
    pub quality: u8,
    pub max_long_edge: u32,
    pub recursive: bool,
}

impl ConversionOptions {
    pub fn new(
        format: TargetFormat,
        quality: Option<u8>,
        max_long_edge: Option<u32>,
        recursive: bool,
    ) -> Result<Self> {
        let quality = quality.unwrap_or(DEFAULT_QUALITY);
        if !(MIN_QUALITY..=MAX_QUALITY).contains(&quality) {
            return Err(PrepError::InvalidQuality(quality));
        }

        let max_long_edge = max_long_edge.unwrap_or(DEFAULT_MAX_LONG_EDGE);
        if max_long_edge == 0 {
            return Err(PrepError::InvalidOption(
                "max size must be a positive number of pixels".to_string(),
            ));
        }

        Ok(Self {
            format,
            quality,
            max_long_edge,
            recursive,
        })
    }
}

impl Default for ConversionOptions {
    fn default() -> Self {
        Self {
            format: TargetFormat::default(),
            quality: DEFAULT_QUALITY,
            max_long_edge: DEFAULT_MAX_LONG_EDGE,
            recursive: false,
        }
    }
}

/// A decoded source image together with the size of the bytes it came from.
#[derive(Debug, Clone)]
pub struct ImageAsset {
    image: DynamicImage,
    original_size: usize,
}

impl ImageAsset {
    /// Decodes `bytes`, guessing the format from the content.
    ///
    /// Empty input, unknown formats and corrupt data all fail with
    /// [`PrepError::Decode`].
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(PrepError::Decode("input is empty".to_string()));
        }

        let image =
            image::load_from_memory(bytes).map_err(|e| PrepError::Decode(e.to_string()))?;

        Ok(Self {
            image,
            original_size: bytes.len(),
        })
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn has_alpha(&self) -> bool {
        self.image.color().has_alpha()
    }

    pub fn original_size(&self) -> usize {
        self.original_size
    }

    pub fn into_image(self) -> DynamicImage {
        self.image
    }
}

/// Outcome of transforming one image. Built once, never modified.
#[derive(Debug, Clone)]
pub struct ConversionResult {
    pub output_bytes: Vec<u8>,
    pub output_path: Option<PathBuf>,
    pub format: TargetFormat,
    pub original_size: usize,
    pub optimized_size: usize,
    /// `optimized_size / original_size`
    pub compression_ratio: f64,
    pub width: u32,
    pub height: u32,
}

impl ConversionResult {
    pub fn media_type(&self) -> &'static str {
        self.format.media_type()
    }

    pub fn exceeds_upload_limit(&self) -> bool {
        self.optimized_size > MAX_OUTPUT_BYTES
    }
}

/// Dimensions that fit `width`x`height` inside a `max_long_edge` square.
///
/// Both edges are scaled by `max_long_edge / max(width, height)` and rounded
/// to the nearest pixel, never below 1. Images that already fit are returned
/// unchanged; nothing is ever upscaled.
///
/// # Example
/// ```
/// use img_prep::target_dimensions;
///
/// assert_eq!(target_dimensions(3000, 2000, 1568), (1568, 1045));
/// assert_eq!(target_dimensions(800, 600, 1568), (800, 600));
/// ```
pub fn target_dimensions(width: u32, height: u32, max_long_edge: u32) -> (u32, u32) {
    let long_edge = width.max(height);
    if long_edge <= max_long_edge {
        return (width, height);
    }

    let long_edge = u64::from(long_edge);
    let max_long_edge = u64::from(max_long_edge);
    let scale = |edge: u32| -> u32 {
        // round(edge * max / long), half up
        let scaled = (u64::from(edge) * max_long_edge * 2 + long_edge) / (2 * long_edge);
        (scaled as u32).max(1)
    };

    (scale(width), scale(height))
}

pub fn resize_to_fit(img: DynamicImage, max_long_edge: u32) -> DynamicImage {
    let (width, height) = img.dimensions();
    let (new_width, new_height) = target_dimensions(width, height, max_long_edge);
    if (new_width, new_height) == (width, height) {
        return img;
    }

    debug!(
        "Resizing {}x{} -> {}x{}",
        width, height, new_width, new_height
    );
    img.resize_exact(new_width, new_height, FilterType::Lanczos3)
}

/// Composites `img` over an opaque white canvas with straight alpha blending.
pub fn flatten_onto_white(img: &DynamicImage) -> DynamicImage {
    let rgba = img.to_rgba8();
    let mut canvas = RgbImage::new(rgba.width(), rgba.height());

    for (dst, src) in canvas.pixels_mut().zip(rgba.pixels()) {
        let [r, g, b, a] = src.0;
        let alpha = u32::from(a);
        let blend = |c: u8| -> u8 {
            ((u32::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8
        };
        *dst = Rgb([blend(r), blend(g), blend(b)]);
    }

    DynamicImage::ImageRgb8(canvas)
}

pub fn encode_image(img: &DynamicImage, options: &ConversionOptions) -> Result<Vec<u8>> {
    match options.format {
        TargetFormat::Jpeg => encode_jpeg(img, options.quality),
        TargetFormat::Png => encode_png(img, options.quality),
        TargetFormat::WebP => encode_webp(img, options.quality),
    }
}

fn encode_jpeg(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = img.to_rgb8();
    let mut buffer = Vec::new();
    // the encoder's scale starts at 1
    let encoder = JpegEncoder::new_with_quality(&mut buffer, quality.max(1));
    rgb.write_with_encoder(encoder)?;
    Ok(buffer)
}

fn encode_png(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    let mut raw = Cursor::new(Vec::new());
    img.write_to(&mut raw, ImageFormat::Png)?;

    // PNG is lossless: quality only picks how hard oxipng works
    let mut oxipng_options = Options::from_preset(OXIPNG_PRESET);
    oxipng_options.strip = StripChunks::Safe;
    oxipng_options.deflate = if quality >= 90 {
        Deflaters::Zopfli {
            iterations: NonZeroU8::new(ZOPFLI_ITERATIONS).unwrap_or(NonZeroU8::MIN),
        }
    } else if quality >= 70 {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_HIGH_LEVEL,
        }
    } else {
        Deflaters::Libdeflater {
            compression: LIBDEFLATER_LOW_LEVEL,
        }
    };

    oxipng::optimize_from_memory(raw.get_ref(), &oxipng_options)
        .map_err(|e| PrepError::PngOptimization(e.to_string()))
}

fn encode_webp(img: &DynamicImage, quality: u8) -> Result<Vec<u8>> {
    // libwebp only takes 8-bit RGB or RGBA
    let img = if img.color().has_alpha() {
        DynamicImage::ImageRgba8(img.to_rgba8())
    } else {
        DynamicImage::ImageRgb8(img.to_rgb8())
    };
    let encoder =
        webp::Encoder::from_image(&img).map_err(|e| PrepError::Encode(e.to_string()))?;
    Ok(encoder.encode(f32::from(quality)).to_vec())
}

/// Decode, fit, flatten if needed, and re-encode `bytes` in memory.
pub fn transform(bytes: &[u8], options: &ConversionOptions) -> Result<ConversionResult> {
    build_result(bytes, options, None)
}

/// Reads `input_path` and transforms it. `output_path` is recorded on the
/// result but nothing is written.
pub fn transform_file(
    input_path: &Path,
    output_path: Option<PathBuf>,
    options: &ConversionOptions,
) -> Result<ConversionResult> {
    if !input_path.exists() {
        return Err(PrepError::FileNotFound(input_path.to_path_buf()));
    }
    let bytes = fs::read(input_path)?;
    build_result(&bytes, options, output_path)
}

fn build_result(
    bytes: &[u8],
    options: &ConversionOptions,
    output_path: Option<PathBuf>,
) -> Result<ConversionResult> {
    let asset = ImageAsset::decode(bytes)?;
    let original_size = asset.original_size();
    let has_alpha = asset.has_alpha();

    // flatten before resampling so transparent pixels can't bleed into edges
    let mut img = asset.into_image();
    if has_alpha && !options.format.supports_alpha() {
        img = flatten_onto_white(&img);
    }
    let img = resize_to_fit(img, options.max_long_edge);

    let output_bytes = encode_image(&img, options)?;
    let optimized_size = output_bytes.len();

    let result = ConversionResult {
        compression_ratio: compression_ratio(original_size as u64, optimized_size as u64),
        output_bytes,
        output_path,
        format: options.format,
        original_size,
        optimized_size,
        width: img.width(),
        height: img.height(),
    };

    if result.exceeds_upload_limit() {
        warn!(
            "Output is {} which is over the {} upload limit",
            format_file_size(optimized_size as u64),
            format_file_size(MAX_OUTPUT_BYTES as u64)
        );
    }

    Ok(result)
}

/// Writes the transformed bytes to `output_path`, creating parent directories.
pub fn write_result(result: &ConversionResult, output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .map_err(|_| PrepError::DirectoryCreationFailed(parent.to_path_buf()))?;
    }
    fs::write(output_path, &result.output_bytes)?;
    Ok(())
}

/// load -> fit -> encode -> save, for the batch converter.
pub fn process_image_pipeline(
    input_path: &Path,
    output_path: &Path,
    options: &ConversionOptions,
) -> Result<ConversionResult> {
    ensure_not_source(input_path, output_path)?;
    let result = transform_file(input_path, Some(output_path.to_path_buf()), options)?;
    write_result(&result, output_path)?;
    Ok(result)
}
