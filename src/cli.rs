use crate::config::{
    ENV_API_ENDPOINT, ENV_API_KEY, ENV_API_TIMEOUT, ENV_FORMAT, ENV_MAX_SIZE, ENV_QUALITY,
    ENV_RECURSIVE,
};
use crate::constants::{DEFAULT_API_TIMEOUT_SECS, DEFAULT_MAX_LONG_EDGE, DEFAULT_QUALITY};
use crate::formats::TargetFormat;
use clap::{Args as ClapArgs, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(
    name = "img-prep",
    about = "Resize and recompress images to fit vision-model upload limits",
    long_about = "img-prep fits images to a maximum long edge (1568px by default), re-encodes them \
                  as JPEG, PNG or WebP, and either writes them to a directory or posts them as \
                  base64 JSON to an image API.",
    version,
    after_help = "EXAMPLES:\n  \
    img-prep convert -i ./photos -o ./prepared -f jpg -q 85\n  \
    img-prep convert -i \"./shots/*.png\" -o ./out -s 1024 -f webp\n  \
    img-prep send -i ./photos -r -m meta.json --save-response ./responses\n\n\
    ENVIRONMENT:\n  \
    IMG_PREP_FORMAT, IMG_PREP_QUALITY, IMG_PREP_MAX_SIZE, IMG_PREP_RECURSIVE\n  \
    API_ENDPOINT, API_HOST, REGISTER_IMAGE_ENDPOINT, API_KEY, API_TIMEOUT\n  \
    RUST_LOG (overrides --quiet/--verbose). A .env file is read at startup."
)]
pub struct Args {
    #[arg(short = 'Q', long, global = true, help = "Only print warnings and errors")]
    pub quiet: bool,

    #[arg(short, long, global = true, help = "Print per-step details")]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Options shared by both modes.
#[derive(ClapArgs, Debug, Clone)]
pub struct ImageArgs {
    #[arg(
        short,
        long,
        help = "Input image, directory, or glob pattern",
        long_help = "A single image, a directory of images, or a quoted glob such as './img/*.png'. \
                     Supported inputs: jpg, jpeg, png, gif, webp."
    )]
    pub input: PathBuf,

    #[arg(
        short,
        long,
        env = ENV_FORMAT,
        default_value_t = TargetFormat::Jpeg,
        help = "Output format (jpg, png, webp)"
    )]
    pub format: TargetFormat,

    #[arg(
        short,
        long,
        env = ENV_QUALITY,
        default_value_t = DEFAULT_QUALITY,
        help = "Encoding quality (0-100)",
        long_help = "JPEG and WebP quality from 0 to 100 (0 is treated as 1 for JPEG). \
                     For PNG: >=90 uses Zopfli, >=70 uses high compression, <70 uses standard compression."
    )]
    pub quality: u8,

    #[arg(
        short = 's',
        long = "max-size",
        env = ENV_MAX_SIZE,
        default_value_t = DEFAULT_MAX_LONG_EDGE,
        help = "Maximum length of the longest edge in pixels",
        long_help = "Images whose longest edge exceeds this are scaled down, keeping aspect ratio. \
                     Smaller images are never enlarged."
    )]
    pub max_size: u32,

    #[arg(
        short,
        long,
        env = ENV_RECURSIVE,
        help = "Descend into subdirectories"
    )]
    pub recursive: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    #[command(
        about = "Resize and re-encode images into a directory",
        long_about = "Batch converter. Every image found is fitted, re-encoded and written below the \
                      output directory, mirroring relative paths. Corrupt files are skipped."
    )]
    Convert {
        #[command(flatten)]
        image: ImageArgs,

        #[arg(short, long, help = "Output directory (created if missing)")]
        output: PathBuf,
    },

    #[command(
        about = "Resize images and post them to the image API",
        long_about = "Transforms each image in memory and posts it as base64 JSON. Exits non-zero \
                      when any file was skipped or could not be sent."
    )]
    Send {
        #[command(flatten)]
        image: ImageArgs,

        #[arg(
            short = 'u',
            long,
            env = ENV_API_ENDPOINT,
            help = "Full API URL",
            long_help = "Full URL to post to. Without it the URL is API_HOST + REGISTER_IMAGE_ENDPOINT \
                         (default http://localhost:1880/image-embed)."
        )]
        api_url: Option<String>,

        #[arg(short = 'k', long, env = ENV_API_KEY, hide_env_values = true, help = "API key")]
        api_key: Option<String>,

        #[arg(
            short,
            long,
            help = "JSON object merged into every payload's metadata",
            long_help = "Path to a JSON file holding an object. Its fields are added to each payload's \
                         metadata. The keys content_type, image_base64, metadata, filename, \
                         original_format and optimized_path are reserved."
        )]
        metadata: Option<PathBuf>,

        #[arg(long, help = "Also copy the base64 image into the metadata object")]
        include_base64: bool,

        #[arg(short = 'o', long, help = "Directory to keep the optimized images in")]
        save_optimized: Option<PathBuf>,

        #[arg(
            long,
            help = "File or directory for API responses",
            long_help = "A directory (or a path without an extension) receives one \
                         <name>_response.json per image; any other path is written as is."
        )]
        save_response: Option<PathBuf>,

        #[arg(
            long,
            env = ENV_API_TIMEOUT,
            default_value_t = DEFAULT_API_TIMEOUT_SECS,
            help = "Request timeout in seconds"
        )]
        timeout: u64,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_convert_defaults() {
        let args = Args::try_parse_from(["img-prep", "convert", "-i", "in", "-o", "out"]).unwrap();
        match args.command {
            Commands::Convert { image, output } => {
                assert_eq!(image.input, PathBuf::from("in"));
                assert_eq!(output, PathBuf::from("out"));
                assert_eq!(image.quality, DEFAULT_QUALITY);
                assert_eq!(image.max_size, DEFAULT_MAX_LONG_EDGE);
                assert!(!image.recursive);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_send_flags() {
        let args = Args::try_parse_from([
            "img-prep", "-Q", "send", "-i", "a.png", "-f", "webp", "-s", "800", "-k", "secret",
            "-u", "http://x/y", "--include-base64", "--timeout", "5",
        ])
        .unwrap();
        assert!(args.quiet);
        match args.command {
            Commands::Send {
                image,
                api_key,
                api_url,
                include_base64,
                timeout,
                ..
            } => {
                assert_eq!(image.format, TargetFormat::WebP);
                assert_eq!(image.max_size, 800);
                assert_eq!(api_key.as_deref(), Some("secret"));
                assert_eq!(api_url.as_deref(), Some("http://x/y"));
                assert!(include_base64);
                assert_eq!(timeout, 5);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_rejects_unknown_format() {
        let result = Args::try_parse_from(["img-prep", "convert", "-i", "a", "-o", "b", "-f", "bmp"]);
        assert!(result.is_err());
    }
}
