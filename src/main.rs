use anyhow::{Context, Result};
use clap::Parser;
use img_prep::cli::{Args, Commands, ImageArgs};
use img_prep::{
    batch_convert_images, config, logger, send_images, validation, ApiClient, ApiSettings,
    ConversionOptions, MetadataDocument, PayloadEncoder, SendOptions,
};
use std::process::ExitCode;
use tracing::{debug, error};

fn main() -> ExitCode {
    // before parsing, so clap's env fallbacks see .env values
    let env_file = config::load_env_file();
    let args = Args::parse();
    logger::init(args.quiet, args.verbose);
    if let Some(path) = env_file {
        debug!("Loaded environment from {}", path.display());
    }

    match run(args) {
        Ok(code) => code,
        Err(e) => {
            error!("❌ {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<ExitCode> {
    let show_progress = !args.quiet;

    match args.command {
        Commands::Convert { image, output } => {
            let options = conversion_options(&image)?;
            validation::validate_input_path(&image.input)?;
            validation::prepare_output_dir(&output, &image.input)
                .with_context(|| format!("cannot use output directory {}", output.display()))?;

            batch_convert_images(&image.input, &output, &options, show_progress)
                .context("batch conversion failed")?;
            // skipped files are reported but don't fail a conversion run
            Ok(ExitCode::SUCCESS)
        }
        Commands::Send {
            image,
            api_url,
            api_key,
            metadata,
            include_base64,
            save_optimized,
            save_response,
            timeout,
        } => {
            let conversion = conversion_options(&image)?;
            validation::validate_input_path(&image.input)?;
            let metadata = MetadataDocument::load_optional(metadata.as_deref())
                .context("invalid metadata")?;
            let settings = ApiSettings::from_args(api_url, api_key, Some(timeout))
                .context("invalid API configuration")?;
            let client = ApiClient::new(settings).context("cannot build HTTP client")?;
            let encoder = PayloadEncoder::new(metadata, include_base64);

            let options = SendOptions {
                conversion,
                save_optimized,
                save_response,
            };
            let report = send_images(&image.input, &options, &encoder, &client, show_progress)?;

            Ok(if report.is_clean() {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            })
        }
    }
}

fn conversion_options(image: &ImageArgs) -> Result<ConversionOptions> {
    ConversionOptions::new(
        image.format,
        Some(image.quality),
        Some(image.max_size),
        image.recursive,
    )
    .context("invalid conversion options")
}
