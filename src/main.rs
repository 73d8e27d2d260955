//! exifkit - inspect and extract EXIF/TIFF metadata in JPEG files.
//!
//! A thin shell over the library: each subcommand opens a file through
//! `ImageFile` and formats what it finds.

use std::process::ExitCode;

use clap::Parser;
use image::codecs::jpeg::JpegEncoder;
use image::{GrayImage, RgbImage};
use serde::Serialize;
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use exifkit::{
    config::{Cli, Command, DumpConfig, ThumbnailConfig},
    jpeg::ImageFile,
    tiff::{tag_name, StripImage, Thumbnail},
};

/// Quality used when a strip thumbnail is re-encoded for extraction.
const JPEG_QUALITY: u8 = 90;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.into_command() {
        Command::Dump(config) => run_dump(config),
        Command::Thumbnail(config) => run_thumbnail(config),
    }
}

// =============================================================================
// Dump Command
// =============================================================================

/// One row of the tag listing, shaped for both table and JSON output.
#[derive(Debug, Serialize)]
struct TagRecord {
    path: String,
    tag: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'static str>,
    kind: &'static str,
    count: u32,
    value: String,
}

fn run_dump(config: DumpConfig) -> ExitCode {
    init_logging(config.verbose);

    let mut file = match ImageFile::open(&config.file) {
        Ok(f) => f,
        Err(e) => {
            error!("failed to read {}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let records: Vec<TagRecord> = file
        .all_tags()
        .into_iter()
        .map(|(path, tag, value)| TagRecord {
            path: path.to_string(),
            tag,
            name: tag_name(tag),
            kind: value.field_type().name(),
            count: value.count(),
            value: value.to_string(),
        })
        .collect();

    if config.json {
        match serde_json::to_string_pretty(&records) {
            Ok(json) => println!("{}", json),
            Err(e) => {
                error!("failed to encode listing: {}", e);
                return ExitCode::FAILURE;
            }
        }
        return ExitCode::SUCCESS;
    }

    match file.info() {
        Some(info) => println!(
            "{}: {}x{} pixels, {} channel(s), {}-bit",
            config.file.display(),
            info.width,
            info.height,
            info.channels,
            info.precision
        ),
        None => println!("{}", config.file.display()),
    }

    if records.is_empty() {
        println!("  (no metadata tags)");
    }
    for record in &records {
        println!(
            "  {:28} {:>5}  {:28} {:>9} x{:<5} {}",
            record.path,
            record.tag,
            record.name.unwrap_or("-"),
            record.kind,
            record.count,
            record.value
        );
    }

    if let Some(thumbnail) = file.thumbnail() {
        println!(
            "thumbnail: compression {}, {} bytes",
            thumbnail.compression(),
            thumbnail.size_in_bytes()
        );
    }

    ExitCode::SUCCESS
}

// =============================================================================
// Thumbnail Command
// =============================================================================

fn run_thumbnail(config: ThumbnailConfig) -> ExitCode {
    init_logging(config.verbose);

    let mut file = match ImageFile::open(&config.file) {
        Ok(f) => f,
        Err(e) => {
            error!("failed to read {}: {}", config.file.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let Some(thumbnail) = file.thumbnail() else {
        eprintln!("{}: no embedded thumbnail", config.file.display());
        return ExitCode::FAILURE;
    };

    let encoded = match thumbnail_jpeg_bytes(thumbnail) {
        Ok(bytes) => bytes,
        Err(e) => {
            error!("failed to encode thumbnail: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = std::fs::write(&config.output, &encoded) {
        error!("failed to write {}: {}", config.output.display(), e);
        return ExitCode::FAILURE;
    }

    println!(
        "wrote {} ({} bytes)",
        config.output.display(),
        encoded.len()
    );
    ExitCode::SUCCESS
}

/// JPEG bytes for a thumbnail: blobs verbatim, strip images re-encoded.
fn thumbnail_jpeg_bytes(thumbnail: &Thumbnail) -> Result<Vec<u8>, String> {
    match thumbnail {
        Thumbnail::Jpeg(blob) => Ok(blob.to_vec()),
        Thumbnail::Strips(strips) => encode_strips(strips),
    }
}

fn encode_strips(strips: &StripImage) -> Result<Vec<u8>, String> {
    let pixels = strips.pixels.to_vec();
    let mut encoded = Vec::new();
    let mut encoder = JpegEncoder::new_with_quality(&mut encoded, JPEG_QUALITY);
    match strips.channels {
        1 => {
            let image = GrayImage::from_raw(strips.width, strips.height, pixels)
                .ok_or("strip data does not match the recorded dimensions")?;
            encoder.encode_image(&image).map_err(|e| e.to_string())?;
        }
        3 => {
            let image = RgbImage::from_raw(strips.width, strips.height, pixels)
                .ok_or("strip data does not match the recorded dimensions")?;
            encoder.encode_image(&image).map_err(|e| e.to_string())?;
        }
        n => return Err(format!("unsupported channel count: {}", n)),
    }
    Ok(encoded)
}

/// Initialize the tracing/logging subsystem.
fn init_logging(verbose: bool) {
    let env_filter = if verbose { "exifkit=debug" } else { "exifkit=info" };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}
