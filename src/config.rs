//! Command-line interface definitions.
//!
//! The binary is a thin demonstration shell around the library: one
//! subcommand per workflow, each with its own argument struct. Options can
//! also be set through environment variables with the `EXIFKIT_` prefix.
//!
//! # Example
//!
//! ```ignore
//! use exifkit::config::{Cli, Command};
//! use clap::Parser;
//!
//! let cli = Cli::parse();
//! match cli.into_command() {
//!     Command::Dump(config) => { /* list tags from config.file */ }
//!     Command::Thumbnail(config) => { /* extract to config.output */ }
//! }
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

// =============================================================================
// Default Values
// =============================================================================

/// Default output path for an extracted thumbnail.
pub const DEFAULT_THUMBNAIL_OUTPUT: &str = "thumbnail.jpg";

// =============================================================================
// CLI
// =============================================================================

/// exifkit - inspect and extract EXIF/TIFF metadata in JPEG files.
#[derive(Parser, Debug, Clone)]
#[command(name = "exifkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    command: Command,
}

impl Cli {
    /// Consume the parsed CLI and return the selected command.
    pub fn into_command(self) -> Command {
        self.command
    }
}

/// Top-level subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// List every metadata tag in a file.
    Dump(DumpConfig),

    /// Extract the embedded thumbnail to a JPEG file.
    Thumbnail(ThumbnailConfig),
}

// =============================================================================
// Dump Command
// =============================================================================

/// Arguments for the `dump` subcommand.
#[derive(Args, Debug, Clone)]
pub struct DumpConfig {
    /// Path of the image file to inspect.
    pub file: PathBuf,

    /// Emit the listing as JSON instead of a table.
    #[arg(long, default_value_t = false)]
    pub json: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Thumbnail Command
// =============================================================================

/// Arguments for the `thumbnail` subcommand.
#[derive(Args, Debug, Clone)]
pub struct ThumbnailConfig {
    /// Path of the image file holding the thumbnail.
    pub file: PathBuf,

    /// Where to write the extracted thumbnail.
    #[arg(
        short,
        long,
        default_value = DEFAULT_THUMBNAIL_OUTPUT,
        env = "EXIFKIT_THUMBNAIL_OUTPUT"
    )]
    pub output: PathBuf,

    /// Enable verbose logging (debug level).
    #[arg(short, long, default_value_t = false)]
    pub verbose: bool,
}

// =============================================================================
// Tests
// =============================================================================
