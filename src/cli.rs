use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "tracksift")]
#[command(author, version, about = "Extract audio and subtitle tracks from Matroska/WebM")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract audio and subtitle tracks into files
    Extract {
        /// Local file or http(s) URL
        #[arg(required = true)]
        source: String,

        /// Output directory (overrides extract.output_dir)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Read size in bytes for local files (overrides extract.chunk_size)
        #[arg(long)]
        chunk_size: Option<usize>,

        /// Also write attached files such as fonts
        #[arg(long)]
        attachments: bool,
    },

    /// List the audio and subtitle tracks of a source
    Tracks {
        /// Local file or http(s) URL
        #[arg(required = true)]
        source: String,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },

    /// Display version information
    Version,
}
