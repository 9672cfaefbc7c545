mod cli;

use tracksift::{config, output};

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracksift_media::{DemuxStats, ExtractOptions, Extraction, TrackSummary};

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Respect RUST_LOG env var if set, otherwise use defaults based on verbose flag
    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| {
        if cli.verbose {
            "tracksift=trace,tracksift_media=trace,reqwest=debug".to_string()
        } else {
            "tracksift=info,tracksift_media=info".to_string()
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(&env_filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Extract {
            source,
            output,
            chunk_size,
            attachments,
        } => {
            let mut config = config::load_config_or_default(cli.config.as_deref())?;
            if let Some(chunk_size) = chunk_size {
                config.extract.chunk_size = chunk_size;
            }
            if let Some(output) = output {
                config.extract.output_dir = output;
            }
            if attachments {
                config.extract.write_attachments = true;
            }
            config::validate_config(&config)?;

            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(extract_source(&source, &config))
        }
        Commands::Tracks { source, json } => {
            let config = config::load_config_or_default(cli.config.as_deref())?;
            let rt = tokio::runtime::Runtime::new()?;
            rt.block_on(list_tracks(&source, &config, json))
        }
        Commands::Validate {
            config: config_path,
        } => {
            let path = config_path.or(cli.config);
            validate_config(path.as_deref())
        }
        Commands::Version => {
            println!("tracksift {}", env!("CARGO_PKG_VERSION"));
            Ok(())
        }
    }
}

async fn run(
    source: &str,
    config: &config::Config,
    options: &ExtractOptions,
) -> Result<Extraction> {
    tracing::info!("Extracting from {}", source);
    let extraction = tracksift::extract_with(source, config, options).await?;
    Ok(extraction)
}

async fn extract_source(source: &str, config: &config::Config) -> Result<()> {
    let extraction = run(source, config, &config.extract.options()).await?;

    let dir: PathBuf = shellexpand::tilde(&config.extract.output_dir.to_string_lossy())
        .into_owned()
        .into();
    let written = output::write_extraction(&extraction, &dir, config.extract.write_attachments)?;

    for file in &written {
        println!("{} ({} bytes)", file.path.display(), file.bytes);
    }

    let skipped = extraction.stats.blocks_malformed;
    if skipped > 0 {
        tracing::warn!("Skipped {} malformed blocks", skipped);
    }

    Ok(())
}

#[derive(Serialize)]
struct TrackReport<'a> {
    tracks: &'a [TrackSummary],
    artifacts: Vec<&'a str>,
    attachments: Vec<&'a str>,
    stats: DemuxStats,
}

/// List tracks from a metadata-only pass; no block content is buffered.
async fn list_tracks(source: &str, config: &config::Config, json: bool) -> Result<()> {
    let options = config.extract.options().metadata_only();
    let extraction = run(source, config, &options).await?;

    if json {
        let report = TrackReport {
            tracks: &extraction.tracks,
            artifacts: extraction.artifacts.iter().map(|a| a.name()).collect(),
            attachments: extraction
                .attachments
                .iter()
                .map(|a| a.name.as_str())
                .collect(),
            stats: extraction.stats,
        };
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Tracks: {}", extraction.tracks.len());
    for (summary, artifact) in extraction.tracks.iter().zip(&extraction.artifacts) {
        let track = &summary.track;
        print!("  [{}] {} ({})", track.number, track.media_type, track.language);
        if let Some(ref codec_id) = track.codec_id {
            print!(" {}", codec_id);
        }
        if let Some(ref name) = track.name {
            print!(" \"{}\"", name);
        }
        println!(", {} blocks -> {}", summary.block_count, artifact.name());
    }

    if !extraction.attachments.is_empty() {
        println!("\nAttachments: {}", extraction.attachments.len());
        for attachment in &extraction.attachments {
            print!("  {}", attachment.name);
            if let Some(ref mime_type) = attachment.mime_type {
                print!(" {}", mime_type);
            }
            println!();
        }
    }

    Ok(())
}

fn validate_config(path: Option<&Path>) -> Result<()> {
    match path {
        Some(p) => {
            println!("Validating config: {:?}", p);
            let config = config::load_config(p)?;
            println!("✓ Configuration is valid");
            print_config(&config);
        }
        None => {
            println!("No config file specified, using defaults");
            let config = config::Config::default();
            println!("Default config:");
            print_config(&config);
        }
    }

    Ok(())
}

fn print_config(config: &config::Config) {
    println!("  Chunk size: {} bytes", config.extract.chunk_size);
    println!("  Max element size: {} bytes", config.extract.max_element_size);
    println!("  Output dir: {:?}", config.extract.output_dir);
    println!("  Write attachments: {}", config.extract.write_attachments);
    println!("  HTTP connect timeout: {}s", config.http.timeout_secs);
}
