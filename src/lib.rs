//! Tracksift - audio and subtitle extraction from Matroska/WebM
//!
//! This library crate exposes the CLI's building blocks for integration
//! testing: configuration, byte sources and the artifact writer.

pub mod config;
pub mod output;
pub mod source;

use config::Config;
use tracksift_media::{ExtractOptions, Extraction, Result};

/// Open `locator` (a URL or a local path) and run a full extraction over it.
///
/// Failures to open or read the source surface as
/// [`tracksift_media::Error::Source`].
pub async fn extract_from(locator: &str, config: &Config) -> Result<Extraction> {
    extract_with(locator, config, &config.extract.options()).await
}

/// Like [`extract_from`], with explicit extraction options.
pub async fn extract_with(
    locator: &str,
    config: &Config,
    options: &ExtractOptions,
) -> Result<Extraction> {
    let stream = source::open(locator, config).await?;
    tracksift_media::extract(stream, options).await
}
