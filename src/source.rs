//! Byte sources feeding the extractor.
//!
//! A locator is either an `http://`/`https://` URL, streamed with reqwest,
//! or a local path, read in `chunk_size` pieces. Either way the result is a
//! stream of byte chunks; nothing is buffered beyond one chunk.

use crate::config::Config;
use bytes::Bytes;
use futures::stream::{BoxStream, StreamExt, TryStreamExt};
use reqwest::Client;
use std::io;
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs::File;
use tokio_util::io::ReaderStream;
use tracksift_media::{Error, Result};

/// A chunked byte stream.
pub type ByteStream = BoxStream<'static, io::Result<Bytes>>;

/// Where the bytes come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Locator {
    Http(String),
    File(PathBuf),
}

impl Locator {
    pub fn parse(locator: &str) -> Self {
        let lower = locator.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::Http(locator.to_string())
        } else {
            Self::File(PathBuf::from(locator))
        }
    }
}

/// Open a locator as a byte stream.
pub async fn open(locator: &str, config: &Config) -> Result<ByteStream> {
    match Locator::parse(locator) {
        Locator::Http(url) => open_url(&url, config).await,
        Locator::File(path) => open_file(&path, config.extract.chunk_size).await,
    }
}

/// Stream a local file in chunks of `chunk_size` bytes.
pub async fn open_file(path: &std::path::Path, chunk_size: usize) -> Result<ByteStream> {
    let file = File::open(path).await.map_err(|e| {
        Error::Source(io::Error::new(
            e.kind(),
            format!("Failed to open {}: {}", path.display(), e),
        ))
    })?;

    tracing::debug!("Reading {} in {} byte chunks", path.display(), chunk_size);
    Ok(ReaderStream::with_capacity(file, chunk_size).boxed())
}

/// Stream an HTTP(S) response body. Non-success statuses fail before any
/// bytes are delivered.
///
/// Only connection setup is bounded by `timeout_secs`; the body streams for
/// as long as the server keeps sending.
pub async fn open_url(url: &str, config: &Config) -> Result<ByteStream> {
    let mut builder =
        Client::builder().connect_timeout(Duration::from_secs(config.http.timeout_secs));
    if !config.http.user_agent.trim().is_empty() {
        builder = builder.user_agent(config.http.user_agent.clone());
    }
    let client = builder
        .build()
        .map_err(|e| Error::transport(format!("Failed to build HTTP client: {}", e)))?;

    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| Error::transport(format!("Failed to GET {}: {}", url, e)))?;

    let status = response.status();
    if !status.is_success() {
        return Err(Error::transport(format!("GET {} returned {}", url, status)));
    }

    tracing::debug!(
        "Streaming {} ({} bytes)",
        url,
        response
            .content_length()
            .map_or_else(|| "unknown".to_string(), |len| len.to_string())
    );

    Ok(response.bytes_stream().map_err(io::Error::other).boxed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_locator_parse() {
        assert_eq!(
            Locator::parse("https://example.com/a.mkv"),
            Locator::Http("https://example.com/a.mkv".to_string())
        );
        assert_eq!(
            Locator::parse("HTTP://example.com/a.webm"),
            Locator::Http("HTTP://example.com/a.webm".to_string())
        );
        assert_eq!(
            Locator::parse("/media/movie.mkv"),
            Locator::File(PathBuf::from("/media/movie.mkv"))
        );
        assert_eq!(
            Locator::parse("httpfile.mkv"),
            Locator::File(PathBuf::from("httpfile.mkv"))
        );
    }
}
