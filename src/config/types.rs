use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracksift_media::ebml::DEFAULT_MAX_ELEMENT_SIZE;
use tracksift_media::ExtractOptions;

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub extract: ExtractConfig,

    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ExtractConfig {
    /// Read size for local files in bytes (default: 2 MiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Largest leaf element the tokenizer will buffer (default: 64 MiB)
    #[serde(default = "default_max_element_size")]
    pub max_element_size: u64,

    /// Directory extracted tracks are written to
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Also write attached files (fonts, cover art)
    #[serde(default)]
    pub write_attachments: bool,
}

fn default_chunk_size() -> usize {
    2 * 1024 * 1024
}

fn default_max_element_size() -> u64 {
    DEFAULT_MAX_ELEMENT_SIZE
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./extracted")
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            max_element_size: default_max_element_size(),
            output_dir: default_output_dir(),
            write_attachments: false,
        }
    }
}

impl ExtractConfig {
    /// Options for the extraction core.
    pub fn options(&self) -> ExtractOptions {
        ExtractOptions::new().max_element_size(self.max_element_size)
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpConfig {
    /// Connection timeout in seconds. Body streaming has no deadline.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_user_agent() -> String {
    format!("tracksift/{}", env!("CARGO_PKG_VERSION"))
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}
