//! File-based config sources.
//!
//! Provides [`FileSource`](file_source::FileSource) with one constructor
//! per file format (YAML, JSON, TOML) gated by feature flags, and the
//! [`parse_config_str`] helper used by `checkpoint validate`.

pub mod file_source;

use sha2::{Digest, Sha256};

use crate::config::model::Config;
use crate::error::CheckpointError;

/// Parse a config string based on file extension.
pub fn parse_config_str(
    ext: &str,
    content: &str,
    path_display: &str,
) -> Result<Config, CheckpointError> {
    match ext {
        #[cfg(feature = "yaml")]
        "yaml" | "yml" => serde_yml::from_str(content).map_err(|e| CheckpointError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "json")]
        "json" => serde_json::from_str(content).map_err(|e| CheckpointError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        #[cfg(feature = "toml")]
        "toml" => toml::from_str(content).map_err(|e| CheckpointError::ConfigParse {
            path: path_display.to_string(),
            source: Box::new(e),
        }),

        other => Err(CheckpointError::UnsupportedFormat(other.to_string())),
    }
}

/// Compute a lowercase hex-encoded SHA-256 digest.
#[must_use]
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}
