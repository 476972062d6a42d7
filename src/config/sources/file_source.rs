//! Async file-based config source with SHA256 versioning.
//!
//! [`FileSource`] reads the file via Tokio, deserializes it with the
//! parser picked by its constructor ([`FileSource::yaml`],
//! [`FileSource::json`], [`FileSource::toml`]), validates the result, and
//! hashes the raw content to report the config version.

use std::path::{Path, PathBuf};

use super::sha256_hex;
use crate::config::model::Config;
use crate::config::validation::validate;
use crate::config::ConfigVersion;
use crate::error::CheckpointError;

type ParseFn = fn(&str) -> Result<Config, Box<dyn std::error::Error + Send + Sync>>;

pub struct FileSource {
    path: PathBuf,
    name: &'static str,
    deserialize: ParseFn,
}

impl FileSource {
    #[must_use]
    pub fn new(path: PathBuf, name: &'static str, deserialize: ParseFn) -> Self {
        Self {
            path,
            name,
            deserialize,
        }
    }

    #[cfg(feature = "yaml")]
    #[must_use]
    pub fn yaml(path: PathBuf) -> Self {
        Self::new(path, "yaml", |content| {
            serde_yml::from_str::<Config>(content).map_err(Into::into)
        })
    }

    #[cfg(feature = "json")]
    #[must_use]
    pub fn json(path: PathBuf) -> Self {
        Self::new(path, "json", |content| {
            serde_json::from_str::<Config>(content).map_err(Into::into)
        })
    }

    #[cfg(feature = "toml")]
    #[must_use]
    pub fn toml(path: PathBuf) -> Self {
        Self::new(path, "toml", |content| {
            toml::from_str::<Config>(content).map_err(Into::into)
        })
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_content(&self) -> Result<String, CheckpointError> {
        tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                CheckpointError::ConfigFileNotFound {
                    path: self.path.clone(),
                }
            } else {
                CheckpointError::Io(e)
            }
        })
    }

    pub async fn load(&self) -> Result<(Config, ConfigVersion), CheckpointError> {
        let content = self.read_content().await?;

        let config = (self.deserialize)(&content).map_err(|e| CheckpointError::ConfigParse {
            path: self.path.display().to_string(),
            source: e,
        })?;

        if let Err(errors) = validate(&config) {
            return Err(CheckpointError::ConfigValidation { errors });
        }

        let hash = sha256_hex(content.as_bytes());
        Ok((config, ConfigVersion::Hash(hash)))
    }
}
