//! Configuration loading and validation.
//!
//! The config file declares which handlers carry markers and which
//! pipeline stages are installed. It is read once at startup: the
//! registry built from it is immutable for the life of the process.
//! Submodules provide the data model, validation logic, and the
//! file-based sources.

pub mod model;
pub mod sources;
pub mod validation;

#[derive(Debug, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ConfigVersion {
    Hash(String),
}

impl ConfigVersion {
    /// First eight characters of the version, for display.
    #[must_use]
    pub fn short(&self) -> &str {
        match self {
            Self::Hash(h) => h.get(..8).unwrap_or(h),
        }
    }
}
