//! Error types for Checkpoint.
//!
//! [`CheckpointError`] covers everything that stops a subcommand: a
//! missing or unreadable config file, a file that does not parse, one that
//! declares groups or operations this binary does not serve, and bind or
//! I/O failures. [`ValidationError`] is one problem found in a parsed
//! config; validation collects all of them before failing.

use std::fmt;
use std::path::PathBuf;

/// One problem in a config file, located by group / operation id.
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// `(root)`, a group id, or `group.operation`.
    pub location: String,
    pub field: String,
    pub message: String,
    pub suggestion: Option<String>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "  {}: {} ({})", self.location, self.field, self.message)?;
        match &self.suggestion {
            Some(suggestion) => write!(f, ", {suggestion}"),
            None => Ok(()),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Renders validation problems one per line.
struct Problems<'a>(&'a [ValidationError]);

impl fmt::Display for Problems<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, problem) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("\n")?;
            }
            write!(f, "{problem}")?;
        }
        Ok(())
    }
}

fn enabled_formats() -> &'static str {
    match (cfg!(feature = "yaml"), cfg!(feature = "json"), cfg!(feature = "toml")) {
        (true, true, true) => ".yaml, .yml, .json, .toml",
        (true, true, false) => ".yaml, .yml, .json",
        (true, false, true) => ".yaml, .yml, .toml",
        (true, false, false) => ".yaml, .yml",
        (false, true, true) => ".json, .toml",
        (false, true, false) => ".json",
        (false, false, true) => ".toml",
        (false, false, false) => "none (build with --features file-backends)",
    }
}

#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum CheckpointError {
    #[error("No handler config found.\n\n  {hint}")]
    NoConfigSource { hint: String },

    #[error(
        "Config file not found: {}\n  Run 'checkpoint init' to write one with every handler group.",
        path.display()
    )]
    ConfigFileNotFound { path: PathBuf },

    #[error(
        "Could not parse {path}:\n  {source}\n  Expected top-level keys: gate, capture, advice, groups."
    )]
    ConfigParse {
        path: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error(
        "Config declares {} problem(s) in its groups/operations:\n{}",
        .errors.len(),
        Problems(.errors)
    )]
    ConfigValidation { errors: Vec<ValidationError> },

    #[error("Unsupported config format: '{0}' (this build reads {formats})", formats = enabled_formats())]
    UnsupportedFormat(String),

    #[error("Invalid listen address: {0}")]
    AddressParse(#[from] std::net::AddrParseError),

    #[error("Refusing to overwrite {}; pass --output to write elsewhere", path.display())]
    FileExists { path: PathBuf },

    #[error("{0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn problem(location: &str, suggestion: Option<&str>) -> ValidationError {
        ValidationError {
            location: location.into(),
            field: "id".into(),
            message: "unknown operation 'signup'".into(),
            suggestion: suggestion.map(String::from),
        }
    }

    #[test]
    fn validation_error_renders_location_and_suggestion() {
        assert_eq!(
            problem("user.signup", Some("expected one of: register, remove")).to_string(),
            "  user.signup: id (unknown operation 'signup'), expected one of: register, remove"
        );
        assert_eq!(
            problem("user.signup", None).to_string(),
            "  user.signup: id (unknown operation 'signup')"
        );
    }

    #[test]
    fn validation_failure_counts_problems_per_line() {
        let err = CheckpointError::ConfigValidation {
            errors: vec![problem("user.signup", None), problem("open.ping", None)],
        };
        let text = err.to_string();
        assert!(text.starts_with("Config declares 2 problem(s) in its groups/operations:\n"));
        assert!(text.ends_with("  open.ping: id (unknown operation 'signup')"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn hints_name_the_next_step() {
        let missing = CheckpointError::ConfigFileNotFound {
            path: "checkpoint.yaml".into(),
        };
        assert!(missing.to_string().contains("checkpoint init"));

        let format = CheckpointError::UnsupportedFormat("ini".into());
        assert!(format.to_string().starts_with("Unsupported config format: 'ini'"));
    }
}
