//! Error types for the safety engine.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while loading or validating a policy.
///
/// Classification itself never fails: malformed commands are reported through
/// [`crate::ParseResult::Unparsed`] instead.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// Policy file could not be read
    #[error("failed to read policy file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Policy file is not valid TOML for [`crate::PolicyConfig`]
    #[error("failed to parse policy config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Policy values are well-formed but not acceptable
    #[error("invalid policy config: {0}")]
    InvalidConfig(String),
}
