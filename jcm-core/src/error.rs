//! Error types.

use std::io;

use crate::scenario::Variant;

pub type Result<T> = core::result::Result<T, Error>;

impl From<io::Error> for Error {
    fn from(e: io::Error) -> Self {
        Self::IoError(e.to_string())
    }
}

/// Crate-wide error type.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("bad scenario: {name} (the {variant} variant knows: {expected}){hint}")]
    UnknownScenario {
        name: String,
        variant: Variant,
        expected: String,
        hint: String,
    },
    #[error("unknown variant: {0} (expected `transmission` or `variance`)")]
    UnknownVariant(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error("failed launching {0}: {1}")]
    LaunchFailed(String, String),
    #[error("failed capturing process output into {0}: {1}")]
    OutputCaptureFailed(String, String),
    #[error("replicate {index} of the {scenario} scenario failed: {status}")]
    ReplicateFailed {
        scenario: String,
        index: u32,
        status: String,
    },

    #[error("io error: {0}")]
    IoError(String),
    #[error("toml deserialization error: {0}")]
    TomlDeserError(#[from] toml::de::Error),
    #[error("toml serialization error: {0}")]
    TomlSerError(#[from] toml::ser::Error),
}
