//! Error types for the fusion pipeline.

use thiserror::Error;

/// Fusion pipeline error type.
///
/// Only [`FusionError::TransformUnavailable`] and the cloud decode variants
/// abort a processing cycle; everything else in the pipeline degrades and
/// continues.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FusionError {
    #[error("no transform chain from '{from}' to '{to}'")]
    TransformUnavailable { from: String, to: String },

    #[error("required field '{0}' missing from cloud")]
    MissingField(&'static str),

    #[error("cloud data truncated: point {index} needs bytes up to {needed}, buffer has {available}")]
    TruncatedData {
        index: usize,
        needed: usize,
        available: usize,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, FusionError>;
