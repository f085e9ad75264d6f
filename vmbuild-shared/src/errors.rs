//! Error types used across the vmbuild pipeline.

use thiserror::Error;

/// Result type for vmbuild operations.
pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BuildError {
    /// The image tool could not report a format for the source image.
    ///
    /// Never fatal on its own: the disk step treats it as "format unknown".
    #[error("image inspection failed: {0}")]
    Inspection(String),

    /// Direct copy of a format-matching source failed.
    #[error("error copying source file: {0}")]
    Copy(String),

    /// The image conversion tool failed.
    #[error("error creating hard drive: {0}")]
    Conversion(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("storage error: {0}")]
    Storage(String),

    #[error("internal error: {0}")]
    Internal(String),

    /// The build was cancelled before all steps ran.
    #[error("build cancelled: {0}")]
    Cancelled(String),
}

// Implement From for common error types to enable `?` operator

impl From<serde_json::Error> for BuildError {
    fn from(err: serde_json::Error) -> Self {
        BuildError::Config(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for BuildError {
    fn from(err: serde_yaml::Error) -> Self {
        BuildError::Config(format!("YAML error: {}", err))
    }
}
