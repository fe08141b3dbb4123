//! Error types for label persistence operations.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while reading or writing label and taxonomy files.
#[derive(Error, Debug)]
pub enum FormatError {
    /// I/O error during file operations
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing or serialization error (configuration files)
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decoding or probing error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Image dimensions required for normalization but not available
    #[error("Image dimensions required but not available for '{image}'")]
    MissingDimensions {
        /// The image missing dimensions
        image: String,
    },

    /// Referenced path does not exist or is not usable
    #[error("Path not usable: {path:?}")]
    BadPath {
        /// The offending path
        path: PathBuf,
    },
}

impl FormatError {
    /// Create a missing dimensions error.
    pub fn missing_dimensions(image: impl Into<String>) -> Self {
        Self::MissingDimensions {
            image: image.into(),
        }
    }

    /// Create a bad path error.
    pub fn bad_path(path: impl Into<PathBuf>) -> Self {
        Self::BadPath { path: path.into() }
    }
}
