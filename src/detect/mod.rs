//! Detection-assisted labeling: ONNX inference, decode, and suppression.

mod pipeline;
mod postprocess;

pub use pipeline::Detector;
pub use postprocess::{non_max_suppression, suppression_overlap};

use thiserror::Error;

use crate::model::Point;

/// Errors from model loading and detection.
#[derive(Error, Debug)]
pub enum DetectError {
    /// Detection requested before a model was loaded
    #[error("No model loaded")]
    ModelNotLoaded,

    /// I/O error while reading the image or model
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Inference runtime failure
    #[error("Inference error: {0}")]
    Runtime(#[from] ort::Error),

    /// Model output did not have the expected layout
    #[error("Unexpected model output: {message}")]
    BadOutput {
        /// Description of the layout mismatch
        message: String,
    },
}

impl DetectError {
    /// Create a bad output error with a message.
    pub fn bad_output(message: impl Into<String>) -> Self {
        Self::BadOutput {
            message: message.into(),
        }
    }
}

/// Static configuration for one detection variant.
#[derive(Debug, Clone, PartialEq)]
pub struct DetectorConfig {
    /// Points per detected shape.
    pub point_count: usize,
    /// Number of classes the model predicts; `None` for shape-only models.
    pub class_count: Option<usize>,
    /// Input tensor width; overridden by the model's declared shape when static.
    pub input_width: u32,
    /// Input tensor height; overridden by the model's declared shape when static.
    pub input_height: u32,
    /// Confidence floor applied during decode.
    pub conf_threshold: f32,
    /// Overlap score above which a candidate is suppressed.
    pub nms_threshold: f32,
    /// Second confidence floor applied after suppression.
    pub accept_threshold: f32,
    /// Whether to run non-max suppression for this variant.
    pub apply_nms: bool,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            point_count: 4,
            class_count: None,
            input_width: 640,
            input_height: 640,
            conf_threshold: 0.6,
            nms_threshold: 0.3,
            accept_threshold: 0.5,
            apply_nms: true,
        }
    }
}

impl DetectorConfig {
    /// Decoded row width: confidence, optional class id, then point pairs.
    pub fn row_len(&self) -> usize {
        1 + usize::from(self.class_count.is_some()) + self.point_count * 2
    }
}

/// One decoded detection, with points already in image pixel space.
#[derive(Debug, Clone)]
pub struct Candidate {
    /// Raw model confidence; compared against thresholds, unbounded above.
    pub confidence: f32,
    /// Shape points in original-image pixel coordinates.
    pub points: Vec<Point>,
    /// Class id when the model classifies; absent for shape-only variants.
    pub class_id: Option<u32>,
}
