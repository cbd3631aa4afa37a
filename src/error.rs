use thiserror::Error;

use crate::models::ColorSpace;

/// Non-fatal problems recorded while processing one frame.
///
/// None of these abort a tick: each stage substitutes a safe fallback and
/// the issue travels with the frame output so the caller can surface it.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PipelineIssue {
    #[error("unknown color space {requested:?}, using HSV")]
    UnsupportedColorSpace { requested: String },

    #[error("color conversion to {space} failed: {reason}")]
    ConversionFailure { space: ColorSpace, reason: String },

    #[error("contour {index} has zero area, centroid skipped")]
    DegenerateContour { index: usize },

    #[error("{stage} failed: {message}")]
    StageFailed { stage: String, message: String },
}

impl PipelineIssue {
    /// Whether the issue belongs in the user-facing status line.
    pub fn is_reportable(&self) -> bool {
        !matches!(self, PipelineIssue::DegenerateContour { .. })
    }
}

/// Why a frame source produced no frame this tick.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("frame source unavailable: {0}")]
    Unavailable(String),

    #[error("failed to read frame: {0}")]
    ReadFailed(String),

    #[error("frame source exhausted")]
    Exhausted,
}
