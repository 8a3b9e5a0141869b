//! OCR Types
//!
//! Token model shared by stored OCR results and text detection jobs, plus
//! the on-disk block schema.

use std::time::Duration;

use serde::Deserialize;

use crate::geometry::NormalizedRect;

/// Kind of an OCR block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlockKind {
    Page,
    Line,
    Word,
    /// Any tag this server does not consume (tables, key-value sets, ...)
    Other(String),
}

impl BlockKind {
    /// Parse a block type tag. Tags are matched exactly, as emitted by the engine.
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "PAGE" => BlockKind::Page,
            "LINE" => BlockKind::Line,
            "WORD" => BlockKind::Word,
            other => BlockKind::Other(other.to_string()),
        }
    }
}

/// One OCR-recognized unit with its page and normalized bounding box
#[derive(Debug, Clone, PartialEq)]
pub struct OcrToken {
    pub kind: BlockKind,
    pub text: String,
    /// Page number (1-indexed)
    pub page: u32,
    /// Confidence score (0-100)
    pub confidence: f32,
    pub geometry: NormalizedRect,
}

impl OcrToken {
    pub fn word(text: &str, page: u32, geometry: NormalizedRect) -> Self {
        Self {
            kind: BlockKind::Word,
            text: text.to_string(),
            page,
            confidence: 99.0,
            geometry,
        }
    }
}

/// Status of an asynchronous text detection job
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    InProgress,
    Succeeded,
    /// Finished, but some pages could not be processed
    PartialSuccess,
    Failed,
}

impl JobStatus {
    /// No further status change will happen
    pub fn is_terminal(self) -> bool {
        !matches!(self, JobStatus::InProgress)
    }
}

/// Outcome of a single status query
#[derive(Debug, Clone)]
pub struct JobPoll {
    pub status: JobStatus,
    /// Tokens attached to the response. Only populated once the job succeeded.
    pub tokens: Vec<OcrToken>,
    /// Engine-provided status message, if any
    pub message: Option<String>,
}

impl JobPoll {
    pub fn in_progress() -> Self {
        Self {
            status: JobStatus::InProgress,
            tokens: Vec::new(),
            message: None,
        }
    }
}

/// Stored OCR block record
///
/// Unknown fields (`Id`, `Relationships`, `Polygon`, ...) are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredBlock {
    #[serde(default)]
    pub block_type: Option<String>,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub geometry: Option<StoredGeometry>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredGeometry {
    #[serde(default)]
    pub bounding_box: Option<StoredBoundingBox>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct StoredBoundingBox {
    #[serde(default)]
    pub left: Option<f32>,
    #[serde(default)]
    pub top: Option<f32>,
    #[serde(default)]
    pub width: Option<f32>,
    #[serde(default)]
    pub height: Option<f32>,
}

impl From<StoredBlock> for OcrToken {
    fn from(block: StoredBlock) -> Self {
        let geometry = block
            .geometry
            .and_then(|g| g.bounding_box)
            .map(|bb| {
                NormalizedRect::new(
                    bb.left.unwrap_or_default(),
                    bb.top.unwrap_or_default(),
                    bb.width.unwrap_or_default(),
                    bb.height.unwrap_or_default(),
                )
            })
            .unwrap_or_default();

        OcrToken {
            kind: BlockKind::from_tag(block.block_type.as_deref().unwrap_or_default()),
            text: block.text.unwrap_or_default(),
            page: block.page.unwrap_or_default(),
            confidence: block.confidence.unwrap_or_default(),
            geometry,
        }
    }
}

/// OCR error types
#[derive(Debug, thiserror::Error)]
pub enum OcrError {
    #[error("Stored OCR result does not match the block schema: {0}")]
    Deserialization(String),

    #[error("OCR job submission rejected: {0}")]
    Submission(String),

    #[error("OCR job {job_id} failed{}", .message.as_ref().map(|m| format!(": {}", m)).unwrap_or_default())]
    JobFailed {
        job_id: String,
        message: Option<String>,
    },

    #[error("Interrupted while waiting for OCR job {job_id}")]
    Interrupted { job_id: String },

    #[error("OCR job {job_id} still running after {attempts} polls ({waited:?})")]
    Timeout {
        job_id: String,
        attempts: u32,
        waited: Duration,
    },

    #[error("API error: {0}")]
    Api(String),
}

impl From<serde_json::Error> for OcrError {
    fn from(err: serde_json::Error) -> Self {
        OcrError::Deserialization(err.to_string())
    }
}
