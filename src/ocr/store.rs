//! Stored OCR results
//!
//! Reads a previously computed block list (a JSON array in object storage)
//! and maps it into tokens. No filtering happens here.

use std::sync::Arc;

use crate::error::AppError;
use crate::storage::{ObjectLocation, ObjectStore};

use super::types::{OcrError, OcrToken, StoredBlock};

/// Adapter over object storage for stored OCR results
#[derive(Clone)]
pub struct OcrResultStore {
    storage: Arc<dyn ObjectStore>,
}

impl OcrResultStore {
    pub fn new(storage: Arc<dyn ObjectStore>) -> Self {
        Self { storage }
    }

    /// Load every token of a stored OCR result
    pub async fn load(&self, location: &ObjectLocation) -> Result<Vec<OcrToken>, AppError> {
        let bytes = self.storage.get_bytes(location).await?;
        let tokens = parse_blocks(&bytes)?;

        tracing::debug!("Loaded {} OCR blocks from {}", tokens.len(), location);
        Ok(tokens)
    }
}

/// Parse a stored block array into tokens, preserving order
pub fn parse_blocks(bytes: &[u8]) -> Result<Vec<OcrToken>, OcrError> {
    let blocks: Vec<StoredBlock> = serde_json::from_slice(bytes)?;
    Ok(blocks.into_iter().map(OcrToken::from).collect())
}
