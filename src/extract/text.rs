//! Text extraction
//!
//! Collects the OCR tokens of a document, either from a stored result or
//! from a fresh text detection job, and keeps the words inside the region.

use crate::error::{AppError, Result};
use crate::geometry::NormalizedRect;
use crate::ocr::{BlockKind, Cancellation, JobRunner, OcrResultStore, OcrToken};

use super::request::ExtractionRequest;

/// Extracts the OCR text inside a page region
#[derive(Clone)]
pub struct TextExtractor {
    store: OcrResultStore,
    jobs: JobRunner,
}

impl TextExtractor {
    pub fn new(store: OcrResultStore, jobs: JobRunner) -> Self {
        Self { store, jobs }
    }

    /// Words inside the requested region, joined by single spaces
    ///
    /// An empty string means nothing matched; it is not an error.
    pub async fn extract_text(
        &self,
        request: &ExtractionRequest,
        cancellation: &mut Cancellation,
    ) -> Result<String> {
        let tokens = self.tokens(request, cancellation).await?;
        let text = select_words(&tokens, request.page_number, &request.rect);

        tracing::debug!(
            "Selected {} characters from {} OCR blocks on page {}",
            text.len(),
            tokens.len(),
            request.page_number
        );

        Ok(text)
    }

    async fn tokens(
        &self,
        request: &ExtractionRequest,
        cancellation: &mut Cancellation,
    ) -> Result<Vec<OcrToken>> {
        if request.use_stored_ocr {
            let location = request.ocr_result.as_ref().ok_or_else(|| {
                AppError::BadRequest(
                    "ocrDocumentKey is required when reading stored OCR results".to_string(),
                )
            })?;
            return self.store.load(location).await;
        }

        tracing::info!("Starting OCR generation for {}", request.document);
        let tokens = self.jobs.run(&request.document, cancellation).await?;
        tracing::info!("OCR generated for {} ({} blocks)", request.document, tokens.len());

        Ok(tokens)
    }
}

/// Join the text of the words on `page` that lie inside `rect`
///
/// Source order is kept; tokens are not re-sorted by position.
pub fn select_words(tokens: &[OcrToken], page: u32, rect: &NormalizedRect) -> String {
    tokens
        .iter()
        .filter(|token| token.kind == BlockKind::Word)
        .filter(|token| token.page == page)
        .filter(|token| token.geometry.is_within(rect))
        .map(|token| token.text.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}
