//! Region extraction route
//!
//! `POST /textract/extract` returns the text or base64 image of a page region
//! as a plain-text body.

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    routing::post,
    Json, Router,
};
use tracing::Instrument;
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::extract::{ExtractRequestBody, ExtractionRequest};
use crate::state::AppState;

/// Create the extract router
pub fn router() -> Router<AppState> {
    Router::new().route("/extract", post(extract_region))
}

/// Extract text or an image from a region of a document page
async fn extract_region(
    State(state): State<AppState>,
    payload: std::result::Result<Json<ExtractRequestBody>, JsonRejection>,
) -> Result<String> {
    let Json(body) = payload?;
    let request = ExtractionRequest::try_from(body)?;

    let span = tracing::info_span!(
        "extract",
        request_id = %Uuid::new_v4(),
        page = request.page_number,
        output = ?request.output,
    );

    async move {
        tracing::info!(
            "Extracting region {:?} from {}",
            request.rect,
            request.document
        );

        let started = Instant::now();
        let mut cancellation = state.cancellation();
        let data = state.extractor().extract(&request, &mut cancellation).await?;

        tracing::info!(
            "Extraction completed in {:?} ({} bytes)",
            started.elapsed(),
            data.len()
        );

        Ok::<_, AppError>(data)
    }
    .instrument(span)
    .await
}
