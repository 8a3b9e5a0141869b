//! Extraction request model
//!
//! The wire body is parsed into an `ExtractionRequest` at the boundary; the
//! extractors only ever see the validated form.

use std::str::FromStr;

use serde::Deserialize;

use crate::error::AppError;
use crate::geometry::NormalizedRect;
use crate::storage::ObjectLocation;

/// Requested output of an extraction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputType {
    /// Space-joined OCR words inside the region
    Text,
    /// Base64-encoded raster crop of the region
    Image,
}

impl FromStr for OutputType {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("text") {
            Ok(OutputType::Text)
        } else if s.eq_ignore_ascii_case("image") {
            Ok(OutputType::Image)
        } else {
            Err(AppError::BadRequest(format!(
                "Unsupported output type '{}', expected TEXT or IMAGE",
                s
            )))
        }
    }
}

/// JSON body of `POST /textract/extract`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractRequestBody {
    pub bucket: String,
    pub document_key: String,
    #[serde(default)]
    pub ocr_document_key: Option<String>,
    #[serde(default = "default_true")]
    pub get_ocr_from_s3: bool,
    #[serde(default)]
    pub page_number: i64,
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub width: f32,
    #[serde(default)]
    pub height: f32,
    #[serde(rename = "type", default)]
    pub output_type: Option<String>,
}

fn default_true() -> bool {
    true
}

/// A validated extraction request
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionRequest {
    /// Source document
    pub document: ObjectLocation,
    /// Stored OCR result for the document, if any
    pub ocr_result: Option<ObjectLocation>,
    /// Read `ocr_result` instead of running a text detection job
    pub use_stored_ocr: bool,
    /// Page number (1-indexed)
    pub page_number: u32,
    pub rect: NormalizedRect,
    pub output: OutputType,
}

impl TryFrom<ExtractRequestBody> for ExtractionRequest {
    type Error = AppError;

    fn try_from(body: ExtractRequestBody) -> Result<Self, Self::Error> {
        let output = body
            .output_type
            .as_deref()
            .ok_or_else(|| AppError::BadRequest("Missing output type".to_string()))?
            .parse::<OutputType>()?;

        let page_number = u32::try_from(body.page_number)
            .ok()
            .filter(|page| *page >= 1)
            .ok_or_else(|| {
                AppError::BadRequest(format!(
                    "Invalid page number {}, pages start at 1",
                    body.page_number
                ))
            })?;

        let ocr_result = body
            .ocr_document_key
            .filter(|key| !key.is_empty())
            .map(|key| ObjectLocation::new(body.bucket.clone(), key));

        Ok(ExtractionRequest {
            document: ObjectLocation::new(body.bucket, body.document_key),
            ocr_result,
            use_stored_ocr: body.get_ocr_from_s3,
            page_number,
            rect: NormalizedRect::new(body.x, body.y, body.width, body.height),
            output,
        })
    }
}
