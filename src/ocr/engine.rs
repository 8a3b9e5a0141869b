//! OCR Engines
//!
//! Defines the engine trait for asynchronous text detection and the
//! Textract implementation.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_textract::{
    error::DisplayErrorContext,
    operation::get_document_text_detection::GetDocumentTextDetectionOutput,
    types::{Block, DocumentLocation, JobStatus as TextractJobStatus, S3Object},
    Client,
};

use crate::config::AwsConfig;
use crate::geometry::NormalizedRect;
use crate::storage::ObjectLocation;

use super::types::{BlockKind, JobPoll, JobStatus, OcrError, OcrToken};

/// Largest page of blocks Textract returns per call
const MAX_RESULTS_PER_CALL: i32 = 1000;

/// Asynchronous OCR engine
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Start a text detection job for a document, returning the job id
    async fn start_text_detection(&self, document: &ObjectLocation) -> Result<String, OcrError>;

    /// Query a job once. Tokens are attached when the job has succeeded.
    async fn get_text_detection(&self, job_id: &str) -> Result<JobPoll, OcrError>;
}

/// AWS Textract engine
#[derive(Clone)]
pub struct TextractEngine {
    client: Client,
}

impl TextractEngine {
    pub fn new(sdk_config: &SdkConfig, config: &AwsConfig) -> Self {
        let mut builder = aws_sdk_textract::config::Builder::from(sdk_config);

        if let Some(endpoint) = &config.textract_endpoint {
            tracing::info!("Using Textract endpoint override: {}", endpoint);
            builder = builder.endpoint_url(endpoint);
        }

        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// Fetch one page of a job's results
    async fn fetch_page(
        &self,
        job_id: &str,
        next_token: Option<String>,
    ) -> Result<GetDocumentTextDetectionOutput, OcrError> {
        self.client
            .get_document_text_detection()
            .job_id(job_id)
            .max_results(MAX_RESULTS_PER_CALL)
            .set_next_token(next_token)
            .send()
            .await
            .map_err(|e| {
                OcrError::Api(format!(
                    "Failed to get results of job {}: {}",
                    job_id,
                    DisplayErrorContext(&e)
                ))
            })
    }
}

#[async_trait]
impl OcrEngine for TextractEngine {
    async fn start_text_detection(&self, document: &ObjectLocation) -> Result<String, OcrError> {
        let location = DocumentLocation::builder()
            .s3_object(
                S3Object::builder()
                    .bucket(&document.bucket)
                    .name(&document.key)
                    .build(),
            )
            .build();

        let response = self
            .client
            .start_document_text_detection()
            .document_location(location)
            .send()
            .await
            .map_err(|e| {
                OcrError::Submission(format!("{}: {}", document, DisplayErrorContext(&e)))
            })?;

        response
            .job_id()
            .map(str::to_string)
            .ok_or_else(|| OcrError::Submission(format!("{}: no job id returned", document)))
    }

    async fn get_text_detection(&self, job_id: &str) -> Result<JobPoll, OcrError> {
        let first = self.fetch_page(job_id, None).await?;
        let status = job_status(job_id, &first)?;
        let mut pages = vec![first];

        // Results of a finished job are paged; follow NextToken to the end
        if carries_results(status) {
            while let Some(token) = pages.last().and_then(|p| p.next_token()).map(str::to_string) {
                pages.push(self.fetch_page(job_id, Some(token)).await?);
            }
            tracing::debug!("Fetched {} result pages for job {}", pages.len(), job_id);
        }

        job_poll(job_id, &pages)
    }
}

fn carries_results(status: JobStatus) -> bool {
    matches!(status, JobStatus::Succeeded | JobStatus::PartialSuccess)
}

fn job_status(job_id: &str, output: &GetDocumentTextDetectionOutput) -> Result<JobStatus, OcrError> {
    match output.job_status() {
        Some(TextractJobStatus::InProgress) => Ok(JobStatus::InProgress),
        Some(TextractJobStatus::Succeeded) => Ok(JobStatus::Succeeded),
        Some(TextractJobStatus::PartialSuccess) => Ok(JobStatus::PartialSuccess),
        Some(TextractJobStatus::Failed) => Ok(JobStatus::Failed),
        other => Err(OcrError::Api(format!(
            "Unexpected status for job {}: {:?}",
            job_id, other
        ))),
    }
}

/// Fold the result pages of one status query into a poll outcome
///
/// Status and message come from the first page. Blocks are kept, in page
/// order, only for finished jobs.
fn job_poll(job_id: &str, pages: &[GetDocumentTextDetectionOutput]) -> Result<JobPoll, OcrError> {
    let first = pages
        .first()
        .ok_or_else(|| OcrError::Api(format!("No response for job {}", job_id)))?;
    let status = job_status(job_id, first)?;

    let tokens = if carries_results(status) {
        pages
            .iter()
            .flat_map(|page| page.blocks())
            .map(token_from_block)
            .collect()
    } else {
        Vec::new()
    };

    Ok(JobPoll {
        status,
        tokens,
        message: first.status_message().map(str::to_string),
    })
}

/// Map an SDK block into the token model
fn token_from_block(block: &Block) -> OcrToken {
    let geometry = block
        .geometry()
        .and_then(|g| g.bounding_box())
        .map(|bb| {
            NormalizedRect::new(
                float_or_zero(bb.left()),
                float_or_zero(bb.top()),
                float_or_zero(bb.width()),
                float_or_zero(bb.height()),
            )
        })
        .unwrap_or_default();

    let page: Option<i32> = block.page().into();

    OcrToken {
        kind: BlockKind::from_tag(block.block_type().map(|t| t.as_str()).unwrap_or_default()),
        text: block.text().unwrap_or_default().to_string(),
        page: page.map(|p| p.max(0) as u32).unwrap_or_default(),
        confidence: float_or_zero(block.confidence()),
        geometry,
    }
}

// Textract models some floats as optional and some as plain values
fn float_or_zero(value: impl Into<Option<f32>>) -> f32 {
    value.into().unwrap_or_default()
}
