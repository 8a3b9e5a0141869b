//! OCR Module
//!
//! Provides the OCR tokens a text extraction filters. Tokens come from one
//! of two places:
//! - a stored OCR result (JSON block array in object storage)
//! - an on-demand text detection job, polled until it finishes
//!
//! ## Usage
//!
//! ```rust,ignore
//! use region_extract_server::ocr::{Cancellation, JobRunner, PollPolicy, TextractEngine};
//!
//! let runner = JobRunner::new(Arc::new(TextractEngine::new(&sdk_config, &aws)), PollPolicy::default());
//!
//! let job_id = runner.submit(&document).await?;
//! let tokens = runner.await_completion(&job_id, &mut Cancellation::never()).await?;
//! ```

mod engine;
mod job;
mod store;
mod types;

pub use engine::{OcrEngine, TextractEngine};
pub use job::{Cancellation, JobRunner, PollPolicy, Sleeper, TokioSleeper};
pub use store::{parse_blocks, OcrResultStore};
pub use types::{BlockKind, JobPoll, JobStatus, OcrError, OcrToken, StoredBlock};

#[cfg(test)]
pub(crate) use engine::tests::ScriptedEngine;
#[cfg(test)]
pub(crate) use job::tests::RecordingSleeper;
#[cfg(test)]
pub(crate) use store::tests::MemoryStore;
