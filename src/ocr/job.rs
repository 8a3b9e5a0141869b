//! OCR Job Runner
//!
//! Drives a text detection job from submission to a terminal state:
//!
//! ```text
//! SUBMITTED → {IN_PROGRESS}* → SUCCEEDED | PARTIAL_SUCCESS | FAILED
//! ```
//!
//! The delays between polls come from a `backon` exponential schedule. Each
//! wait goes through a [`Sleeper`] so tests can run the loop without real
//! delays, and races a [`Cancellation`] so a shutdown interrupts the loop
//! instead of leaving the request hanging.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use backon::{BackoffBuilder, ExponentialBuilder};
use tokio::sync::watch;

use crate::storage::ObjectLocation;

use super::engine::OcrEngine;
use super::types::{JobPoll, JobStatus, OcrError, OcrToken};

/// How often, and for how long, a job is polled
#[derive(Debug, Clone, PartialEq)]
pub struct PollPolicy {
    /// Delay after the first non-terminal poll
    pub interval: Duration,
    /// Multiplier applied to the delay after each poll (1.0 = fixed)
    pub backoff_factor: f64,
    /// Upper bound for a single delay
    pub max_interval: Duration,
    /// Give up after this many polls
    pub max_attempts: Option<u32>,
    /// Give up once the next delay would take the total wait past this
    pub max_wait: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(5),
            backoff_factor: 1.0,
            max_interval: Duration::from_secs(60),
            max_attempts: None,
            max_wait: None,
        }
    }
}

impl PollPolicy {
    /// Backoff schedule for the waits between polls
    ///
    /// No jitter: with the default factor of 1.0 every delay equals
    /// `interval`. A job polled `max_attempts` times has waited
    /// `max_attempts - 1` times.
    pub fn backoff(&self) -> ExponentialBuilder {
        let builder = ExponentialBuilder::default()
            .with_min_delay(self.interval)
            .with_max_delay(self.max_interval.max(self.interval))
            .with_factor(self.backoff_factor as f32)
            .with_total_delay(self.max_wait);

        match self.max_attempts {
            Some(max) => builder.with_max_times(max.saturating_sub(1) as usize),
            None => builder.without_max_times(),
        }
    }
}

/// Source of delays between polls
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real-time sleeper backed by the tokio timer
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Cooperative cancellation signal
///
/// Wraps the receiving side of a `watch` channel; the signal fires once the
/// sender publishes `true`. A dropped sender never cancels.
#[derive(Debug, Clone)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
}

impl Cancellation {
    pub fn new(rx: watch::Receiver<bool>) -> Self {
        Self { rx: Some(rx) }
    }

    /// A signal that never fires
    pub fn never() -> Self {
        Self { rx: None }
    }

    pub fn is_cancelled(&self) -> bool {
        self.rx.as_ref().map(|rx| *rx.borrow()).unwrap_or(false)
    }

    /// Resolves once cancellation has been requested
    pub async fn cancelled(&mut self) {
        if let Some(rx) = self.rx.as_mut() {
            if rx.wait_for(|cancelled| *cancelled).await.is_ok() {
                return;
            }
        }
        std::future::pending::<()>().await
    }
}

/// Logs a job that is still running when its waiter goes away
///
/// Dropping the waiting future (client disconnect) skips every return path,
/// so only the guard sees it.
struct PendingJob<'a> {
    job_id: &'a str,
    settled: bool,
}

impl<'a> PendingJob<'a> {
    fn new(job_id: &'a str) -> Self {
        Self {
            job_id,
            settled: false,
        }
    }

    fn settle(mut self) {
        self.settled = true;
    }
}

impl Drop for PendingJob<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("Abandoning text detection job {}", self.job_id);
        }
    }
}

/// Submits text detection jobs and waits for their results
#[derive(Clone)]
pub struct JobRunner {
    engine: Arc<dyn OcrEngine>,
    sleeper: Arc<dyn Sleeper>,
    policy: PollPolicy,
}

impl JobRunner {
    pub fn new(engine: Arc<dyn OcrEngine>, policy: PollPolicy) -> Self {
        Self {
            engine,
            sleeper: Arc::new(TokioSleeper),
            policy,
        }
    }

    /// Replace the sleeper (tests use one that returns immediately)
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Start a job for a document
    pub async fn submit(&self, document: &ObjectLocation) -> Result<String, OcrError> {
        let job_id = self.engine.start_text_detection(document).await?;
        tracing::info!("Started text detection job {} for {}", job_id, document);
        Ok(job_id)
    }

    /// Query the job status once
    pub async fn poll(&self, job_id: &str) -> Result<JobPoll, OcrError> {
        self.engine.get_text_detection(job_id).await
    }

    /// Poll until the job reaches a terminal status
    ///
    /// Returns the tokens of the successful response. A failed job is
    /// reported as `JobFailed` without further polls. Cancellation is checked
    /// before every poll and during every wait. Once the backoff schedule is
    /// exhausted the job is reported as `Timeout`.
    pub async fn await_completion(
        &self,
        job_id: &str,
        cancellation: &mut Cancellation,
    ) -> Result<Vec<OcrToken>, OcrError> {
        let pending = PendingJob::new(job_id);
        let result = self.poll_to_completion(job_id, cancellation).await;
        pending.settle();
        result
    }

    async fn poll_to_completion(
        &self,
        job_id: &str,
        cancellation: &mut Cancellation,
    ) -> Result<Vec<OcrToken>, OcrError> {
        let mut delays = self.policy.backoff().build();
        let mut attempts: u32 = 0;
        let mut waited = Duration::ZERO;

        loop {
            if cancellation.is_cancelled() {
                return Err(self.interrupted(job_id));
            }

            let poll = self.poll(job_id).await?;
            attempts += 1;

            match poll.status {
                JobStatus::Succeeded => {
                    tracing::info!(
                        "Text detection job {} succeeded after {} polls ({} blocks)",
                        job_id,
                        attempts,
                        poll.tokens.len()
                    );
                    return Ok(poll.tokens);
                }
                JobStatus::PartialSuccess => {
                    tracing::warn!(
                        "Text detection job {} partially succeeded: {}",
                        job_id,
                        poll.message.as_deref().unwrap_or("no status message")
                    );
                    return Ok(poll.tokens);
                }
                JobStatus::Failed => {
                    return Err(OcrError::JobFailed {
                        job_id: job_id.to_string(),
                        message: poll.message,
                    });
                }
                JobStatus::InProgress => {}
            }

            let Some(delay) = delays.next() else {
                return Err(self.timed_out(job_id, attempts, waited));
            };

            tracing::info!(
                "Waiting for text detection job {} to complete (poll {}, next in {:?})",
                job_id,
                attempts,
                delay
            );

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => return Err(self.interrupted(job_id)),
                _ = self.sleeper.sleep(delay) => {}
            }

            waited += delay;
        }
    }

    /// Submit a job and wait for its tokens
    pub async fn run(
        &self,
        document: &ObjectLocation,
        cancellation: &mut Cancellation,
    ) -> Result<Vec<OcrToken>, OcrError> {
        let job_id = self.submit(document).await?;
        self.await_completion(&job_id, cancellation).await
    }

    fn interrupted(&self, job_id: &str) -> OcrError {
        tracing::warn!("Stopped waiting for text detection job {}: interrupted", job_id);
        OcrError::Interrupted {
            job_id: job_id.to_string(),
        }
    }

    fn timed_out(&self, job_id: &str, attempts: u32, waited: Duration) -> OcrError {
        tracing::warn!(
            "Giving up on text detection job {} after {} polls ({:?})",
            job_id,
            attempts,
            waited
        );
        OcrError::Timeout {
            job_id: job_id.to_string(),
            attempts,
            waited,
        }
    }
}
