//! Application state management

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::Config;
use crate::extract::{Extractor, ImageExtractor, TextExtractor};
use crate::ocr::{Cancellation, JobRunner, OcrResultStore, TextractEngine};
use crate::render::MupdfRenderer;
use crate::storage::S3Client;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: Config,
    extractor: Extractor,
    shutdown: watch::Receiver<bool>,
}

impl AppState {
    /// Create a new application state around an assembled extractor
    pub fn new(config: Config, extractor: Extractor, shutdown: watch::Receiver<bool>) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                config,
                extractor,
                shutdown,
            }),
        }
    }

    /// Build the AWS clients and renderer once and wire them into the extractors
    pub async fn connect(config: Config, shutdown: watch::Receiver<bool>) -> Self {
        let sdk_config = config.aws.load_sdk_config().await;

        let storage = Arc::new(S3Client::new(&sdk_config, &config.aws));
        let engine = Arc::new(TextractEngine::new(&sdk_config, &config.aws));
        let renderer = Arc::new(MupdfRenderer::new(config.render.timeout_secs));

        let jobs = JobRunner::new(engine, config.ocr.poll_policy());
        let text = TextExtractor::new(OcrResultStore::new(storage.clone()), jobs);
        let image = ImageExtractor::new(
            storage,
            renderer,
            config.render.scale,
            config.render.crop_format,
        );

        Self::new(config, Extractor::new(text, image), shutdown)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    /// Get the extractor
    pub fn extractor(&self) -> &Extractor {
        &self.inner.extractor
    }

    /// Cancellation handle that fires when the server starts shutting down
    pub fn cancellation(&self) -> Cancellation {
        Cancellation::new(self.inner.shutdown.clone())
    }
}
