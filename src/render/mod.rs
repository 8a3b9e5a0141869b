//! Page rendering
//!
//! Rasterizes a single page of a document into an RGB pixel grid. The MuPDF
//! renderer is the production implementation; extractors only see the
//! `PageRenderer` trait.

mod mupdf_renderer;

use async_trait::async_trait;
use image::RgbImage;
use thiserror::Error;

pub use mupdf_renderer::MupdfRenderer;

/// Renderer error types
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("Page {page} is out of range (document has {page_count} pages)")]
    /// `page` is 1-indexed
    PageOutOfRange { page: usize, page_count: usize },

    #[error("Invalid document: {0}")]
    InvalidDocument(String),

    #[error("Render failed: {0}")]
    Render(String),

    #[error("Image encoding failed: {0}")]
    Encode(String),

    #[error("Rendering timed out after {0} seconds")]
    Timeout(u64),
}

/// Rasterizer for document pages
#[async_trait]
pub trait PageRenderer: Send + Sync {
    /// Render one page (0-indexed) at the given scale
    ///
    /// Fails with `PageOutOfRange` when the document has no such page.
    async fn render_page(
        &self,
        document: Vec<u8>,
        page_index: usize,
        scale: f32,
    ) -> Result<RgbImage, RenderError>;
}
