//! MuPDF page renderer
//!
//! MuPDF documents are not thread-safe, so each render opens a fresh
//! document on the blocking pool and drops it before returning.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use image::RgbImage;
use mupdf::{Colorspace, Document, Matrix, Pixmap};

use super::{PageRenderer, RenderError};

const PDF_MIME: &str = "application/pdf";

/// Default timeout for a single page render
/// Some PDFs make MuPDF spin for a long time. The blocking thread may keep
/// running, but the request completes.
const DEFAULT_RENDER_TIMEOUT_SECS: u64 = 30;

/// Page renderer backed by MuPDF
#[derive(Debug, Clone)]
pub struct MupdfRenderer {
    timeout_secs: u64,
}

impl MupdfRenderer {
    pub fn new(timeout_secs: u64) -> Self {
        Self { timeout_secs }
    }
}

impl Default for MupdfRenderer {
    fn default() -> Self {
        Self::new(DEFAULT_RENDER_TIMEOUT_SECS)
    }
}

impl From<mupdf::Error> for RenderError {
    fn from(err: mupdf::Error) -> Self {
        RenderError::Render(err.to_string())
    }
}

#[async_trait]
impl PageRenderer for MupdfRenderer {
    async fn render_page(
        &self,
        document: Vec<u8>,
        page_index: usize,
        scale: f32,
    ) -> Result<RgbImage, RenderError> {
        let started = Instant::now();

        let task = tokio::task::spawn_blocking(move || render_blocking(&document, page_index, scale));

        let image = tokio::time::timeout(Duration::from_secs(self.timeout_secs), task)
            .await
            .map_err(|_| RenderError::Timeout(self.timeout_secs))?
            .map_err(|e| RenderError::Render(format!("Task join error: {}", e)))??;

        tracing::debug!(
            "Rendered page {} at {}x ({}x{} px) in {:?}",
            page_index + 1,
            scale,
            image.width(),
            image.height(),
            started.elapsed()
        );

        Ok(image)
    }
}

fn render_blocking(data: &[u8], page_index: usize, scale: f32) -> Result<RgbImage, RenderError> {
    let doc = Document::from_bytes(data, PDF_MIME)
        .map_err(|e| RenderError::InvalidDocument(e.to_string()))?;

    let page_count = doc
        .page_count()
        .map_err(|e| RenderError::InvalidDocument(e.to_string()))?
        .max(0) as usize;

    if page_index >= page_count {
        return Err(RenderError::PageOutOfRange {
            page: page_index + 1,
            page_count,
        });
    }

    let page = doc.load_page(page_index as i32)?;

    let matrix = Matrix::new_scale(scale, scale);
    let colorspace = Colorspace::device_rgb();
    let pixmap = page.to_pixmap(&matrix, &colorspace, false, true)?;

    pixmap_to_rgb(&pixmap)
}

/// Copy pixmap samples into an RGB buffer, dropping alpha if present
fn pixmap_to_rgb(pixmap: &Pixmap) -> Result<RgbImage, RenderError> {
    let width = pixmap.width() as u32;
    let height = pixmap.height() as u32;
    let samples = pixmap.samples();
    let n = pixmap.n() as usize;

    if width == 0 || height == 0 {
        return Err(RenderError::Render("Rendered page is empty".to_string()));
    }

    let mut rgb_buffer = Vec::with_capacity((width * height * 3) as usize);

    for y in 0..height as usize {
        for x in 0..width as usize {
            let offset = (y * width as usize + x) * n;
            let r = samples.get(offset).copied().unwrap_or(0);
            let g = samples.get(offset + 1).copied().unwrap_or(r);
            let b = samples.get(offset + 2).copied().unwrap_or(r);
            rgb_buffer.extend_from_slice(&[r, g, b]);
        }
    }

    RgbImage::from_raw(width, height, rgb_buffer)
        .ok_or_else(|| RenderError::Render("Failed to create image buffer".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// One blank 100x200 pt page. The xref table is omitted; MuPDF rebuilds it.
    const BLANK_PDF: &str = "%PDF-1.4
1 0 obj << /Type /Catalog /Pages 2 0 R >> endobj
2 0 obj << /Type /Pages /Kids [3 0 R] /Count 1 >> endobj
3 0 obj << /Type /Page /Parent 2 0 R /MediaBox [0 0 100 200] >> endobj
trailer << /Root 1 0 R >>
%%EOF
";

    #[tokio::test]
    async fn test_render_scales_page() {
        let renderer = MupdfRenderer::default();

        let image = renderer
            .render_page(BLANK_PDF.as_bytes().to_vec(), 0, 2.0)
            .await
            .unwrap();

        assert_eq!(image.dimensions(), (200, 400));
        assert_eq!(image.get_pixel(10, 10).0, [255, 255, 255]);
    }

    #[tokio::test]
    async fn test_render_page_out_of_range() {
        let renderer = MupdfRenderer::default();

        let result = renderer
            .render_page(BLANK_PDF.as_bytes().to_vec(), 1, 2.0)
            .await;

        assert!(matches!(
            result,
            Err(RenderError::PageOutOfRange {
                page: 2,
                page_count: 1
            })
        ));
    }

    #[tokio::test]
    async fn test_render_rejects_non_pdf() {
        let renderer = MupdfRenderer::default();

        let result = renderer.render_page(b"not a pdf".to_vec(), 0, 2.0).await;

        // Depending on how far repair gets, MuPDF either refuses the bytes or
        // opens an empty document
        assert!(matches!(
            result,
            Err(RenderError::InvalidDocument(_)) | Err(RenderError::PageOutOfRange { page_count: 0, .. })
        ));
    }
}
