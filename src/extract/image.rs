//! Image extraction
//!
//! Renders the requested page, crops the region and returns it base64
//! encoded so it can travel in a plain-text response body.

use std::io::Cursor;
use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use image::{imageops, DynamicImage, RgbImage};

use crate::config::CropFormat;
use crate::error::Result;
use crate::render::{PageRenderer, RenderError};
use crate::storage::ObjectStore;

use super::request::ExtractionRequest;

/// Extracts a raster crop of a page region
#[derive(Clone)]
pub struct ImageExtractor {
    storage: Arc<dyn ObjectStore>,
    renderer: Arc<dyn PageRenderer>,
    scale: f32,
    format: CropFormat,
}

impl ImageExtractor {
    pub fn new(
        storage: Arc<dyn ObjectStore>,
        renderer: Arc<dyn PageRenderer>,
        scale: f32,
        format: CropFormat,
    ) -> Self {
        Self {
            storage,
            renderer,
            scale,
            format,
        }
    }

    /// Base64 text of the encoded crop
    pub async fn extract_image(&self, request: &ExtractionRequest) -> Result<String> {
        let document = self.storage.get_bytes(&request.document).await?;

        let page_index = (request.page_number as usize).saturating_sub(1);
        let page = self
            .renderer
            .render_page(document, page_index, self.scale)
            .await?;

        let encoded = crop_and_encode(&page, request, self.format)?;
        Ok(BASE64.encode(encoded))
    }
}

fn crop_and_encode(
    page: &RgbImage,
    request: &ExtractionRequest,
    format: CropFormat,
) -> std::result::Result<Vec<u8>, RenderError> {
    let (width, height) = page.dimensions();
    let region = request.rect.to_pixel_crop(width, height);

    tracing::debug!(
        "Cropping {}x{} page to {}x{} at ({}, {})",
        width,
        height,
        region.width,
        region.height,
        region.x,
        region.y
    );

    let cropped = imageops::crop_imm(page, region.x, region.y, region.width, region.height).to_image();

    let mut output = Vec::new();
    DynamicImage::ImageRgb8(cropped)
        .write_to(&mut Cursor::new(&mut output), format.image_format())
        .map_err(|e| RenderError::Encode(e.to_string()))?;

    Ok(output)
}
