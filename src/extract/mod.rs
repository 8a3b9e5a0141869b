//! Region extraction
//!
//! The `Extractor` routes a validated request to the text or image path:
//!
//! - `TEXT`: OCR words contained in the region, joined by spaces
//! - `IMAGE`: the region cropped from the rendered page, base64 encoded

mod image;
mod request;
mod text;

pub use self::image::ImageExtractor;
pub use request::{ExtractRequestBody, ExtractionRequest, OutputType};
pub use text::{select_words, TextExtractor};

use crate::error::Result;
use crate::ocr::Cancellation;

/// Dispatches extraction requests by output type
#[derive(Clone)]
pub struct Extractor {
    text: TextExtractor,
    image: ImageExtractor,
}

impl Extractor {
    pub fn new(text: TextExtractor, image: ImageExtractor) -> Self {
        Self { text, image }
    }

    pub async fn extract(
        &self,
        request: &ExtractionRequest,
        cancellation: &mut Cancellation,
    ) -> Result<String> {
        match request.output {
            OutputType::Text => self.text.extract_text(request, cancellation).await,
            OutputType::Image => self.image.extract_image(request).await,
        }
    }
}
