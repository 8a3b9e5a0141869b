//! Page geometry
//!
//! Normalized rectangles (fractions of the page, origin top-left) and their
//! conversion to pixel crop regions on a rendered page.

/// Normalized rectangle (0-1 coordinates, origin top-left)
///
/// Values are not range checked. Callers may send anything numeric; only the
/// pixel conversion clamps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct NormalizedRect {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl NormalizedRect {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Whether `self` lies entirely inside `query`.
    ///
    /// Containment, not overlap: a rectangle that only intersects the query
    /// is rejected. Boundaries compare exactly, so a rectangle sharing an
    /// edge with the query is inside.
    pub fn is_within(&self, query: &NormalizedRect) -> bool {
        self.x >= query.x
            && self.x + self.width <= query.x + query.width
            && self.y >= query.y
            && self.y + self.height <= query.y + query.height
    }

    /// Convert to a pixel crop region on an image of the given size
    pub fn to_pixel_crop(&self, image_width: u32, image_height: u32) -> PixelCropRegion {
        to_pixel_crop(self, image_width, image_height)
    }
}

/// Pixel-based crop region, always inside the image it was computed for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PixelCropRegion {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Scale a normalized rectangle to pixels and clamp it into the image.
///
/// Fractions are truncated toward zero. The origin is clamped to
/// `[0, size - 1]` and the extent to `[1, size - origin]`, so the region is
/// never empty and never leaves the image, whatever the input.
pub fn to_pixel_crop(rect: &NormalizedRect, image_width: u32, image_height: u32) -> PixelCropRegion {
    let (x, width) = clamp_axis(rect.x, rect.width, image_width);
    let (y, height) = clamp_axis(rect.y, rect.height, image_height);

    PixelCropRegion {
        x,
        y,
        width,
        height,
    }
}

fn clamp_axis(start: f32, extent: f32, size: u32) -> (u32, u32) {
    let size = i64::from(size);

    // f32 -> i64 saturates and maps NaN to 0
    let raw_start = (start * size as f32) as i64;
    let raw_extent = (extent * size as f32) as i64;

    let start = raw_start.min(size - 1).max(0);
    let extent = raw_extent.min(size - start).max(1);

    (start as u32, extent as u32)
}
