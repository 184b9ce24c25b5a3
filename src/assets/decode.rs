use image::RgbaImage;

use crate::foundation::error::{ScrubError, ScrubResult};

/// Decoded frame as straight-alpha RGBA8, ready to paint.
#[derive(Clone, Debug)]
pub struct FrameImage {
    pixels: RgbaImage,
}

impl FrameImage {
    /// Wrap decoded pixels.
    pub fn new(pixels: RgbaImage) -> Self {
        Self { pixels }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Pixel buffer.
    pub fn pixels(&self) -> &RgbaImage {
        &self.pixels
    }

    /// Width divided by height.
    pub fn aspect_ratio(&self) -> f64 {
        f64::from(self.width()) / f64::from(self.height())
    }

    /// Size of the pixel buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.as_raw().len()
    }
}

/// Decode encoded frame bytes (PNG, JPEG, WebP, ...) into RGBA8.
pub fn decode_frame(bytes: &[u8]) -> ScrubResult<FrameImage> {
    if bytes.is_empty() {
        return Err(ScrubError::decode("frame payload is empty"));
    }
    let pixels = image::load_from_memory(bytes)
        .map_err(|e| ScrubError::decode(format!("decode frame from memory: {e}")))?
        .into_rgba8();
    if pixels.width() == 0 || pixels.height() == 0 {
        return Err(ScrubError::decode("decoded frame has zero size"));
    }
    Ok(FrameImage::new(pixels))
}

#[cfg(test)]
#[path = "../../tests/unit/assets/decode.rs"]
mod tests;
