use image::{Rgba, RgbaImage, imageops};

use crate::assets::decode::FrameImage;
use crate::foundation::core::Viewport;

/// How a frame is placed inside the viewport. Aspect ratio is preserved in both modes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FitMode {
    /// Whole frame visible, letter-boxed on the short axis.
    #[default]
    Contain,
    /// Frame fills the viewport; overflow is cropped evenly.
    Cover,
}

/// Straight-alpha RGBA8 canvas, row-major, `width * height * 4` bytes.
#[derive(Clone, Debug)]
pub struct CanvasFrame {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel data.
    pub data: Vec<u8>,
}

/// Background behind letter-box bars.
pub const CANVAS_BACKGROUND: [u8; 4] = [0, 0, 0, 255];

/// Placement of an `image_width x image_height` frame inside `viewport`, centered.
///
/// For [`FitMode::Cover`] the rectangle may extend past the viewport on one axis.
pub fn fit_rect(
    image_width: u32,
    image_height: u32,
    viewport: Viewport,
    fit: FitMode,
) -> kurbo::Rect {
    let iw = f64::from(image_width.max(1));
    let ih = f64::from(image_height.max(1));
    let vw = f64::from(viewport.width);
    let vh = f64::from(viewport.height);

    let sx = vw / iw;
    let sy = vh / ih;
    let scale = match fit {
        FitMode::Contain => sx.min(sy),
        FitMode::Cover => sx.max(sy),
    };

    let w = iw * scale;
    let h = ih * scale;
    let x0 = (vw - w) / 2.0;
    let y0 = (vh - h) / 2.0;
    kurbo::Rect::new(x0, y0, x0 + w, y0 + h)
}

/// Composite `frame` onto a fresh viewport-sized canvas.
pub fn paint_frame(frame: &FrameImage, viewport: Viewport, fit: FitMode) -> CanvasFrame {
    let src = frame.pixels();
    let rect = fit_rect(src.width(), src.height(), viewport, fit);
    let sw = (rect.width().round() as u32).max(1);
    let sh = (rect.height().round() as u32).max(1);
    let x = rect.x0.round() as i64;
    let y = rect.y0.round() as i64;

    let mut canvas = RgbaImage::from_pixel(
        viewport.width,
        viewport.height,
        Rgba(CANVAS_BACKGROUND),
    );
    if sw == src.width() && sh == src.height() {
        imageops::overlay(&mut canvas, src, x, y);
    } else {
        let scaled = imageops::resize(src, sw, sh, imageops::FilterType::Triangle);
        imageops::overlay(&mut canvas, &scaled, x, y);
    }

    CanvasFrame {
        width: viewport.width,
        height: viewport.height,
        data: canvas.into_raw(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/playback/paint.rs"]
mod tests;
