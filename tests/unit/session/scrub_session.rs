use std::io::Cursor;

use super::*;
use crate::assets::source::FrameSource;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::ScrubError;

/// Serves a 1x1 PNG for every locator except those containing `missing`.
struct PngFetcher {
    missing: Option<&'static str>,
}

impl FrameFetcher for PngFetcher {
    fn fetch(&self, source: &FrameSource) -> ScrubResult<Vec<u8>> {
        if let Some(m) = self.missing
            && source.as_str().contains(m)
        {
            return Err(ScrubError::fetch(format!("Failed to load frame: {source}")));
        }
        let img = image::RgbaImage::from_raw(1, 1, vec![1, 2, 3, 255]).unwrap();
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        Ok(buf)
    }
}

fn session(total: u32, missing: Option<&'static str>) -> ScrubSession {
    let cfg = StreamConfig {
        total_frames: total,
        buffer_radius: 2,
        batch_size: 4,
        stagger_per_frame_ms: 0,
        fetch_threads: Some(2),
        ..StreamConfig::default()
    };
    ScrubSession::new(cfg, Arc::new(PngFetcher { missing })).unwrap()
}

fn settle(s: &mut ScrubSession) {
    let deadline = Instant::now() + Duration::from_secs(10);
    while s.has_pending() && Instant::now() < deadline {
        s.pump_wait(Duration::from_millis(50));
    }
}

#[test]
fn scroll_then_pump_paints_exact_frame() {
    let mut s = session(20, None);
    assert!(matches!(s.scroll_to(0.5), PaintDecision::NothingToPaint));
    settle(&mut s);

    let decision = s.refresh();
    let frame = decision.frame().unwrap();
    assert!(frame.is_exact());
    assert_eq!(frame.shown, FrameIndex(11));
    assert_eq!(s.progress().loaded, 5);
}

#[test]
fn bulk_load_completes_with_zero_stagger() {
    let mut s = session(10, None);
    assert_eq!(s.start_bulk_load(), 3);
    assert!(s.bulk_load_released());
    settle(&mut s);

    let p = s.progress();
    assert!(p.is_complete());
    assert_eq!(p.percent(), 100);
    assert_eq!(s.stats().frames_failed, 0);
}

#[test]
fn missing_frame_fails_its_batch_only() {
    let mut s = session(8, Some("frame-0003"));
    s.start_bulk_load();
    settle(&mut s);

    let p = s.progress();
    assert_eq!(p.loaded, 4);
    assert!(!s.scheduler().is_cached(FrameIndex(3)));
    assert!(s.scheduler().is_cached(FrameIndex(5)));
    assert_eq!(s.stats().batches_failed, 1);
}

#[test]
fn teardown_is_idempotent() {
    let mut s = session(10, None);
    s.scroll_to(0.0);
    settle(&mut s);

    assert_eq!(s.teardown(), 3);
    assert_eq!(s.teardown(), 0);
    assert!(matches!(s.scroll_to(1.0), PaintDecision::NothingToPaint));
    assert_eq!(s.pump(), 0);
}
