use std::io::Cursor;

use super::*;
use crate::fetch::dispatch::InMemoryDispatch;
use crate::foundation::error::ScrubError;

fn png(tag: u8) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(1, 1, vec![tag, tag, tag, 255]).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

fn config(total: u32, radius: u32) -> StreamConfig {
    StreamConfig {
        total_frames: total,
        buffer_radius: radius,
        ..StreamConfig::default()
    }
}

fn indices(s: &FrameScheduler, load: &LoadFrames) -> Vec<u32> {
    load.frames
        .iter()
        .map(|f| s.sources().index_of(f).unwrap().0)
        .collect()
}

fn resolve_all(s: &mut FrameScheduler, d: &mut InMemoryDispatch) {
    for load in d.take() {
        let blobs = load
            .frames
            .iter()
            .map(|f| LoadedBlob {
                blob: png(s.sources().index_of(f).unwrap().0 as u8),
                frame_path: f.clone(),
            })
            .collect();
        s.on_batch_loaded(BlobsLoaded {
            batch: load.batch,
            blobs,
        });
    }
}

struct RejectingDispatch;

impl FrameDispatch for RejectingDispatch {
    fn dispatch(&mut self, _req: LoadFrames) -> ScrubResult<()> {
        Err(ScrubError::worker("closed"))
    }
}

#[test]
fn plan_window_splits_priority_and_regular() {
    let s = FrameScheduler::new(&config(10, 2)).unwrap();
    let plan = s.plan_window(FrameIndex(5));
    assert_eq!(plan.priority, Some(FrameIndex(5)));
    assert_eq!(
        plan.regular,
        vec![FrameIndex(3), FrameIndex(4), FrameIndex(6), FrameIndex(7)]
    );
}

#[test]
fn request_frame_dispatches_priority_before_window() {
    let mut s = FrameScheduler::new(&config(10, 2)).unwrap();
    let mut d = InMemoryDispatch::new();
    assert!(s.request_frame(FrameIndex(5), &mut d).is_none());

    assert_eq!(d.requests.len(), 2);
    assert_eq!(indices(&s, &d.requests[0]), vec![5]);
    assert_eq!(indices(&s, &d.requests[1]), vec![3, 4, 6, 7]);
    assert!(d.requests[0].batch < d.requests[1].batch);
    assert_eq!(s.pending_len(), 5);
    assert_eq!(s.in_flight_batches(), 2);
}

#[test]
fn request_frame_clamps_out_of_range_targets() {
    let mut s = FrameScheduler::new(&config(10, 1)).unwrap();
    let mut d = InMemoryDispatch::new();
    s.request_frame(FrameIndex(0), &mut d);
    s.request_frame(FrameIndex(99), &mut d);

    let all: Vec<u32> = d.requests.iter().flat_map(|l| indices(&s, l)).collect();
    assert!(all.iter().all(|i| (1..=10).contains(i)));
    assert_eq!(s.target(), Some(FrameIndex(10)));
}

#[test]
fn loaded_batch_fills_cache_and_clears_pending() {
    let mut s = FrameScheduler::new(&config(10, 1)).unwrap();
    let mut d = InMemoryDispatch::new();
    s.request_frame(FrameIndex(4), &mut d);
    resolve_all(&mut s, &mut d);

    for i in 3..=5 {
        assert!(s.is_cached(FrameIndex(i)));
        assert!(!s.is_pending(FrameIndex(i)));
    }
    assert_eq!(s.in_flight_batches(), 0);
    assert_eq!(s.progress_snapshot(), Progress { loaded: 3, total: 10 });

    let shown = s.request_frame(FrameIndex(4), &mut d).unwrap();
    assert!(shown.is_exact());
    assert!(d.requests.is_empty());
}

#[test]
fn displayable_falls_back_to_nearest() {
    let mut s = FrameScheduler::new(&config(20, 0)).unwrap();
    let mut d = InMemoryDispatch::new();
    s.request_frame(FrameIndex(3), &mut d);
    s.request_frame(FrameIndex(10), &mut d);
    resolve_all(&mut s, &mut d);

    let shown = s.displayable(FrameIndex(6)).unwrap();
    assert_eq!(shown.requested, FrameIndex(6));
    assert_eq!(shown.shown, FrameIndex(3));
    assert!(!shown.is_exact());
}

#[test]
fn failed_batch_releases_every_outstanding_index() {
    let mut s = FrameScheduler::new(&config(10, 0)).unwrap();
    let mut d = InMemoryDispatch::new();
    let batch = s
        .dispatch_bulk((1..=5).map(FrameIndex), &mut d)
        .unwrap();
    let frames = d.take().remove(0).frames;

    s.on_batch_failed(BatchError {
        batch,
        error: "Failed to load frame".to_string(),
        frame_path: frames[2].clone(),
    });

    assert_eq!(s.pending_len(), 0);
    assert_eq!(s.in_flight_batches(), 0);
    assert!(s.cache().is_empty());
    let stats = s.stats();
    assert_eq!(stats.frames_failed, 1);
    assert_eq!(stats.batches_failed, 1);
}

#[test]
fn per_item_successes_then_error_leave_nothing_pending() {
    let mut s = FrameScheduler::new(&config(10, 0)).unwrap();
    let mut d = InMemoryDispatch::new();
    let batch = s.dispatch_bulk((1..=3).map(FrameIndex), &mut d).unwrap();
    let frames = d.take().remove(0).frames;

    s.on_batch_loaded(BlobsLoaded {
        batch,
        blobs: vec![
            LoadedBlob {
                blob: png(1),
                frame_path: frames[0].clone(),
            },
            LoadedBlob {
                blob: png(3),
                frame_path: frames[2].clone(),
            },
        ],
    });
    s.on_batch_failed(BatchError {
        batch,
        error: "boom".to_string(),
        frame_path: frames[1].clone(),
    });

    assert!(s.is_cached(FrameIndex(1)));
    assert!(!s.is_cached(FrameIndex(2)));
    assert!(s.is_cached(FrameIndex(3)));
    assert_eq!(s.pending_len(), 0);
}

#[test]
fn late_error_from_closed_batch_keeps_redispatched_frame_pending() {
    let mut s = FrameScheduler::new(&config(10, 0)).unwrap();
    let mut d = InMemoryDispatch::new();
    let batch = s.dispatch_bulk((1..=3).map(FrameIndex), &mut d).unwrap();
    let frames = d.take().remove(0).frames;

    s.on_batch_loaded(BlobsLoaded {
        batch,
        blobs: vec![LoadedBlob {
            blob: png(1),
            frame_path: frames[0].clone(),
        }],
    });
    s.on_batch_failed(BatchError {
        batch,
        error: "boom".to_string(),
        frame_path: frames[1].clone(),
    });
    assert!(!s.is_pending(FrameIndex(3)));

    s.request_frame(FrameIndex(3), &mut d);
    assert_eq!(d.take().len(), 1);
    assert!(s.is_pending(FrameIndex(3)));

    // Second per-item error of the first batch.
    s.on_batch_failed(BatchError {
        batch,
        error: "boom".to_string(),
        frame_path: frames[2].clone(),
    });
    assert!(s.is_pending(FrameIndex(3)));
    assert_eq!(s.in_flight_batches(), 1);

    s.request_frame(FrameIndex(3), &mut d);
    assert!(d.requests.is_empty());
    assert_eq!(s.stats().batches_failed, 1);
    assert_eq!(s.stats().frames_failed, 2);
}

#[test]
fn undecodable_blob_counts_as_failure_and_is_retried() {
    let mut s = FrameScheduler::new(&config(5, 0)).unwrap();
    let mut d = InMemoryDispatch::new();
    s.request_frame(FrameIndex(2), &mut d);
    let load = d.take().remove(0);
    s.on_batch_loaded(BlobsLoaded {
        batch: load.batch,
        blobs: vec![LoadedBlob {
            blob: b"not an image".to_vec(),
            frame_path: load.frames[0].clone(),
        }],
    });

    assert!(!s.is_cached(FrameIndex(2)));
    assert!(!s.is_pending(FrameIndex(2)));
    assert_eq!(s.stats().frames_failed, 1);

    s.request_frame(FrameIndex(2), &mut d);
    assert_eq!(d.requests.len(), 1);
}

#[test]
fn rejected_dispatch_does_not_mark_pending() {
    let mut s = FrameScheduler::new(&config(10, 2)).unwrap();
    assert!(s.request_frame(FrameIndex(5), &mut RejectingDispatch).is_none());
    assert_eq!(s.pending_len(), 0);
    assert_eq!(s.stats().dispatch_rejected, 2);
}

#[test]
fn dispatch_bulk_skips_cached_pending_and_out_of_range() {
    let mut s = FrameScheduler::new(&config(6, 0)).unwrap();
    let mut d = InMemoryDispatch::new();
    s.request_frame(FrameIndex(1), &mut d);
    resolve_all(&mut s, &mut d);
    s.request_frame(FrameIndex(2), &mut d);
    d.take();

    s.dispatch_bulk((0..=7).map(FrameIndex), &mut d);
    assert_eq!(d.requests.len(), 1);
    assert_eq!(indices(&s, &d.requests[0]), vec![3, 4, 5, 6]);

    assert!(s.dispatch_bulk((1..=2).map(FrameIndex), &mut d).is_none());
}

#[test]
fn bounded_cache_keeps_progress_monotonic() {
    let cfg = StreamConfig {
        max_cached_frames: Some(2),
        ..config(4, 0)
    };
    let mut s = FrameScheduler::new(&cfg).unwrap();
    let mut d = InMemoryDispatch::new();
    s.dispatch_bulk((1..=4).map(FrameIndex), &mut d);
    resolve_all(&mut s, &mut d);

    assert_eq!(s.cache().len(), 2);
    assert_eq!(s.stats().evictions, 2);
    let p = s.progress_snapshot();
    assert_eq!(p.loaded, 4);
    assert!(p.is_complete());
    assert_eq!(p.percent(), 100);
}

#[test]
fn bounded_cache_keeps_whole_window_of_current_target() {
    let cfg = StreamConfig {
        max_cached_frames: Some(3),
        ..config(20, 1)
    };
    let mut s = FrameScheduler::new(&cfg).unwrap();
    let mut d = InMemoryDispatch::new();

    s.request_frame(FrameIndex(5), &mut d);
    resolve_all(&mut s, &mut d);
    s.request_frame(FrameIndex(10), &mut d);
    resolve_all(&mut s, &mut d);

    let cached: Vec<FrameIndex> = s.cache().indices().collect();
    assert_eq!(cached, vec![FrameIndex(9), FrameIndex(10), FrameIndex(11)]);
    assert_eq!(s.stats().evictions, 3);

    let shown = s.request_frame(FrameIndex(10), &mut d).unwrap();
    assert!(shown.is_exact());
    assert!(d.requests.is_empty());
}

#[test]
fn cache_cap_below_window_is_rejected() {
    let cfg = StreamConfig {
        max_cached_frames: Some(2),
        ..config(20, 1)
    };
    assert!(matches!(
        FrameScheduler::new(&cfg),
        Err(ScrubError::Validation(_))
    ));
}

#[test]
fn progress_percent_rounds() {
    let p = Progress {
        loaded: 1,
        total: 3,
    };
    assert_eq!(p.percent(), 33);
    assert!(!p.is_complete());
    assert_eq!(
        Progress {
            loaded: 2,
            total: 3
        }
        .percent(),
        67
    );
}

#[test]
fn teardown_clears_state_and_ignores_late_responses() {
    let mut s = FrameScheduler::new(&config(10, 1)).unwrap();
    let mut d = InMemoryDispatch::new();
    s.request_frame(FrameIndex(1), &mut d);
    let late = d.take();
    s.request_frame(FrameIndex(9), &mut d);
    resolve_all(&mut s, &mut d);

    assert_eq!(s.teardown(), 3);
    assert!(s.cache().is_empty());
    assert_eq!(s.pending_len(), 0);

    for load in late {
        s.on_batch_loaded(BlobsLoaded {
            batch: load.batch,
            blobs: vec![LoadedBlob {
                blob: png(1),
                frame_path: load.frames[0].clone(),
            }],
        });
    }
    assert!(s.cache().is_empty());
    assert_eq!(s.stats().stale_responses, 2);
    assert!(s.request_frame(FrameIndex(1), &mut d).is_none());
    assert!(d.requests.is_empty());
}
