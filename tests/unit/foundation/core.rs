use super::*;

#[test]
fn window_around_clamps_at_both_ends() {
    let w = FrameWindow::around(FrameIndex(1), 30, 100);
    assert_eq!(w.start, FrameIndex(1));
    assert_eq!(w.end, FrameIndex(31));

    let w = FrameWindow::around(FrameIndex(100), 30, 100);
    assert_eq!(w.start, FrameIndex(70));
    assert_eq!(w.end, FrameIndex(100));
    assert!(!w.contains(FrameIndex(101)));
}

#[test]
fn window_around_interior_is_symmetric() {
    let w = FrameWindow::around(FrameIndex(50), 30, 100);
    assert_eq!(w.start, FrameIndex(20));
    assert_eq!(w.end, FrameIndex(80));
    assert_eq!(w.len_frames(), 61);
    assert_eq!(w.iter().count(), 61);
}

#[test]
fn window_around_clamps_out_of_range_center() {
    let w = FrameWindow::around(FrameIndex(0), 2, 10);
    assert_eq!(w.start, FrameIndex(1));
    assert_eq!(w.end, FrameIndex(3));

    let w = FrameWindow::around(FrameIndex(500), 2, 10);
    assert_eq!(w.start, FrameIndex(8));
    assert_eq!(w.end, FrameIndex(10));
}

#[test]
fn window_new_rejects_zero_and_reversed() {
    assert!(FrameWindow::new(FrameIndex(0), FrameIndex(3)).is_err());
    assert!(FrameWindow::new(FrameIndex(4), FrameIndex(3)).is_err());
    assert!(FrameWindow::new(FrameIndex(3), FrameIndex(3)).is_ok());
}

#[test]
fn frame_distance_is_symmetric() {
    assert_eq!(FrameIndex(3).distance(FrameIndex(10)), 7);
    assert_eq!(FrameIndex(10).distance(FrameIndex(3)), 7);
}

#[test]
fn viewport_rejects_zero_dims() {
    assert!(Viewport::new(0, 10).is_err());
    assert!(Viewport::new(10, 0).is_err());
    let v = Viewport::new(1920, 1080).unwrap();
    assert!((v.aspect_ratio() - 16.0 / 9.0).abs() < 1e-12);
}
