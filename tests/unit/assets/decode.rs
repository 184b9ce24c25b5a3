use std::io::Cursor;

use super::*;

fn encode_png(w: u32, h: u32, rgba: Vec<u8>) -> Vec<u8> {
    let img = image::RgbaImage::from_raw(w, h, rgba).unwrap();
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgba8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    buf
}

#[test]
fn decode_frame_png_keeps_straight_rgba() {
    let buf = encode_png(1, 1, vec![100u8, 50u8, 200u8, 128u8]);

    let frame = decode_frame(&buf).unwrap();
    assert_eq!(frame.width(), 1);
    assert_eq!(frame.height(), 1);
    assert_eq!(frame.pixels().as_raw().as_slice(), &[100u8, 50, 200, 128]);
}

#[test]
fn decode_frame_reports_aspect_and_len() {
    let buf = encode_png(4, 2, vec![255u8; 4 * 2 * 4]);
    let frame = decode_frame(&buf).unwrap();
    assert_eq!(frame.byte_len(), 32);
    assert!((frame.aspect_ratio() - 2.0).abs() < 1e-12);
}

#[test]
fn decode_frame_rejects_garbage_and_empty() {
    assert!(matches!(decode_frame(b""), Err(ScrubError::Decode(_))));
    assert!(matches!(
        decode_frame(b"not an image"),
        Err(ScrubError::Decode(_))
    ));
}
