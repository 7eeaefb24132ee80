//! Tests for PNG and data-URI encoding of rendered layers.

use renderer::gradient::{render_grid, ColorRamp, VisParams};
use renderer::png::{create_png, create_png_auto, validate_png, PNG_SIGNATURE};
use renderer::{decode_data_uri, encode_png_data_uri};
use test_utils::create_gradient_grid;

fn ndvi_pixels(width: usize, height: usize) -> Vec<u8> {
    let data = create_gradient_grid(width, height, -0.2, 0.8);
    let ramp = ColorRamp::from_vis(&VisParams::new(-0.2, 0.8, &["blue", "white", "green"])).unwrap();
    render_grid(&data, width, height, &ramp)
}

#[test]
fn test_png_signature_and_dimensions() {
    let png = create_png_auto(&ndvi_pixels(64, 32), 64, 32).unwrap();
    assert_eq!(&png[0..8], &PNG_SIGNATURE);
    assert_eq!(validate_png(&png).unwrap(), (64, 32));
}

#[test]
fn test_ramp_image_uses_indexed_encoding() {
    // A 256-wide ramp has at most 256 distinct colors, so auto picks PNG8.
    let pixels = ndvi_pixels(256, 256);
    let indexed = create_png_auto(&pixels, 256, 256).unwrap();
    let rgba = create_png(&pixels, 256, 256).unwrap();

    // Color type byte lives at offset 25 (signature 8 + len 4 + type 4 + 9 IHDR bytes).
    assert_eq!(indexed[25], 3);
    assert_eq!(rgba[25], 6);
}

#[test]
fn test_decoded_pixels_match_source() {
    let pixels = ndvi_pixels(16, 4);
    let png = create_png_auto(&pixels, 16, 4).unwrap();
    let decoded = image::load_from_memory(&png).unwrap().to_rgba8();
    assert_eq!(decoded.into_raw(), pixels);
}

#[test]
fn test_data_uri_round_trip_is_valid_png() {
    let png = create_png_auto(&ndvi_pixels(8, 8), 8, 8).unwrap();
    let uri = encode_png_data_uri(&png);
    assert!(uri.starts_with("data:image/png;base64,"));

    let (mime, bytes) = decode_data_uri(&uri).unwrap();
    assert_eq!(mime, "image/png");
    assert_eq!(validate_png(&bytes).unwrap(), (8, 8));
}
