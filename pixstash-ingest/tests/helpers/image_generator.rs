//! Synthetic image fixtures
//!
//! `seed` changes every pixel, so different seeds never share a content hash.

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/// Minimal SVG with explicit dimensions
pub const SVG_64X32: &str = r#"<svg xmlns="http://www.w3.org/2000/svg" width="64" height="32"><rect width="64" height="32" fill="teal"/></svg>"#;

/// Gradient PNG
pub fn png_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let img = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x as u8).wrapping_add(seed), (y as u8).wrapping_mul(3), seed])
    });
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

/// Single-frame GIF
pub fn gif_bytes(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let img = RgbaImage::from_fn(width, height, |x, _| Rgba([seed, (x as u8).wrapping_mul(5), 40, 255]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Gif)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), format)
        .expect("Failed to encode test image");
    buf
}
