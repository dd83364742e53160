//! Image preprocessing for the inference endpoint.
//!
//! Any decodable upload is reduced to the 28x28 grayscale grid the
//! classifier was trained on:
//! 1. decode to single-channel grayscale
//! 2. invert when the background is predominantly light (mean > 127);
//!    the classifier expects a light digit on a dark background
//! 3. auto-contrast (stretch the intensity histogram to full range)
//! 4. aspect-preserving resize so both dimensions fit in 28 pixels
//!    (images already within bounds are not upscaled)
//! 5. center on a 28x28 black canvas
//! 6. normalize to [0,1]

use image::imageops::FilterType;
use image::{imageops, DynamicImage, GrayImage};

use crate::error::{DigitError, Result};
use crate::model::IMAGE_SIDE;

/// A normalized 28x28 single-channel sample ready for the classifier.
#[derive(Debug, Clone, PartialEq)]
pub struct DigitImage {
    pixels: Vec<f32>,
}

impl DigitImage {
    /// Flat row-major pixels, 784 values in [0,1]
    pub fn pixels(&self) -> &[f32] {
        &self.pixels
    }

    pub fn into_vec(self) -> Vec<f32> {
        self.pixels
    }
}

/// Decode raw upload bytes and run the full preprocessing pipeline.
///
/// Undecodable bytes are a client-input error; nothing downstream of
/// decoding can be blamed on the caller.
pub fn preprocess_bytes(bytes: &[u8]) -> Result<DigitImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|e| DigitError::InvalidInput(format!("could not decode image: {e}")))?;
    Ok(preprocess_image(decoded))
}

/// Run the preprocessing pipeline on an already-decoded image.
pub fn preprocess_image(decoded: DynamicImage) -> DigitImage {
    let mut gray = decoded.to_luma8();

    if mean_intensity(&gray) > 127.0 {
        imageops::invert(&mut gray);
    }

    let gray = autocontrast(&gray);
    let gray = fit_within_side(gray, IMAGE_SIDE as u32);
    let canvas = center_on_canvas(&gray, IMAGE_SIDE as u32);

    let pixels = canvas.pixels().map(|p| p.0[0] as f32 / 255.0).collect();
    DigitImage { pixels }
}

fn mean_intensity(img: &GrayImage) -> f32 {
    let count = img.as_raw().len();
    if count == 0 {
        return 0.0;
    }
    let sum: u64 = img.as_raw().iter().map(|&p| p as u64).sum();
    sum as f32 / count as f32
}

/// Stretch the intensity histogram so the darkest pixel maps to 0 and
/// the lightest to 255. A flat image is returned unchanged.
fn autocontrast(img: &GrayImage) -> GrayImage {
    let lo = img.as_raw().iter().copied().min().unwrap_or(0);
    let hi = img.as_raw().iter().copied().max().unwrap_or(0);

    if hi <= lo {
        return img.clone();
    }

    let scale = 255.0 / (hi - lo) as f32;
    let mut out = img.clone();
    for p in out.iter_mut() {
        *p = (((*p - lo) as f32) * scale).round().clamp(0.0, 255.0) as u8;
    }
    out
}

/// Downscale so neither dimension exceeds `side`, preserving aspect
/// ratio. Smaller images pass through untouched.
fn fit_within_side(img: GrayImage, side: u32) -> GrayImage {
    if img.width() <= side && img.height() <= side {
        return img;
    }
    DynamicImage::ImageLuma8(img)
        .resize(side, side, FilterType::Lanczos3)
        .into_luma8()
}

fn center_on_canvas(img: &GrayImage, side: u32) -> GrayImage {
    let mut canvas = GrayImage::new(side, side);
    let x = (side - img.width()) / 2;
    let y = (side - img.height()) / 2;
    imageops::overlay(&mut canvas, img, x as i64, y as i64);
    canvas
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::ImageFormat;
    use std::io::Cursor;

    fn encode_png(img: GrayImage) -> Vec<u8> {
        let mut buf = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
            .unwrap();
        buf
    }

    fn uniform(width: u32, height: u32, value: u8) -> GrayImage {
        GrayImage::from_pixel(width, height, image::Luma([value]))
    }

    /// A crude light bar on a dark background, side x side.
    fn synthetic_digit(side: u32) -> GrayImage {
        let mut img = GrayImage::new(side, side);
        for y in side / 8..side - side / 8 {
            for x in side / 2 - 1..=side / 2 + 1 {
                img.put_pixel(x, y, image::Luma([255]));
            }
        }
        img
    }

    #[test]
    fn output_is_always_784_values_in_unit_range() {
        for (w, h) in [(5, 3), (28, 28), (100, 60), (41, 300)] {
            let img = GrayImage::from_fn(w, h, |x, y| image::Luma([((x + y) % 256) as u8]));
            let out = preprocess_bytes(&encode_png(img)).unwrap();
            assert_eq!(out.pixels().len(), INPUT_DIM);
            assert!(out.pixels().iter().all(|p| (0.0..=1.0).contains(p)));
        }
    }

    #[test]
    fn light_background_is_inverted() {
        // Uniform 200: mean > 127, inverted to 55; flat histogram leaves
        // autocontrast a no-op, so the value survives to the output.
        let out = preprocess_bytes(&encode_png(uniform(56, 56, 200))).unwrap();
        let center = out.pixels()[14 * IMAGE_SIDE + 14];
        assert!(
            (center - 55.0 / 255.0).abs() < 2.5 / 255.0,
            "center was {center}"
        );
    }

    #[test]
    fn dark_background_is_not_inverted() {
        let out = preprocess_bytes(&encode_png(uniform(56, 56, 50))).unwrap();
        let center = out.pixels()[14 * IMAGE_SIDE + 14];
        assert!(
            (center - 50.0 / 255.0).abs() < 2.5 / 255.0,
            "center was {center}"
        );
    }

    #[test]
    fn small_images_are_centered_not_upscaled() {
        // A 4x4 block of a dark value lands in the middle of the canvas;
        // corners stay black.
        let out = preprocess_bytes(&encode_png(uniform(4, 4, 90))).unwrap();
        assert_eq!(out.pixels()[0], 0.0);
        let center = out.pixels()[13 * IMAGE_SIDE + 13];
        assert!(center > 0.0);
    }

    #[test]
    fn preprocessing_is_idempotent_on_its_own_output() {
        let first = preprocess_bytes(&encode_png(synthetic_digit(28))).unwrap();

        let reencoded = GrayImage::from_fn(28, 28, |x, y| {
            let v = first.pixels()[(y * 28 + x) as usize];
            image::Luma([(v * 255.0).round() as u8])
        });
        let second = preprocess_bytes(&encode_png(reencoded)).unwrap();

        for (a, b) in first.pixels().iter().zip(second.pixels()) {
            assert!((a - b).abs() < 1e-2, "pixels diverged: {a} vs {b}");
        }
    }

    #[test]
    fn undecodable_bytes_are_a_client_error() {
        let err = preprocess_bytes(b"definitely not an image").unwrap_err();
        assert!(err.is_client_error());
    }
}
