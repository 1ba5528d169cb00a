//! Progressive JPEG re-encode with an SSIM-guided quality search.
//!
//! The lowest quality in `[min, max]` whose luma SSIM against the decoded
//! source reaches `target_ssim` wins. When none does, `max` is used.

use image::{DynamicImage, GrayImage, ImageFormat};
use jpeg_encoder::{ColorType, Encoder};

use crate::config::JpegConfig;

/// SSIM stabilizers for 8-bit samples: (0.01 * 255)^2 and (0.03 * 255)^2.
const C1: f64 = 6.5025;
const C2: f64 = 58.5225;

/// SSIM window edge, in pixels.
const WINDOW: u32 = 8;

pub fn recompress(bytes: &[u8], config: &JpegConfig) -> Result<Vec<u8>, String> {
    let source = image::load_from_memory_with_format(bytes, ImageFormat::Jpeg)
        .map_err(|e| e.to_string())?;
    let reference = source.to_luma8();

    let similarity = |encoded: &[u8]| -> Result<f64, String> {
        let decoded = image::load_from_memory_with_format(encoded, ImageFormat::Jpeg)
            .map_err(|e| e.to_string())?;
        Ok(ssim(&reference, &decoded.to_luma8()))
    };

    let (mut lo, mut hi) = (i32::from(config.min), i32::from(config.max));
    let mut best = None;
    while lo <= hi {
        let quality = lo + (hi - lo) / 2;
        let candidate = encode(&source, quality as u8)?;
        if similarity(&candidate)? >= config.target_ssim {
            best = Some(candidate);
            hi = quality - 1;
        } else {
            lo = quality + 1;
        }
    }

    match best {
        Some(encoded) => Ok(encoded),
        None => encode(&source, config.max),
    }
}

fn encode(image: &DynamicImage, quality: u8) -> Result<Vec<u8>, String> {
    let width = u16::try_from(image.width()).map_err(|_| "image too wide for JPEG")?;
    let height = u16::try_from(image.height()).map_err(|_| "image too tall for JPEG")?;

    let mut out = Vec::new();
    let mut encoder = Encoder::new(&mut out, quality);
    encoder.set_progressive(true);
    encoder.set_optimized_huffman_tables(true);

    let result = if image.color().has_color() {
        encoder.encode(image.to_rgb8().as_raw(), width, height, ColorType::Rgb)
    } else {
        encoder.encode(image.to_luma8().as_raw(), width, height, ColorType::Luma)
    };
    result.map_err(|e| e.to_string())?;
    Ok(out)
}

/// Mean SSIM over non-overlapping 8×8 windows (edge windows clipped).
pub fn ssim(a: &GrayImage, b: &GrayImage) -> f64 {
    if a.dimensions() != b.dimensions() || a.width() == 0 || a.height() == 0 {
        return 0.0;
    }

    let (width, height) = a.dimensions();
    let mut total = 0.0;
    let mut windows = 0usize;

    for y0 in (0..height).step_by(WINDOW as usize) {
        for x0 in (0..width).step_by(WINDOW as usize) {
            let (x1, y1) = ((x0 + WINDOW).min(width), (y0 + WINDOW).min(height));
            let n = f64::from((x1 - x0) * (y1 - y0));

            let (mut sum_a, mut sum_b, mut sum_aa, mut sum_bb, mut sum_ab) = (0.0, 0.0, 0.0, 0.0, 0.0);
            for y in y0..y1 {
                for x in x0..x1 {
                    let pa = f64::from(a.get_pixel(x, y)[0]);
                    let pb = f64::from(b.get_pixel(x, y)[0]);
                    sum_a += pa;
                    sum_b += pb;
                    sum_aa += pa * pa;
                    sum_bb += pb * pb;
                    sum_ab += pa * pb;
                }
            }

            let (mean_a, mean_b) = (sum_a / n, sum_b / n);
            let var_a = sum_aa / n - mean_a * mean_a;
            let var_b = sum_bb / n - mean_b * mean_b;
            let cov = sum_ab / n - mean_a * mean_b;

            total += ((2.0 * mean_a * mean_b + C1) * (2.0 * cov + C2))
                / ((mean_a * mean_a + mean_b * mean_b + C1) * (var_a + var_b + C2));
            windows += 1;
        }
    }

    total / windows as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::codecs::jpeg::JpegEncoder;
    use image::{Luma, RgbImage};

    fn gradient_jpeg(quality: u8) -> Vec<u8> {
        let img = RgbImage::from_fn(64, 48, |x, y| {
            image::Rgb([(x * 4) as u8, (y * 5) as u8, ((x + y) * 2) as u8])
        });
        let mut out = Vec::new();
        JpegEncoder::new_with_quality(&mut out, quality)
            .encode_image(&img)
            .unwrap();
        out
    }

    #[test]
    fn test_ssim_identity_and_difference() {
        let a = GrayImage::from_fn(20, 20, |x, y| Luma([((x * 13 + y * 7) % 256) as u8]));
        assert!((ssim(&a, &a) - 1.0).abs() < 1e-9);

        let b = GrayImage::from_fn(20, 20, |x, _| Luma([if x % 2 == 0 { 0 } else { 255 }]));
        assert!(ssim(&a, &b) < 0.5);

        let small = GrayImage::new(4, 4);
        assert_eq!(ssim(&a, &small), 0.0);
    }

    #[test]
    fn test_output_is_progressive_and_decodable() {
        let source = gradient_jpeg(100);
        let out = recompress(&source, &JpegConfig::default()).unwrap();

        // SOF2 marks a progressive frame
        assert!(out.windows(2).any(|w| w == [0xFF, 0xC2]));
        let decoded = image::load_from_memory_with_format(&out, ImageFormat::Jpeg).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (64, 48));
    }

    #[test]
    fn test_lower_band_gives_smaller_output() {
        let source = gradient_jpeg(100);
        let high = recompress(
            &source,
            &JpegConfig {
                min: 95,
                max: 95,
                target_ssim: 0.0,
            },
        )
        .unwrap();
        let low = recompress(
            &source,
            &JpegConfig {
                min: 40,
                max: 40,
                target_ssim: 0.0,
            },
        )
        .unwrap();
        assert!(low.len() < high.len());
    }
}
