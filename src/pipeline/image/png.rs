//! PNG palette quantization (imagequant) written as an indexed PNG.

use image::ImageFormat;
use imagequant::RGBA;

use crate::config::PngConfig;

/// Quantize to at most 256 colors.
///
/// Returns `None` when the configured quality floor cannot be met; the
/// caller keeps the original file.
pub fn quantize(bytes: &[u8], config: &PngConfig) -> Result<Option<Vec<u8>>, String> {
    let source = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| e.to_string())?
        .to_rgba8();
    let (width, height) = source.dimensions();

    let pixels: Vec<RGBA> = source
        .pixels()
        .map(|p| RGBA::new(p[0], p[1], p[2], p[3]))
        .collect();

    let mut attributes = imagequant::new();
    attributes.set_speed(config.speed).map_err(|e| e.to_string())?;
    attributes
        .set_quality(config.min, config.max)
        .map_err(|e| e.to_string())?;

    let mut image = attributes
        .new_image(pixels, width as usize, height as usize, 0.0)
        .map_err(|e| e.to_string())?;
    let mut result = match attributes.quantize(&mut image) {
        Ok(result) => result,
        Err(imagequant::Error::QualityTooLow) => return Ok(None),
        Err(e) => return Err(e.to_string()),
    };
    result.set_dithering_level(1.0).map_err(|e| e.to_string())?;
    let (palette, indices) = result.remapped(&mut image).map_err(|e| e.to_string())?;

    write_indexed(width, height, &palette, &indices).map(Some)
}

fn write_indexed(width: u32, height: u32, palette: &[RGBA], indices: &[u8]) -> Result<Vec<u8>, String> {
    let rgb: Vec<u8> = palette.iter().flat_map(|c| [c.r, c.g, c.b]).collect();
    let alpha: Vec<u8> = palette.iter().map(|c| c.a).collect();

    let mut out = Vec::new();
    {
        let mut encoder = ::png::Encoder::new(&mut out, width, height);
        encoder.set_color(::png::ColorType::Indexed);
        encoder.set_depth(::png::BitDepth::Eight);
        encoder.set_compression(::png::Compression::Best);
        encoder.set_palette(rgb);
        if alpha.iter().any(|&a| a != 255) {
            encoder.set_trns(alpha);
        }
        let mut writer = encoder.write_header().map_err(|e| e.to_string())?;
        writer.write_image_data(indices).map_err(|e| e.to_string())?;
        writer.finish().map_err(|e| e.to_string())?;
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use std::io::Cursor;

    fn sample_png() -> Vec<u8> {
        let img = RgbaImage::from_fn(40, 30, |x, y| match (x / 10 + y / 10) % 3 {
            0 => Rgba([255, 0, 0, 255]),
            1 => Rgba([0, 128, 255, 255]),
            _ => Rgba([0, 0, 0, 0]),
        });
        let mut out = Vec::new();
        img.write_to(&mut Cursor::new(&mut out), ImageFormat::Png)
            .unwrap();
        out
    }

    #[test]
    fn test_writes_indexed_png_with_transparency() {
        let out = quantize(&sample_png(), &PngConfig::default())
            .unwrap()
            .unwrap();

        let decoder = ::png::Decoder::new(Cursor::new(&out));
        let reader = decoder.read_info().unwrap();
        let info = reader.info();
        assert_eq!(info.color_type, ::png::ColorType::Indexed);
        assert_eq!((info.width, info.height), (40, 30));
        assert!(info.trns.is_some());
    }

    #[test]
    fn test_not_a_png_is_an_error() {
        assert!(quantize(b"GIF89a", &PngConfig::default()).is_err());
    }
}
