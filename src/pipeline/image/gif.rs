//! Lossless GIF re-encode with interlacing.

use std::io::Cursor;

/// Interlaced row passes: (first row, step).
const PASSES: [(usize, usize); 4] = [(0, 8), (4, 8), (2, 4), (1, 2)];

/// Re-encode every frame interlaced, keeping palettes, timing and loop count.
pub fn recompress(bytes: &[u8]) -> Result<Vec<u8>, String> {
    let mut options = ::gif::DecodeOptions::new();
    options.set_color_output(::gif::ColorOutput::Indexed);
    let mut decoder = options
        .read_info(Cursor::new(bytes))
        .map_err(|e| e.to_string())?;

    let width = decoder.width();
    let height = decoder.height();
    let global_palette = decoder.global_palette().map(<[u8]>::to_vec);
    let repeat = decoder.repeat();

    let mut out = Vec::with_capacity(bytes.len());
    {
        let mut encoder =
            ::gif::Encoder::new(&mut out, width, height, global_palette.as_deref().unwrap_or(&[]))
                .map_err(|e| e.to_string())?;
        encoder.set_repeat(repeat).map_err(|e| e.to_string())?;

        while let Some(frame) = decoder.read_next_frame().map_err(|e| e.to_string())? {
            let mut frame = frame.clone();
            // the decoder hands out rows in display order
            frame.buffer = interlace(&frame.buffer, frame.width.into(), frame.height.into()).into();
            frame.interlaced = true;
            encoder.write_frame(&frame).map_err(|e| e.to_string())?;
        }
    }

    Ok(out)
}

/// Reorder display-order rows into interlaced pass order.
fn interlace(buffer: &[u8], width: usize, height: usize) -> Vec<u8> {
    if width == 0 || buffer.len() < width * height {
        return buffer.to_vec();
    }
    let mut out = Vec::with_capacity(buffer.len());
    for (start, step) in PASSES {
        for row in (start..height).step_by(step) {
            out.extend_from_slice(&buffer[row * width..(row + 1) * width]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_gif(width: u16, height: u16) -> (Vec<u8>, Vec<u8>) {
        let palette = [0, 0, 0, 255, 255, 255, 255, 0, 0, 0, 0, 255];
        let pixels: Vec<u8> = (0..usize::from(width) * usize::from(height))
            .map(|i| (i % 4) as u8)
            .collect();

        let mut bytes = Vec::new();
        {
            let mut encoder = ::gif::Encoder::new(&mut bytes, width, height, &palette).unwrap();
            let frame = ::gif::Frame {
                width,
                height,
                buffer: pixels.clone().into(),
                ..::gif::Frame::default()
            };
            encoder.write_frame(&frame).unwrap();
        }
        (bytes, pixels)
    }

    #[test]
    fn test_interlace_row_order() {
        let rows: Vec<u8> = (0..5).collect();
        assert_eq!(interlace(&rows, 1, 5), vec![0, 4, 2, 1, 3]);
    }

    #[test]
    fn test_recompress_is_lossless_and_interlaced() {
        let (bytes, pixels) = sample_gif(13, 11);
        let out = recompress(&bytes).unwrap();

        let mut options = ::gif::DecodeOptions::new();
        options.set_color_output(::gif::ColorOutput::Indexed);
        let mut decoder = options.read_info(Cursor::new(out)).unwrap();
        // pixel reads deinterlace and clear the flag, so check the descriptor first
        let interlaced = decoder.next_frame_info().unwrap().unwrap().interlaced;
        assert!(interlaced);

        let mut buffer = vec![0; decoder.buffer_size()];
        decoder.read_into_buffer(&mut buffer).unwrap();
        assert_eq!(buffer, pixels);
    }

    #[test]
    fn test_garbage_is_an_error() {
        assert!(recompress(b"not a gif").is_err());
    }
}
