//! JPEG encoding of converted frames.

use anyhow::Result;
use image::codecs::jpeg::JpegEncoder;
use image::{ImageBuffer, RgbImage};
use std::io::Cursor;

use crate::frame::ColorRaster;

/// Default JPEG quality (1-100). Higher = sharper, more bandwidth.
pub const DEFAULT_QUALITY: u8 = 80;

/// JPEG-encode an RGB raster at the given quality (clamped to 1-100).
///
/// Pure function of (raster, quality); safe to call concurrently for
/// independent rasters. Higher quality yields a payload at least as large
/// for the same raster.
pub fn to_jpeg(raster: &ColorRaster, quality: u8) -> Result<Vec<u8>> {
    let quality = quality.clamp(1, 100);
    let mut buf = Cursor::new(Vec::new());
    let encoder = JpegEncoder::new_with_quality(&mut buf, quality);

    let img: RgbImage = ImageBuffer::from_raw(raster.width, raster.height, raster.pixels.clone())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "raster buffer does not cover {}x{} pixels",
                raster.width,
                raster.height
            )
        })?;

    img.write_with_encoder(encoder)?;

    Ok(buf.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gradient_raster(width: u32, height: u32) -> ColorRaster {
        let mut pixels = Vec::with_capacity((width * height * 3) as usize);
        for row in 0..height {
            for col in 0..width {
                pixels.push((col * 4) as u8);
                pixels.push((row * 4) as u8);
                pixels.push((col + row) as u8);
            }
        }
        ColorRaster {
            width,
            height,
            pixels,
        }
    }

    #[test]
    fn encodes_decodable_jpeg_with_matching_dimensions() {
        let raster = gradient_raster(48, 32);
        let jpeg = to_jpeg(&raster, 80).unwrap();

        let decoded = image::load_from_memory(&jpeg).unwrap();
        assert_eq!(decoded.width(), 48);
        assert_eq!(decoded.height(), 32);
    }

    #[test]
    fn payload_size_is_monotone_in_quality() {
        let raster = gradient_raster(64, 64);
        let sizes: Vec<usize> = [10u8, 40, 70, 95]
            .iter()
            .map(|&q| to_jpeg(&raster, q).unwrap().len())
            .collect();

        for pair in sizes.windows(2) {
            assert!(pair[0] <= pair[1], "sizes not monotone: {sizes:?}");
        }
    }

    #[test]
    fn out_of_range_quality_is_clamped() {
        let raster = gradient_raster(16, 16);
        // 0 and 255 must not panic; they behave as 1 and 100.
        let low = to_jpeg(&raster, 0).unwrap();
        let high = to_jpeg(&raster, 255).unwrap();
        assert!(low.len() <= high.len());
    }

    #[test]
    fn mismatched_buffer_is_an_error() {
        let raster = ColorRaster {
            width: 8,
            height: 8,
            pixels: vec![0; 10],
        };
        assert!(to_jpeg(&raster, 80).is_err());
    }
}
