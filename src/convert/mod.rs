//! YUV 4:2:0 to RGB conversion.
//!
//! Walks the planes by row stride and pixel stride, so planar (I420-style)
//! and semi-planar (NV12-style) chroma layouts go through the same code path.
//!
//! Uses BT.601 conversion coefficients:
//! - R = Y + 1.402 * (V - 128)
//! - G = Y - 0.344 * (U - 128) - 0.714 * (V - 128)
//! - B = Y + 1.772 * (U - 128)

use thiserror::Error;

use crate::frame::{ColorRaster, PlanarFrame};

/// Why a frame could not be converted. The caller drops the frame; nothing
/// here is retried or escalated past the current frame.
#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("frame has zero width or height")]
    EmptyFrame,
    #[error("plane {plane} has an unsupported pixel stride of {pixel_stride}")]
    UnsupportedLayout { plane: usize, pixel_stride: usize },
    #[error("plane {plane} buffer too small: {actual} bytes, needs {required}")]
    PlaneTooSmall {
        plane: usize,
        required: usize,
        actual: usize,
    },
}

/// Convert a planar YUV 4:2:0 frame into an interleaved RGB raster of the
/// same width and height.
pub fn to_rgb(frame: &PlanarFrame) -> Result<ColorRaster, ConvertError> {
    validate(frame)?;

    let width = frame.width as usize;
    let height = frame.height as usize;
    let luma = &frame.planes[0];
    let u_plane = &frame.planes[1];
    let v_plane = &frame.planes[2];

    let mut pixels = Vec::with_capacity(width * height * 3);

    for row in 0..height {
        for col in 0..width {
            let y = luma.data[row * luma.row_stride + col] as f32;

            // Each chroma sample covers a 2x2 luma block.
            let u_idx = (row / 2) * u_plane.row_stride + (col / 2) * u_plane.pixel_stride;
            let v_idx = (row / 2) * v_plane.row_stride + (col / 2) * v_plane.pixel_stride;
            let u = u_plane.data[u_idx] as f32 - 128.0;
            let v = v_plane.data[v_idx] as f32 - 128.0;

            let r = (y + 1.402 * v).clamp(0.0, 255.0) as u8;
            let g = (y - 0.344 * u - 0.714 * v).clamp(0.0, 255.0) as u8;
            let b = (y + 1.772 * u).clamp(0.0, 255.0) as u8;

            pixels.push(r);
            pixels.push(g);
            pixels.push(b);
        }
    }

    Ok(ColorRaster {
        width: frame.width,
        height: frame.height,
        pixels,
    })
}

fn validate(frame: &PlanarFrame) -> Result<(), ConvertError> {
    if frame.width == 0 || frame.height == 0 {
        return Err(ConvertError::EmptyFrame);
    }

    let extents = [
        (frame.height as usize, frame.width as usize),
        (frame.chroma_height(), frame.chroma_width()),
        (frame.chroma_height(), frame.chroma_width()),
    ];

    for (idx, plane) in frame.planes.iter().enumerate() {
        // Luma is always one byte per pixel; chroma may be interleaved.
        let stride_ok = if idx == 0 {
            plane.pixel_stride == 1
        } else {
            plane.pixel_stride >= 1
        };
        if !stride_ok {
            return Err(ConvertError::UnsupportedLayout {
                plane: idx,
                pixel_stride: plane.pixel_stride,
            });
        }

        let (rows, cols) = extents[idx];
        let required = plane.required_len(rows, cols);
        if plane.data.len() < required {
            return Err(ConvertError::PlaneTooSmall {
                plane: idx,
                required,
                actual: plane.data.len(),
            });
        }
    }

    Ok(())
}
