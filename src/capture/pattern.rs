//! Deterministic synthetic frame source.
//!
//! Produces a moving diagonal gradient in planar YUV 4:2:0, with chroma
//! ramps centered on neutral (128). Used by the `stream` command when no
//! device source is wired in, and by tests that need known frame content.

use anyhow::Result;

use crate::frame::{Plane, PlanarFrame};
use super::FrameSource;

pub struct TestPattern {
    width: u32,
    height: u32,
    frame_rate: u32,
    tick: u64,
}

impl TestPattern {
    pub fn new(width: u32, height: u32, frame_rate: u32) -> Self {
        Self {
            width,
            height,
            frame_rate,
            tick: 0,
        }
    }

    /// The pattern frame for a given tick. Luma slides diagonally by one
    /// step per tick; pixel (0,0) has luma `tick` (mod 256).
    pub fn frame_at(width: u32, height: u32, tick: u64) -> PlanarFrame {
        let w = width as usize;
        let h = height as usize;
        let cw = (w + 1) / 2;
        let ch = (h + 1) / 2;

        let mut luma = vec![0u8; w * h];
        for row in 0..h {
            for col in 0..w {
                luma[row * w + col] = (row + col).wrapping_add(tick as usize) as u8;
            }
        }

        let mut u = vec![0u8; cw * ch];
        let mut v = vec![0u8; cw * ch];
        for row in 0..ch {
            for col in 0..cw {
                u[row * cw + col] = 104 + ((col * 4) % 48) as u8;
                v[row * cw + col] = 104 + ((row * 4) % 48) as u8;
            }
        }

        PlanarFrame {
            width,
            height,
            planes: [
                Plane {
                    data: luma,
                    row_stride: w,
                    pixel_stride: 1,
                },
                Plane {
                    data: u,
                    row_stride: cw,
                    pixel_stride: 1,
                },
                Plane {
                    data: v,
                    row_stride: cw,
                    pixel_stride: 1,
                },
            ],
        }
    }
}

impl FrameSource for TestPattern {
    fn next_frame(&mut self) -> Result<PlanarFrame> {
        let frame = Self::frame_at(self.width, self.height, self.tick);
        self.tick = self.tick.wrapping_add(1);
        Ok(frame)
    }

    fn frame_rate(&self) -> u32 {
        self.frame_rate
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert;

    #[test]
    fn frames_have_requested_geometry() {
        let frame = TestPattern::frame_at(34, 26, 0);
        assert_eq!(frame.width, 34);
        assert_eq!(frame.height, 26);
        assert_eq!(frame.planes[0].data.len(), 34 * 26);
        assert_eq!(frame.planes[1].data.len(), 17 * 13);
        assert_eq!(frame.planes[2].data.len(), 17 * 13);
    }

    #[test]
    fn pattern_moves_between_ticks() {
        let a = TestPattern::frame_at(16, 16, 0);
        let b = TestPattern::frame_at(16, 16, 1);
        assert_ne!(a.planes[0].data, b.planes[0].data);
    }

    #[test]
    fn source_advances_its_own_tick() {
        let mut source = TestPattern::new(8, 8, 30);
        let a = source.next_frame().unwrap();
        let b = source.next_frame().unwrap();
        assert_ne!(a.planes[0].data, b.planes[0].data);
    }

    #[test]
    fn frames_convert_cleanly() {
        let frame = TestPattern::frame_at(33, 17, 5);
        let raster = convert::to_rgb(&frame).unwrap();
        assert_eq!(raster.pixels.len(), 33 * 17 * 3);
    }
}
