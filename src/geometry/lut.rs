//! Fixed-size per-pixel two-channel lookup tables.
//!
//! One table type serves the three per-pixel maps the device works with:
//! ray-direction tables (`uv2xy`), undistortion maps and rectification
//! maps. Each pixel holds two `f32` channels; the table is stored row by
//! row and its dimensions always match the owning sensor's resolution.

use bytemuck::{cast_slice, cast_vec};

/// Per-pixel two-channel `f32` table with fixed dimensions.
#[derive(Debug, Clone, PartialEq)]
pub struct PixelMap {
    width: usize,
    height: usize,
    data: Vec<[f32; 2]>,
}

impl PixelMap {
    /// Build a table from per-pixel channel pairs, row-major.
    ///
    /// Returns `None` when the buffer length does not match the
    /// dimensions.
    pub fn from_pixels(width: usize, height: usize, data: Vec<[f32; 2]>) -> Option<Self> {
        (data.len() == width * height).then_some(Self {
            width,
            height,
            data,
        })
    }

    /// Build a table by evaluating `f(u, v)` at every pixel.
    pub fn from_fn(width: usize, height: usize, mut f: impl FnMut(usize, usize) -> [f32; 2]) -> Self {
        let mut data = Vec::with_capacity(width * height);
        for v in 0..height {
            for u in 0..width {
                data.push(f(u, v));
            }
        }
        Self {
            width,
            height,
            data,
        }
    }

    /// Build a table from a flat channel-interleaved buffer
    /// (`x0 y0 x1 y1 ...`), as stored on disk.
    pub fn from_flat(width: usize, height: usize, flat: Vec<f32>) -> Option<Self> {
        (flat.len() == width * height * 2).then(|| Self {
            width,
            height,
            data: cast_vec(flat),
        })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Channel pair at pixel `(u, v)`.
    #[inline]
    pub fn at(&self, u: usize, v: usize) -> [f32; 2] {
        self.data[v * self.width + u]
    }

    /// All pixels, row-major.
    pub fn pixels(&self) -> &[[f32; 2]] {
        &self.data
    }

    /// Flat channel-interleaved view, matching the on-disk layout.
    pub fn as_flat(&self) -> &[f32] {
        cast_slice(&self.data)
    }
}
