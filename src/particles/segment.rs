use std::collections::VecDeque;

use crate::foundation::error::{MontageError, MontageResult};
use crate::media::frame::{FrameRGBA, PixelRect};

/// Pixel adjacency used by component labeling.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Connectivity {
    /// Edge neighbours only.
    #[default]
    Four,
    /// Edge and corner neighbours.
    Eight,
}

impl Connectivity {
    /// Parse `4` or `8`.
    pub fn from_neighbours(n: u64) -> MontageResult<Self> {
        match n {
            4 => Ok(Self::Four),
            8 => Ok(Self::Eight),
            other => Err(MontageError::validation(format!(
                "connectivity must be 4 or 8, got {other}"
            ))),
        }
    }

    fn offsets(self) -> &'static [(i64, i64)] {
        const FOUR: [(i64, i64); 4] = [(0, -1), (-1, 0), (1, 0), (0, 1)];
        const EIGHT: [(i64, i64); 8] = [
            (-1, -1),
            (0, -1),
            (1, -1),
            (-1, 0),
            (1, 0),
            (-1, 1),
            (0, 1),
            (1, 1),
        ];
        match self {
            Self::Four => &FOUR,
            Self::Eight => &EIGHT,
        }
    }
}

/// Binary foreground mask.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    bits: Vec<bool>,
}

impl Mask {
    /// Mask from row-major bits.
    pub fn new(width: u32, height: u32, bits: Vec<bool>) -> MontageResult<Self> {
        if bits.len() != width as usize * height as usize {
            return Err(MontageError::validation(format!(
                "mask has {} bits, expected {width}x{height}",
                bits.len()
            )));
        }
        Ok(Self {
            width,
            height,
            bits,
        })
    }

    /// Foreground wherever the frame has any coverage.
    pub fn from_alpha(frame: &FrameRGBA) -> Self {
        Self {
            width: frame.width,
            height: frame.height,
            bits: frame.data.chunks_exact(4).map(|px| px[3] > 0).collect(),
        }
    }

    /// Mask width.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Mask height.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// `true` when `(x, y)` is foreground. Out-of-bounds reads are background.
    pub fn get(&self, x: i64, y: i64) -> bool {
        if x < 0 || y < 0 || x >= i64::from(self.width) || y >= i64::from(self.height) {
            return false;
        }
        self.bits[(y as usize) * (self.width as usize) + (x as usize)]
    }
}

/// Bounding boxes of the connected foreground components of `mask`.
///
/// Components are numbered by their first pixel in raster order, so the result is stable for a
/// given mask.
pub fn label_components(mask: &Mask, connectivity: Connectivity) -> Vec<PixelRect> {
    let (w, h) = (mask.width as usize, mask.height as usize);
    let mut visited = vec![false; w * h];
    let mut boxes = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..w * h {
        if visited[start] || !mask.bits[start] {
            continue;
        }
        visited[start] = true;
        queue.push_back(start);

        let (sx, sy) = ((start % w) as u32, (start / w) as u32);
        let mut rect = PixelRect {
            x0: sx,
            y0: sy,
            x1: sx + 1,
            y1: sy + 1,
        };

        while let Some(idx) = queue.pop_front() {
            let (x, y) = ((idx % w) as i64, (idx / w) as i64);
            rect.x0 = rect.x0.min(x as u32);
            rect.y0 = rect.y0.min(y as u32);
            rect.x1 = rect.x1.max(x as u32 + 1);
            rect.y1 = rect.y1.max(y as u32 + 1);

            for &(dx, dy) in connectivity.offsets() {
                let (nx, ny) = (x + dx, y + dy);
                if !mask.get(nx, ny) {
                    continue;
                }
                let n = (ny as usize) * w + nx as usize;
                if !visited[n] {
                    visited[n] = true;
                    queue.push_back(n);
                }
            }
        }
        boxes.push(rect);
    }
    boxes
}

#[cfg(test)]
#[path = "../../tests/unit/particles/segment.rs"]
mod tests;
