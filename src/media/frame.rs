use crate::foundation::core::Rgba8Premul;
use crate::foundation::error::{MontageError, MontageResult};

#[derive(Clone, Debug, PartialEq, Eq)]
/// CPU frame in RGBA8 layout.
///
/// Frames produced by sources, effects and the compositor are premultiplied.
pub struct FrameRGBA {
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Pixel bytes in row-major RGBA8 order.
    pub data: Vec<u8>,
    /// Whether `data` is premultiplied alpha.
    pub premultiplied: bool,
}

/// Half-open pixel rectangle `[x0, x1) x [y0, y1)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PixelRect {
    /// Left edge (inclusive).
    pub x0: u32,
    /// Top edge (inclusive).
    pub y0: u32,
    /// Right edge (exclusive).
    pub x1: u32,
    /// Bottom edge (exclusive).
    pub y1: u32,
}

impl PixelRect {
    /// Rectangle width.
    pub fn width(self) -> u32 {
        self.x1.saturating_sub(self.x0)
    }

    /// Rectangle height.
    pub fn height(self) -> u32 {
        self.y1.saturating_sub(self.y0)
    }

    /// `true` when the rectangle covers no pixels.
    pub fn is_empty(self) -> bool {
        self.width() == 0 || self.height() == 0
    }

    /// `true` when the two rectangles share at least one pixel.
    pub fn intersects(self, other: PixelRect) -> bool {
        self.x0 < other.x1 && other.x0 < self.x1 && self.y0 < other.y1 && other.y0 < self.y1
    }

    /// `true` when pixel `(x, y)` lies inside.
    pub fn contains(self, x: u32, y: u32) -> bool {
        self.x0 <= x && x < self.x1 && self.y0 <= y && y < self.y1
    }
}

fn byte_len(width: u32, height: u32) -> MontageResult<usize> {
    (width as usize)
        .checked_mul(height as usize)
        .and_then(|v| v.checked_mul(4))
        .ok_or_else(|| MontageError::evaluation("frame buffer size overflow"))
}

impl FrameRGBA {
    /// Fully transparent frame.
    pub fn transparent(width: u32, height: u32) -> MontageResult<Self> {
        Ok(Self {
            width,
            height,
            data: vec![0u8; byte_len(width, height)?],
            premultiplied: true,
        })
    }

    /// Frame where every pixel is `color`.
    pub fn filled(width: u32, height: u32, color: Rgba8Premul) -> MontageResult<Self> {
        let px = color.to_array();
        let n = byte_len(width, height)? / 4;
        Ok(Self {
            width,
            height,
            data: px.repeat(n),
            premultiplied: true,
        })
    }

    /// Wrap premultiplied bytes, checking the buffer length.
    pub fn from_premul(width: u32, height: u32, data: Vec<u8>) -> MontageResult<Self> {
        if data.len() != byte_len(width, height)? {
            return Err(MontageError::evaluation(format!(
                "frame data has {} bytes, expected {}x{}x4",
                data.len(),
                width,
                height
            )));
        }
        Ok(Self {
            width,
            height,
            data,
            premultiplied: true,
        })
    }

    /// Wrap straight-alpha bytes and premultiply them.
    pub fn from_straight(width: u32, height: u32, mut data: Vec<u8>) -> MontageResult<Self> {
        for px in data.chunks_exact_mut(4) {
            let p = Rgba8Premul::from_straight_rgba(px[0], px[1], px[2], px[3]);
            px.copy_from_slice(&p.to_array());
        }
        Self::from_premul(width, height, data)
    }

    /// Pixel at `(x, y)`. Out-of-bounds reads are transparent.
    pub fn pixel(&self, x: u32, y: u32) -> [u8; 4] {
        if x >= self.width || y >= self.height {
            return [0; 4];
        }
        let idx = ((y as usize) * (self.width as usize) + (x as usize)) * 4;
        [
            self.data[idx],
            self.data[idx + 1],
            self.data[idx + 2],
            self.data[idx + 3],
        ]
    }

    /// Copy of the pixels inside `rect`.
    pub fn crop(&self, rect: PixelRect) -> MontageResult<Self> {
        let rect = PixelRect {
            x0: rect.x0.min(self.width),
            y0: rect.y0.min(self.height),
            x1: rect.x1.min(self.width),
            y1: rect.y1.min(self.height),
        };
        if rect.is_empty() {
            return Err(MontageError::validation(format!(
                "crop of {}x{} frame to [{}, {}) x [{}, {}) has zero area",
                self.width, self.height, rect.x0, rect.x1, rect.y0, rect.y1
            )));
        }

        let row = self.width as usize * 4;
        let mut data = Vec::with_capacity(byte_len(rect.width(), rect.height())?);
        for y in rect.y0..rect.y1 {
            let start = y as usize * row + rect.x0 as usize * 4;
            let end = y as usize * row + rect.x1 as usize * 4;
            data.extend_from_slice(&self.data[start..end]);
        }
        Self::from_premul(rect.width(), rect.height(), data)
    }

    /// Resample to `width x height` with a triangle (bilinear) filter.
    pub fn resized(&self, width: u32, height: u32) -> MontageResult<Self> {
        if width == 0 || height == 0 {
            return Err(MontageError::validation(format!(
                "resize target must have non-zero area, got {width}x{height}"
            )));
        }
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        let src = image::RgbaImage::from_raw(self.width, self.height, self.data.clone())
            .ok_or_else(|| MontageError::evaluation("frame buffer does not match its size"))?;
        let out = image::imageops::resize(&src, width, height, image::imageops::FilterType::Triangle);
        Self::from_premul(width, height, out.into_raw())
    }

    /// Scale every channel by `factor` in `[0, 1]`, fading the whole frame.
    pub fn scale_alpha(&mut self, factor: f32) {
        let factor = factor.clamp(0.0, 1.0);
        if factor >= 1.0 {
            return;
        }
        for v in &mut self.data {
            *v = (f32::from(*v) * factor).round() as u8;
        }
    }

    /// Straight-alpha copy of the pixel bytes, as image encoders expect.
    pub fn to_straight(&self) -> Vec<u8> {
        let mut out = self.data.clone();
        if !self.premultiplied {
            return out;
        }
        for px in out.chunks_exact_mut(4) {
            let a = u16::from(px[3]);
            if a == 0 || a == 255 {
                continue;
            }
            for c in &mut px[..3] {
                *c = ((u16::from(*c) * 255 + a / 2) / a).min(255) as u8;
            }
        }
        out
    }

    /// `true` when no pixel has coverage.
    pub fn is_fully_transparent(&self) -> bool {
        self.data.chunks_exact(4).all(|px| px[3] == 0)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/frame.rs"]
mod tests;
