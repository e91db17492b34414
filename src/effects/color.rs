use crate::foundation::math::{premultiply, unpremultiply};
use crate::media::frame::FrameRGBA;

/// Colorimetric transform on straight RGB. Alpha is preserved.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ColorOp {
    /// `c·factor`.
    Multiply {
        /// Channel factor.
        factor: f64,
    },
    /// `c + lum + contrast·(c - threshold)`.
    LumContrast {
        /// Added luminance.
        lum: f64,
        /// Contrast factor.
        contrast: f64,
        /// Contrast pivot.
        threshold: f64,
    },
    /// `saturation·c - black·255·edge`.
    Painting {
        /// Channel factor.
        saturation: f64,
        /// Edge darkening strength.
        black: f64,
    },
}

impl ColorOp {
    /// Apply to a premultiplied frame. Results clamp to `[0, 255]`.
    pub fn apply(&self, frame: &FrameRGBA) -> FrameRGBA {
        match *self {
            Self::Multiply { factor } => {
                let f = factor as f32;
                map_pixels(frame, |c, _| c * f)
            }
            Self::LumContrast {
                lum,
                contrast,
                threshold,
            } => {
                let (l, k, th) = (lum as f32, contrast as f32, threshold as f32);
                map_pixels(frame, |c, _| c + l + k * (c - th))
            }
            Self::Painting { saturation, black } => {
                let edges = sobel_magnitude(frame);
                let (s, b) = (saturation as f32, black as f32);
                map_pixels(frame, |c, i| s * c - b * 255.0 * edges[i])
            }
        }
    }
}

fn map_pixels(frame: &FrameRGBA, f: impl Fn(f32, usize) -> f32) -> FrameRGBA {
    let mut out = frame.clone();
    for (i, px) in out.data.chunks_exact_mut(4).enumerate() {
        let a = px[3];
        if a == 0 {
            continue;
        }
        let rgb = unpremultiply([px[0], px[1], px[2], a]);
        let mapped = [f(rgb[0], i), f(rgb[1], i), f(rgb[2], i)];
        px.copy_from_slice(&premultiply(mapped, a));
    }
    out
}

/// Sobel gradient magnitude of the mean straight intensity in `[0, 255]`.
///
/// Each axis uses the kernel normalized by 4 and the magnitude is `sqrt((gx² + gy²) / 2)`, so a
/// full black-to-white step scores `255/√2`. Borders replicate the nearest pixel.
pub fn sobel_magnitude(frame: &FrameRGBA) -> Vec<f32> {
    let (w, h) = (frame.width as usize, frame.height as usize);
    let intensity: Vec<f32> = frame
        .data
        .chunks_exact(4)
        .map(|px| {
            let rgb = unpremultiply([px[0], px[1], px[2], px[3]]);
            (rgb[0] + rgb[1] + rgb[2]) / 3.0
        })
        .collect();

    let at = |x: isize, y: isize| {
        let x = x.clamp(0, w as isize - 1) as usize;
        let y = y.clamp(0, h as isize - 1) as usize;
        intensity[y * w + x]
    };

    let mut out = vec![0.0f32; w * h];
    for y in 0..h as isize {
        for x in 0..w as isize {
            let gx = ((at(x + 1, y - 1) + 2.0 * at(x + 1, y) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x - 1, y) + at(x - 1, y + 1)))
                / 4.0;
            let gy = ((at(x - 1, y + 1) + 2.0 * at(x, y + 1) + at(x + 1, y + 1))
                - (at(x - 1, y - 1) + 2.0 * at(x, y - 1) + at(x + 1, y - 1)))
                / 4.0;
            out[y as usize * w + x as usize] = ((gx * gx + gy * gy) / 2.0).sqrt();
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/effects/color.rs"]
mod tests;
