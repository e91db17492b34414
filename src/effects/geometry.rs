use crate::effects::spec::Interpolation;
use crate::foundation::core::{Affine, Point};
use crate::foundation::error::MontageResult;
use crate::media::frame::FrameRGBA;

const RIGHT_ANGLE_EPS: f64 = 1e-9;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum QuarterTurn {
    Zero,
    One,
    Two,
    Three,
}

fn quarter_turn(angle_deg: f64) -> Option<QuarterTurn> {
    let a = angle_deg.rem_euclid(360.0);
    let q = (a / 90.0).round();
    if (a - q * 90.0).abs() > RIGHT_ANGLE_EPS {
        return None;
    }
    Some(match q as i64 % 4 {
        0 => QuarterTurn::Zero,
        1 => QuarterTurn::One,
        2 => QuarterTurn::Two,
        _ => QuarterTurn::Three,
    })
}

/// Output size of rotating a `w x h` frame by `angle_deg`.
///
/// Without `expand` the size is unchanged. With it, the frame grows to the rotated bounds.
pub fn rotated_size(w: u32, h: u32, angle_deg: f64, expand: bool) -> (u32, u32) {
    if !expand {
        return (w, h);
    }
    match quarter_turn(angle_deg) {
        Some(QuarterTurn::Zero | QuarterTurn::Two) => (w, h),
        Some(QuarterTurn::One | QuarterTurn::Three) => (h, w),
        None => {
            let (s, c) = angle_deg.to_radians().sin_cos();
            let (wf, hf) = (f64::from(w), f64::from(h));
            let bw = wf * c.abs() + hf * s.abs();
            let bh = wf * s.abs() + hf * c.abs();
            (
                ((bw - 1e-6).ceil() as u32).max(1),
                ((bh - 1e-6).ceil() as u32).max(1),
            )
        }
    }
}

/// Rotate a premultiplied frame counter-clockwise by `angle_deg` about its center.
///
/// Right-angle turns that keep every pixel are exact copies. Other angles inverse-map each
/// output pixel center into the source and sample with `interp`; samples outside the source
/// are transparent.
pub fn rotate_frame(
    frame: &FrameRGBA,
    angle_deg: f64,
    interp: Interpolation,
    expand: bool,
) -> MontageResult<FrameRGBA> {
    let (w, h) = (frame.width, frame.height);
    let (ow, oh) = rotated_size(w, h, angle_deg, expand);

    if let Some(q) = quarter_turn(angle_deg)
        && (ow, oh) == rotated_size(w, h, angle_deg, true)
    {
        return Ok(exact_turn(frame, q));
    }

    // y-down: a visual counter-clockwise turn maps output offsets back with a positive rotation.
    let src_c = Point::new(f64::from(w) * 0.5, f64::from(h) * 0.5);
    let dst_c = Point::new(f64::from(ow) * 0.5, f64::from(oh) * 0.5);
    let inverse = Affine::translate(src_c.to_vec2())
        * Affine::rotate(angle_deg.to_radians())
        * Affine::translate(-dst_c.to_vec2());

    let mut out = FrameRGBA::transparent(ow, oh)?;
    for y in 0..oh {
        for x in 0..ow {
            let p = inverse * Point::new(f64::from(x) + 0.5, f64::from(y) + 0.5);
            let px = sample(frame, p.x - 0.5, p.y - 0.5, interp);
            let i = ((y as usize) * (ow as usize) + x as usize) * 4;
            out.data[i..i + 4].copy_from_slice(&px);
        }
    }
    Ok(out)
}

fn exact_turn(frame: &FrameRGBA, q: QuarterTurn) -> FrameRGBA {
    let (w, h) = (frame.width, frame.height);
    let (ow, oh) = match q {
        QuarterTurn::Zero | QuarterTurn::Two => (w, h),
        QuarterTurn::One | QuarterTurn::Three => (h, w),
    };
    if q == QuarterTurn::Zero {
        return frame.clone();
    }

    let mut data = Vec::with_capacity(frame.data.len());
    for y in 0..oh {
        for x in 0..ow {
            let (sx, sy) = match q {
                QuarterTurn::One => (w - 1 - y, x),
                QuarterTurn::Two => (w - 1 - x, h - 1 - y),
                QuarterTurn::Three => (y, h - 1 - x),
                QuarterTurn::Zero => (x, y),
            };
            data.extend_from_slice(&frame.pixel(sx, sy));
        }
    }
    FrameRGBA {
        width: ow,
        height: oh,
        data,
        premultiplied: frame.premultiplied,
    }
}

fn tap(frame: &FrameRGBA, x: i64, y: i64) -> [f32; 4] {
    if x < 0 || y < 0 || x >= i64::from(frame.width) || y >= i64::from(frame.height) {
        return [0.0; 4];
    }
    let p = frame.pixel(x as u32, y as u32);
    [
        f32::from(p[0]),
        f32::from(p[1]),
        f32::from(p[2]),
        f32::from(p[3]),
    ]
}

/// Sample at continuous pixel coordinates where integer values are pixel centers.
fn sample(frame: &FrameRGBA, u: f64, v: f64, interp: Interpolation) -> [u8; 4] {
    let acc = match interp {
        Interpolation::Nearest => tap(frame, u.round() as i64, v.round() as i64),
        Interpolation::Bilinear => {
            let (x0, y0) = (u.floor(), v.floor());
            let (fx, fy) = ((u - x0) as f32, (v - y0) as f32);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let mut acc = [0.0f32; 4];
            for (dy, wy) in [(0, 1.0 - fy), (1, fy)] {
                for (dx, wx) in [(0, 1.0 - fx), (1, fx)] {
                    let t = tap(frame, x0 + dx, y0 + dy);
                    for c in 0..4 {
                        acc[c] += t[c] * wx * wy;
                    }
                }
            }
            acc
        }
        Interpolation::Bicubic => {
            let (x0, y0) = (u.floor(), v.floor());
            let wx = catmull_rom_weights((u - x0) as f32);
            let wy = catmull_rom_weights((v - y0) as f32);
            let (x0, y0) = (x0 as i64, y0 as i64);
            let mut acc = [0.0f32; 4];
            for (j, wyj) in wy.iter().enumerate() {
                for (i, wxi) in wx.iter().enumerate() {
                    let t = tap(frame, x0 + i as i64 - 1, y0 + j as i64 - 1);
                    for c in 0..4 {
                        acc[c] += t[c] * wxi * wyj;
                    }
                }
            }
            acc
        }
    };

    let a = acc[3].round().clamp(0.0, 255.0);
    let ch = |v: f32| v.round().clamp(0.0, a) as u8;
    [ch(acc[0]), ch(acc[1]), ch(acc[2]), a as u8]
}

fn catmull_rom_weights(t: f32) -> [f32; 4] {
    const A: f32 = -0.5;
    let k = |x: f32| {
        let x = x.abs();
        if x <= 1.0 {
            (A + 2.0) * x * x * x - (A + 3.0) * x * x + 1.0
        } else if x < 2.0 {
            A * x * x * x - 5.0 * A * x * x + 8.0 * A * x - 4.0 * A
        } else {
            0.0
        }
    };
    [k(t + 1.0), k(t), k(1.0 - t), k(2.0 - t)]
}

#[cfg(test)]
#[path = "../../tests/unit/effects/geometry.rs"]
mod tests;
