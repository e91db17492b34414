use crate::foundation::math::mul_div255_u8;
use crate::media::frame::FrameRGBA;

/// Premultiplied RGBA8 pixel.
pub type PremulRgba8 = [u8; 4];

/// Premultiplied source-over with an extra layer opacity.
pub fn over(dst: PremulRgba8, src: PremulRgba8, opacity: f32) -> PremulRgba8 {
    let opacity = opacity.clamp(0.0, 1.0);
    if opacity <= 0.0 || src[3] == 0 {
        return dst;
    }

    let op = ((opacity * 255.0).round() as i32).clamp(0, 255) as u16;
    let sa = mul_div255_u8(u16::from(src[3]), op);
    if sa == 0 {
        return dst;
    }

    let inv = 255u16 - u16::from(sa);

    let mut out = [0u8; 4];
    out[3] = sa.saturating_add(mul_div255_u8(u16::from(dst[3]), inv));
    for i in 0..3 {
        let sc = mul_div255_u8(u16::from(src[i]), op);
        let dc = mul_div255_u8(u16::from(dst[i]), inv);
        out[i] = sc.saturating_add(dc);
    }
    out
}

fn blend_row(dst: &mut [u8], src: &[u8], opacity: f32) {
    for (d, s) in dst.chunks_exact_mut(4).zip(src.chunks_exact(4)) {
        let out = over([d[0], d[1], d[2], d[3]], [s[0], s[1], s[2], s[3]], opacity);
        d.copy_from_slice(&out);
    }
}

/// Blend `src` onto `dst` with its top-left corner at `(x, y)`, clipping to `dst`.
pub fn blit_over(dst: &mut FrameRGBA, src: &FrameRGBA, x: i64, y: i64, opacity: f32) {
    let (dw, dh) = (i64::from(dst.width), i64::from(dst.height));
    let (sw, sh) = (i64::from(src.width), i64::from(src.height));

    let x0 = x.max(0);
    let y0 = y.max(0);
    let x1 = (x + sw).min(dw);
    let y1 = (y + sh).min(dh);
    if x0 >= x1 || y0 >= y1 {
        return;
    }

    let full_row = x0 == 0 && x1 == dw && x == 0 && sw == dw;
    for dy in y0..y1 {
        let sy = dy - y;
        let d_start = ((dy * dw + x0) * 4) as usize;
        let d_end = ((dy * dw + x1) * 4) as usize;
        let s_start = ((sy * sw + (x0 - x)) * 4) as usize;
        let s_end = s_start + (d_end - d_start);

        let d_row = &mut dst.data[d_start..d_end];
        let s_row = &src.data[s_start..s_end];
        if full_row && opacity >= 1.0 && s_row.chunks_exact(4).all(|p| p[3] == 255) {
            d_row.copy_from_slice(s_row);
            continue;
        }
        blend_row(d_row, s_row, opacity);
    }
}

/// Flatten a premultiplied frame over an opaque `background` (straight RGB).
pub fn flatten_onto(frame: &FrameRGBA, background: [u8; 3]) -> Vec<u8> {
    let bg = [background[0], background[1], background[2], 255];
    let mut out = Vec::with_capacity(frame.data.len());
    for px in frame.data.chunks_exact(4) {
        out.extend_from_slice(&over(bg, [px[0], px[1], px[2], px[3]], 1.0));
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/compose/blend.rs"]
mod tests;
