pub(crate) fn mul_div255_u16(x: u16, y: u16) -> u16 {
    (((u32::from(x) * u32::from(y)) + 127) / 255) as u16
}

pub(crate) fn mul_div255_u8(x: u16, y: u16) -> u8 {
    mul_div255_u16(x, y) as u8
}

/// Recover straight RGB from a premultiplied pixel.
pub(crate) fn unpremultiply(px: [u8; 4]) -> [f32; 3] {
    let a = px[3];
    if a == 0 {
        return [0.0; 3];
    }
    let a = f32::from(a);
    [
        (f32::from(px[0]) * 255.0 / a).min(255.0),
        (f32::from(px[1]) * 255.0 / a).min(255.0),
        (f32::from(px[2]) * 255.0 / a).min(255.0),
    ]
}

/// Clamp straight RGB to `[0, 255]` and premultiply by `a`.
pub(crate) fn premultiply(rgb: [f32; 3], a: u8) -> [u8; 4] {
    let af = f32::from(a) / 255.0;
    let ch = |c: f32| (c.clamp(0.0, 255.0) * af).round().clamp(0.0, 255.0) as u8;
    [ch(rgb[0]), ch(rgb[1]), ch(rgb[2]), a]
}
