use super::*;

fn gradient(w: u32, h: u32) -> FrameRGBA {
    let mut data = Vec::new();
    for y in 0..h {
        for x in 0..w {
            data.extend_from_slice(&[x as u8, y as u8, 0, 255]);
        }
    }
    FrameRGBA::from_premul(w, h, data).unwrap()
}

#[test]
fn from_premul_checks_length() {
    assert!(FrameRGBA::from_premul(2, 2, vec![0; 15]).is_err());
    assert!(FrameRGBA::from_premul(2, 2, vec![0; 16]).is_ok());
}

#[test]
fn crop_copies_rows() {
    let f = gradient(4, 3);
    let c = f
        .crop(PixelRect {
            x0: 1,
            y0: 1,
            x1: 3,
            y1: 3,
        })
        .unwrap();
    assert_eq!((c.width, c.height), (2, 2));
    assert_eq!(c.pixel(0, 0), [1, 1, 0, 255]);
    assert_eq!(c.pixel(1, 1), [2, 2, 0, 255]);
}

#[test]
fn crop_to_zero_area_is_validation_error() {
    let f = gradient(4, 3);
    let err = f
        .crop(PixelRect {
            x0: 2,
            y0: 0,
            x1: 2,
            y1: 3,
        })
        .unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);

    // Fully outside the frame clamps to an empty rect.
    assert!(
        f.crop(PixelRect {
            x0: 10,
            y0: 10,
            x1: 20,
            y1: 20
        })
        .is_err()
    );
}

#[test]
fn resize_preserves_solid_color() {
    let f = FrameRGBA::filled(4, 4, Rgba8Premul::from_straight_rgba(10, 20, 30, 255)).unwrap();
    let r = f.resized(8, 2).unwrap();
    assert_eq!((r.width, r.height), (8, 2));
    assert!(r.data.chunks_exact(4).all(|px| px == [10, 20, 30, 255]));
}

#[test]
fn scale_alpha_fades_premultiplied_channels() {
    let mut f = FrameRGBA::filled(1, 1, Rgba8Premul::from_straight_rgba(200, 100, 0, 255)).unwrap();
    f.scale_alpha(0.5);
    assert_eq!(f.pixel(0, 0), [100, 50, 0, 128]);
}

#[test]
fn out_of_bounds_pixel_is_transparent() {
    let f = gradient(2, 2);
    assert_eq!(f.pixel(5, 0), [0, 0, 0, 0]);
}

#[test]
fn straight_copy_undoes_premultiplication() {
    let f = FrameRGBA::from_straight(2, 1, vec![200, 100, 50, 128, 10, 20, 30, 0]).unwrap();
    let straight = f.to_straight();
    assert_eq!(straight[3], 128);
    assert!((199..=201).contains(&straight[0]));
    assert!((99..=101).contains(&straight[1]));
    assert_eq!(&straight[4..], &[0, 0, 0, 0]);
}
