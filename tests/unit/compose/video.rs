use std::sync::Arc;

use super::*;
use crate::media::source::SolidColor;

fn layer(node: &str, span: (f64, f64), rgba: [u8; 4], size: (u32, u32), opacity: f32) -> VideoLayer {
    VideoLayer {
        node: node.to_string(),
        span: Span {
            start: span.0,
            end: span.1,
        },
        stream: Arc::new(SolidColor::new(size.0, size.1, rgba).unwrap()),
        position: Position::origin(),
        opacity,
    }
}

fn compositor(layers: Vec<VideoLayer>) -> FrameCompositor {
    FrameCompositor::new(
        Canvas::new(8, 4).unwrap(),
        Rgba8Premul::from_straight_rgba(0, 0, 0, 255),
        layers,
    )
}

#[test]
fn opaque_top_layer_occludes() {
    let c = compositor(vec![
        layer("bottom", (0.0, 5.0), [255, 0, 0, 255], (8, 4), 1.0),
        layer("top", (0.0, 5.0), [0, 0, 255, 255], (8, 4), 1.0),
    ]);
    let f = c.compose_frame(1.0).unwrap();
    assert_eq!(f.pixel(3, 2), [0, 0, 255, 255]);
}

#[test]
fn partial_opacity_blends() {
    let c = compositor(vec![
        layer("bottom", (0.0, 5.0), [255, 0, 0, 255], (8, 4), 1.0),
        layer("top", (0.0, 5.0), [0, 0, 255, 255], (8, 4), 0.5),
    ]);
    let px = c.compose_frame(1.0).unwrap().pixel(0, 0);
    assert!(px[0] > 100 && px[2] > 100);
    assert_eq!(px[3], 255);
}

#[test]
fn span_is_half_open() {
    let c = compositor(vec![layer("a", (1.0, 2.0), [0, 255, 0, 255], (8, 4), 1.0)]);
    assert_eq!(c.compose_frame(0.99).unwrap().pixel(0, 0), [0, 0, 0, 255]);
    assert_eq!(c.compose_frame(1.0).unwrap().pixel(0, 0), [0, 255, 0, 255]);
    assert_eq!(c.compose_frame(2.0).unwrap().pixel(0, 0), [0, 0, 0, 255]);
}

#[test]
fn centered_small_layer() {
    let mut l = layer("dot", (0.0, 1.0), [255, 255, 255, 255], (2, 2), 1.0);
    l.position = Position::centered();
    let f = compositor(vec![l]).compose_frame(0.0).unwrap();
    assert_eq!(f.pixel(3, 1), [255, 255, 255, 255]);
    assert_eq!(f.pixel(4, 2), [255, 255, 255, 255]);
    assert_eq!(f.pixel(2, 1), [0, 0, 0, 255]);
}

#[test]
fn layer_errors_carry_the_node_id() {
    #[derive(Debug)]
    struct Broken;
    impl crate::media::stream::VideoStream for Broken {
        fn size(&self) -> (u32, u32) {
            (1, 1)
        }
        fn duration(&self) -> Option<f64> {
            None
        }
        fn frame_at(&self, _t: f64) -> MontageResult<FrameRGBA> {
            Err(crate::foundation::error::MontageError::evaluation("decode failed"))
        }
    }

    let mut l = layer("clip", (0.0, 1.0), [0; 4], (1, 1), 1.0);
    l.stream = Arc::new(Broken);
    let err = compositor(vec![l]).compose_frame(0.5).unwrap_err();
    assert_eq!(err.node_id(), Some("clip"));
}
