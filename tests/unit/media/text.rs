use super::*;

#[test]
fn svg_escapes_markup() {
    let svg = text_svg("a<b & \"c\"", &TextStyle::default());
    assert!(svg.contains("a&lt;b &amp; &quot;c&quot;"));
    assert!(!svg.contains("a<b"));
}

#[test]
fn svg_anchor_follows_alignment() {
    let style = TextStyle {
        align: TextAlign::Center,
        box_size: (200, 100),
        ..TextStyle::default()
    };
    let svg = text_svg("hi", &style);
    assert!(svg.contains(r#"text-anchor="middle""#));
    assert!(svg.contains(r#"x="100""#));
}

#[test]
fn multi_line_text_is_centered_vertically() {
    let style = TextStyle {
        font_size: 10.0,
        box_size: (100, 100),
        ..TextStyle::default()
    };
    let svg = text_svg("one\ntwo", &style);
    assert!(svg.contains(r#"y="44""#));
    assert!(svg.contains(r#"y="56""#));
}

#[test]
fn invalid_style_is_rejected() {
    let style = TextStyle {
        font_size: 0.0,
        ..TextStyle::default()
    };
    let db = Arc::new(usvg::fontdb::Database::new());
    let err = render_text("x", &style, db).unwrap_err();
    assert_eq!(err.kind(), crate::ErrorKind::Validation);
}

#[test]
fn render_produces_box_sized_frame() {
    let style = TextStyle {
        box_size: (64, 32),
        font_size: 12.0,
        ..TextStyle::default()
    };
    let frame = render_text("Hi", &style, font_database(None)).unwrap();
    assert_eq!((frame.width, frame.height), (64, 32));
}

#[test]
fn background_fills_the_whole_box() {
    let style = TextStyle {
        box_size: (40, 20),
        font_size: 8.0,
        color: [255, 255, 255, 255],
        background: Some([0, 0, 128, 255]),
        ..TextStyle::default()
    };
    let svg = text_svg("", &style);
    assert!(svg.contains(r#"<rect x="0" y="0" width="40" height="20" fill="rgb(0,0,128)""#));

    let frame = render_text("", &style, Arc::new(usvg::fontdb::Database::new())).unwrap();
    for (x, y) in [(0, 0), (39, 0), (0, 19), (39, 19), (20, 10)] {
        assert_eq!(frame.pixel(x, y), [0, 0, 128, 255], "({x}, {y})");
    }
}

#[test]
fn no_background_leaves_the_box_transparent() {
    let style = TextStyle {
        box_size: (16, 8),
        ..TextStyle::default()
    };
    assert!(!text_svg("x", &style).contains("<rect"));
    let frame = render_text("", &style, Arc::new(usvg::fontdb::Database::new())).unwrap();
    assert!(frame.is_fully_transparent());
}
