use std::path::Path;
use std::sync::Arc;

use crate::foundation::error::{MontageError, MontageResult};
use crate::media::frame::FrameRGBA;

/// Horizontal alignment of a text block inside its box.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextAlign {
    /// Flush left.
    #[default]
    Left,
    /// Centered.
    Center,
    /// Flush right.
    Right,
}

/// Styling for a rasterized text element.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct TextStyle {
    /// Font size in pixels.
    pub font_size: f32,
    /// Straight-alpha fill color.
    pub color: [u8; 4],
    /// Preferred font family. Falls back to sans-serif.
    pub font_family: Option<String>,
    /// Alignment of each line inside the box.
    pub align: TextAlign,
    /// Raster size. Text is vertically centered in it.
    pub box_size: (u32, u32),
    /// Straight RGBA fill behind the text, covering the whole box. `None` leaves it transparent.
    pub background: Option<[u8; 4]>,
}

impl Default for TextStyle {
    fn default() -> Self {
        Self {
            font_size: 60.0,
            color: [255, 255, 255, 255],
            font_family: None,
            align: TextAlign::Left,
            box_size: (1920, 1080),
            background: None,
        }
    }
}

impl TextStyle {
    fn validate(&self) -> MontageResult<()> {
        if !self.font_size.is_finite() || self.font_size <= 0.0 || self.font_size > 1024.0 {
            return Err(MontageError::validation(
                "text font_size must be in (0, 1024]",
            ));
        }
        if self.box_size.0 == 0 || self.box_size.1 == 0 {
            return Err(MontageError::validation("text box must have non-zero area"));
        }
        Ok(())
    }
}

/// Font database used for text rasterization: system fonts plus an optional directory.
pub fn font_database(extra_dir: Option<&Path>) -> Arc<usvg::fontdb::Database> {
    let mut db = usvg::fontdb::Database::new();
    db.load_system_fonts();
    if let Some(dir) = extra_dir {
        db.load_fonts_dir(dir);
    }
    Arc::new(db)
}

/// Rasterize `text` into a premultiplied frame of `style.box_size`.
pub fn render_text(
    text: &str,
    style: &TextStyle,
    fontdb: Arc<usvg::fontdb::Database>,
) -> MontageResult<FrameRGBA> {
    style.validate()?;
    let svg = text_svg(text, style);
    let opts = usvg::Options {
        fontdb,
        ..Default::default()
    };
    let tree = usvg::Tree::from_data(svg.as_bytes(), &opts)
        .map_err(|e| MontageError::evaluation(format!("text layout failed: {e}")))?;

    let (w, h) = style.box_size;
    let mut pixmap = resvg::tiny_skia::Pixmap::new(w, h)
        .ok_or_else(|| MontageError::evaluation("failed to allocate text pixmap"))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );
    FrameRGBA::from_premul(w, h, pixmap.data().to_vec())
}

fn text_svg(text: &str, style: &TextStyle) -> String {
    let (w, h) = style.box_size;
    let (anchor, x) = match style.align {
        TextAlign::Left => ("start", 0.0),
        TextAlign::Center => ("middle", f64::from(w) * 0.5),
        TextAlign::Right => ("end", f64::from(w)),
    };
    let family = style.font_family.as_deref().unwrap_or("sans-serif");
    let [r, g, b, a] = style.color;

    let lines: Vec<&str> = text.lines().collect();
    let line_h = f64::from(style.font_size) * 1.2;
    let first_y = f64::from(h) * 0.5 - line_h * (lines.len().saturating_sub(1) as f64) * 0.5;

    let mut spans = String::new();
    for (i, line) in lines.iter().enumerate() {
        let y = first_y + line_h * i as f64;
        spans.push_str(&format!(
            r#"<tspan x="{x}" y="{y}">{}</tspan>"#,
            escape_xml(line)
        ));
    }

    let backdrop = match style.background {
        Some([br, bg, bb, ba]) => format!(
            r#"<rect x="0" y="0" width="{w}" height="{h}" fill="rgb({br},{bg},{bb})" fill-opacity="{}"/>"#,
            f32::from(ba) / 255.0
        ),
        None => String::new(),
    };

    format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}">{backdrop}<text font-family="{}" font-size="{}" fill="rgb({r},{g},{b})" fill-opacity="{}" text-anchor="{anchor}" dominant-baseline="central" xml:space="preserve">{spans}</text></svg>"#,
        escape_xml(family),
        style.font_size,
        f32::from(a) / 255.0,
    )
}

fn escape_xml(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}

#[cfg(test)]
#[path = "../../tests/unit/media/text.rs"]
mod tests;
