use crate::foundation::core::{Canvas, Vec2};
use crate::foundation::error::{MontageError, MontageResult};
use crate::timeline::node::{Geometry, Placement, Position};

/// Normalized geometry for one visual node.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LayoutPlan {
    /// Size the source is scaled to before its effect chain runs.
    pub size: (u32, u32),
    /// Placement resolved against the final frame size at compose time.
    pub position: Position,
    /// Layer opacity.
    pub opacity: f64,
}

/// Deterministic aspect-ratio policy for visual nodes.
#[derive(Clone, Copy, Debug)]
pub struct LayoutEngine {
    canvas: Canvas,
}

impl LayoutEngine {
    /// Engine targeting `canvas`.
    pub fn new(canvas: Canvas) -> Self {
        Self { canvas }
    }

    /// Target canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Plan for a node whose source is `native` pixels.
    ///
    /// With an exactly equal aspect ratio the clip fills the canvas and stays at the origin.
    /// Otherwise wide clips (ratio > 1) match the canvas width and the rest match its height,
    /// and the clip is centered. An explicit size replaces the fitted size; an explicit
    /// position replaces the policy's placement.
    pub fn plan(&self, native: (u32, u32), geometry: &Geometry) -> MontageResult<LayoutPlan> {
        let (w, h) = native;
        if w == 0 || h == 0 {
            return Err(MontageError::validation(format!(
                "visual source has zero area ({w}x{h})"
            )));
        }

        let (mut size, implicit) = if geometry.fit {
            self.fit(native)
        } else {
            (native, Position::origin())
        };
        if let Some(explicit) = geometry.size {
            size = explicit;
        }

        Ok(LayoutPlan {
            size,
            position: geometry.position.unwrap_or(implicit),
            opacity: geometry.opacity,
        })
    }

    fn fit(&self, native: (u32, u32)) -> ((u32, u32), Position) {
        let (w, h) = (f64::from(native.0), f64::from(native.1));
        let ratio = w / h;
        // Exact comparison: only true aspect matches skip the recentering.
        if ratio == self.canvas.aspect() {
            return ((self.canvas.width, self.canvas.height), Position::origin());
        }

        let size = if ratio > 1.0 {
            let cw = self.canvas.width;
            (cw, proportional(h, f64::from(cw) / w))
        } else {
            let ch = self.canvas.height;
            (proportional(w, f64::from(ch) / h), ch)
        };
        (size, Position::centered())
    }
}

fn proportional(len: f64, scale: f64) -> u32 {
    ((len * scale).round() as u32).max(1)
}

/// Top-left pixel offset of a `content`-sized frame placed at `position` on `canvas`.
pub fn resolve_position(position: Position, canvas: Canvas, content: (u32, u32)) -> Vec2 {
    fn axis(p: Placement, canvas_len: u32, content_len: u32) -> f64 {
        let rem = f64::from(canvas_len) - f64::from(content_len);
        match p {
            Placement::Px(v) => v,
            Placement::Start => 0.0,
            Placement::Center => rem * 0.5,
            Placement::End => rem,
        }
    }

    Vec2::new(
        axis(position.x, canvas.width, content.0),
        axis(position.y, canvas.height, content.1),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/layout/fit.rs"]
mod tests;
