use crate::compose::blend::blit_over;
use crate::foundation::core::{Canvas, Rgba8Premul};
use crate::foundation::error::MontageResult;
use crate::layout::fit::resolve_position;
use crate::media::frame::FrameRGBA;
use crate::media::stream::VideoRef;
use crate::timeline::node::Position;
use crate::timeline::resolve::Span;

/// One fully materialized entry of the video layer stack.
#[derive(Clone, Debug)]
pub struct VideoLayer {
    /// Owning node id.
    pub node: String,
    /// Absolute timeline span.
    pub span: Span,
    /// Laid-out and effected stream; time 0 is the span start.
    pub stream: VideoRef,
    /// Declared or policy placement.
    pub position: Position,
    /// Layer opacity.
    pub opacity: f32,
}

/// Layered frame composition over a fixed canvas.
#[derive(Clone, Debug)]
pub struct FrameCompositor {
    canvas: Canvas,
    background: Rgba8Premul,
    layers: Vec<VideoLayer>,
}

impl FrameCompositor {
    /// Compositor over `layers`, ordered bottom to top.
    pub fn new(canvas: Canvas, background: Rgba8Premul, layers: Vec<VideoLayer>) -> Self {
        Self {
            canvas,
            background,
            layers,
        }
    }

    /// Render canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Layer stack, bottom first.
    pub fn layers(&self) -> &[VideoLayer] {
        &self.layers
    }

    /// Compose the frame at timeline time `t`.
    ///
    /// A layer contributes when `start <= t < end`. Later layers draw over earlier ones.
    pub fn compose_frame(&self, t: f64) -> MontageResult<FrameRGBA> {
        let mut out = FrameRGBA::filled(self.canvas.width, self.canvas.height, self.background)?;
        for layer in self.layers.iter().filter(|l| l.span.contains(t)) {
            if layer.opacity <= 0.0 {
                continue;
            }
            let frame = layer
                .stream
                .frame_at(t - layer.span.start)
                .map_err(|e| e.at_node(&layer.node))?;
            let offset = resolve_position(layer.position, self.canvas, (frame.width, frame.height));
            blit_over(
                &mut out,
                &frame,
                offset.x.round() as i64,
                offset.y.round() as i64,
                layer.opacity,
            );
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/compose/video.rs"]
mod tests;
