use crate::compose::blend::blit_over;
use crate::foundation::core::{Canvas, Point};
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::frame::{FrameRGBA, PixelRect};
use crate::media::stream::{VideoRef, VideoStream};
use crate::particles::motion::MotionCurve;
use crate::particles::segment::{Connectivity, Mask, label_components};

/// Parameters of the particle effect.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ParticleParams {
    /// Length of the assembled clip in seconds.
    pub duration: f64,
    /// Adjacency used to split the mask into fragments.
    pub connectivity: Connectivity,
    /// Trajectory shared by all fragments.
    pub curve: MotionCurve,
}

impl Default for ParticleParams {
    fn default() -> Self {
        Self {
            duration: 5.0,
            connectivity: Connectivity::Four,
            curve: MotionCurve::default(),
        }
    }
}

impl ParticleParams {
    pub(crate) fn validate(&self) -> MontageResult<()> {
        if !self.duration.is_finite() || self.duration <= 0.0 {
            return Err(MontageError::validation(format!(
                "particle duration must be finite and > 0, got {}",
                self.duration
            )));
        }
        self.curve.validate()
    }
}

/// One segmented piece of the source.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LetterFragment {
    /// Crop of the source frame, in source pixels.
    pub rect: PixelRect,
    /// Rest position of the fragment's top-left corner on the canvas.
    pub origin: Point,
}

/// Canvas-sized clip that animates the fragments of a source back into place.
#[derive(Debug)]
pub struct ParticleAssembly {
    source: VideoRef,
    canvas: Canvas,
    fragments: Vec<LetterFragment>,
    curve: MotionCurve,
    duration: f64,
}

impl ParticleAssembly {
    /// Segment the coverage of `source` at `t = 0` and build the assembly.
    ///
    /// The source is centered on the canvas; each fragment rests where its pixels sit in that
    /// centered frame. A blank mask is a configuration error.
    pub fn new(source: VideoRef, canvas: Canvas, params: ParticleParams) -> MontageResult<Self> {
        params.validate()?;
        let first = source.frame_at(0.0)?;
        let rects = label_components(&Mask::from_alpha(&first), params.connectivity);
        if rects.is_empty() {
            return Err(MontageError::configuration(
                "particle effect found no fragments: the source mask is blank",
            ));
        }

        let cx = ((f64::from(canvas.width) - f64::from(first.width)) * 0.5).round();
        let cy = ((f64::from(canvas.height) - f64::from(first.height)) * 0.5).round();
        let fragments = rects
            .into_iter()
            .map(|rect| LetterFragment {
                rect,
                origin: Point::new(cx + f64::from(rect.x0), cy + f64::from(rect.y0)),
            })
            .collect::<Vec<_>>();

        tracing::debug!(fragments = fragments.len(), "particle mask segmented");
        Ok(Self {
            source,
            canvas,
            fragments,
            curve: params.curve,
            duration: params.duration,
        })
    }

    /// Fragments in label order.
    pub fn fragments(&self) -> &[LetterFragment] {
        &self.fragments
    }

    /// Canvas position of fragment `i` at time `t`.
    pub fn fragment_position(&self, i: usize, t: f64) -> Option<Point> {
        let f = self.fragments.get(i)?;
        Some(self.curve.position(i, self.fragments.len(), f.origin, t))
    }
}

impl VideoStream for ParticleAssembly {
    fn size(&self) -> (u32, u32) {
        (self.canvas.width, self.canvas.height)
    }

    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        let mut out = FrameRGBA::transparent(self.canvas.width, self.canvas.height)?;
        let src = self.source.frame_at(t)?;
        let n = self.fragments.len();
        for (i, f) in self.fragments.iter().enumerate() {
            let piece = src.crop(f.rect)?;
            let p = self.curve.position(i, n, f.origin, t);
            blit_over(&mut out, &piece, p.x.round() as i64, p.y.round() as i64, 1.0);
        }
        Ok(out)
    }
}

#[cfg(test)]
#[path = "../../tests/unit/particles/assemble.rs"]
mod tests;
