use crate::effects::color::ColorOp;
use crate::effects::geometry::{rotate_frame, rotated_size};
use crate::effects::spec::Interpolation;
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::frame::{FrameRGBA, PixelRect};
use crate::media::stream::{VideoRef, VideoStream};

/// Direction of a linear ramp.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Ramp {
    /// 0 to 1 over the first seconds.
    In,
    /// 1 to 0 over the last seconds.
    Out,
}

impl Ramp {
    /// Ramp factor at `t` for a ramp of `len` seconds on a stream ending at `end`.
    pub fn factor(self, t: f64, len: f64, end: f64) -> f64 {
        if len <= 0.0 {
            return 1.0;
        }
        match self {
            Self::In => (t / len).clamp(0.0, 1.0),
            Self::Out => ((end - t) / len).clamp(0.0, 1.0),
        }
    }
}

/// Alpha fade.
#[derive(Debug)]
pub struct Faded {
    inner: VideoRef,
    ramp: Ramp,
    len: f64,
    end: f64,
}

impl Faded {
    /// Fade `inner` over `len` seconds; `end` is the stream end used by fade-outs.
    pub fn new(inner: VideoRef, ramp: Ramp, len: f64, end: f64) -> Self {
        Self {
            inner,
            ramp,
            len,
            end,
        }
    }
}

impl VideoStream for Faded {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        let mut frame = self.inner.frame_at(t)?;
        frame.scale_alpha(self.ramp.factor(t, self.len, self.end) as f32);
        Ok(frame)
    }
}

/// Constant opacity multiply.
#[derive(Debug)]
pub struct OpacityScaled {
    inner: VideoRef,
    value: f32,
}

impl OpacityScaled {
    pub fn new(inner: VideoRef, value: f64) -> Self {
        Self {
            inner,
            value: value as f32,
        }
    }
}

impl VideoStream for OpacityScaled {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        let mut frame = self.inner.frame_at(t)?;
        frame.scale_alpha(self.value);
        Ok(frame)
    }
}

/// Resampled to a fixed size.
#[derive(Debug)]
pub struct Resized {
    inner: VideoRef,
    size: (u32, u32),
}

impl Resized {
    pub fn new(inner: VideoRef, width: u32, height: u32) -> MontageResult<Self> {
        if width == 0 || height == 0 {
            return Err(MontageError::validation(format!(
                "resize target must have non-zero area, got {width}x{height}"
            )));
        }
        Ok(Self {
            inner,
            size: (width, height),
        })
    }
}

impl VideoStream for Resized {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        self.inner.frame_at(t)?.resized(self.size.0, self.size.1)
    }
}

/// Counter-clockwise rotation.
#[derive(Debug)]
pub struct Rotated {
    inner: VideoRef,
    angle_deg: f64,
    interpolation: Interpolation,
    expand: bool,
    size: (u32, u32),
}

impl Rotated {
    pub fn new(inner: VideoRef, angle_deg: f64, interpolation: Interpolation, expand: bool) -> Self {
        let (w, h) = inner.size();
        Self {
            size: rotated_size(w, h, angle_deg, expand),
            inner,
            angle_deg,
            interpolation,
            expand,
        }
    }
}

impl VideoStream for Rotated {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        let frame = self.inner.frame_at(t)?;
        rotate_frame(&frame, self.angle_deg, self.interpolation, self.expand)
    }
}

/// Time window `[start, end)` of the source, re-based to start at 0.
#[derive(Debug)]
pub struct Subclipped {
    inner: VideoRef,
    start: f64,
    end: Option<f64>,
}

/// Clamp a subclip window against a known source length.
pub(crate) fn clamp_window(
    start: f64,
    end: Option<f64>,
    source: Option<f64>,
) -> MontageResult<Option<f64>> {
    let Some(len) = source else {
        return Ok(end);
    };
    if start >= len {
        return Err(MontageError::validation(format!(
            "subclip start {start} is past the source end {len}"
        )));
    }
    Ok(Some(end.map_or(len, |e| e.min(len))))
}

impl Subclipped {
    pub fn new(inner: VideoRef, start: f64, end: Option<f64>) -> MontageResult<Self> {
        let end = clamp_window(start, end, inner.duration())?;
        Ok(Self { inner, start, end })
    }
}

impl VideoStream for Subclipped {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn duration(&self) -> Option<f64> {
        self.end.map(|e| e - self.start)
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        self.inner.frame_at(self.start + t.max(0.0))
    }
}

/// Fixed pixel window.
#[derive(Debug)]
pub struct Cropped {
    inner: VideoRef,
    rect: PixelRect,
}

impl Cropped {
    /// Crop `inner` to `rect`, clamped to the frame. A zero-area result is rejected.
    pub fn new(inner: VideoRef, rect: PixelRect) -> MontageResult<Self> {
        let (w, h) = inner.size();
        let rect = PixelRect {
            x0: rect.x0.min(w),
            y0: rect.y0.min(h),
            x1: rect.x1.min(w),
            y1: rect.y1.min(h),
        };
        if rect.is_empty() {
            return Err(MontageError::validation(format!(
                "crop leaves zero area on a {w}x{h} frame"
            )));
        }
        Ok(Self { inner, rect })
    }
}

impl VideoStream for Cropped {
    fn size(&self) -> (u32, u32) {
        (self.rect.width(), self.rect.height())
    }

    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        self.inner.frame_at(t)?.crop(self.rect)
    }
}

/// Per-frame color transform.
#[derive(Debug)]
pub struct ColorMapped {
    inner: VideoRef,
    op: ColorOp,
}

impl ColorMapped {
    pub fn new(inner: VideoRef, op: ColorOp) -> Self {
        Self { inner, op }
    }
}

impl VideoStream for ColorMapped {
    fn size(&self) -> (u32, u32) {
        self.inner.size()
    }

    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        Ok(self.op.apply(&self.inner.frame_at(t)?))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/video.rs"]
mod tests;
