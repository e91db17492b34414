use std::sync::Arc;

use crate::foundation::core::{Fps, Rgba8Premul};
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::audio::AudioBuffer;
use crate::media::frame::FrameRGBA;
use crate::media::stream::{AudioStream, VideoStream};

/// Unbounded still image.
#[derive(Clone, Debug)]
pub struct StillImage {
    frame: Arc<FrameRGBA>,
}

impl StillImage {
    /// Still that always returns `frame`.
    pub fn new(frame: FrameRGBA) -> Self {
        Self {
            frame: Arc::new(frame),
        }
    }
}

impl VideoStream for StillImage {
    fn size(&self) -> (u32, u32) {
        (self.frame.width, self.frame.height)
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn frame_at(&self, _t: f64) -> MontageResult<FrameRGBA> {
        Ok(self.frame.as_ref().clone())
    }
}

/// Unbounded solid-color rectangle.
#[derive(Clone, Debug)]
pub struct SolidColor {
    width: u32,
    height: u32,
    color: Rgba8Premul,
}

impl SolidColor {
    /// Solid of `width x height` filled with a straight-alpha color.
    pub fn new(width: u32, height: u32, rgba: [u8; 4]) -> MontageResult<Self> {
        if width == 0 || height == 0 {
            return Err(MontageError::validation(format!(
                "solid color must have non-zero area, got {width}x{height}"
            )));
        }
        Ok(Self {
            width,
            height,
            color: Rgba8Premul::from_straight_rgba(rgba[0], rgba[1], rgba[2], rgba[3]),
        })
    }
}

impl VideoStream for SolidColor {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn frame_at(&self, _t: f64) -> MontageResult<FrameRGBA> {
        FrameRGBA::filled(self.width, self.height, self.color)
    }
}

/// In-memory frame sequence played at a fixed rate.
#[derive(Clone, Debug)]
pub struct FrameSequence {
    fps: Fps,
    frames: Vec<Arc<FrameRGBA>>,
    size: (u32, u32),
}

impl FrameSequence {
    /// Sequence of equally sized frames.
    pub fn new(fps: Fps, frames: Vec<FrameRGBA>) -> MontageResult<Self> {
        let first = frames
            .first()
            .ok_or_else(|| MontageError::validation("frame sequence must not be empty"))?;
        let size = (first.width, first.height);
        if frames.iter().any(|f| (f.width, f.height) != size) {
            return Err(MontageError::validation(
                "frame sequence frames must share one size",
            ));
        }
        Ok(Self {
            fps,
            frames: frames.into_iter().map(Arc::new).collect(),
            size,
        })
    }
}

impl VideoStream for FrameSequence {
    fn size(&self) -> (u32, u32) {
        self.size
    }

    fn duration(&self) -> Option<f64> {
        Some(self.fps.frames_to_secs(self.frames.len() as u64))
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        let idx = (t.max(0.0) * self.fps.as_f64() + 1e-9).floor() as usize;
        let idx = idx.min(self.frames.len().saturating_sub(1));
        Ok(self.frames[idx].as_ref().clone())
    }
}

/// Decoded PCM played back with linear interpolation.
#[derive(Clone, Debug)]
pub struct PcmAudio {
    pcm: Arc<AudioBuffer>,
}

impl PcmAudio {
    /// Stream over `pcm`.
    pub fn new(pcm: AudioBuffer) -> MontageResult<Self> {
        if pcm.sample_rate == 0 || pcm.channels == 0 {
            return Err(MontageError::validation(
                "pcm audio must have non-zero sample rate and channels",
            ));
        }
        Ok(Self { pcm: Arc::new(pcm) })
    }

    /// Samples backing this stream.
    pub fn buffer(&self) -> &AudioBuffer {
        &self.pcm
    }
}

impl AudioStream for PcmAudio {
    fn duration(&self) -> Option<f64> {
        Some(self.pcm.duration_secs())
    }

    fn sample_at(&self, t: f64) -> [f32; 2] {
        if t < 0.0 {
            return [0.0, 0.0];
        }
        let pos = snap_to_sample(t * f64::from(self.pcm.sample_rate));
        let i0 = pos.floor() as usize;
        if i0 >= self.pcm.frames() {
            return [0.0, 0.0];
        }
        let frac = (pos - pos.floor()) as f32;
        let a = self.pcm.stereo_frame(i0);
        if frac == 0.0 {
            return a;
        }
        let b = if i0 + 1 < self.pcm.frames() {
            self.pcm.stereo_frame(i0 + 1)
        } else {
            a
        };
        [
            a[0] + (b[0] - a[0]) * frac,
            a[1] + (b[1] - a[1]) * frac,
        ]
    }
}

/// Round sample positions that sit within float noise of an integer, so a stream read at its
/// own rate returns the stored samples bit for bit.
fn snap_to_sample(pos: f64) -> f64 {
    let nearest = pos.round();
    if (pos - nearest).abs() <= SAMPLE_SNAP_EPS {
        nearest
    } else {
        pos
    }
}

const SAMPLE_SNAP_EPS: f64 = 1e-6;

/// Sine tone on both channels.
#[derive(Clone, Copy, Debug)]
pub struct Tone {
    frequency_hz: f64,
    amplitude: f32,
    duration: f64,
}

impl Tone {
    /// Tone of `duration` seconds.
    pub fn new(frequency_hz: f64, amplitude: f32, duration: f64) -> MontageResult<Self> {
        if !frequency_hz.is_finite() || frequency_hz <= 0.0 {
            return Err(MontageError::validation("tone frequency must be > 0"));
        }
        if !amplitude.is_finite() {
            return Err(MontageError::validation("tone amplitude must be finite"));
        }
        if !duration.is_finite() || duration <= 0.0 {
            return Err(MontageError::validation("tone duration must be > 0"));
        }
        Ok(Self {
            frequency_hz,
            amplitude,
            duration,
        })
    }
}

impl AudioStream for Tone {
    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }

    fn sample_at(&self, t: f64) -> [f32; 2] {
        if t < 0.0 || t >= self.duration {
            return [0.0, 0.0];
        }
        let v = self.amplitude * (std::f64::consts::TAU * self.frequency_hz * t).sin() as f32;
        [v, v]
    }
}

/// Silence of a fixed length.
#[derive(Clone, Copy, Debug)]
pub struct Silence {
    duration: f64,
}

impl Silence {
    /// Silence of `duration` seconds.
    pub fn new(duration: f64) -> MontageResult<Self> {
        if !duration.is_finite() || duration <= 0.0 {
            return Err(MontageError::validation("silence duration must be > 0"));
        }
        Ok(Self { duration })
    }
}

impl AudioStream for Silence {
    fn duration(&self) -> Option<f64> {
        Some(self.duration)
    }

    fn sample_at(&self, _t: f64) -> [f32; 2] {
        [0.0, 0.0]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/media/source.rs"]
mod tests;
