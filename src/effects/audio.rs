use crate::effects::video::{Ramp, clamp_window};
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::stream::{AudioRef, AudioStream};

/// Independent left/right gains.
#[derive(Debug)]
pub struct StereoGain {
    inner: AudioRef,
    gains: [f32; 2],
}

impl StereoGain {
    pub fn new(inner: AudioRef, left: f64, right: f64) -> Self {
        Self {
            inner,
            gains: [left as f32, right as f32],
        }
    }
}

impl AudioStream for StereoGain {
    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn sample_at(&self, t: f64) -> [f32; 2] {
        let [l, r] = self.inner.sample_at(t);
        [l * self.gains[0], r * self.gains[1]]
    }
}

/// Linear gain ramp.
#[derive(Debug)]
pub struct AudioFaded {
    inner: AudioRef,
    ramp: Ramp,
    len: f64,
    end: f64,
}

impl AudioFaded {
    pub fn new(inner: AudioRef, ramp: Ramp, len: f64, end: f64) -> Self {
        Self {
            inner,
            ramp,
            len,
            end,
        }
    }
}

impl AudioStream for AudioFaded {
    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn sample_at(&self, t: f64) -> [f32; 2] {
        let g = self.ramp.factor(t, self.len, self.end) as f32;
        let [l, r] = self.inner.sample_at(t);
        [l * g, r * g]
    }
}

/// Sum of `repeats + 1` delayed copies with gains spaced linearly from 1 to `decay`.
#[derive(Debug)]
pub struct Echo {
    inner: AudioRef,
    offset: f64,
    gains: Vec<f32>,
}

impl Echo {
    pub fn new(inner: AudioRef, offset: f64, repeats: u32, decay: f64) -> Self {
        let steps = f64::from(repeats);
        let gains = (0..=repeats)
            .map(|k| (1.0 + (decay - 1.0) * f64::from(k) / steps) as f32)
            .collect();
        Self {
            inner,
            offset,
            gains,
        }
    }

    /// Gain applied to each copy, first copy first.
    pub fn gains(&self) -> &[f32] {
        &self.gains
    }
}

impl AudioStream for Echo {
    fn duration(&self) -> Option<f64> {
        let extra = self.offset * (self.gains.len() - 1) as f64;
        self.inner.duration().map(|d| d + extra)
    }

    fn sample_at(&self, t: f64) -> [f32; 2] {
        let mut acc = [0.0f32; 2];
        for (k, g) in self.gains.iter().enumerate() {
            let local = t - self.offset * k as f64;
            if local < 0.0 {
                break;
            }
            let [l, r] = self.inner.sample_at(local);
            acc[0] += l * g;
            acc[1] += r * g;
        }
        acc
    }
}

/// Time window of the source, re-based to start at 0.
#[derive(Debug)]
pub struct AudioSubclip {
    inner: AudioRef,
    start: f64,
    end: Option<f64>,
}

impl AudioSubclip {
    pub fn new(inner: AudioRef, start: f64, end: Option<f64>) -> MontageResult<Self> {
        let end = clamp_window(start, end, inner.duration())?;
        Ok(Self { inner, start, end })
    }
}

impl AudioStream for AudioSubclip {
    fn duration(&self) -> Option<f64> {
        self.end.map(|e| e - self.start)
    }

    fn sample_at(&self, t: f64) -> [f32; 2] {
        if t < 0.0 || self.duration().is_some_and(|d| t >= d) {
            return [0.0; 2];
        }
        self.inner.sample_at(self.start + t)
    }
}

/// Constant gain that brings the peak sample to 1.
#[derive(Debug)]
pub struct Normalized {
    inner: AudioRef,
    gain: f32,
}

impl Normalized {
    /// Scan `inner` over `[0, span)` at `sample_rate` to find its peak. Silence stays silent.
    pub fn new(inner: AudioRef, span: f64, sample_rate: u32) -> MontageResult<Self> {
        if !span.is_finite() || span <= 0.0 {
            return Err(MontageError::validation(
                "audio_normalize needs a bounded stream",
            ));
        }
        let frames = (span * f64::from(sample_rate)).ceil() as u64;
        let peak = (0..frames)
            .map(|i| {
                let [l, r] = inner.sample_at(i as f64 / f64::from(sample_rate));
                l.abs().max(r.abs())
            })
            .fold(0.0f32, f32::max);
        let gain = if peak > 0.0 { 1.0 / peak } else { 1.0 };
        Ok(Self { inner, gain })
    }

    /// Gain applied to every sample.
    pub fn gain(&self) -> f32 {
        self.gain
    }
}

impl AudioStream for Normalized {
    fn duration(&self) -> Option<f64> {
        self.inner.duration()
    }

    fn sample_at(&self, t: f64) -> [f32; 2] {
        let [l, r] = self.inner.sample_at(t);
        [l * self.gain, r * self.gain]
    }
}

#[cfg(test)]
#[path = "../../tests/unit/effects/audio.rs"]
mod tests;
