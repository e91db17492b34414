use std::path::Path;

use crate::foundation::error::{MontageError, MontageResult};

/// Internal audio mixing sample rate used across decode, mix and export.
pub const MIX_SAMPLE_RATE: u32 = 48_000;

#[derive(Clone, Debug, PartialEq)]
/// Interleaved floating-point PCM.
pub struct AudioBuffer {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Interleaved `f32` PCM samples.
    pub interleaved_f32: Vec<f32>,
}

impl AudioBuffer {
    /// Zero-filled buffer holding `frames` sample frames.
    pub fn silent(sample_rate: u32, channels: u16, frames: usize) -> Self {
        Self {
            sample_rate,
            channels,
            interleaved_f32: vec![0.0; frames * usize::from(channels)],
        }
    }

    /// Number of sample frames (one sample per channel).
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.interleaved_f32.len() / usize::from(self.channels)
    }

    /// Length in seconds.
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / f64::from(self.sample_rate)
    }

    /// Stereo view of sample frame `i`. Mono duplicates its channel; out of range is silence.
    pub fn stereo_frame(&self, i: usize) -> [f32; 2] {
        let ch = usize::from(self.channels);
        if ch == 0 || i >= self.frames() {
            return [0.0, 0.0];
        }
        let base = i * ch;
        let l = self.interleaved_f32[base];
        let r = if ch >= 2 {
            self.interleaved_f32[base + 1]
        } else {
            l
        };
        [l, r]
    }

    /// Largest absolute sample value.
    pub fn peak(&self) -> f32 {
        self.interleaved_f32
            .iter()
            .fold(0.0f32, |acc, s| acc.max(s.abs()))
    }

    /// `true` when every sample is exactly zero.
    pub fn is_silent(&self) -> bool {
        self.interleaved_f32.iter().all(|s| *s == 0.0)
    }
}

/// Write interleaved PCM as raw little-endian `f32` samples.
pub fn write_f32le_file(buffer: &AudioBuffer, out_path: &Path) -> MontageResult<()> {
    use anyhow::Context as _;

    if buffer.channels == 0 {
        return Err(MontageError::validation(
            "audio buffer must have at least one channel",
        ));
    }
    let mut bytes = Vec::with_capacity(buffer.interleaved_f32.len() * 4);
    for s in &buffer.interleaved_f32 {
        bytes.extend_from_slice(&s.to_le_bytes());
    }
    std::fs::write(out_path, bytes)
        .with_context(|| format!("write f32le audio to '{}'", out_path.display()))?;
    Ok(())
}

/// Parse raw little-endian `f32` samples with `channels` interleaved channels.
pub fn read_f32le(bytes: &[u8], sample_rate: u32, channels: u16) -> MontageResult<AudioBuffer> {
    let ch = usize::from(channels);
    if ch == 0 || sample_rate == 0 {
        return Err(MontageError::validation(
            "audio sample rate and channel count must be non-zero",
        ));
    }
    if !bytes.len().is_multiple_of(4 * ch) {
        return Err(MontageError::validation(format!(
            "{} bytes of f32le audio do not divide into {ch}-channel frames",
            bytes.len()
        )));
    }
    Ok(AudioBuffer {
        sample_rate,
        channels,
        interleaved_f32: bytes
            .chunks_exact(4)
            .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
            .collect(),
    })
}

#[cfg(test)]
#[path = "../../tests/unit/media/audio.rs"]
mod tests;
