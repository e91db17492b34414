use std::sync::Arc;

use crate::foundation::core::{Fps, FrameIndex};
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::audio::AudioBuffer;
use crate::media::frame::FrameRGBA;

/// Configuration provided to a [`FrameSink`] at the start of a range render.
#[derive(Clone, Debug)]
pub struct SinkConfig {
    /// Frame width.
    pub width: u32,
    /// Frame height.
    pub height: u32,
    /// Output frame rate.
    pub fps: Fps,
    /// Straight RGBA background, for sinks that flatten alpha.
    pub background: [u8; 4],
    /// Mixed audio for the whole artifact, when any node contributes sound.
    pub audio: Option<Arc<AudioBuffer>>,
}

/// Consumer of rendered frames.
///
/// Ordering contract: `push_frame` is called in strictly increasing `FrameIndex` order within the
/// requested range. `end` is called after the last delivered frame, including after a
/// cancellation.
pub trait FrameSink {
    /// Start of a range.
    fn begin(&mut self, cfg: SinkConfig) -> MontageResult<()>;
    /// Next frame in order.
    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MontageResult<()>;
    /// End of the delivered prefix.
    fn end(&mut self) -> MontageResult<()>;
}

/// Sink that keeps every frame in memory.
#[derive(Debug, Default)]
pub struct InMemorySink {
    cfg: Option<SinkConfig>,
    ended: bool,
    /// Frames in timeline order.
    pub frames: Vec<(FrameIndex, FrameRGBA)>,
}

impl InMemorySink {
    /// Empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configuration from the last `begin`.
    pub fn config(&self) -> Option<&SinkConfig> {
        self.cfg.as_ref()
    }

    /// `true` once `end` has been called for the current range.
    pub fn is_ended(&self) -> bool {
        self.ended
    }
}

impl FrameSink for InMemorySink {
    fn begin(&mut self, cfg: SinkConfig) -> MontageResult<()> {
        self.cfg = Some(cfg);
        self.ended = false;
        self.frames.clear();
        Ok(())
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MontageResult<()> {
        if let Some((last, _)) = self.frames.last()
            && idx.0 <= last.0
        {
            return Err(MontageError::evaluation(
                "in-memory sink received out-of-order frame index",
            ));
        }
        self.frames.push((idx, frame.clone()));
        Ok(())
    }

    fn end(&mut self) -> MontageResult<()> {
        self.ended = true;
        Ok(())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/sink.rs"]
mod tests;
