use std::sync::Arc;

use crate::foundation::error::MontageResult;
use crate::media::frame::FrameRGBA;
use crate::media::source::PcmAudio;
use crate::media::stream::{AudioRef, Media, VideoStream};
use crate::render::session::RenderSession;

/// A finished sub-timeline seen as a video stream.
#[derive(Clone, Debug)]
struct CompositeVideo {
    session: Arc<RenderSession>,
}

impl VideoStream for CompositeVideo {
    fn size(&self) -> (u32, u32) {
        let c = self.session.canvas();
        (c.width, c.height)
    }

    fn duration(&self) -> Option<f64> {
        Some(self.session.duration())
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        self.session.frame_at_time(t)
    }
}

impl Media {
    /// Expose a prepared session as media, so a `composite` node can embed a sub-timeline.
    ///
    /// Frames are composed on demand at the parent's local time. The sub-timeline's audio is mixed
    /// once here, at the session's sample rate.
    pub fn composite(session: RenderSession) -> MontageResult<Media> {
        let audio = if session.has_audio() {
            Some(Arc::new(PcmAudio::new(session.mix_audio())?) as AudioRef)
        } else {
            None
        };
        let video = CompositeVideo {
            session: Arc::new(session),
        };
        Ok(Media::from_streams(Some(Arc::new(video)), audio))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/nested.rs"]
mod tests;
