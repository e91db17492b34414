use std::fmt;
use std::sync::Arc;

use crate::foundation::error::MontageResult;
use crate::media::frame::FrameRGBA;

/// Pull-by-time source of video frames.
///
/// Times are local to the stream: `0.0` is its first frame. Implementations must be pure with
/// respect to `t` so that frames can be produced by any worker in any order.
pub trait VideoStream: Send + Sync + fmt::Debug {
    /// Frame size in pixels. Constant for the lifetime of the stream.
    fn size(&self) -> (u32, u32);

    /// Stream length in seconds, or `None` for unbounded sources such as stills.
    fn duration(&self) -> Option<f64>;

    /// Premultiplied frame at local time `t`.
    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA>;
}

/// Pull-by-time source of stereo audio samples.
///
/// Reads outside `[0, duration)` return silence.
pub trait AudioStream: Send + Sync + fmt::Debug {
    /// Stream length in seconds, or `None` for unbounded sources.
    fn duration(&self) -> Option<f64>;

    /// Stereo sample at local time `t`.
    fn sample_at(&self, t: f64) -> [f32; 2];
}

/// Shared handle to a video stream.
pub type VideoRef = Arc<dyn VideoStream>;
/// Shared handle to an audio stream.
pub type AudioRef = Arc<dyn AudioStream>;

/// Externally managed media item: a video stream, an audio stream, or both.
///
/// Nodes hold a [`MediaRef`] and never own the media itself, so one loaded source can back any
/// number of independently effected nodes.
#[derive(Clone, Debug, Default)]
pub struct Media {
    video: Option<VideoRef>,
    audio: Option<AudioRef>,
}

/// Shared handle to a [`Media`] item.
pub type MediaRef = Arc<Media>;

impl Media {
    /// Video-only media.
    pub fn from_video(video: impl VideoStream + 'static) -> Self {
        Self {
            video: Some(Arc::new(video)),
            audio: None,
        }
    }

    /// Audio-only media.
    pub fn from_audio(audio: impl AudioStream + 'static) -> Self {
        Self {
            video: None,
            audio: Some(Arc::new(audio)),
        }
    }

    /// Media from already shared streams.
    pub fn from_streams(video: Option<VideoRef>, audio: Option<AudioRef>) -> Self {
        Self { video, audio }
    }

    /// Attach an audio stream to this media.
    pub fn with_audio(mut self, audio: impl AudioStream + 'static) -> Self {
        self.audio = Some(Arc::new(audio));
        self
    }

    /// Wrap in a shared handle.
    pub fn shared(self) -> MediaRef {
        Arc::new(self)
    }

    /// Video stream, if any.
    pub fn video(&self) -> Option<&VideoRef> {
        self.video.as_ref()
    }

    /// Audio stream, if any.
    pub fn audio(&self) -> Option<&AudioRef> {
        self.audio.as_ref()
    }

    /// Native frame size of the video stream.
    pub fn native_size(&self) -> Option<(u32, u32)> {
        self.video.as_ref().map(|v| v.size())
    }

    /// Duration of the video stream, falling back to the audio stream.
    pub fn intrinsic_duration(&self) -> Option<f64> {
        let v = self.video.as_ref().and_then(|v| v.duration());
        v.or_else(|| self.audio.as_ref().and_then(|a| a.duration()))
    }
}
