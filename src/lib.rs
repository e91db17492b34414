//! Montage is a declarative timeline render core.
//!
//! A timeline is a graph of [`ClipNode`]s whose starts may reference other nodes. The public
//! API is session-oriented:
//!
//! - Build a [`TimelineGraph`] in code, or load a [`Project`] from JSON
//! - Create a [`RenderSession`], which resolves every start, fits visual nodes to the canvas and
//!   materializes each node's [`EffectChain`]
//! - Render single frames, stream a range into a [`FrameSink`], or collect an [`Artifact`]
//!
//! Video layers are composited with premultiplied source-over in track order. Audio is an
//! additive stereo mix with no limiting.
#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub(crate) mod compose;
pub(crate) mod effects;
pub(crate) mod foundation;
pub(crate) mod layout;
pub(crate) mod media;
pub(crate) mod particles;
pub(crate) mod project;
pub(crate) mod render;
pub(crate) mod timeline;

pub use crate::foundation::core::{
    Affine, Canvas, Fps, FrameIndex, FrameRange, Point, Rect, Rgba8Premul, Vec2,
};
pub use crate::foundation::error::{ErrorKind, MontageError, MontageResult};

pub use crate::media::audio::{AudioBuffer, MIX_SAMPLE_RATE, read_f32le, write_f32le_file};
pub use crate::media::decode::{
    VideoFile, decode_audio, decode_image, open_video_with_audio, rasterize_svg,
};
pub use crate::media::frame::{FrameRGBA, PixelRect};
pub use crate::media::source::{FrameSequence, PcmAudio, Silence, SolidColor, StillImage, Tone};
pub use crate::media::stream::{AudioRef, AudioStream, Media, MediaRef, VideoRef, VideoStream};
pub use crate::media::text::{TextAlign, TextStyle, font_database, render_text};

pub use crate::timeline::graph::TimelineGraph;
pub use crate::timeline::node::{
    Anchor, ClipNode, ClipNodeBuilder, DEFAULT_TEXT_DURATION, Geometry, NodeKind, Placement,
    Position, RelativeTimeRef, StartSpec,
};
pub use crate::timeline::resolve::{ResolveReport, Resolver, Schedule, Span, resolve};
pub use crate::timeline::tracks::CompositeTrackSpec;

pub use crate::layout::fit::{LayoutEngine, LayoutPlan, resolve_position};

pub use crate::effects::chain::{EffectChain, EffectContext, NodeStreams, StreamSet};
pub use crate::effects::color::{ColorOp, sobel_magnitude};
pub use crate::effects::geometry::{rotate_frame, rotated_size};
pub use crate::effects::spec::{
    EffectInstance, EffectSpec, EffectTarget, Interpolation, ResizeTarget, parse_effect,
};

pub use crate::particles::assemble::{LetterFragment, ParticleAssembly, ParticleParams};
pub use crate::particles::motion::MotionCurve;
pub use crate::particles::segment::{Connectivity, Mask, label_components};

pub use crate::compose::audio::{AudioTrack, mix_tracks};
pub use crate::compose::video::{FrameCompositor, VideoLayer};

pub use crate::render::ffmpeg::{FfmpegSink, FfmpegSinkOpts, ensure_parent_dir, is_ffmpeg_on_path};
pub use crate::render::session::{
    Artifact, CancelToken, RenderConfig, RenderSession, RenderStats,
};
pub use crate::render::sink::{FrameSink, InMemorySink, SinkConfig};

pub use crate::project::load::{LoadedProject, load_project};
pub use crate::project::model::{MediaDecl, NodeDecl, Project, TracksDecl};
