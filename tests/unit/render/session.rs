use super::*;
use crate::ErrorKind;
use crate::effects::spec::EffectSpec;
use crate::media::source::{SolidColor, Tone};
use crate::media::stream::{Media, MediaRef, VideoStream};
use crate::particles::assemble::ParticleParams;
use crate::timeline::node::{NodeKind, StartSpec};

const RED: [u8; 4] = [255, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 255, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

fn solid(w: u32, h: u32, rgba: [u8; 4]) -> MediaRef {
    Media::from_video(SolidColor::new(w, h, rgba).unwrap()).shared()
}

fn config() -> RenderConfig {
    RenderConfig {
        fps: Fps::new(10, 1).unwrap(),
        canvas: Some(Canvas::new(16, 8).unwrap()),
        sample_rate: 100,
        ..RenderConfig::default()
    }
}

/// Red for `[0, 1)`, then blue for `[1, 2)`.
fn two_shots() -> TimelineGraph {
    let mut g = TimelineGraph::new();
    g.insert(
        ClipNode::builder("red", NodeKind::Video, solid(16, 8, RED))
            .duration(1.0)
            .build()
            .unwrap(),
    )
    .unwrap();
    g.insert(
        ClipNode::builder("blue", NodeKind::Video, solid(16, 8, BLUE))
            .start(StartSpec::after_end("red", 0.0))
            .duration(1.0)
            .build()
            .unwrap(),
    )
    .unwrap();
    g
}

fn session(g: &TimelineGraph, cfg: RenderConfig) -> RenderSession {
    RenderSession::new(g, &CompositeTrackSpec::from_graph(g), cfg).unwrap()
}

/// Cancels its token after `after` frames.
struct CancellingSink {
    inner: InMemorySink,
    token: CancelToken,
    after: usize,
}

impl FrameSink for CancellingSink {
    fn begin(&mut self, cfg: SinkConfig) -> MontageResult<()> {
        self.inner.begin(cfg)
    }

    fn push_frame(&mut self, idx: FrameIndex, frame: &FrameRGBA) -> MontageResult<()> {
        self.inner.push_frame(idx, frame)?;
        if self.inner.frames.len() >= self.after {
            self.token.cancel();
        }
        Ok(())
    }

    fn end(&mut self) -> MontageResult<()> {
        self.inner.end()
    }
}

#[test]
fn frames_sample_the_timeline_at_f_over_fps() {
    let s = session(&two_shots(), config());
    assert_eq!(s.duration(), 2.0);
    assert_eq!(s.frame_count(), 20);
    assert_eq!(s.render_frame(FrameIndex(9)).unwrap().pixel(0, 0), RED);
    assert_eq!(s.render_frame(FrameIndex(10)).unwrap().pixel(0, 0), BLUE);

    let err = s.render_frame(FrameIndex(20)).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn canvas_falls_back_to_the_primary_video() {
    let mut g = TimelineGraph::new();
    g.insert(
        ClipNode::builder("clip", NodeKind::Video, solid(32, 18, RED))
            .duration(1.0)
            .build()
            .unwrap(),
    )
    .unwrap();
    let cfg = RenderConfig {
        canvas: None,
        ..config()
    };
    assert_eq!(session(&g, cfg).canvas(), Canvas::new(32, 18).unwrap());
}

#[test]
fn track_canvas_is_used_before_the_primary_video() {
    let g = two_shots();
    let mut tracks = CompositeTrackSpec::from_graph(&g);
    tracks.canvas = Some(Canvas::new(4, 2).unwrap());
    let cfg = RenderConfig {
        canvas: None,
        ..config()
    };
    let s = RenderSession::new(&g, &tracks, cfg).unwrap();
    assert_eq!(s.canvas(), Canvas::new(4, 2).unwrap());
}

#[test]
fn missing_canvas_without_video_is_a_configuration_error() {
    let mut g = TimelineGraph::new();
    let music = Media::from_audio(Tone::new(440.0, 0.2, 1.0).unwrap()).shared();
    g.insert(
        ClipNode::builder("music", NodeKind::Audio, music)
            .build()
            .unwrap(),
    )
    .unwrap();
    let cfg = RenderConfig {
        canvas: None,
        ..config()
    };
    let err = RenderSession::new(&g, &CompositeTrackSpec::from_graph(&g), cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
}

#[test]
fn portrait_source_is_fitted_to_height_and_centered() {
    let mut g = TimelineGraph::new();
    g.insert(
        ClipNode::builder("tall", NodeKind::Video, solid(6, 8, RED))
            .duration(1.0)
            .build()
            .unwrap(),
    )
    .unwrap();
    let f = session(&g, config()).render_frame(FrameIndex(0)).unwrap();
    assert_eq!(f.pixel(4, 4), BLACK);
    assert_eq!(f.pixel(5, 4), RED);
    assert_eq!(f.pixel(10, 4), RED);
    assert_eq!(f.pixel(11, 4), BLACK);
}

#[test]
fn sequential_range_is_delivered_in_order() {
    let s = session(&two_shots(), config());
    let mut sink = InMemorySink::new();
    let range = FrameRange::new(FrameIndex(5), FrameIndex(15)).unwrap();
    let stats = s.render_range(range, &mut sink, &CancelToken::new()).unwrap();

    assert_eq!(
        stats,
        RenderStats {
            frames_requested: 10,
            frames_rendered: 10,
            frames_cancelled: 0,
        }
    );
    assert!(sink.is_ended());
    let idx: Vec<u64> = sink.frames.iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, (5..15).collect::<Vec<_>>());
    let cfg = sink.config().unwrap();
    assert_eq!((cfg.width, cfg.height), (16, 8));
    assert!(cfg.audio.is_none());
}

#[test]
fn parallel_chunks_match_sequential_output() {
    let g = two_shots();
    let range = FrameRange::new(FrameIndex(0), FrameIndex(20)).unwrap();

    let mut seq = InMemorySink::new();
    session(&g, config())
        .render_range(range, &mut seq, &CancelToken::new())
        .unwrap();

    let par_cfg = RenderConfig {
        parallel: true,
        chunk_size: 3,
        threads: Some(2),
        ..config()
    };
    let mut par = InMemorySink::new();
    session(&g, par_cfg)
        .render_range(range, &mut par, &CancelToken::new())
        .unwrap();

    assert_eq!(seq.frames, par.frames);
}

#[test]
fn zero_threads_is_rejected() {
    let g = two_shots();
    let cfg = RenderConfig {
        parallel: true,
        threads: Some(0),
        ..config()
    };
    let err = RenderSession::new(&g, &CompositeTrackSpec::from_graph(&g), cfg).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(build_thread_pool(Some(0)).is_err());
}

#[test]
fn cancelled_before_start_delivers_nothing() {
    for parallel in [false, true] {
        let s = session(
            &two_shots(),
            RenderConfig {
                parallel,
                ..config()
            },
        );
        let token = CancelToken::new();
        token.cancel();
        let mut sink = InMemorySink::new();
        let range = FrameRange::new(FrameIndex(4), FrameIndex(8)).unwrap();
        let err = s.render_range(range, &mut sink, &token).unwrap_err();

        assert!(matches!(err, MontageError::Cancelled { frame: 4 }));
        assert!(sink.frames.is_empty());
        assert!(sink.is_ended());
    }
}

#[test]
fn cancellation_keeps_the_ordered_prefix() {
    let s = session(&two_shots(), config());
    let token = CancelToken::new();
    let mut sink = CancellingSink {
        inner: InMemorySink::new(),
        token: token.clone(),
        after: 3,
    };
    let range = FrameRange::new(FrameIndex(0), FrameIndex(20)).unwrap();
    let err = s.render_range(range, &mut sink, &token).unwrap_err();

    assert!(matches!(err, MontageError::Cancelled { frame: 3 }));
    assert!(sink.inner.is_ended());
    let idx: Vec<u64> = sink.inner.frames.iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, [0, 1, 2]);
    assert_eq!(
        RenderStats::cancelled_at(range, 3),
        RenderStats {
            frames_requested: 20,
            frames_rendered: 3,
            frames_cancelled: 17,
        }
    );
}

#[test]
fn parallel_cancellation_stops_at_a_chunk_boundary_or_earlier() {
    let cfg = RenderConfig {
        parallel: true,
        chunk_size: 4,
        threads: Some(2),
        ..config()
    };
    let s = session(&two_shots(), cfg);
    let token = CancelToken::new();
    let mut sink = CancellingSink {
        inner: InMemorySink::new(),
        token: token.clone(),
        after: 2,
    };
    let range = FrameRange::new(FrameIndex(0), FrameIndex(20)).unwrap();
    let err = s.render_range(range, &mut sink, &token).unwrap_err();

    // The first chunk was already rendered when the sink cancelled.
    assert!(matches!(err, MontageError::Cancelled { frame: 4 }));
    let idx: Vec<u64> = sink.inner.frames.iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, [0, 1, 2, 3]);
}

#[test]
fn range_past_the_artifact_is_rejected() {
    let s = session(&two_shots(), config());
    let range = FrameRange::new(FrameIndex(0), FrameIndex(21)).unwrap();
    let err = s
        .render_range(range, &mut InMemorySink::new(), &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

#[test]
fn artifact_spans_the_latest_node_end_including_audio() {
    let mut g = two_shots();
    let music = Media::from_audio(Tone::new(5.0, 0.5, 3.0).unwrap()).shared();
    g.insert(
        ClipNode::builder("music", NodeKind::Audio, music)
            .build()
            .unwrap(),
    )
    .unwrap();

    let s = session(&g, config());
    assert!(s.has_audio());
    let artifact = s.render_artifact().unwrap();
    assert_eq!(artifact.duration, 3.0);
    assert_eq!(artifact.frame_count, 30);
    assert_eq!(artifact.frames.len(), 30);
    assert_eq!(artifact.audio.sample_rate, 100);
    assert_eq!(artifact.audio.frames(), 300);
    assert!(!artifact.audio.is_silent());
    // Past the video nodes only the background remains.
    assert_eq!(artifact.frames[25].pixel(0, 0), BLACK);
}

#[test]
fn effect_failures_name_the_node() {
    let mut g = TimelineGraph::new();
    g.insert(
        ClipNode::builder("blank", NodeKind::Text, solid(16, 8, [0, 0, 0, 0]))
            .effect(EffectSpec::Particles(ParticleParams::default()))
            .build()
            .unwrap(),
    )
    .unwrap();
    let err = RenderSession::new(&g, &CompositeTrackSpec::from_graph(&g), config()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    assert_eq!(err.node_id(), Some("blank"));
}

#[test]
fn incremental_resolver_sees_edits() {
    let mut g = two_shots();
    let tracks = CompositeTrackSpec::from_graph(&g);
    let mut resolver = Resolver::new();
    let s = RenderSession::with_resolver(&mut resolver, &g, &tracks, config()).unwrap();
    assert_eq!(s.duration(), 2.0);

    g.set_duration("red", 1.5).unwrap();
    let s = RenderSession::with_resolver(&mut resolver, &g, &tracks, config()).unwrap();
    assert_eq!(s.schedule().get("blue").map(|sp| sp.start), Some(1.5));
    assert_eq!(s.duration(), 2.5);
}

#[test]
fn config_defaults_fill_missing_json_fields() {
    let cfg: RenderConfig = serde_json::from_str(r#"{"fps": {"num": 25, "den": 1}}"#).unwrap();
    assert_eq!(cfg.fps, Fps::new(25, 1).unwrap());
    assert_eq!(cfg.background, [0, 0, 0, 255]);
    assert_eq!(cfg.chunk_size, 64);
    assert_eq!(cfg.sample_rate, 48_000);
    assert!(!cfg.parallel);
    assert!(serde_json::from_str::<RenderConfig>(r#"{"speed": 2}"#).is_err());
}

/// Solid red until `fail_from`, then a decode error.
#[derive(Debug)]
struct GlitchyStream {
    fail_from: f64,
}

impl VideoStream for GlitchyStream {
    fn size(&self) -> (u32, u32) {
        (16, 8)
    }

    fn duration(&self) -> Option<f64> {
        Some(2.0)
    }

    fn frame_at(&self, t: f64) -> MontageResult<FrameRGBA> {
        if t >= self.fail_from {
            return Err(anyhow::anyhow!("corrupt packet at {t:.2}s").into());
        }
        SolidColor::new(16, 8, RED).unwrap().frame_at(t)
    }
}

fn glitchy_graph() -> TimelineGraph {
    let mut g = TimelineGraph::new();
    g.insert(
        ClipNode::builder(
            "glitch",
            NodeKind::Video,
            Media::from_video(GlitchyStream { fail_from: 0.5 }).shared(),
        )
        .build()
        .unwrap(),
    )
    .unwrap();
    g
}

#[test]
fn frame_failure_still_closes_the_sink() {
    let g = glitchy_graph();
    let range = FrameRange::new(FrameIndex(0), FrameIndex(20)).unwrap();

    let mut sink = InMemorySink::new();
    let err = session(&g, config())
        .render_range(range, &mut sink, &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::External);
    assert_eq!(err.node_id(), Some("glitch"));
    assert!(err.message().contains("corrupt packet"));
    assert!(sink.is_ended());
    let idx: Vec<u64> = sink.frames.iter().map(|(i, _)| i.0).collect();
    assert_eq!(idx, (0..5).collect::<Vec<_>>());

    let par_cfg = RenderConfig {
        parallel: true,
        chunk_size: 4,
        threads: Some(2),
        ..config()
    };
    let mut par = InMemorySink::new();
    let err = session(&g, par_cfg)
        .render_range(range, &mut par, &CancelToken::new())
        .unwrap_err();
    assert_eq!(err.node_id(), Some("glitch"));
    assert!(par.is_ended());
    assert!(par.frames.len() <= 5);
}
