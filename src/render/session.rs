use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;

use crate::compose::audio::{AudioTrack, mix_tracks};
use crate::compose::video::{FrameCompositor, VideoLayer};
use crate::effects::chain::{EffectContext, NodeStreams};
use crate::effects::video::Resized;
use crate::foundation::core::{Canvas, Fps, FrameIndex, FrameRange, Rgba8Premul};
use crate::foundation::error::{MontageError, MontageResult};
use crate::layout::fit::LayoutEngine;
use crate::media::audio::{AudioBuffer, MIX_SAMPLE_RATE};
use crate::media::frame::FrameRGBA;
use crate::media::stream::VideoRef;
use crate::render::sink::{FrameSink, InMemorySink, SinkConfig};
use crate::timeline::graph::TimelineGraph;
use crate::timeline::node::{ClipNode, Position};
use crate::timeline::resolve::{Resolver, Schedule, Span, resolve};
use crate::timeline::tracks::CompositeTrackSpec;

const MAX_REORDER_BUFFER_BYTES: u64 = 128 * 1024 * 1024;

fn default_background() -> [u8; 4] {
    [0, 0, 0, 255]
}

fn default_chunk_size() -> usize {
    64
}

fn default_sample_rate() -> u32 {
    MIX_SAMPLE_RATE
}

/// Caller-supplied render settings.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderConfig {
    /// Output frame rate.
    #[serde(default)]
    pub fps: Fps,
    /// Output canvas. `None` defers to the track spec, then to the primary video node.
    #[serde(default)]
    pub canvas: Option<Canvas>,
    /// Straight RGBA background drawn under every layer.
    #[serde(default = "default_background")]
    pub background: [u8; 4],
    /// Render frame ranges on a worker pool.
    #[serde(default)]
    pub parallel: bool,
    /// Frames per parallel chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    /// Worker count for parallel renders. `None` uses rayon's default.
    #[serde(default)]
    pub threads: Option<usize>,
    /// Audio mix rate in Hz.
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            fps: Fps::default(),
            canvas: None,
            background: default_background(),
            parallel: false,
            chunk_size: default_chunk_size(),
            threads: None,
            sample_rate: default_sample_rate(),
        }
    }
}

impl RenderConfig {
    /// Check value domains.
    pub fn validate(&self) -> MontageResult<()> {
        Fps::new(self.fps.num, self.fps.den)?;
        if let Some(c) = self.canvas {
            Canvas::new(c.width, c.height)?;
        }
        if self.sample_rate == 0 {
            return Err(MontageError::validation("render sample_rate must be > 0"));
        }
        if self.threads == Some(0) {
            return Err(MontageError::validation(
                "render threading 'threads' must be >= 1 when set",
            ));
        }
        Ok(())
    }

    fn background_premul(&self) -> Rgba8Premul {
        let [r, g, b, a] = self.background;
        Rgba8Premul::from_straight_rgba(r, g, b, a)
    }
}

/// Cooperative cancellation flag shared between a caller and a running render.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Fresh, uncancelled token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Frames already started still complete.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// `true` once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Frame accounting for one range render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    /// Frames in the requested range.
    pub frames_requested: u64,
    /// Frames delivered to the sink.
    pub frames_rendered: u64,
    /// Frames skipped because of cancellation.
    pub frames_cancelled: u64,
}

impl RenderStats {
    /// Stats for a range that stopped before `frame`.
    pub fn cancelled_at(range: FrameRange, frame: u64) -> Self {
        let frame = frame.clamp(range.start.0, range.end.0);
        Self {
            frames_requested: range.len_frames(),
            frames_rendered: frame - range.start.0,
            frames_cancelled: range.end.0 - frame,
        }
    }
}

/// Finished in-memory render: every frame plus the mixed audio.
#[derive(Clone, Debug)]
pub struct Artifact {
    /// Output canvas.
    pub canvas: Canvas,
    /// Output frame rate.
    pub fps: Fps,
    /// Artifact length in seconds.
    pub duration: f64,
    /// Number of frames covering `duration`.
    pub frame_count: u64,
    /// Composed frames, premultiplied, in timeline order.
    pub frames: Vec<FrameRGBA>,
    /// Additive stereo mix.
    pub audio: AudioBuffer,
}

/// A node's streams after layout and effects.
struct Materialized {
    span: Span,
    streams: NodeStreams,
    position: Position,
    opacity: f64,
}

/// Resolved, laid-out and effected timeline, ready to produce frames.
///
/// Construction is the barrier between scheduling and rendering: once a session exists every node
/// has an absolute span and a materialized stream, and frames can be produced in any order.
#[derive(Debug)]
pub struct RenderSession {
    config: RenderConfig,
    canvas: Canvas,
    schedule: Schedule,
    compositor: FrameCompositor,
    audio_tracks: Vec<AudioTrack>,
    duration: f64,
    frame_count: u64,
}

impl RenderSession {
    /// Resolve `graph` from scratch and prepare it for rendering.
    #[tracing::instrument(skip_all, fields(nodes = graph.len()))]
    pub fn new(
        graph: &TimelineGraph,
        tracks: &CompositeTrackSpec,
        config: RenderConfig,
    ) -> MontageResult<Self> {
        let schedule = resolve(graph)?;
        Self::from_schedule(graph, tracks, schedule, config)
    }

    /// Like [`RenderSession::new`], reusing an incremental resolver across edits.
    #[tracing::instrument(skip_all, fields(nodes = graph.len()))]
    pub fn with_resolver(
        resolver: &mut Resolver,
        graph: &TimelineGraph,
        tracks: &CompositeTrackSpec,
        config: RenderConfig,
    ) -> MontageResult<Self> {
        let report = resolver.resolve(graph)?;
        tracing::debug!(recomputed = ?report.recomputed, "schedule refreshed before render");
        Self::from_schedule(graph, tracks, resolver.schedule().clone(), config)
    }

    fn from_schedule(
        graph: &TimelineGraph,
        tracks: &CompositeTrackSpec,
        schedule: Schedule,
        config: RenderConfig,
    ) -> MontageResult<Self> {
        config.validate()?;
        tracks.validate(graph)?;

        let canvas = select_canvas(graph, tracks, &config)?;
        tracing::debug!(
            width = canvas.width,
            height = canvas.height,
            "render canvas selected"
        );

        let layout = LayoutEngine::new(canvas);
        let mut cache: HashMap<String, Materialized> = HashMap::new();

        let mut layers = Vec::with_capacity(tracks.video.len());
        for id in &tracks.video {
            let m = materialized(&mut cache, graph, &schedule, &layout, &config, id)?;
            let stream = m.streams.video.clone().ok_or_else(|| {
                MontageError::validation("video track node has no video stream after effects")
                    .at_node(id)
            })?;
            layers.push(VideoLayer {
                node: id.clone(),
                span: m.span,
                stream,
                position: m.position,
                opacity: m.opacity as f32,
            });
        }

        let mut audio_tracks = Vec::with_capacity(tracks.audio.len());
        for id in &tracks.audio {
            let m = materialized(&mut cache, graph, &schedule, &layout, &config, id)?;
            if let Some(stream) = m.streams.audio.clone() {
                audio_tracks.push(AudioTrack {
                    node: id.clone(),
                    span: m.span,
                    stream,
                });
            }
        }

        let duration = cache.values().fold(0.0_f64, |acc, m| acc.max(m.span.end));
        let frame_count = config.fps.secs_to_frames_ceil(duration);
        tracing::debug!(
            duration,
            frame_count,
            layers = layers.len(),
            audio_tracks = audio_tracks.len(),
            "render session ready"
        );

        Ok(Self {
            compositor: FrameCompositor::new(canvas, config.background_premul(), layers),
            config,
            canvas,
            schedule,
            audio_tracks,
            duration,
            frame_count,
        })
    }

    /// Output canvas.
    pub fn canvas(&self) -> Canvas {
        self.canvas
    }

    /// Output frame rate.
    pub fn fps(&self) -> Fps {
        self.config.fps
    }

    /// Render settings.
    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Absolute spans of every node in the graph.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Artifact length: the latest end over every listed node.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Frames needed to cover [`RenderSession::duration`].
    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Compose the frame at timeline time `t`.
    pub fn frame_at_time(&self, t: f64) -> MontageResult<FrameRGBA> {
        self.compositor.compose_frame(t)
    }

    /// Compose output frame `frame`.
    pub fn render_frame(&self, frame: FrameIndex) -> MontageResult<FrameRGBA> {
        if frame.0 >= self.frame_count {
            return Err(MontageError::validation(format!(
                "frame {} is outside the artifact (0..{})",
                frame.0, self.frame_count
            )));
        }
        self.compositor
            .compose_frame(self.config.fps.frames_to_secs(frame.0))
    }

    /// Mix every audio track into one stereo buffer covering the artifact.
    pub fn mix_audio(&self) -> AudioBuffer {
        mix_tracks(&self.audio_tracks, self.config.sample_rate, self.duration)
    }

    /// `true` when at least one node feeds the mix.
    pub fn has_audio(&self) -> bool {
        !self.audio_tracks.is_empty()
    }

    /// Stream `range` into `sink`.
    ///
    /// The sink receives frames in strictly increasing order. On cancellation the already
    /// produced prefix is delivered, the sink is ended, and `Cancelled { frame }` names the first
    /// frame that was not delivered.
    #[tracing::instrument(skip(self, sink, cancel), fields(start = range.start.0, end = range.end.0))]
    pub fn render_range(
        &self,
        range: FrameRange,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> MontageResult<RenderStats> {
        if range.end.0 > self.frame_count {
            return Err(MontageError::validation(format!(
                "frame range {}..{} exceeds the artifact (0..{})",
                range.start.0, range.end.0, self.frame_count
            )));
        }

        let audio = self.has_audio().then(|| Arc::new(self.mix_audio()));
        sink.begin(SinkConfig {
            width: self.canvas.width,
            height: self.canvas.height,
            fps: self.config.fps,
            background: self.config.background,
            audio,
        })?;

        let rendered = if self.config.parallel {
            self.render_parallel(range, sink, cancel)
        } else {
            self.render_sequential(range, sink, cancel)
        };
        let stopped = match rendered {
            Ok(stopped) => stopped,
            Err(err) => {
                // The sink still gets closed; the frame error is the one reported.
                if let Err(end_err) = sink.end() {
                    tracing::warn!(error = %end_err, "closing sink after a failed frame");
                }
                return Err(err);
            }
        };
        sink.end()?;

        match stopped {
            None => Ok(RenderStats {
                frames_requested: range.len_frames(),
                frames_rendered: range.len_frames(),
                frames_cancelled: 0,
            }),
            Some(frame) => {
                let stats = RenderStats::cancelled_at(range, frame);
                tracing::info!(
                    frame,
                    rendered = stats.frames_rendered,
                    cancelled = stats.frames_cancelled,
                    "render cancelled"
                );
                Err(MontageError::Cancelled { frame })
            }
        }
    }

    /// Render every frame and the mix in memory.
    pub fn render_artifact(&self) -> MontageResult<Artifact> {
        let range = FrameRange::new(FrameIndex(0), FrameIndex(self.frame_count))?;
        let mut sink = InMemorySink::new();
        self.render_range(range, &mut sink, &CancelToken::new())?;
        let audio = sink
            .config()
            .and_then(|c| c.audio.clone())
            .map(Arc::unwrap_or_clone)
            .unwrap_or_else(|| self.mix_audio());

        Ok(Artifact {
            canvas: self.canvas,
            fps: self.config.fps,
            duration: self.duration,
            frame_count: self.frame_count,
            frames: sink.frames.into_iter().map(|(_, f)| f).collect(),
            audio,
        })
    }

    fn render_sequential(
        &self,
        range: FrameRange,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> MontageResult<Option<u64>> {
        for f in range.start.0..range.end.0 {
            if cancel.is_cancelled() {
                return Ok(Some(f));
            }
            let frame = self.render_frame(FrameIndex(f))?;
            sink.push_frame(FrameIndex(f), &frame)?;
        }
        Ok(None)
    }

    fn render_parallel(
        &self,
        range: FrameRange,
        sink: &mut dyn FrameSink,
        cancel: &CancelToken,
    ) -> MontageResult<Option<u64>> {
        let pool = build_thread_pool(self.config.threads)?;
        let chunk = self.chunk_frames();

        let mut f0 = range.start.0;
        while f0 < range.end.0 {
            let f1 = f0.saturating_add(chunk).min(range.end.0);
            let indices: Vec<u64> = (f0..f1).collect();
            let frames: Vec<MontageResult<Option<FrameRGBA>>> = pool.install(|| {
                indices
                    .par_iter()
                    .map(|&f| {
                        if cancel.is_cancelled() {
                            return Ok(None);
                        }
                        self.render_frame(FrameIndex(f)).map(Some)
                    })
                    .collect()
            });

            // Deliver the in-order prefix; anything past the first skipped frame is dropped.
            for (f, frame) in indices.into_iter().zip(frames) {
                match frame? {
                    Some(frame) => sink.push_frame(FrameIndex(f), &frame)?,
                    None => return Ok(Some(f)),
                }
            }
            f0 = f1;
        }
        Ok(None)
    }

    fn chunk_frames(&self) -> u64 {
        let bytes_per_frame =
            (u64::from(self.canvas.width) * u64::from(self.canvas.height) * 4).max(1);
        let max_chunk_by_mem = (MAX_REORDER_BUFFER_BYTES / bytes_per_frame).max(1);
        normalized_chunk_size(self.config.chunk_size).min(max_chunk_by_mem)
    }
}

fn select_canvas(
    graph: &TimelineGraph,
    tracks: &CompositeTrackSpec,
    config: &RenderConfig,
) -> MontageResult<Canvas> {
    if let Some(c) = config.canvas.or(tracks.canvas) {
        return Ok(c);
    }
    let primary = tracks.primary_video(graph).ok_or_else(|| {
        MontageError::configuration("no canvas configured and no video node to take it from")
    })?;
    let (w, h) = primary.media().native_size().ok_or_else(|| {
        MontageError::configuration("primary video node has no video stream to size the canvas")
            .at_node(primary.id())
    })?;
    Canvas::new(w, h).map_err(|e| e.at_node(primary.id()))
}

fn materialized<'c>(
    cache: &'c mut HashMap<String, Materialized>,
    graph: &TimelineGraph,
    schedule: &Schedule,
    layout: &LayoutEngine,
    config: &RenderConfig,
    id: &str,
) -> MontageResult<&'c Materialized> {
    if !cache.contains_key(id) {
        let node = graph
            .get(id)
            .ok_or_else(|| MontageError::unresolved("track lists an unknown node").at_node(id))?;
        let span = schedule
            .get(id)
            .ok_or_else(|| MontageError::unresolved("node has no resolved span").at_node(id))?;
        let m = materialize(node, span, layout, config).map_err(|e| e.at_node(id))?;
        cache.insert(id.to_string(), m);
    }
    cache
        .get(id)
        .ok_or_else(|| MontageError::evaluation("materialized node missing from cache").at_node(id))
}

fn materialize(
    node: &ClipNode,
    span: Span,
    layout: &LayoutEngine,
    config: &RenderConfig,
) -> MontageResult<Materialized> {
    let media = node.media();
    let geometry = node.geometry();
    let mut position = geometry.position.unwrap_or_else(Position::origin);
    let mut opacity = geometry.opacity;

    let video = match media.video() {
        Some(v) if node.kind().is_visual() => {
            let plan = layout.plan(v.size(), geometry)?;
            position = plan.position;
            opacity = plan.opacity;
            let fitted: VideoRef = if plan.size == v.size() {
                Arc::clone(v)
            } else {
                Arc::new(Resized::new(Arc::clone(v), plan.size.0, plan.size.1)?)
            };
            Some(fitted)
        }
        _ => None,
    };

    let ctx = EffectContext {
        canvas: layout.canvas(),
        node_duration: span.duration(),
        sample_rate: config.sample_rate,
    };
    let streams = node.effects().apply(
        NodeStreams {
            video,
            audio: media.audio().cloned(),
        },
        &ctx,
    )?;

    Ok(Materialized {
        span,
        streams,
        position,
        opacity,
    })
}

fn build_thread_pool(threads: Option<usize>) -> MontageResult<rayon::ThreadPool> {
    if let Some(n) = threads
        && n == 0
    {
        return Err(MontageError::validation(
            "render threading 'threads' must be >= 1 when set",
        ));
    }

    let mut builder = rayon::ThreadPoolBuilder::new();
    if let Some(n) = threads {
        builder = builder.num_threads(n);
    }
    builder
        .build()
        .map_err(|e| MontageError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

fn normalized_chunk_size(chunk_size: usize) -> u64 {
    if chunk_size == 0 {
        1
    } else {
        chunk_size as u64
    }
}

#[cfg(test)]
#[path = "../../tests/unit/render/session.rs"]
mod tests;
