use std::collections::BTreeMap;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;

use crate::effects::spec::parse_effect;
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::decode::{decode_audio, decode_image, open_video_with_audio, rasterize_svg};
use crate::media::source::{Silence, SolidColor, StillImage, Tone};
use crate::media::stream::{Media, MediaRef};
use crate::media::text::{TextStyle, font_database, render_text};
use crate::project::model::{MediaDecl, NodeDecl, Project};
use crate::render::session::{RenderConfig, RenderSession};
use crate::timeline::graph::TimelineGraph;
use crate::timeline::node::ClipNode;
use crate::timeline::tracks::CompositeTrackSpec;

const MAX_COMPOSITE_DEPTH: usize = 8;

/// A project turned into runtime values.
#[derive(Debug)]
pub struct LoadedProject {
    /// Node graph.
    pub graph: TimelineGraph,
    /// Layer stack and mix set.
    pub tracks: CompositeTrackSpec,
    /// Render settings.
    pub render: RenderConfig,
}

impl LoadedProject {
    /// Prepare a render session over the loaded graph.
    pub fn session(&self) -> MontageResult<RenderSession> {
        RenderSession::new(&self.graph, &self.tracks, self.render.clone())
    }
}

impl Project {
    /// Parse a project from a JSON reader.
    pub fn from_reader<R: std::io::Read>(r: R) -> MontageResult<Self> {
        serde_json::from_reader(r)
            .map_err(|e| MontageError::serde(format!("parse project JSON: {e}")))
    }

    /// Parse a project from a JSON file on disk.
    pub fn from_path(path: impl AsRef<Path>) -> MontageResult<Self> {
        let path = path.as_ref();
        let f = File::open(path)
            .with_context(|| format!("open project JSON '{}'", path.display()))?;
        Self::from_reader(BufReader::new(f))
    }

    /// Load media and build the graph. Relative media paths resolve against `root`.
    pub fn load(&self, root: &Path) -> MontageResult<LoadedProject> {
        self.load_at_depth(root, 0)
    }

    fn load_at_depth(&self, root: &Path, depth: usize) -> MontageResult<LoadedProject> {
        self.render.validate()?;
        let ctx = LoadContext {
            root,
            render: &self.render,
            depth,
        };

        let mut media: BTreeMap<&str, (MediaRef, &MediaDecl)> = BTreeMap::new();
        for (key, decl) in &self.media {
            let m = ctx
                .load_media(decl)
                .map_err(|e| e.context(format_args!("media '{key}'")))?;
            media.insert(key.as_str(), (m, decl));
        }

        let mut graph = TimelineGraph::new();
        for decl in &self.nodes {
            let (m, media_decl) = media.get(decl.media.as_str()).ok_or_else(|| {
                MontageError::unresolved(format!("node references unknown media '{}'", decl.media))
                    .at_node(&decl.id)
            })?;
            graph.insert(build_node(decl, Arc::clone(m), media_decl)?)?;
        }

        let mut tracks = CompositeTrackSpec::from_graph(&graph);
        if let Some(t) = &self.tracks {
            if let Some(video) = &t.video {
                tracks.video = video.clone();
            }
            if let Some(audio) = &t.audio {
                tracks.audio = audio.clone();
            }
            tracks.canvas = t.canvas;
        }
        tracks.validate(&graph)?;

        tracing::debug!(
            media = self.media.len(),
            nodes = graph.len(),
            "project loaded"
        );
        Ok(LoadedProject {
            graph,
            tracks,
            render: self.render.clone(),
        })
    }
}

/// Read a project file and load it relative to its own directory.
pub fn load_project(path: impl AsRef<Path>) -> MontageResult<LoadedProject> {
    let path = path.as_ref();
    let project = Project::from_path(path)?;
    project.load(path.parent().unwrap_or_else(|| Path::new(".")))
}

fn build_node(
    decl: &NodeDecl,
    media: MediaRef,
    media_decl: &MediaDecl,
) -> MontageResult<ClipNode> {
    let effects = decl
        .effects
        .iter()
        .enumerate()
        .map(|(i, inst)| {
            parse_effect(inst).map_err(|e| {
                e.context(format_args!("effect #{i} ('{}')", inst.kind))
                    .at_node(&decl.id)
            })
        })
        .collect::<MontageResult<Vec<_>>>()?;

    let kind = decl.kind.unwrap_or_else(|| media_decl.default_kind());
    let mut builder = ClipNode::builder(decl.id.clone(), kind, media)
        .start(decl.start.clone())
        .geometry(decl.geometry.clone())
        .layer(decl.layer)
        .effects(effects);
    if let Some(d) = decl.duration {
        builder = builder.duration(d);
    }
    builder.build()
}

struct LoadContext<'a> {
    root: &'a Path,
    render: &'a RenderConfig,
    depth: usize,
}

impl LoadContext<'_> {
    fn resolve(&self, rel: &str) -> MontageResult<PathBuf> {
        Ok(self.root.join(normalize_rel_path(rel)?))
    }

    fn read(&self, rel: &str) -> MontageResult<(PathBuf, Vec<u8>)> {
        let path = self.resolve(rel)?;
        let bytes =
            std::fs::read(&path).with_context(|| format!("read media '{}'", path.display()))?;
        Ok((path, bytes))
    }

    fn load_media(&self, decl: &MediaDecl) -> MontageResult<MediaRef> {
        let media = match decl {
            MediaDecl::Image { path } => {
                let (_, bytes) = self.read(path)?;
                Media::from_video(StillImage::new(decode_image(&bytes)?))
            }
            MediaDecl::Svg { path } => {
                let (full, bytes) = self.read(path)?;
                let frame = rasterize_svg(&bytes, full.parent())?;
                Media::from_video(StillImage::new(frame))
            }
            MediaDecl::Video { path } => {
                open_video_with_audio(&self.resolve(path)?, self.render.sample_rate)?
            }
            MediaDecl::Audio { path } => {
                Media::from_audio(decode_audio(&self.resolve(path)?, self.render.sample_rate)?)
            }
            MediaDecl::Text {
                text,
                font_size,
                color,
                font_family,
                align,
                box_size,
                background,
            } => {
                let defaults = TextStyle::default();
                let style = TextStyle {
                    font_size: font_size.unwrap_or(defaults.font_size),
                    color: color.unwrap_or(defaults.color),
                    font_family: font_family.clone(),
                    align: align.unwrap_or(defaults.align),
                    box_size: box_size
                        .or_else(|| self.render.canvas.map(|c| (c.width, c.height)))
                        .unwrap_or(defaults.box_size),
                    background: *background,
                };
                let fonts = self.root.join("fonts");
                let db = font_database(fonts.is_dir().then_some(fonts.as_path()));
                Media::from_video(StillImage::new(render_text(text, &style, db)?))
            }
            MediaDecl::Solid {
                color,
                width,
                height,
            } => Media::from_video(SolidColor::new(*width, *height, *color)?),
            MediaDecl::Tone {
                frequency_hz,
                amplitude,
                duration,
            } => Media::from_audio(Tone::new(*frequency_hz, *amplitude, *duration)?),
            MediaDecl::Silence { duration } => Media::from_audio(Silence::new(*duration)?),
            MediaDecl::Composite { path } => {
                if self.depth >= MAX_COMPOSITE_DEPTH {
                    return Err(MontageError::configuration(format!(
                        "composite projects nest deeper than {MAX_COMPOSITE_DEPTH} levels"
                    )));
                }
                let full = self.resolve(path)?;
                let nested = Project::from_path(&full)?;
                let root = full.parent().unwrap_or(self.root);
                let loaded = nested.load_at_depth(root, self.depth + 1)?;
                Media::composite(loaded.session()?)?
            }
        };
        Ok(media.shared())
    }
}

/// Normalize a project-relative path, rejecting absolute paths and `..` traversal.
pub(crate) fn normalize_rel_path(source: &str) -> MontageResult<String> {
    let s = source.replace('\\', "/");
    if s.starts_with('/') || (s.len() > 1 && s.as_bytes()[1] == b':') {
        return Err(MontageError::validation("media paths must be relative"));
    }
    if s.is_empty() {
        return Err(MontageError::validation("media path must be non-empty"));
    }

    let mut out = Vec::<&str>::new();
    for part in s.split('/') {
        if part.is_empty() || part == "." {
            continue;
        }
        if part == ".." {
            return Err(MontageError::validation("media paths must not contain '..'"));
        }
        out.push(part);
    }

    if out.is_empty() {
        return Err(MontageError::validation(
            "media path must contain a file name",
        ));
    }

    Ok(out.join("/"))
}

#[cfg(test)]
#[path = "../../tests/unit/project/load.rs"]
mod tests;
