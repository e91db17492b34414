use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::effects::spec::EffectInstance;
use crate::foundation::core::Canvas;
use crate::media::text::TextAlign;
use crate::render::session::RenderConfig;
use crate::timeline::node::{Geometry, NodeKind, StartSpec};

/// JSON-facing description of a whole timeline.
///
/// Media are declared once under a key and referenced by any number of nodes, so one loaded source
/// can back several independently effected clips.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Project {
    /// Render settings.
    #[serde(default)]
    pub render: RenderConfig,
    /// Media declarations by key.
    #[serde(default)]
    pub media: BTreeMap<String, MediaDecl>,
    /// Nodes in insertion order.
    pub nodes: Vec<NodeDecl>,
    /// Layer stack and mix set. Missing lists default to the graph's own.
    #[serde(default)]
    pub tracks: Option<TracksDecl>,
}

/// A media source. Paths are relative to the project file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case", deny_unknown_fields)]
pub enum MediaDecl {
    /// Raster image (PNG, JPEG, ...), shown as a still.
    Image {
        /// Relative file path.
        path: String,
    },
    /// SVG document rasterized once at its intrinsic size.
    Svg {
        /// Relative file path.
        path: String,
    },
    /// Video file with its audio track, decoded through ffmpeg.
    Video {
        /// Relative file path.
        path: String,
    },
    /// Audio file decoded through ffmpeg.
    Audio {
        /// Relative file path.
        path: String,
    },
    /// Rasterized text block.
    Text {
        /// Text content; `\n` starts a new line.
        text: String,
        /// Font size in pixels.
        #[serde(default)]
        font_size: Option<f32>,
        /// Straight RGBA fill.
        #[serde(default)]
        color: Option<[u8; 4]>,
        /// Preferred font family.
        #[serde(default)]
        font_family: Option<String>,
        /// Line alignment.
        #[serde(default)]
        align: Option<TextAlign>,
        /// Raster size. Defaults to the render canvas.
        #[serde(default)]
        box_size: Option<(u32, u32)>,
        /// Straight RGBA box fill behind the text.
        #[serde(default)]
        background: Option<[u8; 4]>,
    },
    /// Solid color rectangle.
    Solid {
        /// Straight RGBA color.
        color: [u8; 4],
        /// Width in pixels.
        width: u32,
        /// Height in pixels.
        height: u32,
    },
    /// Sine tone on both channels.
    Tone {
        /// Frequency in Hz.
        frequency_hz: f64,
        /// Peak amplitude.
        #[serde(default = "default_tone_amplitude")]
        amplitude: f32,
        /// Length in seconds.
        duration: f64,
    },
    /// Digital silence.
    Silence {
        /// Length in seconds.
        duration: f64,
    },
    /// Another project file rendered as a nested sub-timeline.
    Composite {
        /// Relative path of the nested project.
        path: String,
    },
}

fn default_tone_amplitude() -> f32 {
    0.5
}

impl MediaDecl {
    /// Node kind used when a node does not declare one.
    pub fn default_kind(&self) -> NodeKind {
        match self {
            Self::Audio { .. } | Self::Tone { .. } | Self::Silence { .. } => NodeKind::Audio,
            Self::Text { .. } => NodeKind::Text,
            Self::Composite { .. } => NodeKind::Composite,
            Self::Image { .. } | Self::Svg { .. } | Self::Video { .. } | Self::Solid { .. } => {
                NodeKind::Video
            }
        }
    }
}

/// One timeline node.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NodeDecl {
    /// Unique node id.
    pub id: String,
    /// Key into [`Project::media`].
    pub media: String,
    /// Node kind. Inferred from the media when absent.
    #[serde(default)]
    pub kind: Option<NodeKind>,
    /// `{"at": secs}` or `{"after": {"node", "anchor", "offset"}}`.
    #[serde(default)]
    pub start: StartSpec,
    /// Declared duration. Defaults to the media's duration after temporal effects.
    #[serde(default)]
    pub duration: Option<f64>,
    /// Spatial attributes.
    #[serde(default)]
    pub geometry: Geometry,
    /// Explicit layer.
    #[serde(default)]
    pub layer: i32,
    /// Ordered effects as `{kind, params}`.
    #[serde(default)]
    pub effects: Vec<EffectInstance>,
}

/// Track overrides.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TracksDecl {
    /// Video layer stack, bottom first.
    #[serde(default)]
    pub video: Option<Vec<String>>,
    /// Audio mix set.
    #[serde(default)]
    pub audio: Option<Vec<String>>,
    /// Canvas used when the render config has none.
    #[serde(default)]
    pub canvas: Option<Canvas>,
}
