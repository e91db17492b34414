use crate::effects::chain::{EffectChain, StreamSet};
use crate::effects::spec::EffectSpec;
use crate::foundation::error::{MontageError, MontageResult};
use crate::media::stream::MediaRef;

/// Length of a text node that declares no duration and has no timed effects.
pub const DEFAULT_TEXT_DURATION: f64 = 5.0;

/// Element kind. Every kind except `Audio` is visual.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Moving picture, optionally with its own audio.
    Video,
    /// Audio only.
    Audio,
    /// Rasterized text.
    Text,
    /// Pre-composed clip such as a nested timeline.
    Composite,
}

impl NodeKind {
    /// `true` for kinds that contribute pixels.
    pub fn is_visual(self) -> bool {
        !matches!(self, Self::Audio)
    }
}

/// Which end of the referenced node a relative start is measured from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    /// The referenced node's start.
    Start,
    /// The referenced node's end.
    End,
}

/// `start = <node>.<anchor> + offset`.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RelativeTimeRef {
    /// Referenced node id.
    pub node: String,
    /// Referenced edge.
    pub anchor: Anchor,
    /// Signed offset in seconds.
    #[serde(default)]
    pub offset: f64,
}

/// Node start: absolute seconds or relative to another node.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartSpec {
    /// Absolute timeline time in seconds.
    At(f64),
    /// Time derived from another node.
    #[serde(alias = "after")]
    Relative(RelativeTimeRef),
}

impl StartSpec {
    /// Start relative to the end of `node`.
    pub fn after_end(node: impl Into<String>, offset: f64) -> Self {
        Self::Relative(RelativeTimeRef {
            node: node.into(),
            anchor: Anchor::End,
            offset,
        })
    }

    /// Start relative to the start of `node`.
    pub fn with_start_of(node: impl Into<String>, offset: f64) -> Self {
        Self::Relative(RelativeTimeRef {
            node: node.into(),
            anchor: Anchor::Start,
            offset,
        })
    }

    /// Referenced node id, for relative starts.
    pub fn reference(&self) -> Option<&str> {
        match self {
            Self::At(_) => None,
            Self::Relative(r) => Some(&r.node),
        }
    }

    fn validate(&self) -> MontageResult<()> {
        match self {
            Self::At(s) if !s.is_finite() || *s < 0.0 => Err(MontageError::validation(format!(
                "absolute start must be finite and >= 0, got {s}"
            ))),
            Self::Relative(r) if r.node.is_empty() => Err(MontageError::validation(
                "relative start must name a node",
            )),
            Self::Relative(r) if !r.offset.is_finite() => Err(MontageError::validation(
                "relative start offset must be finite",
            )),
            _ => Ok(()),
        }
    }
}

impl Default for StartSpec {
    fn default() -> Self {
        Self::At(0.0)
    }
}

/// One axis of a position.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "PlacementRepr", into = "PlacementRepr")]
pub enum Placement {
    /// Pixel offset of the clip's top-left corner.
    Px(f64),
    /// Flush with the canvas start (left or top).
    Start,
    /// Centered on the canvas.
    Center,
    /// Flush with the canvas end (right or bottom).
    End,
}

#[derive(Clone, serde::Serialize, serde::Deserialize)]
#[serde(untagged)]
enum PlacementRepr {
    Px(f64),
    Named(String),
}

impl TryFrom<PlacementRepr> for Placement {
    type Error = String;

    fn try_from(value: PlacementRepr) -> Result<Self, Self::Error> {
        match value {
            PlacementRepr::Px(v) => Ok(Self::Px(v)),
            PlacementRepr::Named(s) => match s.trim().to_ascii_lowercase().as_str() {
                "start" | "left" | "top" => Ok(Self::Start),
                "center" | "centre" | "middle" => Ok(Self::Center),
                "end" | "right" | "bottom" => Ok(Self::End),
                other => Err(format!("unknown placement '{other}'")),
            },
        }
    }
}

impl From<Placement> for PlacementRepr {
    fn from(value: Placement) -> Self {
        match value {
            Placement::Px(v) => Self::Px(v),
            Placement::Start => Self::Named("start".to_string()),
            Placement::Center => Self::Named("center".to_string()),
            Placement::End => Self::Named("end".to_string()),
        }
    }
}

/// Per-axis placement on the canvas.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Position {
    /// Horizontal placement.
    pub x: Placement,
    /// Vertical placement.
    pub y: Placement,
}

impl Position {
    /// Top-left corner at `(x, y)`.
    pub fn at(x: f64, y: f64) -> Self {
        Self {
            x: Placement::Px(x),
            y: Placement::Px(y),
        }
    }

    /// Centered on both axes.
    pub fn centered() -> Self {
        Self {
            x: Placement::Center,
            y: Placement::Center,
        }
    }

    /// Canvas origin.
    pub fn origin() -> Self {
        Self::at(0.0, 0.0)
    }
}

/// Spatial attributes of a visual node.
#[derive(Clone, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct Geometry {
    /// Declared position. `None` lets the layout policy place the clip.
    pub position: Option<Position>,
    /// Explicit size applied after the aspect fit.
    pub size: Option<(u32, u32)>,
    /// Layer opacity in `[0, 1]`.
    pub opacity: f64,
    /// Apply the canvas aspect-fit policy.
    pub fit: bool,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            position: None,
            size: None,
            opacity: 1.0,
            fit: true,
        }
    }
}

impl Geometry {
    fn validate(&self) -> MontageResult<()> {
        if !self.opacity.is_finite() || !(0.0..=1.0).contains(&self.opacity) {
            return Err(MontageError::validation(format!(
                "opacity must be in [0, 1], got {}",
                self.opacity
            )));
        }
        if let Some((w, h)) = self.size
            && (w == 0 || h == 0)
        {
            return Err(MontageError::validation(format!(
                "size must have non-zero area, got {w}x{h}"
            )));
        }
        if let Some(p) = self.position {
            for axis in [p.x, p.y] {
                if let Placement::Px(v) = axis
                    && !v.is_finite()
                {
                    return Err(MontageError::validation("position must be finite"));
                }
            }
        }
        Ok(())
    }
}

/// Timed, positioned media element.
///
/// Nodes are immutable once built; the owning graph swaps whole values on edit.
#[derive(Clone, Debug)]
pub struct ClipNode {
    id: String,
    media: MediaRef,
    kind: NodeKind,
    start: StartSpec,
    duration: f64,
    geometry: Geometry,
    layer: i32,
    effects: EffectChain,
}

impl ClipNode {
    /// Start building a node.
    pub fn builder(id: impl Into<String>, kind: NodeKind, media: MediaRef) -> ClipNodeBuilder {
        ClipNodeBuilder {
            id: id.into(),
            kind,
            media,
            start: StartSpec::default(),
            duration: None,
            geometry: Geometry::default(),
            layer: 0,
            effects: Vec::new(),
        }
    }

    /// Node id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared media handle.
    pub fn media(&self) -> &MediaRef {
        &self.media
    }

    /// Node kind.
    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    /// Start declaration.
    pub fn start(&self) -> &StartSpec {
        &self.start
    }

    /// Duration in seconds, always > 0.
    pub fn duration(&self) -> f64 {
        self.duration
    }

    /// Spatial attributes.
    pub fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    /// Explicit layer. Higher layers draw later.
    pub fn layer(&self) -> i32 {
        self.layer
    }

    /// Ordered effect chain.
    pub fn effects(&self) -> &EffectChain {
        &self.effects
    }

    /// `true` when this node feeds audio into the mix.
    pub fn has_audio(&self) -> bool {
        self.media.audio().is_some()
    }

    pub(crate) fn set_duration(&mut self, duration: f64) -> MontageResult<()> {
        validate_duration(duration).map_err(|e| e.at_node(&self.id))?;
        self.duration = duration;
        Ok(())
    }

    pub(crate) fn set_start(&mut self, start: StartSpec) -> MontageResult<()> {
        start.validate().map_err(|e| e.at_node(&self.id))?;
        self.start = start;
        Ok(())
    }

    pub(crate) fn set_layer(&mut self, layer: i32) {
        self.layer = layer;
    }
}

fn validate_duration(d: f64) -> MontageResult<()> {
    if !d.is_finite() || d <= 0.0 {
        return Err(MontageError::validation(format!(
            "duration must be finite and > 0, got {d}"
        )));
    }
    Ok(())
}

/// Builder for [`ClipNode`].
#[derive(Debug)]
pub struct ClipNodeBuilder {
    id: String,
    kind: NodeKind,
    media: MediaRef,
    start: StartSpec,
    duration: Option<f64>,
    geometry: Geometry,
    layer: i32,
    effects: Vec<EffectSpec>,
}

impl ClipNodeBuilder {
    /// Absolute start in seconds.
    pub fn start_at(mut self, secs: f64) -> Self {
        self.start = StartSpec::At(secs);
        self
    }

    /// Start declaration.
    pub fn start(mut self, start: StartSpec) -> Self {
        self.start = start;
        self
    }

    /// Declared duration. Defaults to the media's duration after temporal effects.
    pub fn duration(mut self, secs: f64) -> Self {
        self.duration = Some(secs);
        self
    }

    /// Declared position.
    pub fn position(mut self, position: Position) -> Self {
        self.geometry.position = Some(position);
        self
    }

    /// Explicit post-fit size.
    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.geometry.size = Some((width, height));
        self
    }

    /// Layer opacity.
    pub fn opacity(mut self, opacity: f64) -> Self {
        self.geometry.opacity = opacity;
        self
    }

    /// Enable or disable the aspect-fit policy.
    pub fn fit(mut self, fit: bool) -> Self {
        self.geometry.fit = fit;
        self
    }

    /// Replace all spatial attributes.
    pub fn geometry(mut self, geometry: Geometry) -> Self {
        self.geometry = geometry;
        self
    }

    /// Explicit layer.
    pub fn layer(mut self, layer: i32) -> Self {
        self.layer = layer;
        self
    }

    /// Append an effect.
    pub fn effect(mut self, effect: EffectSpec) -> Self {
        self.effects.push(effect);
        self
    }

    /// Append several effects in order.
    pub fn effects(mut self, effects: impl IntoIterator<Item = EffectSpec>) -> Self {
        self.effects.extend(effects);
        self
    }

    /// Validate and build the node.
    pub fn build(self) -> MontageResult<ClipNode> {
        let id = self.id;
        let at = |e: MontageError| e.at_node(&id);

        if id.trim().is_empty() {
            return Err(MontageError::validation("node id must be non-empty"));
        }
        self.start.validate().map_err(at)?;
        self.geometry.validate().map_err(at)?;

        let streams = StreamSet {
            video: self.media.video().is_some(),
            audio: self.media.audio().is_some(),
        };
        if self.kind.is_visual() && !streams.video {
            return Err(at(MontageError::validation(format!(
                "{:?} node requires media with a video stream",
                self.kind
            ))));
        }
        if self.kind == NodeKind::Audio && !streams.audio {
            return Err(at(MontageError::validation(
                "audio node requires media with an audio stream",
            )));
        }

        let effects = EffectChain::build(self.effects, streams).map_err(at)?;
        let duration = match self.duration {
            Some(d) => d,
            None => effects
                .duration_after(self.media.intrinsic_duration())
                .or((self.kind == NodeKind::Text).then_some(DEFAULT_TEXT_DURATION))
                .ok_or_else(|| {
                    at(MontageError::validation(
                        "duration is required for media without an intrinsic duration",
                    ))
                })?,
        };
        validate_duration(duration).map_err(at)?;

        Ok(ClipNode {
            id,
            media: self.media,
            kind: self.kind,
            start: self.start,
            duration,
            geometry: self.geometry,
            layer: self.layer,
            effects,
        })
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/node.rs"]
mod tests;
