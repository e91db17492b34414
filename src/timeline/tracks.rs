use std::collections::HashSet;

use crate::foundation::core::Canvas;
use crate::foundation::error::{MontageError, MontageResult};
use crate::timeline::graph::TimelineGraph;
use crate::timeline::node::{ClipNode, NodeKind};

/// Layer stack and mix set handed to the compositor.
///
/// `video` is ordered bottom-to-top. `audio` is the mix order, which only matters for
/// floating-point summation order.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct CompositeTrackSpec {
    /// Video layer stack, bottom first.
    #[serde(default)]
    pub video: Vec<String>,
    /// Audio mix set.
    #[serde(default)]
    pub audio: Vec<String>,
    /// Target canvas. `None` defers to the render config or the primary video node.
    #[serde(default)]
    pub canvas: Option<Canvas>,
}

impl CompositeTrackSpec {
    /// Default tracks for `graph`: visual nodes in z-order and audio-bearing nodes in insertion
    /// order.
    pub fn from_graph(graph: &TimelineGraph) -> Self {
        let video = graph
            .z_ordered()
            .into_iter()
            .filter(|n| n.kind().is_visual())
            .map(|n| n.id().to_string())
            .collect();
        let audio = graph
            .iter()
            .filter(|n| n.has_audio())
            .map(|n| n.id().to_string())
            .collect();
        Self {
            video,
            audio,
            canvas: None,
        }
    }

    /// Check referential integrity against `graph`.
    pub fn validate(&self, graph: &TimelineGraph) -> MontageResult<()> {
        let mut seen = HashSet::new();
        for id in &self.video {
            let node = graph.get(id).ok_or_else(|| {
                MontageError::unresolved("video track lists an unknown node").at_node(id)
            })?;
            if !node.kind().is_visual() {
                return Err(MontageError::validation(format!(
                    "video track lists a non-visual {:?} node",
                    node.kind()
                ))
                .at_node(id));
            }
            if !seen.insert(id.as_str()) {
                return Err(
                    MontageError::validation("node listed twice in the video track").at_node(id),
                );
            }
        }

        seen.clear();
        for id in &self.audio {
            let node = graph.get(id).ok_or_else(|| {
                MontageError::unresolved("audio track lists an unknown node").at_node(id)
            })?;
            if !node.has_audio() {
                return Err(
                    MontageError::validation("audio track lists a node without audio")
                        .at_node(id),
                );
            }
            if !seen.insert(id.as_str()) {
                return Err(
                    MontageError::validation("node listed twice in the audio track").at_node(id),
                );
            }
        }

        if let Some(c) = self.canvas {
            Canvas::new(c.width, c.height)?;
        }
        Ok(())
    }

    /// First `video`-kind node of the layer stack, falling back to the first layer.
    pub fn primary_video<'g>(&self, graph: &'g TimelineGraph) -> Option<&'g ClipNode> {
        let nodes: Vec<_> = self.video.iter().filter_map(|id| graph.get(id)).collect();
        nodes
            .iter()
            .find(|n| n.kind() == NodeKind::Video)
            .or_else(|| nodes.first())
            .copied()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/tracks.rs"]
mod tests;
