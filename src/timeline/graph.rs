use std::collections::{BTreeSet, HashMap};

use crate::foundation::error::{MontageError, MontageResult};
use crate::timeline::node::{ClipNode, StartSpec};

/// Exclusive owner of the declared nodes, in insertion order.
///
/// Insertion order is the default z-order; [`TimelineGraph::set_layer`] is the explicit reorder.
#[derive(Clone, Debug, Default)]
pub struct TimelineGraph {
    nodes: Vec<ClipNode>,
    index: HashMap<String, usize>,
}

impl TimelineGraph {
    /// Empty graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// `true` when the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// `true` when a node with `id` exists.
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Node by id.
    pub fn get(&self, id: &str) -> Option<&ClipNode> {
        self.index.get(id).map(|&i| &self.nodes[i])
    }

    /// Insertion index of `id`.
    pub fn position(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    /// Nodes in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &ClipNode> {
        self.nodes.iter()
    }

    /// Add a node. Ids are unique.
    ///
    /// References to nodes that do not exist yet are allowed; they are checked by the resolver.
    pub fn insert(&mut self, node: ClipNode) -> MontageResult<()> {
        if self.index.contains_key(node.id()) {
            return Err(
                MontageError::validation("duplicate node id").at_node(node.id().to_string())
            );
        }
        self.index.insert(node.id().to_string(), self.nodes.len());
        self.nodes.push(node);
        Ok(())
    }

    /// Remove a node and return it. Dependents keep their now dangling references.
    pub fn remove(&mut self, id: &str) -> MontageResult<ClipNode> {
        let idx = self.require(id)?;
        let node = self.nodes.remove(idx);
        self.reindex();
        Ok(node)
    }

    /// Swap in a new definition for an existing id, keeping its insertion position.
    pub fn replace(&mut self, node: ClipNode) -> MontageResult<ClipNode> {
        let idx = self.require(node.id())?;
        Ok(std::mem::replace(&mut self.nodes[idx], node))
    }

    /// Change a node's duration.
    pub fn set_duration(&mut self, id: &str, duration: f64) -> MontageResult<()> {
        let idx = self.require(id)?;
        self.nodes[idx].set_duration(duration)
    }

    /// Change a node's start declaration.
    pub fn set_start(&mut self, id: &str, start: StartSpec) -> MontageResult<()> {
        let idx = self.require(id)?;
        self.nodes[idx].set_start(start)
    }

    /// Move a node to another layer.
    pub fn set_layer(&mut self, id: &str, layer: i32) -> MontageResult<()> {
        let idx = self.require(id)?;
        self.nodes[idx].set_layer(layer);
        Ok(())
    }

    /// Nodes sorted bottom-to-top: by layer, then insertion order.
    pub fn z_ordered(&self) -> Vec<&ClipNode> {
        let mut out: Vec<(usize, &ClipNode)> = self.nodes.iter().enumerate().collect();
        out.sort_by_key(|(i, n)| (n.layer(), *i));
        out.into_iter().map(|(_, n)| n).collect()
    }

    /// Ids of nodes whose start references `id` directly, in insertion order.
    pub fn dependents(&self, id: &str) -> Vec<&str> {
        self.nodes
            .iter()
            .filter(|n| n.start().reference() == Some(id))
            .map(|n| n.id())
            .collect()
    }

    /// Ids reachable from `seeds` through dependent edges, seeds included.
    pub fn dependent_closure(&self, seeds: &[&str]) -> BTreeSet<String> {
        let mut reverse: HashMap<&str, Vec<&str>> = HashMap::new();
        for n in &self.nodes {
            if let Some(target) = n.start().reference() {
                reverse.entry(target).or_default().push(n.id());
            }
        }

        let mut seen = BTreeSet::new();
        let mut stack: Vec<&str> = seeds.to_vec();
        while let Some(id) = stack.pop() {
            if !seen.insert(id.to_string()) {
                continue;
            }
            if let Some(children) = reverse.get(id) {
                stack.extend(children.iter().copied());
            }
        }
        seen
    }

    fn require(&self, id: &str) -> MontageResult<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| MontageError::unresolved(format!("no node with id '{id}'")).at_node(id))
    }

    fn reindex(&mut self) {
        self.index = self
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.id().to_string(), i))
            .collect();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/graph.rs"]
mod tests;
