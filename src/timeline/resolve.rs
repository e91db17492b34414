use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap, HashMap};

use crate::foundation::error::{MontageError, MontageResult};
use crate::timeline::graph::TimelineGraph;
use crate::timeline::node::{Anchor, StartSpec};

/// Absolute placement of a node on the timeline: `[start, end)` in seconds.
#[derive(Clone, Copy, Debug, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Span {
    /// Start time (inclusive).
    pub start: f64,
    /// End time (exclusive).
    pub end: f64,
}

impl Span {
    /// Span length in seconds.
    pub fn duration(self) -> f64 {
        self.end - self.start
    }

    /// `true` when `start <= t < end`.
    pub fn contains(self, t: f64) -> bool {
        self.start <= t && t < self.end
    }
}

/// Resolved absolute spans for every node in a graph.
#[derive(Clone, Debug, Default, PartialEq, serde::Serialize)]
pub struct Schedule {
    spans: BTreeMap<String, Span>,
}

impl Schedule {
    /// Span of `id`.
    pub fn get(&self, id: &str) -> Option<Span> {
        self.spans.get(id).copied()
    }

    /// Spans sorted by id.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Span)> {
        self.spans.iter().map(|(k, v)| (k.as_str(), *v))
    }

    /// Number of scheduled nodes.
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// `true` when nothing is scheduled.
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Latest end time, or `0.0` for an empty schedule.
    pub fn end(&self) -> f64 {
        self.spans.values().fold(0.0, |acc, s| acc.max(s.end))
    }
}

/// What a resolve pass touched.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolveReport {
    /// Ids whose spans were (re)computed, in resolution order.
    pub recomputed: Vec<String>,
    /// Ids dropped because they left the graph.
    pub removed: Vec<String>,
}

/// Incremental resolver from relative start declarations to absolute spans.
///
/// The resolver remembers the `(start, duration)` it last saw for every node. A pass only
/// recomputes nodes whose declaration changed, nodes that were added, dependents of removed nodes,
/// and everything downstream of those.
#[derive(Clone, Debug, Default)]
pub struct Resolver {
    schedule: Schedule,
    seen: HashMap<String, (StartSpec, f64)>,
}

impl Resolver {
    /// Resolver with an empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// Last successfully resolved schedule.
    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Bring the cached schedule up to date with `graph`.
    ///
    /// On error the cache keeps the previous consistent schedule.
    #[tracing::instrument(skip_all, fields(nodes = graph.len()))]
    pub fn resolve(&mut self, graph: &TimelineGraph) -> MontageResult<ResolveReport> {
        let mut seeds: Vec<&str> = Vec::new();
        for n in graph.iter() {
            let changed = match self.seen.get(n.id()) {
                Some((start, duration)) => start != n.start() || *duration != n.duration(),
                None => true,
            };
            if changed {
                seeds.push(n.id());
            }
        }
        let mut removed: Vec<String> = self
            .seen
            .keys()
            .filter(|id| !graph.contains(id))
            .cloned()
            .collect();
        removed.sort();
        for id in &removed {
            seeds.extend(graph.dependents(id));
        }

        let affected = graph.dependent_closure(&seeds);
        let mut spans = self.schedule.spans.clone();
        for id in &removed {
            spans.remove(id);
        }
        let recomputed = resolve_subset(graph, &affected, &mut spans)?;

        tracing::debug!(
            recomputed = recomputed.len(),
            removed = removed.len(),
            "timeline resolved"
        );

        self.schedule = Schedule { spans };
        self.seen = graph
            .iter()
            .map(|n| (n.id().to_string(), (n.start().clone(), n.duration())))
            .collect();
        Ok(ResolveReport {
            recomputed,
            removed,
        })
    }
}

/// One-shot resolve of every node in `graph`.
pub fn resolve(graph: &TimelineGraph) -> MontageResult<Schedule> {
    let mut r = Resolver::new();
    r.resolve(graph)?;
    Ok(r.schedule)
}

/// Deterministic Kahn pass over `affected`, reading unaffected spans from `spans`.
///
/// When several nodes are ready, the one inserted first is resolved first.
fn resolve_subset(
    graph: &TimelineGraph,
    affected: &std::collections::BTreeSet<String>,
    spans: &mut BTreeMap<String, Span>,
) -> MontageResult<Vec<String>> {
    // Local order = insertion order restricted to the affected set.
    let order: Vec<&str> = graph
        .iter()
        .map(|n| n.id())
        .filter(|id| affected.contains(*id))
        .collect();
    let local: HashMap<&str, u32> = order
        .iter()
        .enumerate()
        .map(|(i, id)| (*id, i as u32))
        .collect();

    let n = order.len();
    let mut indeg = vec![0u32; n];
    let mut dependents = vec![Vec::<u32>::new(); n];
    for (i, id) in order.iter().enumerate() {
        let Some(node) = graph.get(id) else {
            continue;
        };
        let Some(target) = node.start().reference() else {
            continue;
        };
        if !graph.contains(target) {
            return Err(MontageError::unresolved(format!(
                "start references unknown node '{target}'"
            ))
            .at_node(*id));
        }
        if let Some(&t) = local.get(target) {
            dependents[t as usize].push(i as u32);
            indeg[i] = 1;
        }
    }

    let mut ready = BinaryHeap::<Reverse<u32>>::new();
    for (i, &deg) in indeg.iter().enumerate() {
        if deg == 0 {
            ready.push(Reverse(i as u32));
        }
    }

    let mut out = Vec::with_capacity(n);
    while let Some(Reverse(i)) = ready.pop() {
        let id = order[i as usize];
        let span = span_for(graph, id, spans)?;
        spans.insert(id.to_string(), span);
        out.push(id.to_string());

        for &dep in &dependents[i as usize] {
            let d = &mut indeg[dep as usize];
            *d = d.saturating_sub(1);
            if *d == 0 {
                ready.push(Reverse(dep));
            }
        }
    }

    if out.len() < n {
        let stuck = order
            .iter()
            .enumerate()
            .find(|(i, _)| indeg[*i] > 0)
            .map(|(_, id)| *id)
            .unwrap_or(order[0]);
        let cycle = cycle_path(graph, stuck);
        let origin = cycle.first().copied().unwrap_or(stuck);
        return Err(MontageError::cycle(format!(
            "time references form a cycle: {}",
            cycle.join(" -> ")
        ))
        .at_node(origin));
    }
    Ok(out)
}

fn span_for(
    graph: &TimelineGraph,
    id: &str,
    spans: &BTreeMap<String, Span>,
) -> MontageResult<Span> {
    let node = graph
        .get(id)
        .ok_or_else(|| MontageError::unresolved(format!("no node with id '{id}'")).at_node(id))?;
    let start = match node.start() {
        StartSpec::At(s) => *s,
        StartSpec::Relative(r) => {
            let target = spans.get(&r.node).ok_or_else(|| {
                MontageError::unresolved(format!("start references unresolved node '{}'", r.node))
                    .at_node(id)
            })?;
            let base = match r.anchor {
                Anchor::Start => target.start,
                Anchor::End => target.end,
            };
            base + r.offset
        }
    };
    if !start.is_finite() || start < 0.0 {
        return Err(MontageError::validation(format!(
            "resolved start must be finite and >= 0, got {start}"
        ))
        .at_node(id));
    }
    Ok(Span {
        start,
        end: start + node.duration(),
    })
}

/// Follow references from `from` until one repeats; returns the closed loop.
fn cycle_path<'a>(graph: &'a TimelineGraph, from: &'a str) -> Vec<&'a str> {
    let mut path: Vec<&str> = vec![from];
    let mut cur = from;
    while let Some(next) = graph.get(cur).and_then(|n| n.start().reference()) {
        if let Some(pos) = path.iter().position(|p| *p == next) {
            let mut cycle: Vec<&str> = path[pos..].to_vec();
            cycle.push(next);
            return cycle;
        }
        path.push(next);
        cur = next;
    }
    path
}

#[cfg(test)]
#[path = "../../tests/unit/timeline/resolve.rs"]
mod tests;
