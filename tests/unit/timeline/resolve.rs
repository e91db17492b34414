use super::*;
use crate::ErrorKind;
use crate::media::source::SolidColor;
use crate::media::stream::{Media, MediaRef};
use crate::timeline::node::{ClipNode, NodeKind};

fn media() -> MediaRef {
    Media::from_video(SolidColor::new(4, 4, [0, 0, 0, 255]).unwrap()).shared()
}

fn node(id: &str, start: StartSpec, duration: f64) -> ClipNode {
    ClipNode::builder(id, NodeKind::Video, media())
        .start(start)
        .duration(duration)
        .build()
        .unwrap()
}

#[test]
fn chains_resolve_to_absolute_spans() {
    let mut g = TimelineGraph::new();
    // Declared out of dependency order on purpose.
    g.insert(node("c", StartSpec::after_end("a", -1.5), 2.0))
        .unwrap();
    g.insert(node("a", StartSpec::after_end("b", 0.0), 3.0))
        .unwrap();
    g.insert(node("b", StartSpec::At(1.0), 4.0)).unwrap();
    g.insert(node("d", StartSpec::with_start_of("b", 0.5), 1.0))
        .unwrap();

    let s = resolve(&g).unwrap();
    assert_eq!(s.get("b"), Some(Span { start: 1.0, end: 5.0 }));
    assert_eq!(s.get("a"), Some(Span { start: 5.0, end: 8.0 }));
    assert_eq!(s.get("c"), Some(Span { start: 6.5, end: 8.5 }));
    assert_eq!(s.get("d"), Some(Span { start: 1.5, end: 2.5 }));
    assert_eq!(s.end(), 8.5);
}

#[test]
fn resolution_order_is_topological_and_deterministic() {
    let mut g = TimelineGraph::new();
    g.insert(node("late", StartSpec::after_end("root", 0.0), 1.0))
        .unwrap();
    g.insert(node("free", StartSpec::At(0.0), 1.0)).unwrap();
    g.insert(node("root", StartSpec::At(0.0), 1.0)).unwrap();

    let mut r = Resolver::new();
    let report = r.resolve(&g).unwrap();
    assert_eq!(report.recomputed, ["free", "root", "late"]);
}

#[test]
fn two_node_cycle_is_rejected() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::after_end("b", 0.0), 1.0))
        .unwrap();
    g.insert(node("b", StartSpec::after_end("a", 0.0), 1.0))
        .unwrap();

    let err = resolve(&g).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cycle);
    assert_eq!(err.node_id(), Some("a"));
    assert!(err.message().contains("a -> b -> a"), "{err}");
}

#[test]
fn self_reference_is_a_cycle() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::with_start_of("a", 1.0), 1.0))
        .unwrap();
    assert_eq!(resolve(&g).unwrap_err().kind(), ErrorKind::Cycle);
}

#[test]
fn cycle_downstream_node_reports_the_loop() {
    let mut g = TimelineGraph::new();
    g.insert(node("tail", StartSpec::after_end("x", 0.0), 1.0))
        .unwrap();
    g.insert(node("x", StartSpec::after_end("y", 0.0), 1.0))
        .unwrap();
    g.insert(node("y", StartSpec::after_end("x", 0.0), 1.0))
        .unwrap();

    let err = resolve(&g).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Cycle);
    assert_eq!(err.node_id(), Some("x"));
    assert!(err.message().contains("x -> y -> x"), "{err}");
}

#[test]
fn unknown_reference_is_unresolved() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::after_end("ghost", 0.0), 1.0))
        .unwrap();
    let err = resolve(&g).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert_eq!(err.node_id(), Some("a"));
}

#[test]
fn negative_resolved_start_is_validation_error() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::At(0.0), 1.0)).unwrap();
    g.insert(node("b", StartSpec::after_end("a", -3.0), 1.0))
        .unwrap();
    let err = resolve(&g).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.node_id(), Some("b"));
}

#[test]
fn editing_a_duration_recomputes_only_dependents() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::At(0.0), 5.0)).unwrap();
    g.insert(node("b", StartSpec::after_end("a", 2.0), 3.0))
        .unwrap();
    g.insert(node("c", StartSpec::after_end("b", 0.0), 1.0))
        .unwrap();
    g.insert(node("other", StartSpec::At(4.0), 1.0)).unwrap();

    let mut r = Resolver::new();
    r.resolve(&g).unwrap();
    assert_eq!(r.schedule().get("b"), Some(Span { start: 7.0, end: 10.0 }));

    g.set_duration("a", 8.0).unwrap();
    let report = r.resolve(&g).unwrap();
    assert_eq!(report.recomputed, ["a", "b", "c"]);
    assert_eq!(r.schedule().get("a"), Some(Span { start: 0.0, end: 8.0 }));
    assert_eq!(r.schedule().get("b"), Some(Span { start: 10.0, end: 13.0 }));
    assert_eq!(r.schedule().get("c"), Some(Span { start: 13.0, end: 14.0 }));
    assert_eq!(r.schedule().get("other"), Some(Span { start: 4.0, end: 5.0 }));

    // Nothing changed: nothing recomputed.
    let report = r.resolve(&g).unwrap();
    assert!(report.recomputed.is_empty());
}

#[test]
fn remove_and_readd_recomputes_dependents() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::At(0.0), 5.0)).unwrap();
    g.insert(node("b", StartSpec::after_end("a", 0.0), 1.0))
        .unwrap();
    g.insert(node("solo", StartSpec::At(1.0), 1.0)).unwrap();

    let mut r = Resolver::new();
    r.resolve(&g).unwrap();

    g.remove("a").unwrap();
    let err = r.resolve(&g).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert_eq!(err.node_id(), Some("b"));
    // Failed pass keeps the previous schedule.
    assert_eq!(r.schedule().get("a"), Some(Span { start: 0.0, end: 5.0 }));

    g.insert(node("a", StartSpec::At(2.0), 5.0)).unwrap();
    let report = r.resolve(&g).unwrap();
    assert_eq!(report.recomputed, ["a", "b"]);
    assert_eq!(r.schedule().get("b"), Some(Span { start: 7.0, end: 8.0 }));
    assert!(!report.recomputed.contains(&"solo".to_string()));
}

#[test]
fn removing_a_leaf_drops_its_span() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::At(0.0), 5.0)).unwrap();
    g.insert(node("leaf", StartSpec::At(0.0), 1.0)).unwrap();

    let mut r = Resolver::new();
    r.resolve(&g).unwrap();
    g.remove("leaf").unwrap();
    let report = r.resolve(&g).unwrap();
    assert!(report.recomputed.is_empty());
    assert_eq!(report.removed, ["leaf"]);
    assert_eq!(r.schedule().get("leaf"), None);
    assert_eq!(r.schedule().len(), 1);
}
