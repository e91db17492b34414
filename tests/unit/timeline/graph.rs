use super::*;
use crate::ErrorKind;
use crate::media::source::SolidColor;
use crate::media::stream::{Media, MediaRef};
use crate::timeline::node::NodeKind;

fn media() -> MediaRef {
    Media::from_video(SolidColor::new(4, 4, [0, 0, 0, 255]).unwrap()).shared()
}

fn node(id: &str, start: StartSpec) -> ClipNode {
    ClipNode::builder(id, NodeKind::Video, media())
        .start(start)
        .duration(1.0)
        .build()
        .unwrap()
}

#[test]
fn duplicate_ids_are_rejected() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::At(0.0))).unwrap();
    let err = g.insert(node("a", StartSpec::At(1.0))).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.node_id(), Some("a"));
    assert_eq!(g.len(), 1);
}

#[test]
fn z_order_is_insertion_order_until_layer_changes() {
    let mut g = TimelineGraph::new();
    for id in ["a", "b", "c"] {
        g.insert(node(id, StartSpec::At(0.0))).unwrap();
    }
    let ids: Vec<&str> = g.z_ordered().iter().map(|n| n.id()).collect();
    assert_eq!(ids, ["a", "b", "c"]);

    g.set_layer("a", 1).unwrap();
    let ids: Vec<&str> = g.z_ordered().iter().map(|n| n.id()).collect();
    assert_eq!(ids, ["b", "c", "a"]);

    g.set_layer("c", -1).unwrap();
    let ids: Vec<&str> = g.z_ordered().iter().map(|n| n.id()).collect();
    assert_eq!(ids, ["c", "b", "a"]);
}

#[test]
fn remove_and_replace_keep_index_consistent() {
    let mut g = TimelineGraph::new();
    for id in ["a", "b", "c"] {
        g.insert(node(id, StartSpec::At(0.0))).unwrap();
    }
    g.remove("a").unwrap();
    assert_eq!(g.position("b"), Some(0));
    assert_eq!(g.position("c"), Some(1));
    assert!(g.get("a").is_none());

    let old = g.replace(node("c", StartSpec::At(3.0))).unwrap();
    assert_eq!(old.start(), &StartSpec::At(0.0));
    assert_eq!(g.get("c").unwrap().start(), &StartSpec::At(3.0));
    assert_eq!(g.position("c"), Some(1));
}

#[test]
fn edits_on_unknown_ids_are_unresolved_references() {
    let mut g = TimelineGraph::new();
    let err = g.set_duration("ghost", 2.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert_eq!(err.node_id(), Some("ghost"));
    assert!(g.remove("ghost").is_err());
}

#[test]
fn set_duration_validates() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::At(0.0))).unwrap();
    let err = g.set_duration("a", 0.0).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(g.get("a").unwrap().duration(), 1.0);
}

#[test]
fn dependents_and_closure_follow_references() {
    let mut g = TimelineGraph::new();
    g.insert(node("a", StartSpec::At(0.0))).unwrap();
    g.insert(node("b", StartSpec::after_end("a", 0.0))).unwrap();
    g.insert(node("c", StartSpec::after_end("b", -0.5))).unwrap();
    g.insert(node("d", StartSpec::with_start_of("a", 1.0))).unwrap();
    g.insert(node("e", StartSpec::At(2.0))).unwrap();

    assert_eq!(g.dependents("a"), ["b", "d"]);
    let closure = g.dependent_closure(&["b"]);
    assert_eq!(
        closure.into_iter().collect::<Vec<_>>(),
        ["b".to_string(), "c".to_string()]
    );
    assert_eq!(g.dependent_closure(&["a"]).len(), 4);
}
