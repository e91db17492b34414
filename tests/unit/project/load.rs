use super::*;
use crate::foundation::core::FrameIndex;
use crate::foundation::error::ErrorKind;
use crate::timeline::node::NodeKind;

const BASIC: &str = r#"{
  "render": { "fps": { "num": 10, "den": 1 }, "canvas": { "width": 16, "height": 8 }, "sample_rate": 100 },
  "media": {
    "red": { "type": "solid", "color": [255, 0, 0, 255], "width": 16, "height": 8 },
    "beep": { "type": "tone", "frequency_hz": 5.0, "duration": 4.0 }
  },
  "nodes": [
    { "id": "a", "media": "red", "start": { "at": 0.0 }, "duration": 5.0 },
    { "id": "b", "media": "red", "start": { "after": { "node": "a", "anchor": "end", "offset": 2.0 } }, "duration": 1.0 },
    { "id": "music", "media": "beep", "effects": [ { "kind": "volume", "params": { "factor": 0.5 } } ] }
  ]
}"#;

fn scratch_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("montage_project_{tag}_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}

#[test]
fn project_builds_graph_and_default_tracks() {
    let loaded = Project::from_reader(BASIC.as_bytes())
        .unwrap()
        .load(Path::new("."))
        .unwrap();

    assert_eq!(loaded.graph.len(), 3);
    assert_eq!(loaded.tracks.video, ["a", "b"]);
    assert_eq!(loaded.tracks.audio, ["music"]);
    assert_eq!(loaded.graph.get("music").map(|n| n.kind()), Some(NodeKind::Audio));
    assert_eq!(loaded.graph.get("music").map(|n| n.duration()), Some(4.0));

    let session = loaded.session().unwrap();
    assert_eq!(session.schedule().get("b").map(|s| s.start), Some(7.0));
    assert_eq!(session.duration(), 8.0);
}

#[test]
fn explicit_tracks_override_the_defaults() {
    let mut project = Project::from_reader(BASIC.as_bytes()).unwrap();
    project.tracks = Some(crate::project::model::TracksDecl {
        video: Some(vec!["b".to_string()]),
        audio: Some(Vec::new()),
        canvas: None,
    });
    let loaded = project.load(Path::new(".")).unwrap();
    assert_eq!(loaded.tracks.video, ["b"]);
    assert!(loaded.tracks.audio.is_empty());

    let session = loaded.session().unwrap();
    assert!(!session.has_audio());
    assert_eq!(
        session.render_frame(FrameIndex(75)).unwrap().pixel(0, 0),
        [255, 0, 0, 255]
    );
}

#[test]
fn unknown_media_key_names_the_node() {
    let json = r#"{ "nodes": [ { "id": "x", "media": "missing", "duration": 1.0 } ] }"#;
    let err = Project::from_reader(json.as_bytes())
        .unwrap()
        .load(Path::new("."))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnresolvedReference);
    assert_eq!(err.node_id(), Some("x"));
}

#[test]
fn bad_effect_params_fail_at_load() {
    let json = r#"{
      "media": { "s": { "type": "solid", "color": [0, 0, 0, 255], "width": 4, "height": 4 } },
      "nodes": [ { "id": "clip", "media": "s", "duration": 1.0,
                   "effects": [ { "kind": "fadein", "params": { "duration": -1.0 } } ] } ]
    }"#;
    let err = Project::from_reader(json.as_bytes())
        .unwrap()
        .load(Path::new("."))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(err.node_id(), Some("clip"));
    assert!(err.message().contains("effect #0"), "{err}");
}

#[test]
fn unknown_fields_are_serde_errors() {
    let err = Project::from_reader(r#"{ "nodes": [], "extra": 1 }"#.as_bytes()).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Serde);
}

#[test]
fn rel_paths_are_normalized() {
    assert_eq!(normalize_rel_path("./a//b.png").unwrap(), "a/b.png");
    assert_eq!(normalize_rel_path("dir\\c.svg").unwrap(), "dir/c.svg");
    assert!(normalize_rel_path("/etc/passwd").is_err());
    assert!(normalize_rel_path("C:/x.png").is_err());
    assert!(normalize_rel_path("../up.png").is_err());
    assert!(normalize_rel_path("a/../../b.png").is_err());
    assert!(normalize_rel_path("").is_err());
    assert!(normalize_rel_path("./").is_err());
}

#[test]
fn image_media_is_read_relative_to_the_root() {
    let dir = scratch_dir("image");
    let img = image::RgbaImage::from_pixel(4, 2, image::Rgba([0, 0, 255, 255]));
    img.save(dir.join("pic.png")).unwrap();

    let json = r#"{
      "render": { "canvas": { "width": 4, "height": 2 } },
      "media": { "pic": { "type": "image", "path": "pic.png" } },
      "nodes": [ { "id": "still", "media": "pic", "duration": 1.0 } ]
    }"#;
    let loaded = Project::from_reader(json.as_bytes())
        .unwrap()
        .load(&dir)
        .unwrap();
    let frame = loaded.session().unwrap().render_frame(FrameIndex(0)).unwrap();
    assert_eq!(frame.pixel(1, 1), [0, 0, 255, 255]);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn missing_media_file_is_an_external_error() {
    let json = r#"{
      "media": { "pic": { "type": "image", "path": "nope.png" } },
      "nodes": []
    }"#;
    let err = Project::from_reader(json.as_bytes())
        .unwrap()
        .load(&scratch_dir("missing"))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::External);
}

#[test]
fn composite_media_loads_a_nested_project() {
    let dir = scratch_dir("nested");
    std::fs::write(dir.join("inner.json"), BASIC).unwrap();
    let outer = r#"{
      "render": { "fps": { "num": 10, "den": 1 }, "canvas": { "width": 16, "height": 8 } },
      "media": { "sub": { "type": "composite", "path": "inner.json" } },
      "nodes": [ { "id": "nested", "media": "sub" } ]
    }"#;
    std::fs::write(dir.join("outer.json"), outer).unwrap();

    let loaded = load_project(dir.join("outer.json")).unwrap();
    let node = loaded.graph.get("nested").unwrap();
    assert_eq!(node.kind(), NodeKind::Composite);
    assert_eq!(node.duration(), 8.0);
    assert!(node.has_audio());
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn self_including_composites_stop_at_the_depth_limit() {
    let dir = scratch_dir("recursive");
    let json = r#"{
      "render": { "canvas": { "width": 4, "height": 4 } },
      "media": { "me": { "type": "composite", "path": "loop.json" } },
      "nodes": [ { "id": "again", "media": "me" } ]
    }"#;
    std::fs::write(dir.join("loop.json"), json).unwrap();
    let err = load_project(dir.join("loop.json")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Configuration);
    let _ = std::fs::remove_dir_all(dir);
}

#[test]
fn bundled_demo_parses() {
    let project =
        Project::from_reader(include_str!("../../../demos/title_card.json").as_bytes()).unwrap();
    assert_eq!(project.nodes.len(), 4);
    assert_eq!(project.render.fps.num, 30);
    assert_eq!(
        project.media.get("title").map(MediaDecl::default_kind),
        Some(NodeKind::Text)
    );
}

#[test]
fn text_media_gets_a_box_fill_and_default_length() {
    let json = r#"{
      "render": { "fps": { "num": 10, "den": 1 }, "canvas": { "width": 16, "height": 8 } },
      "media": { "label": { "type": "text", "text": "", "background": [0, 128, 0, 255] } },
      "nodes": [ { "id": "caption", "media": "label" } ]
    }"#;
    let loaded = Project::from_reader(json.as_bytes())
        .unwrap()
        .load(&scratch_dir("text"))
        .unwrap();
    assert_eq!(loaded.graph.get("caption").map(|n| n.duration()), Some(5.0));

    let session = loaded.session().unwrap();
    assert_eq!(session.frame_count(), 50);
    let frame = session.render_frame(FrameIndex(0)).unwrap();
    assert_eq!(frame.pixel(0, 0), [0, 128, 0, 255]);
    assert_eq!(frame.pixel(15, 7), [0, 128, 0, 255]);
}
