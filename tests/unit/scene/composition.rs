use std::time::Duration;

use serde_json::json;

use super::*;
use crate::encode::memory::InMemoryEngine;
use crate::scene::model::Element;
use crate::session::events::RenderEvent;

fn scratch(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!(
        "framecraft_comp_{tag}_{}_{nanos}",
        std::process::id()
    ))
}

fn composition(root: &Path) -> Composition {
    let options = CompositionOptions {
        cache_dir: root.join("cache"),
        output_dir: root.join("out"),
        ..CompositionOptions::default()
    };
    Composition::with_engine(options, Arc::new(InMemoryEngine::new())).unwrap()
}

fn text_scene(secs: f64) -> Scene {
    let mut s = Scene::new();
    s.set_duration(secs).unwrap();
    s.add_element(Element::text("hello"));
    s
}

#[test]
fn first_mutation_moves_idle_to_building() {
    let root = scratch("building");
    let mut c = composition(&root);
    assert_eq!(c.state(), CompositionState::Idle);
    assert_eq!(c.add_scene(text_scene(2.0)).unwrap(), 0);
    assert_eq!(c.add_scene(text_scene(2.0)).unwrap(), 1);
    assert_eq!(c.state(), CompositionState::Building);
    assert!(matches!(c.scene_mut(5), Err(FramecraftError::Config(_))));
}

#[test]
fn options_round_trip_through_keys() {
    let root = scratch("options");
    let mut c = composition(&root);
    c.set_option("frameRate", json!(25)).unwrap();
    assert_eq!(c.get_option("frameRate").unwrap(), json!(25));
    c.set_option("videoEncodingParams.codec", json!("libx265"))
        .unwrap();
    assert_eq!(
        c.get_option("videoEncodingParams.codec").unwrap(),
        json!("libx265")
    );
    assert!(matches!(
        c.set_option("frameWidth", json!(1281)),
        Err(FramecraftError::Config(_))
    ));
    assert!(c.set_option("noSuchOption", json!(1)).is_err());
    assert!(c.set_size(640, 0).is_err());
    c.set_size(640, 360).unwrap();
    assert_eq!(c.options().frame_width, 640);
    c.open_log().unwrap();
    assert!(c.options().logging_enabled);
    c.close_log().unwrap();
    assert!(!c.options().logging_enabled);
}

#[test]
fn output_paths_resolve_against_output_dir() {
    let root = scratch("output");
    let mut c = composition(&root);
    let default = c.output_path();
    assert_eq!(default.parent().unwrap(), root.join("out"));
    assert_eq!(default.file_name().unwrap().to_string_lossy(), format!("{}.mp4", c.id()));

    c.set_output("final.mp4").unwrap();
    assert_eq!(c.output_path(), root.join("out").join("final.mp4"));
    let abs = root.join("elsewhere.mp4");
    c.set_output(&abs).unwrap();
    assert_eq!(c.output_path(), abs);
    assert!(c.set_output("").is_err());
}

#[test]
fn start_rejects_unrunnable_compositions() {
    let root = scratch("reject");
    let mut c = composition(&root);
    assert!(matches!(c.start(), Err(FramecraftError::Config(_))));

    let mut first = text_scene(1.0);
    first.set_transition("fade", 1500.0).unwrap();
    c.add_scene(first).unwrap();
    c.add_scene(text_scene(3.0)).unwrap();
    assert!(matches!(c.start(), Err(FramecraftError::Config(_))));
    // A rejected start leaves the graph editable.
    assert_eq!(c.state(), CompositionState::Building);
    c.scene_mut(0).unwrap().set_transition("fade", 500.0).unwrap();
}

#[test]
fn started_composition_is_frozen_and_completes() {
    let root = scratch("frozen");
    let mut c = composition(&root);
    c.add_scene(text_scene(2.0)).unwrap();
    let mut events = c.start().unwrap();
    assert!(matches!(c.add_scene(text_scene(1.0)), Err(FramecraftError::Config(_))));
    assert!(c.scene_mut(0).is_err());
    assert!(c.set_option("frameRate", json!(24)).is_err());
    assert!(c.start().is_err());

    let mut saw_terminal = false;
    while let Some(ev) = events.next_timeout(Duration::from_secs(10)).unwrap() {
        if let RenderEvent::Complete(report) = &ev {
            assert!(report.output.is_file());
            saw_terminal = true;
        }
    }
    assert!(saw_terminal);
    for _ in 0..200 {
        if c.state() == CompositionState::Completed {
            break;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(c.state(), CompositionState::Completed);
    c.destroy();
    assert_eq!(c.state(), CompositionState::Destroyed);
    let _ = std::fs::remove_dir_all(root);
}

#[test]
fn destroy_is_idempotent_from_any_state() {
    let root = scratch("destroy");
    let mut c = composition(&root);
    c.destroy();
    c.destroy();
    assert_eq!(c.state(), CompositionState::Destroyed);
    assert!(c.add_scene(text_scene(1.0)).is_err());
    assert!(c.start().is_err());
}
