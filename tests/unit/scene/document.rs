use serde_json::json;

use super::*;
use crate::animation::anim::ShowType;
use crate::encode::memory::InMemoryEngine;
use crate::scene::composition::CompositionState;

fn sample() -> serde_json::Value {
    json!({
        "options": { "frameWidth": 640, "frameHeight": 360, "concurrency": 2 },
        "scenes": [
            {
                "duration": 3,
                "background": "#102030",
                "transition": { "name": "fade", "duration": 500 },
                "elements": [
                    {
                        "type": "image",
                        "path": "media/bg.png",
                        "position": { "x": 320, "y": 180 },
                        "size": { "width": 640, "height": 360 }
                    },
                    {
                        "type": "text",
                        "text": "Hello",
                        "fontSize": 48,
                        "appearTime": 0.5,
                        "effects": [{ "name": "fadeIn", "time": 0.5 }, { "name": "zoomOut", "time": 1, "delay": 0.2 }],
                        "animations": [{ "type": "rotate", "from": 0, "to": 90, "time": 1, "showType": "in" }]
                    }
                ]
            },
            {
                "elements": [
                    { "type": "video", "path": "clip.mp4", "clipStartTime": 1, "clipEndTime": 3, "loop": true }
                ]
            }
        ],
        "audio": { "path": "music.mp3", "volume": 0.8, "fadeOut": 2 },
        "output": "demo.mp4"
    })
}

#[test]
fn document_builds_through_the_method_surface() {
    let doc: CompositionDocument = serde_json::from_value(sample()).unwrap();
    let scenes = doc.build_scenes().unwrap();
    assert_eq!(scenes.len(), 2);
    assert_eq!(scenes[0].duration(), 3.0);
    assert_eq!(scenes[1].duration(), crate::scene::model::DEFAULT_SCENE_DURATION);
    assert_eq!(scenes[0].background(), Some(Color::rgb(0x10, 0x20, 0x30)));
    assert!(scenes[0].transition().is_some());

    let text = &scenes[0].elements()[1];
    assert_eq!(text.appear_time(), 0.5);
    // fadeIn is one descriptor, zoomOut is a fade plus a zoom, then the explicit rotate.
    assert_eq!(text.animations().len(), 4);
    assert_eq!(text.animations()[3].show_type, ShowType::In);

    let comp = Composition::from_document(&doc, Arc::new(InMemoryEngine::new())).unwrap();
    assert_eq!(comp.state(), CompositionState::Building);
    assert_eq!(comp.options().frame_width, 640);
    assert_eq!(comp.audio().unwrap().fade_out, 2.0);
    assert!(comp.output_path().ends_with("demo.mp4"));
}

#[test]
fn relative_paths_resolve_against_a_base() {
    let mut doc: CompositionDocument = serde_json::from_value(sample()).unwrap();
    doc.resolve_paths(Path::new("/projects/demo"));
    let scenes = doc.build_scenes().unwrap();
    assert_eq!(
        scenes[0].elements()[0].source_path().unwrap(),
        Path::new("/projects/demo/media/bg.png")
    );
    assert_eq!(
        doc.audio.as_ref().unwrap().path,
        PathBuf::from("/projects/demo/music.mp3")
    );
}

#[test]
fn invalid_documents_fail_with_located_config_errors() {
    let mut bad = sample();
    bad["scenes"][0]["elements"][1]["effects"][0]["name"] = json!("spinAround");
    let doc: CompositionDocument = serde_json::from_value(bad).unwrap();
    match doc.build_scenes() {
        Err(FramecraftError::Config(msg)) => {
            assert!(msg.starts_with("scene 0: element 1:"), "{msg}");
        }
        other => panic!("expected a config error, got {other:?}"),
    }

    assert!(matches!(
        CompositionDocument::from_json_str(r#"{ "scenes": [], "bogus": 1 }"#),
        Err(FramecraftError::Serde(_))
    ));
    assert!(matches!(
        Composition::from_json_str(
            r#"{ "options": { "frameRate": 0 }, "scenes": [] }"#,
            Arc::new(InMemoryEngine::new())
        ),
        Err(FramecraftError::Config(_))
    ));
}

#[test]
fn missing_document_file_is_resource_not_found() {
    assert!(matches!(
        CompositionDocument::from_path(Path::new("/no/such/doc.json")),
        Err(FramecraftError::ResourceNotFound { .. })
    ));
}
