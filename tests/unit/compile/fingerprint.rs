use super::*;
use crate::scene::model::Element;

fn sample_scene() -> Scene {
    let mut s = Scene::new();
    s.set_duration(4.0).unwrap();
    let mut t = Element::text("hello");
    t.set_position(640.0, 360.0).unwrap();
    t.add_effect("fadeIn", 1.0, 0.0).unwrap();
    s.add_element(t);
    s
}

#[test]
fn fingerprint_is_reproducible() {
    let o = CompositionOptions::default();
    let a = fingerprint_scene(0, &sample_scene(), &o, &[]);
    let b = fingerprint_scene(0, &sample_scene(), &o, &[]);
    assert_eq!(a, b);
    assert_eq!(a.to_string().len(), 32);
}

#[test]
fn index_content_and_params_all_change_the_key() {
    let o = CompositionOptions::default();
    let base = fingerprint_scene(0, &sample_scene(), &o, &[]);

    assert_ne!(base, fingerprint_scene(1, &sample_scene(), &o, &[]));

    let mut s = sample_scene();
    s.element_mut(0).unwrap().set_scale(2.0).unwrap();
    assert_ne!(base, fingerprint_scene(0, &s, &o, &[]));

    let mut s = sample_scene();
    s.element_mut(0).unwrap().add_effect("fadeOut", 1.0, 0.0).unwrap();
    assert_ne!(base, fingerprint_scene(0, &s, &o, &[]));

    let mut wide = o.clone();
    wide.frame_width = 1920;
    assert_ne!(base, fingerprint_scene(0, &sample_scene(), &wide, &[]));

    let stamp = SourceStamp {
        path: "a.png".into(),
        len: 10,
        modified_nanos: 1,
    };
    assert_ne!(base, fingerprint_scene(0, &sample_scene(), &o, &[stamp]));
}

#[test]
fn transition_does_not_change_scene_artifact_key() {
    let o = CompositionOptions::default();
    let mut s = sample_scene();
    let before = fingerprint_scene(0, &s, &o, &[]);
    s.set_transition("fade", 500.0).unwrap();
    assert_eq!(before, fingerprint_scene(0, &s, &o, &[]));
}

#[test]
fn missing_source_stamp_is_resource_not_found() {
    let err = SourceStamp::read(Path::new("/definitely/not/here.mp4")).unwrap_err();
    assert!(matches!(err, FramecraftError::ResourceNotFound { .. }));
}
