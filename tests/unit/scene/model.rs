use super::*;
use crate::animation::anim::{AnimationKind, ShowType};

#[test]
fn scene_defaults_and_duration_validation() {
    let mut s = Scene::new();
    assert_eq!(s.duration(), DEFAULT_SCENE_DURATION);
    assert!(matches!(s.set_duration(0.0), Err(FramecraftError::Config(_))));
    assert!(s.set_duration(-2.0).is_err());
    assert_eq!(s.duration(), DEFAULT_SCENE_DURATION);
    s.set_duration(3.5).unwrap();
    assert_eq!(s.duration(), 3.5);
}

#[test]
fn add_element_returns_z_order_index() {
    let mut s = Scene::new();
    s.set_background(Color::WHITE);
    assert_eq!(s.add_element(Element::text("a")), 0);
    assert_eq!(s.add_element(Element::image("b.png")), 1);
    assert_eq!(s.elements().len(), 2);
}

#[test]
fn repeated_effect_calls_append_independently() {
    let mut e = Element::image("a.png");
    let before = e.animations().len();
    e.add_effect("fadeIn", 1.0, 0.0).unwrap();
    e.add_effect("fadeIn", 1.0, 0.0).unwrap();
    assert!(e.animations().len() >= before + 2);
}

#[test]
fn unknown_effect_fails_at_call_time_and_appends_nothing() {
    let mut e = Element::image("a.png");
    assert!(matches!(
        e.add_effect("warp", 1.0, 0.0),
        Err(FramecraftError::Config(_))
    ));
    assert!(e.add_effects(&["fadeIn", "warp"], 1.0, 0.0).is_err());
    assert!(e.animations().is_empty());
}

#[test]
fn add_animate_appends_descriptor_unchanged() {
    let mut e = Element::video("clip.mp4");
    let a = Animation::new(
        AnimationKind::Move {
            from: Vec2::ZERO,
            to: Vec2::new(200.0, 150.0),
        },
        2.0,
        1.0,
    )
    .show(ShowType::In);
    e.add_animate(a.clone()).unwrap();
    assert_eq!(e.animations(), &[a]);
}

#[test]
fn clip_window_must_be_ordered() {
    let mut v = Element::video("clip.mp4");
    assert!(v.set_clip(2.0, Some(1.0)).is_err());
    assert!(v.set_clip(2.0, Some(2.0)).is_err());
    v.set_clip(1.0, Some(4.0)).unwrap().set_loop(true).unwrap();
    match v.kind() {
        ElementKind::Video(src) => {
            assert_eq!((src.clip_start, src.clip_end, src.looped), (1.0, Some(4.0), true));
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn variant_specific_setters_reject_other_variants() {
    let mut img = Element::image("a.png");
    assert!(img.set_loop(true).is_err());
    assert!(img.set_font_size(30.0).is_err());

    let mut t = Element::text("hello");
    t.set_font_size(40.0)
        .unwrap()
        .set_color(Color::rgb(255, 0, 0))
        .unwrap()
        .set_border(2.0, Color::BLACK)
        .unwrap();
    assert!(t.set_clip(0.0, None).is_err());
}

#[test]
fn geometry_setters_validate() {
    let mut e = Element::image("a.png");
    assert!(e.set_scale(0.0).is_err());
    assert!(e.set_size(0.0, 10.0).is_err());
    assert!(e.set_position(f64::NAN, 0.0).is_err());
    assert!(e.set_appear_time(-1.0).is_err());
    e.set_position(640.0, 360.0).unwrap().set_size(1280.0, 720.0).unwrap();
    assert_eq!(e.position(), Vec2::new(640.0, 360.0));
    assert_eq!(e.size(), Some(Size::new(1280.0, 720.0)));
}

#[test]
fn audio_track_validation() {
    let mut a = AudioTrack::new("music.mp3");
    assert!(a.validate().is_ok());
    a.volume = -1.0;
    assert!(a.validate().is_err());
}
