use super::*;

#[test]
fn every_catalogue_name_expands() {
    for name in effect_names() {
        let v = expand_effect(name, 1.0, 0.0).unwrap();
        assert!(!v.is_empty(), "{name}");
    }
}

#[test]
fn names_are_case_insensitive() {
    assert_eq!(
        expand_effect("FADEIN", 1.0, 0.0).unwrap(),
        expand_effect("fadeIn", 1.0, 0.0).unwrap()
    );
}

#[test]
fn move_in_left_starts_off_to_the_left() {
    let v = expand_effect("moveInLeft", 1.5, 0.0).unwrap();
    assert_eq!(v.len(), 2);
    assert!(matches!(v[0].kind, AnimationKind::Fade { .. }));
    assert_eq!(
        v[1].kind,
        AnimationKind::Move {
            from: Vec2::new(-MOVE_DISTANCE, 0.0),
            to: Vec2::ZERO
        }
    );
}

#[test]
fn out_presets_use_out_windows() {
    for name in ["fadeOut", "moveOutUp", "zoomOut", "rotateOut", "backOut"] {
        let v = expand_effect(name, 1.0, 0.0).unwrap();
        assert!(v.iter().all(|a| a.show_type == ShowType::Out), "{name}");
    }
}

#[test]
fn unknown_or_invalid_fails_with_config_error() {
    assert!(matches!(
        expand_effect("sparkle", 1.0, 0.0),
        Err(FramecraftError::Config(_))
    ));
    assert!(matches!(
        expand_effect("fadeIn", 0.0, 0.0),
        Err(FramecraftError::Config(_))
    ));
    assert!(expand_effect("fadeIn", 1.0, -0.5).is_err());
}
