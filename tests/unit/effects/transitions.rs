use super::*;

#[test]
fn parse_accepts_aliases_and_case() {
    assert_eq!(TransitionKind::parse("fade").unwrap(), TransitionKind::Fade);
    assert_eq!(
        TransitionKind::parse(" CrossFade ").unwrap(),
        TransitionKind::Fade
    );
    assert_eq!(
        TransitionKind::parse("wipe_left").unwrap(),
        TransitionKind::Wipe(Direction::Left)
    );
    assert_eq!(
        TransitionKind::parse("SlideDown").unwrap(),
        TransitionKind::Slide(Direction::Down)
    );
}

#[test]
fn parse_rejects_unknown() {
    assert!(matches!(
        TransitionKind::parse("spin"),
        Err(FramecraftError::Config(_))
    ));
    assert!(TransitionKind::parse("wipediagonal").is_err());
    assert!(TransitionKind::parse("").is_err());
}

#[test]
fn every_kind_round_trips_through_its_xfade_name() {
    let all = TransitionKind::all();
    assert_eq!(all.len(), 17);
    for k in all {
        assert_eq!(TransitionKind::parse(&k.xfade_name()).unwrap(), k);
    }
}

#[test]
fn spec_converts_millis() {
    let t = TransitionSpec::from_millis("fade", 1000.0).unwrap();
    assert_eq!(t.duration_secs, 1.0);
    assert!(TransitionSpec::from_millis("fade", 0.0).is_err());
    assert!(TransitionSpec::from_millis("fade", f64::NAN).is_err());
}
