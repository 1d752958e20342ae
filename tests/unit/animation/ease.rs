use super::*;

#[test]
fn every_ease_hits_endpoints() {
    for ease in Ease::ALL {
        assert!(ease.apply(0.0).abs() < 1e-9, "{ease:?} at 0");
        assert!((ease.apply(1.0) - 1.0).abs() < 1e-9, "{ease:?} at 1");
    }
}

#[test]
fn progress_is_clamped() {
    assert_eq!(Ease::OutQuad.apply(-3.0), 0.0);
    assert_eq!(Ease::InCubic.apply(7.0), 1.0);
}

#[test]
fn out_back_overshoots() {
    let peak = (1..100)
        .map(|i| Ease::OutBack.apply(f64::from(i) / 100.0))
        .fold(f64::MIN, f64::max);
    assert!(peak > 1.0);
}

#[test]
fn names_parse_in_several_spellings() {
    assert_eq!("quadOut".parse::<Ease>().unwrap(), Ease::OutQuad);
    assert_eq!("OutQuad".parse::<Ease>().unwrap(), Ease::OutQuad);
    assert_eq!("out_quad".parse::<Ease>().unwrap(), Ease::OutQuad);
    assert_eq!("ease-in-out-cubic".parse::<Ease>().unwrap(), Ease::InOutCubic);
    assert_eq!("linear".parse::<Ease>().unwrap(), Ease::Linear);
    assert!(matches!(
        "wobble".parse::<Ease>(),
        Err(FramecraftError::Config(_))
    ));
}

#[test]
fn canonical_names_round_trip() {
    for ease in Ease::ALL {
        assert_eq!(ease.name().parse::<Ease>().unwrap(), ease);
    }
}
