use serde_json::json;

use super::*;

#[test]
fn defaults_are_applied_once() {
    let o = CompositionOptions::default();
    assert_eq!((o.frame_width, o.frame_height, o.frame_rate), (1280, 720, 30));
    assert_eq!(o.concurrency, 1);
    assert_eq!(o.video_encoding_params.codec, "libx264");
    assert_eq!(o.audio_encoding_params.sample_rate, 44_100);
    assert!(o.validate().is_ok());
}

#[test]
fn get_reads_top_level_and_nested_keys() {
    let o = CompositionOptions::default();
    assert_eq!(o.get("frameRate").unwrap(), json!(30));
    assert_eq!(o.get("videoEncodingParams.preset").unwrap(), json!("medium"));
    assert_eq!(o.get("videoEncodingParams.bitrate").unwrap(), json!(null));
    assert_eq!(o.get("defaultBackgroundColor").unwrap(), json!("#000000"));
}

#[test]
fn set_updates_and_revalidates() {
    let mut o = CompositionOptions::default();
    o.set("concurrency", json!(4)).unwrap();
    o.set("videoEncodingParams.bitrate", json!("4M")).unwrap();
    o.set("defaultBackgroundColor", json!("#112233")).unwrap();
    assert_eq!(o.concurrency, 4);
    assert_eq!(o.video_encoding_params.bitrate.as_deref(), Some("4M"));
    assert_eq!(o.default_background_color, Color::rgb(0x11, 0x22, 0x33));
}

#[test]
fn unknown_keys_fail() {
    let mut o = CompositionOptions::default();
    for key in ["fps", "videoEncodingParams.speed", "frameRate.x", "", "a.b.c"] {
        assert!(
            matches!(o.set(key, json!(1)), Err(FramecraftError::Config(_))),
            "{key}"
        );
    }
    assert!(o.get("nope").is_err());
}

#[test]
fn invalid_values_leave_options_untouched() {
    let mut o = CompositionOptions::default();
    assert!(o.set("frameWidth", json!(641)).is_err());
    assert!(o.set("frameRate", json!(0)).is_err());
    assert!(o.set("concurrency", json!("many")).is_err());
    assert!(o.set("audioEncodingParams.channels", json!(0)).is_err());
    assert_eq!(o, CompositionOptions::default());
}

#[test]
fn keys_list_nested_parameters() {
    let keys = CompositionOptions::keys();
    assert!(keys.iter().any(|k| k == "frameWidth"));
    assert!(keys.iter().any(|k| k == "videoEncodingParams.keyframeInterval"));
    assert!(keys.iter().any(|k| k == "audioEncodingParams.sampleRate"));
    for k in &keys {
        assert!(CompositionOptions::default().get(k).is_ok(), "{k}");
    }
}
