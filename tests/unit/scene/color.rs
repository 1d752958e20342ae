use super::*;

#[test]
fn parses_short_long_and_alpha_hex() {
    assert_eq!(Color::parse("#ff0000").unwrap(), Color::rgb(255, 0, 0));
    assert_eq!(Color::parse("1a1a1a").unwrap(), Color::rgb(26, 26, 26));
    assert_eq!(Color::parse("#fc0").unwrap(), Color::rgb(255, 204, 0));
    assert_eq!(Color::parse("#00000080").unwrap().a, 128);
    assert_eq!(Color::parse("White").unwrap(), Color::WHITE);
}

#[test]
fn rejects_garbage() {
    assert!(matches!(
        Color::parse("#12345"),
        Err(FramecraftError::Config(_))
    ));
    assert!(Color::parse("#gg0000").is_err());
}

#[test]
fn ffmpeg_literal_carries_alpha_only_when_translucent() {
    assert_eq!(Color::rgb(17, 17, 17).to_ffmpeg(), "0x111111");
    assert_eq!(Color::TRANSPARENT.to_ffmpeg(), "0x000000@0");
    assert_eq!(Color::parse("#1a1a1a").unwrap().to_string(), "#1a1a1a");
}
