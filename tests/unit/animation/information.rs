use super::*;

#[test]
fn uniform_metadata_loop_duration() {
    let m = AnimationMetadata::uniform(
        5,
        100,
        LoopCount::Finite(7),
        Dimension::Px(10),
        Dimension::Unset,
    );
    assert_eq!(m.frame_count(), 5);
    assert_eq!(m.frame_duration_ms(4), 100);
    assert_eq!(m.frame_duration_ms(5), 0);
    assert_eq!(m.loop_duration_ms(), 500);
    assert!(m.validate().is_ok());
}

#[test]
fn validate_rejects_unplayable_metadata() {
    assert!(AnimationMetadata::default().validate().is_err());
    let zero = AnimationMetadata::uniform(
        3,
        0,
        LoopCount::Infinite,
        Dimension::Unset,
        Dimension::Unset,
    );
    assert!(zero.validate().is_err());
}

#[test]
fn parses_from_json() {
    let json = r#"{
        "frame_durations_ms": [40, 60],
        "loop_count": { "finite": 2 },
        "width": { "px": 32 },
        "height": "unset"
    }"#;
    let m = AnimationMetadata::from_json_str(json).unwrap();
    assert_eq!(m.loop_duration_ms(), 100);
    assert_eq!(m.loop_count(), LoopCount::Finite(2));
    assert_eq!(m.width(), Dimension::Px(32));
    assert_eq!(m.height(), Dimension::Unset);

    assert!(matches!(
        AnimationMetadata::from_json_str("{ nope"),
        Err(ReelError::Serde(_))
    ));
}
