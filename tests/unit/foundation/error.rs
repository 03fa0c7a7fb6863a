use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        ReelError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        ReelError::closed("x")
            .to_string()
            .contains("closed reference:")
    );
    assert!(
        ReelError::shared("x")
            .to_string()
            .contains("shared reference:")
    );
    assert!(
        ReelError::allocation("x")
            .to_string()
            .contains("allocation error:")
    );
    assert!(ReelError::render("x").to_string().contains("render error:"));
    assert!(
        ReelError::serde("x")
            .to_string()
            .contains("serialization error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = ReelError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
}
