use super::*;

#[test]
fn display_prefixes_are_stable() {
    assert!(
        TimelineError::reader_closed("x")
            .to_string()
            .contains("reader closed:")
    );
    assert!(
        TimelineError::invalid_clip("x")
            .to_string()
            .contains("invalid clip:")
    );
    assert!(
        TimelineError::resource_exhaustion("x")
            .to_string()
            .contains("resource exhaustion:")
    );
    assert!(
        TimelineError::validation("x")
            .to_string()
            .contains("validation error:")
    );
    assert!(
        TimelineError::decode("x")
            .to_string()
            .contains("decode error:")
    );
}

#[test]
fn other_preserves_source() {
    let base = std::io::Error::other("boom");
    let err = TimelineError::Other(anyhow::Error::new(base));
    assert!(err.to_string().contains("boom"));
    assert!(!err.is_reader_closed());
}

#[test]
fn reader_closed_is_detectable() {
    assert!(TimelineError::reader_closed("after close").is_reader_closed());
}
