use super::*;

fn fps30() -> Fps {
    Fps::new(30, 1).unwrap()
}

#[test]
fn settings_reject_zero_dimensions_and_rates() {
    assert!(TimelineSettings::new(0, 10, fps30(), 48_000, 2).is_err());
    assert!(TimelineSettings::new(10, 0, fps30(), 48_000, 2).is_err());
    assert!(TimelineSettings::new(10, 10, fps30(), 0, 2).is_err());
    assert!(TimelineSettings::new(10, 10, fps30(), 48_000, 0).is_err());

    let bad_fps = TimelineSettings {
        width: 1,
        height: 1,
        fps: Fps { num: 0, den: 1 },
        sample_rate: 1,
        channels: 1,
    };
    assert!(bad_fps.validate().is_err());
}

#[test]
fn settings_expose_canvas() {
    let s = TimelineSettings::new(640, 360, fps30(), 48_000, 2).unwrap();
    assert_eq!(
        s.canvas(),
        Canvas {
            width: 640,
            height: 360
        }
    );
}

#[test]
fn opts_json_fills_defaults() {
    let opts = TimelineOpts::from_json_str(r#"{ "cache_capacity": 8, "threads": 2 }"#).unwrap();
    assert_eq!(opts.cache_capacity, 8);
    assert_eq!(opts.threads, Some(2));
    assert_eq!(opts.keep_window_frames, TimelineOpts::default().keep_window_frames);
    assert!(opts.parallel);
}

#[test]
fn opts_json_rejects_unknown_fields_and_zero_values() {
    assert!(TimelineOpts::from_json_str(r#"{ "cache_size": 8 }"#).is_err());
    assert!(TimelineOpts::from_json_str(r#"{ "cache_capacity": 0 }"#).is_err());
    let err = TimelineOpts::from_json_str(r#"{ "threads": 0 }"#).unwrap_err();
    assert!(matches!(err, TimelineError::Validation(_)));
}
