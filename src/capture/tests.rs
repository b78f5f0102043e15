use super::*;

#[test]
fn sequence_numbers_are_strictly_monotonic_within_a_session() {
    let mut source = CaptureSource::new();
    source.start(CaptureTarget::FullScreen).unwrap();

    let mut last = None;
    for _ in 0..10 {
        let frame = source.poll().expect("synthetic backend always produces a frame");
        if let Some(prev) = last {
            assert!(frame.sequence > prev);
        }
        last = Some(frame.sequence);
    }
}

#[test]
fn sequence_numbers_reset_on_restart() {
    let mut source = CaptureSource::new();
    source.start(CaptureTarget::FullScreen).unwrap();
    let first = source.poll().unwrap();
    assert_eq!(first.sequence, 0);
    source.stop();

    source.start(CaptureTarget::FullScreen).unwrap();
    let after_restart = source.poll().unwrap();
    assert_eq!(after_restart.sequence, 0);
}

#[test]
fn window_by_title_fails_target_not_found_when_absent() {
    let mut source = CaptureSource::new().with_enumerator(Box::new(StaticWindowEnumerator {
        titles: vec!["Editor".to_string()],
        pids: vec![],
    }));

    let err = source
        .start(CaptureTarget::WindowByTitle("Browser".to_string()))
        .unwrap_err();
    assert!(matches!(err, PipelineError::TargetNotFound(_)));
}

#[test]
fn window_by_title_succeeds_when_present() {
    let mut source = CaptureSource::new().with_enumerator(Box::new(StaticWindowEnumerator {
        titles: vec!["Editor".to_string()],
        pids: vec![],
    }));

    assert!(source.start(CaptureTarget::WindowByTitle("Editor".to_string())).is_ok());
}

#[test]
fn region_outside_virtual_desktop_is_invalid() {
    let mut source = CaptureSource::new().with_virtual_desktop_bounds(1920, 1080);
    let err = source
        .start(CaptureTarget::Region { x: 1800, y: 0, width: 500, height: 200 })
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidRegion(_)));
}

#[test]
fn region_within_virtual_desktop_is_accepted() {
    let mut source = CaptureSource::new().with_virtual_desktop_bounds(1920, 1080);
    assert!(source
        .start(CaptureTarget::Region { x: 0, y: 0, width: 800, height: 600 })
        .is_ok());
}

#[test]
fn target_disappearing_mid_session_yields_none_and_stop_still_succeeds() {
    let mut source = CaptureSource::new();
    source.start(CaptureTarget::FullScreen).unwrap();
    assert!(source.poll().is_some());

    // Reach into the backend to simulate the target going away.
    let backend = source.backend.as_mut().unwrap();
    // SAFETY-free downcast avoidance: SyntheticBackend is the only backend
    // constructed here, so this direct field poke via a concrete type the
    // test controls is fine to express through `stop`, which has the same
    // externally-observable effect as the target disappearing.
    backend.stop();

    assert!(source.poll().is_none());
    source.stop();
    assert!(!source.is_capturing());
}

#[test]
fn poll_before_start_returns_none() {
    let mut source = CaptureSource::new();
    assert!(source.poll().is_none());
}
