mod support;

use std::sync::{Arc, Mutex};
use support::{fall_trace, samples, scenario_config, FakeBehavior, FakePlatform};
use vigia_core::{
    DialOutcome, EngineConfig, EngineEvent, FallEngine, FallPhase, FallbackReason,
    MagnitudeReading, PlatformError, SamplerStatus, SamplingPurpose, SqliteSettingsRepository,
};

fn engine(platform: &FakePlatform) -> FallEngine<SqliteSettingsRepository> {
    let config = EngineConfig {
        detector: scenario_config(),
        ..EngineConfig::default()
    };
    FallEngine::new(
        SqliteSettingsRepository::open_in_memory().unwrap(),
        platform.ports(),
        config,
    )
    .unwrap()
}

fn collect_events(
    engine: &mut FallEngine<SqliteSettingsRepository>,
) -> Arc<Mutex<Vec<EngineEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&events);
    engine.subscribe(Box::new(move |event: &EngineEvent| {
        sink.lock().unwrap().push(event.clone());
    }));
    events
}

fn confirmed_count(events: &[EngineEvent]) -> usize {
    events
        .iter()
        .filter(|event| matches!(event, EngineEvent::FallConfirmed { .. }))
        .count()
}

#[test]
fn start_with_detection_disabled_keeps_sensor_off() {
    let platform = FakePlatform::new(FakeBehavior::default());
    let mut engine = engine(&platform);
    let settings = engine.start().clone();

    assert!(!settings.fall_detection_enabled);
    assert!(!engine.is_detecting());
    assert_eq!(engine.sampler_status(), &SamplerStatus::Stopped);
    assert!(platform.recorded().sensor_starts.is_empty());
}

#[test]
fn fall_opens_alert_with_contact_snapshot() {
    let platform = FakePlatform::new(FakeBehavior::default());
    let mut engine = engine(&platform);
    let events = collect_events(&mut engine);
    engine.start();
    engine.set_emergency_contact("11987654321").unwrap();
    engine.set_fall_detection_enabled(true);
    assert_eq!(platform.recorded().sensor_starts, vec![100]);

    for sample in samples(&fall_trace(), 200) {
        engine.handle_sample(&sample);
    }

    let session = engine.active_alert().unwrap().clone();
    assert_eq!(
        session.contact.as_ref().map(|contact| contact.digits()),
        Some("11987654321")
    );

    // Editing the contact afterwards does not retarget the open session.
    engine.set_emergency_contact("2133334444").unwrap();
    assert_eq!(engine.confirm_alert(), Some(DialOutcome::Launched));
    assert_eq!(platform.recorded().launched, vec!["tel:11987654321"]);

    let events = events.lock().unwrap();
    assert_eq!(confirmed_count(&events), 1);
    assert!(events.contains(&EngineEvent::AlertConfirmed {
        session_id: session.id
    }));
    assert!(events.contains(&EngineEvent::DialerOutcome {
        session_id: Some(session.id),
        outcome: DialOutcome::Launched,
    }));
}

#[test]
fn samples_during_open_alert_do_not_stack_alerts() {
    let platform = FakePlatform::new(FakeBehavior::default());
    let mut engine = engine(&platform);
    let events = collect_events(&mut engine);
    engine.start();
    engine.set_fall_detection_enabled(true);

    let mut trace = fall_trace();
    trace.extend(fall_trace());
    for sample in samples(&trace, 200) {
        engine.handle_sample(&sample);
    }

    assert_eq!(confirmed_count(&events.lock().unwrap()), 1);
    assert_eq!(platform.recorded().alerts_shown.len(), 1);
    assert_eq!(engine.detection_phase(), FallPhase::Confirmed);
}

#[test]
fn cancel_resets_and_allows_next_detection() {
    let platform = FakePlatform::new(FakeBehavior::default());
    let mut engine = engine(&platform);
    let events = collect_events(&mut engine);
    engine.start();
    engine.set_fall_detection_enabled(true);

    for sample in samples(&fall_trace(), 200) {
        engine.handle_sample(&sample);
    }
    let session = engine.cancel_alert().unwrap();
    assert!(session.resolved);
    assert_eq!(engine.detection_phase(), FallPhase::Idle);
    assert!(engine.cancel_alert().is_none());
    assert!(engine.confirm_alert().is_none());

    for reading in support::readings(&fall_trace(), 200) {
        engine.handle_reading(MagnitudeReading::new(
            reading.magnitude,
            reading.timestamp_ms + 10_000,
        ));
    }
    assert_eq!(confirmed_count(&events.lock().unwrap()), 2);
    assert!(platform.recorded().launched.is_empty());
}

#[test]
fn disabling_mid_cycle_never_raises_stale_alert() {
    let platform = FakePlatform::new(FakeBehavior::default());
    let mut engine = engine(&platform);
    let events = collect_events(&mut engine);
    engine.start();
    engine.set_fall_detection_enabled(true);

    let trace = samples(&fall_trace(), 200);
    for sample in &trace[..10] {
        engine.handle_sample(sample);
    }
    assert_eq!(engine.detection_phase(), FallPhase::Monitoring);

    engine.set_fall_detection_enabled(false);
    assert_eq!(engine.detection_phase(), FallPhase::Idle);
    assert_eq!(engine.sampler_status(), &SamplerStatus::Stopped);
    for sample in &trace[10..] {
        assert!(engine.handle_sample(sample).is_none());
    }

    engine.set_fall_detection_enabled(true);
    for sample in &trace[10..] {
        engine.handle_sample(sample);
    }
    assert_eq!(confirmed_count(&events.lock().unwrap()), 0);
    assert!(engine.active_alert().is_none());
}

#[test]
fn passive_mode_keeps_coarse_stream_when_disabled() {
    let platform = FakePlatform::new(FakeBehavior::default());
    let config = EngineConfig {
        detector: scenario_config(),
        passive_when_disabled: true,
        ..EngineConfig::default()
    };
    let mut engine = FallEngine::new(
        SqliteSettingsRepository::open_in_memory().unwrap(),
        platform.ports(),
        config,
    )
    .unwrap();
    let movement = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&movement);
    engine.subscribe_movement(Box::new(move |reading: &MagnitudeReading| {
        sink.lock().unwrap().push(reading.magnitude);
    }));
    engine.start();

    assert_eq!(
        engine.sampler_status(),
        &SamplerStatus::Running {
            interval_ms: 2_000,
            purpose: SamplingPurpose::PassiveDisplay,
        }
    );
    for sample in samples(&fall_trace(), 200) {
        assert!(engine.handle_sample(&sample).is_none());
    }
    assert_eq!(movement.lock().unwrap().len(), fall_trace().len());
}

#[test]
fn unavailable_sensor_disables_detection_without_panicking() {
    let platform = FakePlatform::new(FakeBehavior {
        sensor_available: false,
        ..FakeBehavior::default()
    });
    let mut engine = engine(&platform);
    let events = collect_events(&mut engine);
    engine.start();
    engine.set_fall_detection_enabled(true);

    assert!(!engine.is_detecting());
    assert!(engine.settings().fall_detection_enabled);
    assert_eq!(
        *events.lock().unwrap(),
        vec![EngineEvent::SensorUnavailable {
            error: PlatformError::PermissionDenied
        }]
    );
    for sample in samples(&fall_trace(), 200) {
        assert!(engine.handle_sample(&sample).is_none());
    }
}

#[test]
fn reported_launch_failure_runs_fallback_once() {
    let platform = FakePlatform::new(FakeBehavior::default());
    let mut engine = engine(&platform);
    let events = collect_events(&mut engine);
    engine.start();
    engine.set_emergency_contact("11987654321").unwrap();

    assert!(engine.report_dial_failure("nothing dialed").is_none());
    assert_eq!(engine.call_emergency_contact(), DialOutcome::Launched);

    let outcome = engine.report_dial_failure("activity not found").unwrap();
    assert_eq!(
        outcome,
        DialOutcome::FellBack {
            reason: FallbackReason::LaunchFailed("activity not found".to_string()),
            copied_to_clipboard: true,
        }
    );
    assert_eq!(platform.recorded().clipboard.as_deref(), Some("11987654321"));
    assert!(engine.report_dial_failure("again").is_none());

    let outcomes = events
        .lock()
        .unwrap()
        .iter()
        .filter(|event| matches!(event, EngineEvent::DialerOutcome { .. }))
        .count();
    assert_eq!(outcomes, 2);
}

#[test]
fn host_clipboard_failure_shows_number_uncopied() {
    let platform = FakePlatform::new(FakeBehavior::default());
    let engine = engine(&platform);

    assert!(engine.report_clipboard_failure("12", "clipboard busy").is_err());
    assert!(platform.recorded().manual_dials.is_empty());

    engine
        .report_clipboard_failure("11987654321", "clipboard busy")
        .unwrap();
    let recorded = platform.recorded();
    assert_eq!(recorded.manual_dials.len(), 1);
    assert_eq!(recorded.manual_dials[0].number, "11987654321");
    assert!(!recorded.manual_dials[0].copied_to_clipboard);
}

#[test]
fn settings_are_restored_on_next_start() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("engine.sqlite3");
    let platform = FakePlatform::new(FakeBehavior::default());

    {
        let mut engine = FallEngine::new(
            SqliteSettingsRepository::open(&path).unwrap(),
            platform.ports(),
            EngineConfig::default(),
        )
        .unwrap();
        engine.start();
        engine.set_fall_detection_enabled(true);
        engine.set_emergency_contact("(11) 98765-4321").unwrap();
    }

    let mut engine = FallEngine::new(
        SqliteSettingsRepository::open(&path).unwrap(),
        platform.ports(),
        EngineConfig::default(),
    )
    .unwrap();
    let settings = engine.start().clone();
    assert!(settings.fall_detection_enabled);
    assert_eq!(
        settings.emergency_contact.map(|contact| contact.digits().to_string()),
        Some("11987654321".to_string())
    );
    assert!(engine.is_detecting());
}
