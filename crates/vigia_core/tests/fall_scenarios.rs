mod support;

use support::{fall_trace, readings, scenario_config};
use vigia_core::{
    AbortReason, DetectorConfig, DetectorEvent, FallDetector, FallPhase, MagnitudeReading,
};

fn enabled_detector(config: DetectorConfig) -> FallDetector {
    let mut detector = FallDetector::new(config).unwrap();
    detector.set_enabled(true);
    detector
}

fn run(detector: &mut FallDetector, readings: &[MagnitudeReading]) -> Vec<(usize, DetectorEvent)> {
    readings
        .iter()
        .enumerate()
        .filter_map(|(index, reading)| detector.ingest(*reading).map(|event| (index, event)))
        .collect()
}

#[test]
fn impact_then_stillness_confirms_exactly_once() {
    let mut detector = enabled_detector(scenario_config());
    let events = run(&mut detector, &readings(&fall_trace(), 200));

    let confirmations = events
        .iter()
        .filter(|(_, event)| matches!(event, DetectorEvent::FallConfirmed { .. }))
        .collect::<Vec<_>>();
    assert_eq!(confirmations.len(), 1);
    let (index, event) = confirmations[0];
    assert_eq!(*index, 16);
    assert_eq!(
        *event,
        DetectorEvent::FallConfirmed {
            impact_at_ms: 600,
            confirmed_at_ms: 3_200,
        }
    );
    assert_eq!(detector.phase(), FallPhase::Confirmed);
}

#[test]
fn event_sequence_for_a_fall() {
    let mut detector = enabled_detector(scenario_config());
    let events = run(&mut detector, &readings(&fall_trace(), 200));

    assert!(matches!(
        events[0],
        (3, DetectorEvent::ImpactDetected { at_ms: 600, .. })
    ));
    assert_eq!(events[1], (6, DetectorEvent::MonitoringStarted { at_ms: 1_200 }));
    assert_eq!(events.len(), 3);
}

#[test]
fn confirmed_detector_ignores_later_impacts_until_reset() {
    let mut detector = enabled_detector(scenario_config());
    run(&mut detector, &readings(&fall_trace(), 200));
    assert!(detector.is_suspended());

    assert_eq!(detector.ingest(MagnitudeReading::new(5.0, 3_400)), None);
    assert_eq!(detector.phase(), FallPhase::Confirmed);

    detector.reset();
    assert_eq!(detector.phase(), FallPhase::Idle);
    assert!(matches!(
        detector.ingest(MagnitudeReading::new(3.0, 3_600)),
        Some(DetectorEvent::ImpactDetected { .. })
    ));
}

#[test]
fn vigorous_movement_after_impact_aborts() {
    let mut detector = enabled_detector(scenario_config());
    let events = run(&mut detector, &readings(&[1.0, 1.0, 3.0, 3.0, 4.5, 4.5], 200));

    assert!(events
        .iter()
        .all(|(_, event)| !matches!(event, DetectorEvent::FallConfirmed { .. })));
    assert_eq!(
        events.last(),
        Some(&(
            4,
            DetectorEvent::Aborted {
                reason: AbortReason::Movement,
                at_ms: 800,
            }
        ))
    );
    assert_eq!(detector.phase(), FallPhase::Idle);
    assert!(!detector.state().armed);
}

#[test]
fn vigorous_movement_aborts_on_a_dense_sample_grid() {
    let mut detector = enabled_detector(scenario_config());
    let events = run(&mut detector, &readings(&[1.0, 1.0, 3.0, 3.0, 4.5, 4.5], 100));

    assert_eq!(
        events,
        vec![
            (2, DetectorEvent::ImpactDetected { at_ms: 200, magnitude: 3.0 }),
            (
                4,
                DetectorEvent::Aborted {
                    reason: AbortReason::Movement,
                    at_ms: 400,
                }
            ),
        ]
    );
    assert_eq!(detector.phase(), FallPhase::Idle);
}

#[test]
fn abort_level_spike_while_settling_prevents_confirmation() {
    let mut detector = enabled_detector(scenario_config());
    let mut magnitudes = vec![1.0, 1.0, 3.0, 4.5];
    magnitudes.extend(std::iter::repeat(0.4).take(14));
    let events = run(&mut detector, &readings(&magnitudes, 200));

    assert!(events
        .iter()
        .all(|(_, event)| !matches!(event, DetectorEvent::FallConfirmed { .. })));
    assert!(events.iter().any(|(_, event)| matches!(
        event,
        DetectorEvent::Aborted {
            reason: AbortReason::Movement,
            at_ms: 600,
        }
    )));
}

#[test]
fn aborted_detector_rearms_after_calm_sample() {
    let mut detector = enabled_detector(scenario_config());
    run(&mut detector, &readings(&[1.0, 1.0, 3.0, 3.0, 4.5, 4.5], 200));

    // Still above impact: no retrigger while disarmed.
    assert_eq!(detector.ingest(MagnitudeReading::new(3.0, 1_200)), None);
    assert_eq!(detector.ingest(MagnitudeReading::new(1.0, 1_400)), None);
    assert!(detector.state().armed);
    assert!(matches!(
        detector.ingest(MagnitudeReading::new(3.0, 1_600)),
        Some(DetectorEvent::ImpactDetected { at_ms: 1_600, .. })
    ));
}

#[test]
fn no_impact_stays_idle() {
    let mut detector = enabled_detector(scenario_config());
    let magnitudes = [1.0, 1.2, 0.9, 2.4, 1.1, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3, 0.3];
    let events = run(&mut detector, &readings(&magnitudes, 200));

    assert!(events.is_empty());
    assert_eq!(detector.phase(), FallPhase::Idle);
}

#[test]
fn disabling_mid_cycle_discards_state() {
    let mut detector = enabled_detector(scenario_config());
    let trace = readings(&fall_trace(), 200);
    run(&mut detector, &trace[..10]);
    assert_eq!(detector.phase(), FallPhase::Monitoring);

    detector.set_enabled(false);
    assert_eq!(detector.phase(), FallPhase::Idle);
    assert!(run(&mut detector, &trace[10..]).is_empty());

    detector.set_enabled(true);
    let late = run(&mut detector, &trace[10..]);
    assert!(late.is_empty(), "stale cycle resumed: {late:?}");
    assert_eq!(detector.phase(), FallPhase::Idle);
}

#[test]
fn movement_without_stillness_times_out() {
    let config = DetectorConfig {
        max_window_ms: 3_000,
        ..scenario_config()
    };
    let mut detector = enabled_detector(config);
    let mut magnitudes = vec![1.0, 3.0];
    // Restless but below abort: the stillness mean stays above threshold.
    magnitudes.extend(std::iter::repeat(3.5).take(20));
    let events = run(&mut detector, &readings(&magnitudes, 200));

    assert!(events.iter().any(|(_, event)| matches!(
        event,
        DetectorEvent::Aborted {
            reason: AbortReason::Timeout,
            ..
        }
    )));
    assert!(events
        .iter()
        .all(|(_, event)| !matches!(event, DetectorEvent::FallConfirmed { .. })));
}

#[test]
fn malformed_readings_are_skipped() {
    let mut detector = enabled_detector(scenario_config());
    assert_eq!(detector.ingest(MagnitudeReading::new(f64::NAN, 0)), None);
    assert_eq!(detector.ingest(MagnitudeReading::new(1.0, 400)), None);
    assert_eq!(detector.ingest(MagnitudeReading::new(3.0, 200)), None);
    assert_eq!(detector.phase(), FallPhase::Idle);
}
