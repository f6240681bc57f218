//! Population-level systematics flagging across a batch.

mod support;

use mono_cbp::config::SystematicsConfig;
use mono_cbp::services::systematics::{apply_histograms, build_histograms};
use mono_cbp::{BatchRunner, CandidateEvent, EpochWindow, InMemoryCatalogue};
use support::{candidate, fast_config, Dip, LightCurveBuilder};

/// Two epochs with events spread evenly, one with a pile-up at `t = 10.2`.
fn population() -> Vec<CandidateEvent> {
    let mut events = Vec::new();
    for (e, epoch) in ["e1", "e2"].iter().enumerate() {
        for i in 0..50 {
            let time = 0.2 + 0.4 * i as f64;
            events.push(candidate(&format!("{}", 1000 * e + i), epoch, time));
        }
    }
    for i in 0..50 {
        events.push(candidate(&format!("{}", 5000 + i), "e3", 10.2 + 0.001 * i as f64));
    }
    for i in 0..10 {
        events.push(candidate(&format!("{}", 6000 + i), "e3", 0.75 + 1.5 * i as f64));
    }
    events
}

fn epochs() -> Vec<EpochWindow> {
    ["e1", "e2", "e3"]
        .iter()
        .map(|id| EpochWindow::new(*id, 0.0, 20.0))
        .collect()
}

#[test]
fn test_clustered_epoch_flagged() {
    let mut events = population();
    let config = SystematicsConfig::default();
    let histograms = build_histograms(&events, &epochs(), &config);
    let summary = apply_histograms(&mut events, histograms);

    assert_eq!(summary.flagged, 50);
    assert_eq!(summary.clean, 110);
    assert_eq!(summary.unresolved, 0);

    for event in &events {
        let clustered = event.epoch_id == "e3" && (10.0..10.5).contains(&event.event_time);
        assert_eq!(event.systematics_flag, Some(clustered), "{:?}", event);
    }

    let e3 = summary.epochs.iter().find(|s| s.epoch_id == "e3").unwrap();
    assert_eq!(e3.total_events, 60);
    assert_eq!(e3.anomalous_bins, vec![20]);
    for uniform in ["e1", "e2"] {
        let stats = summary.epochs.iter().find(|s| s.epoch_id == uniform).unwrap();
        assert!(stats.anomalous_bins.is_empty());
        assert!((stats.expected_per_bin - 1.25).abs() < 1e-12);
    }
}

#[test]
fn test_flag_independent_of_input_order() {
    let mut forward = population();
    let mut reversed: Vec<CandidateEvent> = population().into_iter().rev().collect();
    let config = SystematicsConfig::default();

    let h = build_histograms(&forward, &epochs(), &config);
    apply_histograms(&mut forward, h);
    let h = build_histograms(&reversed, &epochs(), &config);
    apply_histograms(&mut reversed, h);

    reversed.reverse();
    assert_eq!(forward, reversed);
}

#[test]
fn test_batch_run_flags_shared_timing() {
    // Four objects dip at the same time in e2, one each at distinct times in e1
    let mut batch = Vec::new();
    for (i, t) in [3.1, 7.1, 11.1, 15.1].iter().enumerate() {
        batch.push(
            LightCurveBuilder::new(&format!("{}", 10 + i), "e1")
                .points(1000, 0.02)
                .noise(0.001, i as u64 + 1)
                .dip(Dip::new(*t, 0.05, 0.1))
                .build(),
        );
    }
    for i in 0..4 {
        batch.push(
            LightCurveBuilder::new(&format!("{}", 20 + i), "e2")
                .points(1000, 0.02)
                .noise(0.001, i as u64 + 11)
                .dip(Dip::new(12.1, 0.05, 0.1))
                .build(),
        );
    }
    let epochs = vec![EpochWindow::new("e1", 0.0, 20.0), EpochWindow::new("e2", 0.0, 20.0)];

    let result = BatchRunner::new(fast_config()).run(&batch, &InMemoryCatalogue::new(), &epochs);

    assert_eq!(result.events.len(), 8, "events: {:?}", result.events);
    for event in &result.events {
        assert_eq!(event.systematics_flag, Some(event.epoch_id == "e2"), "{:?}", event);
    }
    assert_eq!(result.systematics.flagged, 4);
    assert_eq!(result.systematics.clean, 4);

    let mut strict = fast_config();
    strict.systematics.min_bin_count = 5;
    let result = BatchRunner::new(strict).run(&batch, &InMemoryCatalogue::new(), &epochs);
    assert!(result.events.iter().all(|e| e.systematics_flag == Some(false)));
}
