use std::fs;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use pose_intent::config::DetectorMode;
use pose_intent::kernel::mode::{ModeGraph, ModeRequest, SystemMode};
use pose_intent::perception::{PoseDetectorSim, PoseObservation};
use pose_intent::SystemConfig;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

fn seeded(mode: DetectorMode, seed: u64) -> SystemConfig {
    let mut config = SystemConfig::default();
    config.simulation.detector_mode = mode;
    config.simulation.seed = Some(seed);
    config
}

#[test]
fn test_seeded_detector_is_reproducible() {
    let config = seeded(DetectorMode::ActionSequence, 7);
    let mut a = PoseDetectorSim::new(&config);
    let mut b = PoseDetectorSim::new(&config);

    let first: Vec<String> = (0..50).filter_map(|_| a.next_label()).collect();
    let second: Vec<String> = (0..50).filter_map(|_| b.next_label()).collect();
    assert_eq!(first.len(), 50);
    assert_eq!(first, second);
}

#[test]
fn test_action_sequence_without_noise_replays_templates() {
    let mut config = seeded(DetectorMode::ActionSequence, 11);
    config.simulation.noise_between_actions = false;
    config.simulation.dwell_ticks_min = 1;
    config.simulation.dwell_ticks_max = 1;
    config.actions.retain(|name, _| name == "picking_objects_from_floor");

    let mut detector = PoseDetectorSim::new(&config);
    let stream: Vec<String> = (0..6).filter_map(|_| detector.next_label()).collect();
    assert_eq!(
        stream,
        vec!["standing", "picking", "raising_hand", "standing", "picking", "raising_hand"]
    );
}

#[test]
fn test_random_mode_stays_in_vocabulary() {
    let config = seeded(DetectorMode::Random, 3);
    let mut detector = PoseDetectorSim::new(&config);
    for _ in 0..100 {
        let label = detector.next_label().unwrap();
        assert!(config.pose_vocabulary.contains(&label), "{label} outside vocabulary");
    }
}

#[tokio::test]
async fn test_detector_task_streams_until_cancelled() {
    let config = seeded(DetectorMode::Random, 5);
    let (tx, mut rx) = mpsc::channel::<PoseObservation>(16);
    let cancel = CancellationToken::new();

    let detector = PoseDetectorSim::new(&config);
    let handle = tokio::spawn(detector.run(tx, Duration::from_millis(2), cancel.clone()));

    let mut received = Vec::new();
    while received.len() < 5 {
        received.push(rx.recv().await.expect("detector alive"));
    }
    cancel.cancel();
    handle.await.unwrap();

    assert!(received.iter().all(|o| o.actor_id == "human_1"));
    assert!(received.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
}

#[test]
fn test_mode_graph() {
    use ModeRequest::*;
    use SystemMode::*;

    assert_eq!(SystemMode::default(), Recognizing);
    assert_eq!(ModeGraph::transition(Recognizing, FreezeForTask), Some(ExecutingTask));
    assert_eq!(ModeGraph::transition(ExecutingTask, UnfreezeAfterTask), Some(Recognizing));
    assert_eq!(ModeGraph::transition(ExecutingTask, FreezeForTask), None);
    assert_eq!(ModeGraph::transition(Recognizing, UnfreezeAfterTask), None);
}

#[test]
fn test_config_file_uses_defaults_for_missing_fields() {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let path = std::env::temp_dir().join(format!("pose_intent_config_{nanos}.json"));
    fs::write(
        &path,
        r#"{
            "system_name": "lab",
            "thresholds": { "min_prefix_len": 3 },
            "simulation": { "detector_mode": "random", "seed": 42 }
        }"#,
    )
    .unwrap();

    let config = SystemConfig::from_file(&path).unwrap();
    let _ = fs::remove_file(&path);

    assert_eq!(config.system_name, "lab");
    assert_eq!(config.thresholds.min_prefix_len, 3);
    assert_eq!(config.thresholds.max_buffer_len, 50);
    assert_eq!(config.simulation.detector_mode, DetectorMode::Random);
    assert_eq!(config.simulation.seed, Some(42));
    assert_eq!(config.actions.len(), 5);
    assert_eq!(config.cancel_join_timeout(), Duration::from_millis(5_000));
}
