use std::collections::BTreeMap;

use pose_intent::config::StepConstraintConfig;
use pose_intent::kernel::intent::{
    ActionConstraint, ActionDefinition, ActionRecognizer, StepConstraint,
};
use pose_intent::kernel::memory::EpisodeMemory;
use pose_intent::{ConfigError, SystemConfig};
use proptest::prelude::*;

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn recognizer(defs: Vec<ActionDefinition>) -> ActionRecognizer {
    ActionRecognizer::new(defs.into_iter().map(|d| (d.name.clone(), d)).collect())
}

fn plain(name: &str, template: &[&str]) -> ActionDefinition {
    ActionDefinition::new(name, vec![(labels(template), None)], None).unwrap()
}

/// Feeds `(label, t)` ticks and returns every detection along the way.
fn feed(rec: &ActionRecognizer, memory: &mut EpisodeMemory, ticks: &[(&str, f64)]) -> Vec<String> {
    let mut hits = Vec::new();
    for (label, t) in ticks {
        memory.ingest(label, *t, None);
        if let Some(instance) = rec.detect_action(memory, *t) {
            hits.push(instance.name);
        }
    }
    hits
}

#[test]
fn test_three_step_template_scenario() {
    let rec = recognizer(vec![plain(
        "picking_objects_from_floor",
        &["standing", "picking", "raising_hand"],
    )]);
    let mut memory = EpisodeMemory::new(50);

    memory.ingest("standing", 10.0, None);
    assert!(rec.detect_action(&mut memory, 10.0).is_none());
    memory.ingest("picking", 11.0, None);
    assert!(rec.detect_action(&mut memory, 11.0).is_none());
    memory.ingest("raising_hand", 12.0, None);

    let instance = rec.detect_action(&mut memory, 12.0).expect("template completed");
    assert_eq!(instance.name, "picking_objects_from_floor");
    assert_eq!(instance.start_time, 10.0);
    assert_eq!(instance.end_time, 12.0);
    assert_eq!(instance.matched_sequence, labels(&["standing", "picking", "raising_hand"]));
    assert_eq!(instance.confidence, 1.0);
    assert_eq!(memory.recognized_actions.len(), 1, "Detection is appended to the episode");
}

#[test]
fn test_start_time_comes_from_matching_window() {
    let rec = recognizer(vec![plain("wave", &["standing", "raising_hand"])]);
    let mut memory = EpisodeMemory::new(50);

    // Earlier unrelated segments must not move the start
    let hits = feed(
        &rec,
        &mut memory,
        &[("sitting", 0.0), ("standing", 1.0), ("standing", 2.0), ("raising_hand", 3.0)],
    );
    assert_eq!(hits, vec!["wave"]);
    let instance = &memory.recognized_actions[0];
    assert_eq!(instance.start_time, 1.0);
    assert_eq!(instance.end_time, 3.0);
}

#[test]
fn test_actions_tried_in_name_order() {
    // Both templates end the same way; the lexicographically smaller name wins.
    let rec = recognizer(vec![
        plain("zeta", &["walking", "sitting"]),
        plain("alpha", &["standing", "walking", "sitting"]),
    ]);
    let mut memory = EpisodeMemory::new(50);

    let hits = feed(&rec, &mut memory, &[("standing", 0.0), ("walking", 1.0), ("sitting", 2.0)]);
    assert_eq!(hits, vec!["alpha"]);
}

#[test]
fn test_step_duration_constraint() {
    let def = ActionDefinition::new(
        "slow_pick",
        vec![(
            labels(&["standing", "picking"]),
            Some(vec![
                StepConstraint::unconstrained("standing"),
                StepConstraint {
                    pose: "picking".into(),
                    min_duration: None,
                    max_duration: Some(1.0),
                    max_gap_after_prev: Some(0.5),
                },
            ]),
        )],
        None,
    )
    .unwrap();
    let rec = recognizer(vec![def]);

    // 1. Gap from standing end (0.0) to picking start (2.0) exceeds 0.5
    let mut memory = EpisodeMemory::new(50);
    assert!(feed(&rec, &mut memory, &[("standing", 0.0), ("picking", 2.0)]).is_empty());

    // 2. Gap within bounds
    let mut memory = EpisodeMemory::new(50);
    let hits = feed(&rec, &mut memory, &[("standing", 0.0), ("standing", 1.0), ("picking", 1.4)]);
    assert_eq!(hits, vec!["slow_pick"]);
}

#[test]
fn test_min_duration_rejects_short_steps() {
    let def = ActionDefinition::new(
        "deliberate_bow",
        vec![(
            labels(&["standing", "bowing"]),
            Some(vec![
                StepConstraint {
                    pose: "standing".into(),
                    min_duration: Some(2.0),
                    max_duration: None,
                    max_gap_after_prev: None,
                },
                StepConstraint::unconstrained("bowing"),
            ]),
        )],
        None,
    )
    .unwrap();
    let rec = recognizer(vec![def]);

    let mut memory = EpisodeMemory::new(50);
    let ticks = [("standing", 0.0), ("standing", 1.0), ("bowing", 1.5)];
    assert!(feed(&rec, &mut memory, &ticks).is_empty());

    let mut memory = EpisodeMemory::new(50);
    let hits = feed(&rec, &mut memory, &[("standing", 0.0), ("standing", 2.5), ("bowing", 3.0)]);
    assert_eq!(hits, vec!["deliberate_bow"]);
}

#[test]
fn test_whole_action_constraint() {
    let def = ActionDefinition::new(
        "quick_drink",
        vec![(labels(&["picking", "drinking"]), None)],
        Some(ActionConstraint {
            min_total_duration: None,
            max_total_duration: Some(3.0),
        }),
    )
    .unwrap();
    let rec = recognizer(vec![def]);

    // Window runs from picking start (0.0) to drinking end (5.0)
    let mut memory = EpisodeMemory::new(50);
    let ticks = [("picking", 0.0), ("drinking", 4.0), ("drinking", 5.0)];
    assert!(feed(&rec, &mut memory, &ticks).is_empty());

    let mut memory = EpisodeMemory::new(50);
    let ticks = [("picking", 0.0), ("drinking", 2.0)];
    assert_eq!(feed(&rec, &mut memory, &ticks), vec!["quick_drink"]);
}

#[test]
fn test_constraint_mismatch_fails_construction() {
    // 1. Length mismatch
    let err = ActionDefinition::new(
        "bad",
        vec![(
            labels(&["standing", "picking"]),
            Some(vec![StepConstraint::unconstrained("standing")]),
        )],
        None,
    )
    .unwrap_err();
    assert_eq!(
        err,
        ConfigError::ConstraintLengthMismatch {
            action: "bad".into(),
            template: 0,
            expected: 2,
            actual: 1,
        }
    );

    // 2. Pose mismatch
    let err = ActionDefinition::new(
        "bad",
        vec![(
            labels(&["standing", "picking"]),
            Some(vec![
                StepConstraint::unconstrained("standing"),
                StepConstraint::unconstrained("walking"),
            ]),
        )],
        None,
    )
    .unwrap_err();
    assert!(matches!(err, ConfigError::ConstraintPoseMismatch { position: 1, .. }));

    // 3. Empty template
    let err = ActionDefinition::new("bad", vec![(Vec::new(), None)], None).unwrap_err();
    assert!(matches!(err, ConfigError::EmptyTemplate { template: 0, .. }));
}

#[test]
fn test_config_fills_constraint_poses_and_checks_vocabulary() {
    let mut config = SystemConfig::default();
    config.step_constraints.insert(
        "picking_objects_from_floor".into(),
        vec![Some(vec![
            StepConstraintConfig::default(),
            StepConstraintConfig {
                max_duration: Some(2.0),
                ..StepConstraintConfig::default()
            },
            StepConstraintConfig::default(),
        ])],
    );

    let defs = config.build_action_definitions().unwrap();
    let template = &defs["picking_objects_from_floor"].templates()[0];
    let steps = template.step_constraints().unwrap();
    assert_eq!(steps[1].pose, "picking");
    assert_eq!(steps[1].max_duration, Some(2.0));

    config.actions.insert("dancing".into(), vec![labels(&["standing", "twirling"])]);
    let err = config.build_action_definitions().unwrap_err();
    assert_eq!(
        err,
        ConfigError::UnknownPose {
            action: "dancing".into(),
            label: "twirling".into(),
        }
    );
}

#[test]
fn test_config_rejects_short_constraint_list() {
    let mut config = SystemConfig::default();
    config.step_constraints.insert(
        "washing_hands".into(),
        vec![Some(vec![StepConstraintConfig::default()])],
    );
    let err = config.build_action_definitions().unwrap_err();
    assert!(matches!(err, ConfigError::ConstraintLengthMismatch { expected: 4, actual: 1, .. }));
}

fn default_templates() -> Vec<(String, Vec<String>)> {
    SystemConfig::default()
        .actions
        .into_iter()
        .flat_map(|(name, templates)| templates.into_iter().map(move |t| (name.clone(), t)))
        .collect()
}

proptest! {
    #[test]
    fn prop_repeats_do_not_change_recognition(
        pick in 0usize..5,
        repeats in proptest::collection::vec(1usize..4, 7),
    ) {
        let config = SystemConfig::default();
        let rec = ActionRecognizer::new(config.build_action_definitions().unwrap());
        let (_, template) = default_templates()[pick].clone();

        // Once each
        let mut once = EpisodeMemory::new(50);
        let mut t = 0.0;
        let mut first = None;
        for label in &template {
            once.ingest(label, t, None);
            first = rec.detect_action(&mut once, t).or(first);
            t += 1.0;
        }

        // Each label repeated
        let mut many = EpisodeMemory::new(50);
        let mut t = 0.0;
        let mut second = None;
        for (label, k) in template.iter().zip(&repeats) {
            for _ in 0..*k {
                many.ingest(label, t, None);
                second = rec.detect_action(&mut many, t).or(second);
                t += 1.0;
            }
        }

        let first = first.map(|i| (i.name, i.matched_sequence));
        let second = second.map(|i| (i.name, i.matched_sequence));
        prop_assert!(first.is_some());
        prop_assert_eq!(first, second);
    }
}
