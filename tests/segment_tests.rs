use pose_intent::kernel::memory::{ActorMap, EpisodeMemory, HumanState};
use proptest::prelude::*;

#[test]
fn test_repeated_labels_extend_one_segment() {
    let mut memory = EpisodeMemory::new(10);

    memory.ingest("sitting", 0.0, None);
    memory.ingest("sitting", 0.5, None);
    let seg = memory.ingest("sitting", 1.0, Some(0.8)).clone();

    assert_eq!(memory.len(), 1, "Identical labels must compress into one segment");
    assert_eq!(seg.start_time, 0.0);
    assert_eq!(seg.end_time, 1.0);
    assert_eq!(seg.duration(), 1.0);
    assert_eq!(seg.confidence, Some(0.8));

    memory.ingest("standing", 1.5, None);
    assert_eq!(memory.labels(), vec!["sitting", "standing"]);
    assert_eq!(memory.last_label(), Some("standing"));
}

#[test]
fn test_out_of_order_timestamp_never_shrinks_segment() {
    let mut memory = EpisodeMemory::new(10);
    memory.ingest("walking", 2.0, None);
    memory.ingest("walking", 3.0, None);
    memory.ingest("walking", 2.5, None);

    let seg = &memory.segments()[0];
    assert_eq!(seg.end_time, 3.0);
}

#[test]
fn test_overflow_drops_oldest() {
    let mut memory = EpisodeMemory::new(3);
    for (i, label) in ["a", "b", "c", "d", "e"].iter().enumerate() {
        memory.ingest(label, i as f64, None);
    }

    assert_eq!(memory.len(), 3);
    assert_eq!(memory.labels(), vec!["c", "d", "e"]);
    assert_eq!(memory.tail(2).iter().map(|s| s.label.as_str()).collect::<Vec<_>>(), vec!["d", "e"]);
}

#[test]
fn test_clear_keeps_actor_entry() {
    let mut episodes: ActorMap<EpisodeMemory> = ActorMap::new(|_| EpisodeMemory::new(5));

    episodes.get_or_insert("human_1").ingest("sitting", 0.0, None);
    episodes.get_or_insert("human_1").executed_tasks.push("task".into());
    episodes.get_or_insert("human_1").clear();

    assert!(episodes.contains("human_1"), "Reset empties the episode, never removes the actor");
    let memory = episodes.get("human_1").unwrap();
    assert!(memory.is_empty());
    assert!(memory.executed_tasks.is_empty());
    assert_eq!(memory.max_segments(), 5);
}

#[test]
fn test_actor_map_is_lazy_and_sorted() {
    let mut humans: ActorMap<HumanState> = ActorMap::new(HumanState::new);
    assert!(humans.is_empty());

    humans.get_or_insert("zed").update("sitting", 1.0);
    humans.get_or_insert("amy").update("walking", 2.0);

    assert_eq!(humans.actors(), vec!["amy", "zed"]);
    let amy = humans.get("amy").unwrap();
    assert_eq!(amy.actor_id, "amy");
    assert_eq!(amy.current_pose.as_deref(), Some("walking"));
    assert_eq!(amy.last_update_time, Some(2.0));
}

proptest! {
    #[test]
    fn prop_buffer_is_bounded_and_compressed(
        labels in proptest::collection::vec(prop::sample::select(vec!["a", "b", "c"]), 0..200),
        max in 1usize..20,
    ) {
        let mut memory = EpisodeMemory::new(max);
        for (i, label) in labels.iter().enumerate() {
            memory.ingest(label, i as f64, None);
        }

        prop_assert!(memory.len() <= max);
        let seen = memory.labels();
        for pair in seen.windows(2) {
            prop_assert_ne!(&pair[0], &pair[1]);
        }
        for seg in memory.segments() {
            prop_assert!(seg.start_time <= seg.end_time);
        }
    }
}
