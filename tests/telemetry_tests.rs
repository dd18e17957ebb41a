use std::fs;
use std::time::{SystemTime, UNIX_EPOCH};

use pose_intent::kernel::event::EventPayload;
use pose_intent::kernel::memory::PoseSegment;
use pose_intent::kernel::telemetry::{
    compute_stats, JsonlTraceSink, TraceKind, TraceRecord, TraceRecorder, TraceSink,
};

fn record(kind: TraceKind, cycle_id: u64, procedure: Option<&str>) -> TraceRecord {
    TraceRecord {
        timestamp: Some(0.0),
        sequence: 1,
        cycle_id,
        kind,
        event_name: "PoseTick".into(),
        procedure_name: procedure.map(str::to_string),
        actor_id: None,
        payload_summary: None,
    }
}

#[test]
fn test_jsonl_sink_appends_lines() {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).unwrap().as_nanos();
    let path = std::env::temp_dir()
        .join(format!("pose_intent_trace_{nanos}"))
        .join("trace.jsonl");

    // 1. Parent directories are created on open
    let mut sink = JsonlTraceSink::open(&path, false).unwrap();
    assert!(!sink.include_payload());
    sink.write(&record(TraceKind::Emit, 1, None));
    sink.write(&record(TraceKind::Run, 1, Some("ingest_pose")));
    drop(sink);

    // 2. Reopening appends instead of truncating
    let mut sink = JsonlTraceSink::open(&path, true).unwrap();
    assert_eq!(sink.path(), path.as_path());
    sink.write(&record(TraceKind::Dispatch, 2, None));
    drop(sink);

    let text = fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);

    let parsed: TraceRecord = serde_json::from_str(lines[1]).unwrap();
    assert_eq!(parsed.kind, TraceKind::Run);
    assert_eq!(parsed.procedure_name.as_deref(), Some("ingest_pose"));

    // Absent optional fields are omitted, kinds are snake_case
    let raw: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(raw["kind"], "emit");
    assert!(raw.get("procedure_name").is_none());

    let _ = fs::remove_dir_all(path.parent().unwrap());
}

#[test]
fn test_recorder_is_bounded_and_shared() {
    let recorder = TraceRecorder::with_capacity(3);
    let mut writer = recorder.clone();

    for cycle in 1..=5 {
        writer.write(&record(TraceKind::Emit, cycle, None));
    }

    let cycles: Vec<u64> = recorder.records().iter().map(|r| r.cycle_id).collect();
    assert_eq!(cycles, vec![3, 4, 5], "Oldest records are dropped first");

    recorder.clear();
    assert!(writer.is_empty());
}

#[test]
fn test_stats_count_by_kind() {
    let records = vec![
        record(TraceKind::Register, 0, Some("ingest_pose")),
        record(TraceKind::Emit, 1, None),
        record(TraceKind::Dispatch, 1, None),
        record(TraceKind::Run, 1, Some("ingest_pose")),
        record(TraceKind::Run, 2, Some("ingest_pose")),
        record(TraceKind::Run, 2, Some("estimate_intent")),
    ];

    let stats = compute_stats(&records);
    assert_eq!(stats.registrations, 1);
    assert_eq!(stats.emits, 1);
    assert_eq!(stats.dispatches, 1);
    assert_eq!(stats.runs, 3);
    assert_eq!(stats.cycles, 2, "Registration-time records are outside any cycle");
    assert_eq!(stats.runs_by_procedure.get("ingest_pose"), Some(&2));
}

#[test]
fn test_payload_summary_truncates_each_value() {
    let payload = EventPayload::PoseSegment {
        actor_id: "human_1".into(),
        segment: PoseSegment::new("raising_hand", 1.0),
    };
    assert_eq!(payload.summary(120), "PoseSegment(label=raising_hand)");
    assert_eq!(payload.actor_id(), Some("human_1"));

    // The cap applies to the value, not to the whole digest
    assert_eq!(payload.summary(6), "PoseSegment(label=raisi…)");

    let family = EventPayload::FamilyChanged {
        actor_id: "human_1".into(),
        family_id: "F_sitting_standing_walking_picking".into(),
    };
    let short = family.summary(10);
    assert_eq!(short, "family=F_sitting…");
    assert_eq!(short.trim_start_matches("family=").chars().count(), 10);
    assert_eq!(EventPayload::Empty.actor_id(), None);
}
