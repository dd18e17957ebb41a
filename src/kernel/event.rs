use serde::{Deserialize, Serialize};

use super::intent::types::ActionInstance;
use super::memory::PoseSegment;

/// Names of the events flowing through one recognition cycle.
pub mod names {
    pub const POSE_TICK: &str = "PoseTick";
    pub const POSE_SEGMENT: &str = "PoseSegment";
    pub const FAMILY_CHANGED: &str = "FamilyChanged";
    pub const ACTION_RECOGNIZED: &str = "ActionRecognized";
    pub const TASK_COMPLETED: &str = "TaskCompleted";
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "data")]
pub enum EventPayload {
    Empty,
    PoseTick {
        actor_id: String,
        label: String,
        confidence: Option<f64>,
    },
    PoseSegment {
        actor_id: String,
        segment: PoseSegment,
    },
    FamilyChanged {
        actor_id: String,
        family_id: String,
    },
    ActionRecognized {
        actor_id: String,
        instance: ActionInstance,
    },
    TaskCompleted {
        actor_id: String,
        task: String,
    },
}

impl EventPayload {
    pub fn actor_id(&self) -> Option<&str> {
        match self {
            EventPayload::Empty => None,
            EventPayload::PoseTick { actor_id, .. }
            | EventPayload::PoseSegment { actor_id, .. }
            | EventPayload::FamilyChanged { actor_id, .. }
            | EventPayload::ActionRecognized { actor_id, .. }
            | EventPayload::TaskCompleted { actor_id, .. } => Some(actor_id),
        }
    }

    /// Short human-readable digest. Each value is capped at `max_len` characters.
    pub fn summary(&self, max_len: usize) -> String {
        let cap = |value: &str| truncate(value, max_len);
        match self {
            EventPayload::Empty => String::new(),
            EventPayload::PoseTick { label, .. } => format!("label={}", cap(label)),
            EventPayload::PoseSegment { segment, .. } => {
                format!("PoseSegment(label={})", cap(&segment.label))
            }
            EventPayload::FamilyChanged { family_id, .. } => format!("family={}", cap(family_id)),
            EventPayload::ActionRecognized { instance, .. } => {
                format!("ActionInstance(name={})", cap(&instance.name))
            }
            EventPayload::TaskCompleted { task, .. } => format!("task={}", cap(task)),
        }
    }
}

/// A queued event. `sequence` is globally monotonic, `cycle` groups one tick's chain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RuntimeEvent {
    pub sequence: u64,
    pub cycle: u64,
    pub name: String,
    pub payload: EventPayload,
    pub timestamp: f64,
}

pub(crate) fn truncate(text: &str, max_len: usize) -> String {
    if text.chars().count() <= max_len {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_len.saturating_sub(1)).collect();
    out.push('…');
    out
}
