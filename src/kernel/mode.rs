use serde::{Deserialize, Serialize};

/// Global coordination mode. One per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemMode {
    /// Poses are ingested, intent is estimated, actions are recognized.
    Recognizing,
    /// The actuator is committed to a final task. Incoming ticks are ignored.
    ExecutingTask,
}

impl Default for SystemMode {
    fn default() -> Self {
        Self::Recognizing
    }
}

/// Requests a mode change. The transition graph decides whether it applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModeRequest {
    FreezeForTask,
    UnfreezeAfterTask,
}

pub struct ModeGraph;

impl ModeGraph {
    /// Pure function: (current, request) -> new mode, or `None` if the request does
    /// not apply in the current mode.
    pub fn transition(current: SystemMode, request: ModeRequest) -> Option<SystemMode> {
        use ModeRequest::*;
        use SystemMode::*;

        match (current, request) {
            (Recognizing, FreezeForTask) => Some(ExecutingTask),
            (ExecutingTask, UnfreezeAfterTask) => Some(Recognizing),
            _ => None,
        }
    }
}
