use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceKind {
    /// An event was enqueued.
    Emit,
    /// An event was popped and is about to fan out to its procedures.
    Dispatch,
    /// A procedure passed its conditions and ran.
    Run,
    /// A procedure was bound to an event name.
    Register,
}

/// One observability record. Consumed by external sinks, never read back by the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TraceRecord {
    pub timestamp: Option<f64>,
    pub sequence: u64,
    pub cycle_id: u64,
    pub kind: TraceKind,
    pub event_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub procedure_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub actor_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload_summary: Option<String>,
}
