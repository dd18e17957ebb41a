//! Scheduler tracing.
//!
//! Trace records are a write-only side channel: the scheduler emits them at every
//! emit, dispatch, run and register point, and nothing in recognition or dispatch
//! ever reads them back.

pub mod event;
pub mod metrics;
pub mod recorder;

pub use event::{TraceKind, TraceRecord};
pub use metrics::{compute_stats, TraceStats};
pub use recorder::{JsonlTraceSink, TraceRecorder, TraceSink};
