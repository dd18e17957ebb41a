use std::collections::{BTreeMap, BTreeSet};

use super::event::{TraceKind, TraceRecord};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceStats {
    pub emits: u64,
    pub dispatches: u64,
    pub runs: u64,
    pub registrations: u64,
    /// Distinct non-zero cycle ids seen.
    pub cycles: u64,
    pub runs_by_procedure: BTreeMap<String, u64>,
}

pub fn compute_stats(records: &[TraceRecord]) -> TraceStats {
    let mut stats = TraceStats::default();
    let mut cycles = BTreeSet::new();

    for record in records {
        match record.kind {
            TraceKind::Emit => stats.emits += 1,
            TraceKind::Dispatch => stats.dispatches += 1,
            TraceKind::Register => stats.registrations += 1,
            TraceKind::Run => {
                stats.runs += 1;
                if let Some(name) = &record.procedure_name {
                    *stats.runs_by_procedure.entry(name.clone()).or_default() += 1;
                }
            }
        }
        if record.cycle_id > 0 {
            cycles.insert(record.cycle_id);
        }
    }

    stats.cycles = cycles.len() as u64;
    stats
}
