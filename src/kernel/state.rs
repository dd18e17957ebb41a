use std::collections::{BTreeSet, HashMap};

use super::intent::{ActionInstance, ActionRecognizer, IntentEstimator};
use super::memory::{ActorMap, EpisodeMemory, HumanState};
use super::mode::{ModeGraph, ModeRequest, SystemMode};
use crate::robot::{PrepareOutcome, PreparationCoordinator};

/// The single context value handed to every procedure. Built once per run.
pub struct RuntimeContext {
    mode: SystemMode,
    pub vocabulary: BTreeSet<String>,
    pub episodes: ActorMap<EpisodeMemory>,
    pub humans: ActorMap<HumanState>,
    pub recognizer: ActionRecognizer,
    pub estimator: IntentEstimator,
    pub coordinator: PreparationCoordinator,
    last_family: HashMap<String, String>,
    pub(crate) report: CycleReport,
}

/// What happened during one tick's causal chain.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CycleReport {
    pub cycle: u64,
    pub events_processed: usize,
    /// The tick was dropped: unknown label, or the actuator was committed.
    pub ignored: bool,
    pub family_changed: Option<String>,
    pub preparation: Option<PrepareOutcome>,
    pub recognized: Option<ActionInstance>,
    pub dispatched_task: Option<String>,
}

impl RuntimeContext {
    pub fn new(
        vocabulary: BTreeSet<String>,
        max_buffer_len: usize,
        recognizer: ActionRecognizer,
        estimator: IntentEstimator,
        coordinator: PreparationCoordinator,
    ) -> Self {
        Self {
            mode: SystemMode::Recognizing,
            vocabulary,
            episodes: ActorMap::new(move |_| EpisodeMemory::new(max_buffer_len)),
            humans: ActorMap::new(HumanState::new),
            recognizer,
            estimator,
            coordinator,
            last_family: HashMap::new(),
            report: CycleReport::default(),
        }
    }

    pub fn mode(&self) -> SystemMode {
        self.mode
    }

    /// Applies a mode request through the transition graph. Returns whether the mode changed.
    pub fn request_mode(&mut self, request: ModeRequest) -> bool {
        match ModeGraph::transition(self.mode, request) {
            Some(next) => {
                self.mode = next;
                true
            }
            None => false,
        }
    }

    pub fn last_family(&self, actor_id: &str) -> Option<&str> {
        self.last_family.get(actor_id).map(String::as_str)
    }

    /// Records the actor's best family. Returns `true` when it differs from the previous one.
    pub(crate) fn update_last_family(&mut self, actor_id: &str, family_id: &str) -> bool {
        if self.last_family(actor_id) == Some(family_id) {
            return false;
        }
        self.last_family.insert(actor_id.to_string(), family_id.to_string());
        true
    }

    pub(crate) fn forget_family(&mut self, actor_id: &str) {
        self.last_family.remove(actor_id);
    }
}
