use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::{DetectorMode, SimulationSettings, SystemConfig};

/// One labeled perception tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseObservation {
    pub actor_id: String,
    pub label: String,
    pub timestamp: f64,
}

/// Simulated pose source.
///
/// `Random` draws a uniform pose every tick. `ActionSequence` picks an action and one
/// of its templates, repeats each label for a random dwell, then optionally emits a
/// few noise poses before the next action.
pub struct PoseDetectorSim {
    mode: DetectorMode,
    poses: Vec<String>,
    actions: BTreeMap<String, Vec<Vec<String>>>,
    settings: SimulationSettings,
    rng: StdRng,
    pending: VecDeque<String>,
}

impl PoseDetectorSim {
    pub fn new(config: &SystemConfig) -> Self {
        let rng = match config.simulation.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Self {
            mode: config.simulation.detector_mode,
            poses: config.pose_vocabulary.iter().cloned().collect(),
            actions: config.actions.clone(),
            settings: config.simulation.clone(),
            rng,
            pending: VecDeque::new(),
        }
    }

    /// Next label in the stream. Falls back to random poses when no action has a template.
    pub fn next_label(&mut self) -> Option<String> {
        if self.mode == DetectorMode::ActionSequence && self.pending.is_empty() {
            self.plan_action();
        }
        if let Some(label) = self.pending.pop_front() {
            return Some(label);
        }
        self.random_pose()
    }

    fn random_pose(&mut self) -> Option<String> {
        self.poses.choose(&mut self.rng).cloned()
    }

    fn dwell(&mut self, min: u32, max: u32) -> u32 {
        if max <= min {
            min
        } else {
            self.rng.gen_range(min..=max)
        }
    }

    fn plan_action(&mut self) {
        let names: Vec<&String> = self.actions.keys().collect();
        let Some(action) = names.choose(&mut self.rng).map(|s| s.to_string()) else {
            return;
        };
        let Some(template) = self
            .actions
            .get(&action)
            .and_then(|t| t.choose(&mut self.rng))
            .cloned()
        else {
            return;
        };
        debug!(action = %action, template = ?template, "simulating action");

        let dwell_min = self.settings.dwell_ticks_min.max(1);
        let dwell_max = self.settings.dwell_ticks_max.max(1);
        for label in template {
            let repeats = self.dwell(dwell_min, dwell_max);
            for _ in 0..repeats {
                self.pending.push_back(label.clone());
            }
        }

        if self.settings.noise_between_actions {
            let noise = self.dwell(self.settings.noise_ticks_min, self.settings.noise_ticks_max);
            for _ in 0..noise {
                if let Some(pose) = self.random_pose() {
                    self.pending.push_back(pose);
                }
            }
        }
    }

    /// Emits one observation per `tick` until cancelled or the receiver goes away.
    pub async fn run(
        mut self,
        tx: mpsc::Sender<PoseObservation>,
        tick: Duration,
        cancel: CancellationToken,
    ) {
        let actor_id = self.settings.actor_id.clone();
        let started = Instant::now();
        let mut cadence = interval(tick.max(Duration::from_millis(1)));
        cadence.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(mode = ?self.mode, tick_ms = tick.as_millis() as u64, "pose detector started");
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = cadence.tick() => {}
            }

            let Some(label) = self.next_label() else {
                break;
            };
            let observation = PoseObservation {
                actor_id: actor_id.clone(),
                label,
                timestamp: started.elapsed().as_secs_f64(),
            };
            if tx.send(observation).await.is_err() {
                break;
            }
        }
        info!("pose detector stopped");
    }
}
