use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::info;

use super::task::{BehaviorStep, TaskDefinition};

/// Step-execution collaborator. Implementations check the token at sub-step
/// granularity and return `false` when a step was cut short or never started.
pub trait Actuator: Send + Sync {
    fn run_step(&self, task: &str, step: &BehaviorStep, cancel: &CancellationToken) -> bool;

    /// Runs every step in order. Returns `true` only if all of them completed.
    fn execute(&self, task: &TaskDefinition, cancel: &CancellationToken) -> bool {
        info!(task = %task.name, "starting task");
        for step in &task.steps {
            if cancel.is_cancelled() {
                info!(task = %task.name, "task cancelled");
                return false;
            }
            if !self.run_step(&task.name, step, cancel) {
                info!(task = %task.name, step = %step.name, "task cancelled during step");
                return false;
            }
        }
        info!(task = %task.name, "completed task");
        true
    }
}

/// What the simulated actuator did for one step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepRecord {
    pub task: String,
    pub step: String,
    pub started: Instant,
    pub finished: Instant,
    pub completed: bool,
}

/// Simulated robot: every step dwells a fixed time, polling the token each tick.
#[derive(Debug, Clone)]
pub struct SimulatedActuator {
    robot_id: String,
    step_duration: Duration,
    poll_interval: Duration,
    log: Arc<Mutex<Vec<StepRecord>>>,
}

impl SimulatedActuator {
    pub fn new(
        robot_id: impl Into<String>,
        step_duration: Duration,
        poll_interval: Duration,
    ) -> Self {
        Self {
            robot_id: robot_id.into(),
            step_duration,
            poll_interval: poll_interval.max(Duration::from_millis(1)),
            log: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn robot_id(&self) -> &str {
        &self.robot_id
    }

    /// Steps run so far, in start order. Steps cancelled before starting are absent.
    pub fn step_log(&self) -> Vec<StepRecord> {
        match self.log.lock() {
            Ok(log) => log.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl Actuator for SimulatedActuator {
    fn run_step(&self, task: &str, step: &BehaviorStep, cancel: &CancellationToken) -> bool {
        if cancel.is_cancelled() {
            info!(robot = %self.robot_id, step = %step.name, "behavior cancelled before start");
            return false;
        }

        match &step.params {
            Some(params) => info!(robot = %self.robot_id, step = %step.name, ?params, "behavior"),
            None => info!(robot = %self.robot_id, step = %step.name, "behavior"),
        }

        let started = Instant::now();
        let mut remaining = self.step_duration;
        let mut completed = true;
        while !remaining.is_zero() {
            if cancel.is_cancelled() {
                info!(robot = %self.robot_id, step = %step.name, "behavior cancelled mid-step");
                completed = false;
                break;
            }
            let dt = remaining.min(self.poll_interval);
            thread::sleep(dt);
            remaining -= dt;
        }

        let record = StepRecord {
            task: task.to_string(),
            step: step.name.clone(),
            started,
            finished: Instant::now(),
            completed,
        };
        match self.log.lock() {
            Ok(mut log) => log.push(record),
            Err(poisoned) => poisoned.into_inner().push(record),
        }

        completed
    }
}
