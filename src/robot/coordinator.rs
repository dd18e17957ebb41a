use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::actuator::Actuator;
use super::task::TaskDefinition;
use crate::error::DispatchError;
use crate::kernel::intent::types::{ActionFamily, ActionInstance};
use crate::kernel::memory::EpisodeMemory;

/// Who currently owns the actuator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActuatorState {
    Idle,
    Preparing,
    Executing,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrepareOutcome {
    /// The family has no pretask attached.
    NoPretask,
    /// The same (actor, family) preparation is still running.
    AlreadyRunning,
    Started { pretask: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Nothing was running.
    Idle,
    /// The routine observed the token and exited within the timeout.
    Joined,
    /// The routine is still finishing its current step; it was detached.
    TimedOut,
}

/// Read-only view of whether a final task currently holds the actuator. Clones can be
/// handed to other threads, including the actuator itself.
#[derive(Debug, Clone, Default)]
pub struct ActuatorMonitor {
    executing: Arc<AtomicBool>,
}

impl ActuatorMonitor {
    pub fn is_executing(&self) -> bool {
        self.executing.load(Ordering::Acquire)
    }

    fn set_executing(&self, value: bool) {
        self.executing.store(value, Ordering::Release);
    }
}

/// A preparation that was started, kept for inspection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparationRecord {
    pub actor_id: String,
    pub family_id: String,
    pub pretask: String,
}

struct Preparation {
    actor_id: String,
    family_id: String,
    cancel: CancellationToken,
    done: mpsc::Receiver<bool>,
    handle: JoinHandle<()>,
}

impl Preparation {
    fn is_running(&self) -> bool {
        !self.handle.is_finished()
    }
}

/// Owns the single shared actuator. Speculative pretasks run on a background thread;
/// a committed dispatch always cancels and joins them first.
pub struct PreparationCoordinator {
    tasks: BTreeMap<String, TaskDefinition>,
    pretasks: BTreeMap<String, TaskDefinition>,
    action_to_task: BTreeMap<String, String>,
    actuator: Arc<dyn Actuator>,
    join_timeout: Duration,
    running: Option<Preparation>,
    prepared: Option<(String, String)>,
    monitor: ActuatorMonitor,
    history: Vec<PreparationRecord>,
}

impl PreparationCoordinator {
    pub fn new(
        tasks: BTreeMap<String, TaskDefinition>,
        pretasks: BTreeMap<String, TaskDefinition>,
        action_to_task: BTreeMap<String, String>,
        actuator: Arc<dyn Actuator>,
        join_timeout: Duration,
    ) -> Self {
        Self {
            tasks,
            pretasks,
            action_to_task,
            actuator,
            join_timeout,
            running: None,
            prepared: None,
            monitor: ActuatorMonitor::default(),
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> ActuatorState {
        if self.monitor.is_executing() {
            ActuatorState::Executing
        } else if self.running.as_ref().is_some_and(Preparation::is_running) {
            ActuatorState::Preparing
        } else {
            ActuatorState::Idle
        }
    }

    pub fn monitor(&self) -> ActuatorMonitor {
        self.monitor.clone()
    }

    /// The (actor, family) pair the last preparation targeted.
    pub fn prepared(&self) -> Option<(&str, &str)> {
        self.prepared.as_ref().map(|(a, f)| (a.as_str(), f.as_str()))
    }

    pub fn preparation_history(&self) -> &[PreparationRecord] {
        &self.history
    }

    /// Starts the family's pretask in the background, replacing any other running
    /// preparation. Idempotent while the same (actor, family) preparation is running.
    pub fn prepare_family(
        &mut self,
        actor_id: &str,
        family: &ActionFamily,
    ) -> Result<PrepareOutcome, DispatchError> {
        let Some(pretask_name) = family.pretask.as_deref() else {
            return Ok(PrepareOutcome::NoPretask);
        };

        if let Some(current) = &self.running {
            if current.actor_id == actor_id
                && current.family_id == family.family_id
                && current.is_running()
            {
                debug!(
                    actor = %actor_id,
                    family = %family.family_id,
                    "preparation already running"
                );
                return Ok(PrepareOutcome::AlreadyRunning);
            }
        }

        let task = self
            .pretasks
            .get(pretask_name)
            .cloned()
            .ok_or_else(|| DispatchError::UnknownPretask(pretask_name.to_string()))?;

        self.cancel_preparation();

        info!(
            actor = %actor_id,
            family = %family.family_id,
            prefix = ?family.prefix,
            pretask = %pretask_name,
            "starting preparation"
        );

        let cancel = CancellationToken::new();
        let (done_tx, done_rx) = mpsc::channel();
        let actuator = Arc::clone(&self.actuator);
        let token = cancel.clone();
        let handle = thread::spawn(move || {
            let finished = actuator.execute(&task, &token);
            let _ = done_tx.send(finished);
        });

        self.running = Some(Preparation {
            actor_id: actor_id.to_string(),
            family_id: family.family_id.clone(),
            cancel,
            done: done_rx,
            handle,
        });
        self.prepared = Some((actor_id.to_string(), family.family_id.clone()));
        self.history.push(PreparationRecord {
            actor_id: actor_id.to_string(),
            family_id: family.family_id.clone(),
            pretask: pretask_name.to_string(),
        });

        Ok(PrepareOutcome::Started {
            pretask: pretask_name.to_string(),
        })
    }

    /// Signals the running preparation and waits up to the join timeout for it to
    /// exit. A timeout is logged and tolerated: the routine only performs reversible
    /// motions and stops at its next poll.
    pub fn cancel_preparation(&mut self) -> JoinOutcome {
        let Some(prep) = self.running.take() else {
            return JoinOutcome::Idle;
        };

        prep.cancel.cancel();
        match prep.done.recv_timeout(self.join_timeout) {
            Ok(_) | Err(RecvTimeoutError::Disconnected) => {
                if prep.handle.join().is_err() {
                    warn!(family = %prep.family_id, "preparation thread panicked");
                }
                debug!(actor = %prep.actor_id, family = %prep.family_id, "preparation joined");
                JoinOutcome::Joined
            }
            Err(RecvTimeoutError::Timeout) => {
                warn!(
                    actor = %prep.actor_id,
                    family = %prep.family_id,
                    timeout_ms = self.join_timeout.as_millis() as u64,
                    "preparation did not stop within timeout; proceeding"
                );
                JoinOutcome::TimedOut
            }
        }
    }

    /// Commits the actuator to the task mapped to `instance`. Cancels and joins any
    /// preparation first, then runs every step on the calling thread. The task name
    /// is appended to the actor's executed-task history.
    pub fn dispatch(
        &mut self,
        actor_id: &str,
        instance: &ActionInstance,
        memory: &mut EpisodeMemory,
    ) -> Result<String, DispatchError> {
        self.cancel_preparation();
        self.prepared = None;

        let task_name = self
            .action_to_task
            .get(&instance.name)
            .cloned()
            .ok_or_else(|| DispatchError::NoTaskMapping(instance.name.clone()))?;
        let task = self.tasks.get(&task_name).ok_or_else(|| DispatchError::UnknownTask {
            action: instance.name.clone(),
            task: task_name.clone(),
        })?;

        info!(
            actor = %actor_id,
            action = %instance.name,
            task = %task_name,
            "action recognized; dispatching task"
        );

        self.monitor.set_executing(true);
        self.actuator.execute(task, &CancellationToken::new());
        self.monitor.set_executing(false);

        memory.executed_tasks.push(task_name.clone());
        Ok(task_name)
    }
}

impl Drop for PreparationCoordinator {
    fn drop(&mut self) {
        if let Some(prep) = self.running.take() {
            prep.cancel.cancel();
        }
    }
}
