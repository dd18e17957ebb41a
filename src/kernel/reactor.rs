use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::event::{names, EventPayload, RuntimeEvent};
use super::guard::{Guard, NamedGuard};
use super::intent::{ActionRecognizer, IntentEstimator};
use super::mode::{ModeRequest, SystemMode};
use super::scheduler::{EventScheduler, Outbox, Procedure};
use super::state::{CycleReport, RuntimeContext};
use super::telemetry::TraceSink;
use crate::config::SystemConfig;
use crate::error::Result;
use crate::perception::PoseObservation;
use crate::robot::{build_task_definitions, Actuator, PreparationCoordinator};

/// Totals from one `Reactor::drive` run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DriveSummary {
    pub cycles: usize,
    pub ignored: usize,
    pub dispatched: Vec<String>,
    /// Observations that queued up while a final task held the actuator.
    pub dropped_stale: usize,
}

/// Wires perception, state update, recognition and dispatch onto the event scheduler.
///
/// Per tick: `PoseTick` -> `PoseSegment` -> (`FamilyChanged` -> prepare) and
/// (`ActionRecognized` -> dispatch -> `TaskCompleted` -> episode reset).
pub struct Reactor {
    pub scheduler: EventScheduler<RuntimeContext>,
    pub ctx: RuntimeContext,
    max_events: usize,
}

impl Reactor {
    /// Builds every static definition from `config` and registers the procedures.
    /// Configuration defects surface here, before any tick is processed.
    pub fn from_config(config: &SystemConfig, actuator: Arc<dyn Actuator>) -> Result<Self> {
        Self::new(config, actuator, None)
    }

    /// Like `from_config`, with a trace sink attached before any procedure is
    /// registered so registration records are captured too.
    pub fn new(
        config: &SystemConfig,
        actuator: Arc<dyn Actuator>,
        sink: Option<Box<dyn TraceSink>>,
    ) -> Result<Self> {
        let actions = config.build_action_definitions()?;
        let tasks = build_task_definitions(&config.tasks);
        let pretasks = build_task_definitions(&config.pretasks);

        let estimator = IntentEstimator::build(
            actions.clone(),
            config.family_thresholds(),
            &config.pretask_by_prefix(),
            &pretasks.keys().cloned().collect(),
        )?;
        info!(
            actions = actions.len(),
            families = estimator.families().len(),
            "action catalog built"
        );

        let coordinator = PreparationCoordinator::new(
            tasks,
            pretasks,
            config.action_to_task.clone(),
            actuator,
            config.cancel_join_timeout(),
        );

        let ctx = RuntimeContext::new(
            config.pose_vocabulary.clone(),
            config.thresholds.max_buffer_len,
            ActionRecognizer::new(actions),
            estimator,
            coordinator,
        );

        let mut scheduler = EventScheduler::new(names::POSE_TICK);
        scheduler.set_sink(sink);

        let mut reactor = Self {
            scheduler,
            ctx,
            max_events: config.thresholds.max_events_per_cycle,
        };
        reactor.register_procedures();
        Ok(reactor)
    }

    fn register_procedures(&mut self) {
        let recognizing = || NamedGuard::from(Guard::ModeIs(SystemMode::Recognizing));
        let s = &mut self.scheduler;

        s.register(
            names::POSE_TICK,
            Procedure::new("ingest_pose", ingest_pose)
                .when(recognizing())
                .when(NamedGuard::from(Guard::KnownPose)),
        );
        s.register(
            names::POSE_TICK,
            Procedure::new("reject_unknown_pose", reject_unknown_pose)
                .when(recognizing())
                .when(NamedGuard::from(Guard::not(Guard::KnownPose))),
        );
        s.register(
            names::POSE_SEGMENT,
            Procedure::new("update_human_state", update_human_state).when(recognizing()),
        );
        s.register(
            names::POSE_SEGMENT,
            Procedure::new("estimate_intent", estimate_intent).when(recognizing()),
        );
        s.register(
            names::POSE_SEGMENT,
            Procedure::new("recognize_action", recognize_action).when(recognizing()),
        );
        s.register(
            names::FAMILY_CHANGED,
            Procedure::new("prepare_family", prepare_family).when(recognizing()),
        );
        s.register(
            names::ACTION_RECOGNIZED,
            Procedure::new("dispatch_task", dispatch_task)
                .when(recognizing())
                .when(NamedGuard::from(Guard::HasActor)),
        );
        s.register(
            names::TASK_COMPLETED,
            Procedure::new("reset_episode", reset_episode)
                .when(NamedGuard::from(Guard::ModeIs(SystemMode::ExecutingTask))),
        );
    }

    /// Feeds one perception tick and drains its whole causal chain.
    pub fn observe(&mut self, actor_id: &str, label: &str, t: f64) -> Result<CycleReport> {
        self.observe_with_confidence(actor_id, label, t, None)
    }

    pub fn observe_with_confidence(
        &mut self,
        actor_id: &str,
        label: &str,
        t: f64,
        confidence: Option<f64>,
    ) -> Result<CycleReport> {
        self.ctx.report = CycleReport {
            ignored: self.ctx.mode() != SystemMode::Recognizing,
            ..CycleReport::default()
        };

        self.scheduler.emit(
            names::POSE_TICK,
            EventPayload::PoseTick {
                actor_id: actor_id.to_string(),
                label: label.to_string(),
                confidence,
            },
            t,
        );
        let processed = self.scheduler.run_until_idle(&mut self.ctx, self.max_events)?;

        let mut report = std::mem::take(&mut self.ctx.report);
        report.cycle = self.scheduler.cycle();
        report.events_processed = processed;
        Ok(report)
    }

    pub fn mode(&self) -> SystemMode {
        self.ctx.mode()
    }

    /// Blocking consumer loop for a pose channel. Returns once every sender is gone.
    ///
    /// A final-task dispatch holds this thread for the whole task, so observations
    /// keep queueing meanwhile. They were seen while the actuator was committed and
    /// are discarded once the task completes.
    pub fn drive(&mut self, rx: &mut mpsc::Receiver<PoseObservation>) -> Result<DriveSummary> {
        let mut summary = DriveSummary::default();

        while let Some(obs) = rx.blocking_recv() {
            let report = self.observe(&obs.actor_id, &obs.label, obs.timestamp)?;
            summary.cycles += 1;
            if report.ignored {
                summary.ignored += 1;
            }

            let Some(task) = report.dispatched_task else {
                continue;
            };
            let mut dropped = 0;
            while rx.try_recv().is_ok() {
                dropped += 1;
            }
            if dropped > 0 {
                debug!(task = %task, dropped, "discarded observations queued during task");
            }
            summary.dropped_stale += dropped;
            summary.dispatched.push(task);
        }

        Ok(summary)
    }
}

fn ingest_pose(ctx: &mut RuntimeContext, event: &RuntimeEvent, out: &mut Outbox) -> Result<()> {
    let EventPayload::PoseTick { actor_id, label, confidence } = &event.payload else {
        return Ok(());
    };

    let segment = ctx
        .episodes
        .get_or_insert(actor_id)
        .ingest(label, event.timestamp, *confidence)
        .clone();
    info!(actor = %actor_id, pose = %label, "observed pose");

    out.emit(
        names::POSE_SEGMENT,
        EventPayload::PoseSegment {
            actor_id: actor_id.clone(),
            segment,
        },
        event.timestamp,
    );
    Ok(())
}

fn reject_unknown_pose(
    ctx: &mut RuntimeContext,
    event: &RuntimeEvent,
    _out: &mut Outbox,
) -> Result<()> {
    if let EventPayload::PoseTick { actor_id, label, .. } = &event.payload {
        warn!(actor = %actor_id, pose = %label, "pose label outside vocabulary; tick dropped");
    }
    ctx.report.ignored = true;
    Ok(())
}

fn update_human_state(
    ctx: &mut RuntimeContext,
    event: &RuntimeEvent,
    _out: &mut Outbox,
) -> Result<()> {
    if let EventPayload::PoseSegment { actor_id, segment } = &event.payload {
        ctx.humans
            .get_or_insert(actor_id)
            .update(&segment.label, segment.end_time);
    }
    Ok(())
}

fn estimate_intent(ctx: &mut RuntimeContext, event: &RuntimeEvent, out: &mut Outbox) -> Result<()> {
    let Some(actor_id) = event.payload.actor_id() else {
        return Ok(());
    };

    let intent = ctx
        .estimator
        .compute_early_intent(ctx.episodes.get_or_insert(actor_id));
    debug!(
        actor = %actor_id,
        actions = ?intent.candidate_actions,
        families = ?intent.candidate_families,
        "early intent"
    );

    if let Some(best) = intent.best_family_id {
        if ctx.update_last_family(actor_id, &best) {
            out.emit(
                names::FAMILY_CHANGED,
                EventPayload::FamilyChanged {
                    actor_id: actor_id.to_string(),
                    family_id: best.clone(),
                },
                event.timestamp,
            );
            ctx.report.family_changed = Some(best);
        }
    }
    Ok(())
}

fn recognize_action(
    ctx: &mut RuntimeContext,
    event: &RuntimeEvent,
    out: &mut Outbox,
) -> Result<()> {
    let Some(actor_id) = event.payload.actor_id() else {
        return Ok(());
    };

    let memory = ctx.episodes.get_or_insert(actor_id);
    if let Some(instance) = ctx.recognizer.detect_action(memory, event.timestamp) {
        info!(
            actor = %actor_id,
            action = %instance.name,
            start = instance.start_time,
            "action recognized"
        );
        ctx.report.recognized = Some(instance.clone());
        out.emit(
            names::ACTION_RECOGNIZED,
            EventPayload::ActionRecognized {
                actor_id: actor_id.to_string(),
                instance,
            },
            event.timestamp,
        );
    }
    Ok(())
}

fn prepare_family(ctx: &mut RuntimeContext, event: &RuntimeEvent, _out: &mut Outbox) -> Result<()> {
    let EventPayload::FamilyChanged { actor_id, family_id } = &event.payload else {
        return Ok(());
    };
    let Some(family) = ctx.estimator.family(family_id) else {
        return Ok(());
    };

    let outcome = ctx.coordinator.prepare_family(actor_id, family)?;
    ctx.report.preparation = Some(outcome);
    Ok(())
}

fn dispatch_task(ctx: &mut RuntimeContext, event: &RuntimeEvent, out: &mut Outbox) -> Result<()> {
    let EventPayload::ActionRecognized { actor_id, instance } = &event.payload else {
        return Ok(());
    };

    ctx.request_mode(ModeRequest::FreezeForTask);
    let memory = ctx.episodes.get_or_insert(actor_id);
    let task = match ctx.coordinator.dispatch(actor_id, instance, memory) {
        Ok(task) => task,
        Err(e) => {
            ctx.request_mode(ModeRequest::UnfreezeAfterTask);
            return Err(e.into());
        }
    };

    ctx.report.dispatched_task = Some(task.clone());
    out.emit(
        names::TASK_COMPLETED,
        EventPayload::TaskCompleted {
            actor_id: actor_id.clone(),
            task,
        },
        event.timestamp,
    );
    Ok(())
}

fn reset_episode(ctx: &mut RuntimeContext, event: &RuntimeEvent, _out: &mut Outbox) -> Result<()> {
    let EventPayload::TaskCompleted { actor_id, task } = &event.payload else {
        return Ok(());
    };

    ctx.episodes.get_or_insert(actor_id).clear();
    ctx.forget_family(actor_id);
    ctx.request_mode(ModeRequest::UnfreezeAfterTask);
    info!(actor = %actor_id, last_task = %task, "episode reset; ready for next episode");
    Ok(())
}
