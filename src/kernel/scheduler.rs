use std::collections::{HashMap, VecDeque};

use tracing::trace;

use super::event::{EventPayload, RuntimeEvent};
use super::telemetry::{TraceKind, TraceRecord, TraceSink};
use crate::error::Result;

/// Default cap on events drained by one `run_until_idle` call.
pub const DEFAULT_MAX_EVENTS: usize = 1000;

const SUMMARY_MAX_LEN: usize = 120;

/// A named boolean predicate over (context, event). Conditions are plain values so
/// they can be built, combined and tested apart from any procedure.
pub trait Condition<C>: Send {
    fn name(&self) -> &str;
    fn holds(&self, ctx: &C, event: &RuntimeEvent) -> bool;
}

/// Events a procedure wants emitted once it returns. They go to the tail of the queue.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<(String, EventPayload, f64)>,
}

impl Outbox {
    pub fn emit(&mut self, name: &str, payload: EventPayload, timestamp: f64) {
        self.pending.push((name.to_string(), payload, timestamp));
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

type ProcedureBody<C> = Box<dyn FnMut(&mut C, &RuntimeEvent, &mut Outbox) -> Result<()> + Send>;

/// A named unit of work bound to an event name, gated by a conjunction of conditions.
pub struct Procedure<C> {
    name: String,
    conditions: Vec<Box<dyn Condition<C>>>,
    body: ProcedureBody<C>,
}

impl<C> Procedure<C> {
    pub fn new(
        name: impl Into<String>,
        body: impl FnMut(&mut C, &RuntimeEvent, &mut Outbox) -> Result<()> + Send + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            conditions: Vec::new(),
            body: Box::new(body),
        }
    }

    pub fn when(mut self, condition: impl Condition<C> + 'static) -> Self {
        self.conditions.push(Box::new(condition));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// All conditions must hold. No conditions means always runnable.
    pub fn can_run(&self, ctx: &C, event: &RuntimeEvent) -> bool {
        self.conditions.iter().all(|c| c.holds(ctx, event))
    }
}

/// Single-threaded FIFO event bus.
///
/// One event is fully resolved (every matching procedure run, in registration order)
/// before the next is popped. Events emitted by procedures are appended to the same
/// queue, never dispatched recursively.
pub struct EventScheduler<C> {
    routes: HashMap<String, Vec<Procedure<C>>>,
    queue: VecDeque<RuntimeEvent>,
    tick_event: String,
    sequence: u64,
    cycle: u64,
    sink: Option<Box<dyn TraceSink>>,
}

impl<C> EventScheduler<C> {
    /// `tick_event` is the event name that opens a new cycle.
    pub fn new(tick_event: impl Into<String>) -> Self {
        Self {
            routes: HashMap::new(),
            queue: VecDeque::new(),
            tick_event: tick_event.into(),
            sequence: 0,
            cycle: 0,
            sink: None,
        }
    }

    pub fn with_sink(mut self, sink: Box<dyn TraceSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn set_sink(&mut self, sink: Option<Box<dyn TraceSink>>) {
        self.sink = sink;
    }

    pub fn register(&mut self, event_name: &str, procedure: Procedure<C>) {
        trace!("register      on={}  proc={}", event_name, procedure.name);
        self.record(TraceKind::Register, event_name, Some(procedure.name()), None, None);
        self.routes
            .entry(event_name.to_string())
            .or_default()
            .push(procedure);
    }

    pub fn emit(&mut self, name: &str, payload: EventPayload, timestamp: f64) {
        self.sequence += 1;
        if name == self.tick_event {
            self.cycle += 1;
        }

        let event = RuntimeEvent {
            sequence: self.sequence,
            cycle: self.cycle,
            name: name.to_string(),
            payload,
            timestamp,
        };
        trace!("emit   #{:05}  {}", event.sequence, event.name);
        self.record(TraceKind::Emit, name, None, Some(&event.payload), Some(timestamp));
        self.queue.push_back(event);
    }

    /// Drains the queue until empty or `max_events` have been dispatched. Hitting the
    /// cap just stops draining; the remaining events stay queued. A procedure error
    /// aborts the drain and is returned.
    pub fn run_until_idle(&mut self, ctx: &mut C, max_events: usize) -> Result<usize> {
        let mut processed = 0;
        while processed < max_events {
            let Some(event) = self.queue.pop_front() else {
                break;
            };
            processed += 1;
            self.dispatch(ctx, &event)?;
        }
        Ok(processed)
    }

    fn dispatch(&mut self, ctx: &mut C, event: &RuntimeEvent) -> Result<()> {
        trace!("dispatch        {}", event.name);
        self.record(
            TraceKind::Dispatch,
            &event.name,
            None,
            Some(&event.payload),
            Some(event.timestamp),
        );

        // Taken out so procedures can be borrowed mutably alongside the trace sink.
        let Some(mut procedures) = self.routes.remove(&event.name) else {
            return Ok(());
        };

        let mut outcome = Ok(());
        for procedure in procedures.iter_mut() {
            if !procedure.can_run(ctx, event) {
                continue;
            }

            trace!("run            proc={}  on={}", procedure.name, event.name);
            self.record(
                TraceKind::Run,
                &event.name,
                Some(procedure.name.as_str()),
                Some(&event.payload),
                Some(event.timestamp),
            );

            let mut outbox = Outbox::default();
            let result = (procedure.body)(ctx, event, &mut outbox);
            for (name, payload, timestamp) in outbox.pending {
                self.emit(&name, payload, timestamp);
            }
            if let Err(e) = result {
                outcome = Err(e);
                break;
            }
        }

        self.routes.insert(event.name.clone(), procedures);
        outcome
    }

    fn record(
        &mut self,
        kind: TraceKind,
        event_name: &str,
        procedure: Option<&str>,
        payload: Option<&EventPayload>,
        timestamp: Option<f64>,
    ) {
        let Some(sink) = self.sink.as_mut() else {
            return;
        };

        let payload_summary = if sink.include_payload() {
            payload.map(|p| p.summary(SUMMARY_MAX_LEN))
        } else {
            None
        };

        sink.write(&TraceRecord {
            timestamp,
            sequence: self.sequence,
            cycle_id: self.cycle,
            kind,
            event_name: event_name.to_string(),
            procedure_name: procedure.map(str::to_string),
            actor_id: payload.and_then(|p| p.actor_id()).map(str::to_string),
            payload_summary,
        });
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn cycle(&self) -> u64 {
        self.cycle
    }

    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    pub fn procedures_for(&self, event_name: &str) -> Vec<&str> {
        self.routes
            .get(event_name)
            .map(|procs| procs.iter().map(Procedure::name).collect())
            .unwrap_or_default()
    }
}
