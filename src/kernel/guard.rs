use super::event::{EventPayload, RuntimeEvent};
use super::mode::SystemMode;
use super::scheduler::Condition;
use super::state::RuntimeContext;

/// Conditions used to gate the recognition procedures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Guard {
    /// The global mode equals the given one.
    ModeIs(SystemMode),
    /// The event is a pose tick whose label is in the vocabulary.
    KnownPose,
    /// The event payload names an actor.
    HasActor,
    Not(Box<Guard>),
}

impl Guard {
    pub fn not(inner: Guard) -> Self {
        Guard::Not(Box::new(inner))
    }

    fn label(&self) -> String {
        match self {
            Guard::ModeIs(mode) => format!("mode_is_{mode:?}"),
            Guard::KnownPose => "known_pose".to_string(),
            Guard::HasActor => "has_actor".to_string(),
            Guard::Not(inner) => format!("not_{}", inner.label()),
        }
    }

    pub fn evaluate(&self, ctx: &RuntimeContext, event: &RuntimeEvent) -> bool {
        match self {
            Guard::ModeIs(mode) => ctx.mode() == *mode,
            Guard::KnownPose => match &event.payload {
                EventPayload::PoseTick { label, .. } => ctx.vocabulary.contains(label),
                _ => false,
            },
            Guard::HasActor => event.payload.actor_id().is_some(),
            Guard::Not(inner) => !inner.evaluate(ctx, event),
        }
    }
}

/// A guard paired with its display name, which is what the scheduler sees.
#[derive(Debug, Clone)]
pub struct NamedGuard {
    name: String,
    guard: Guard,
}

impl From<Guard> for NamedGuard {
    fn from(guard: Guard) -> Self {
        Self {
            name: guard.label(),
            guard,
        }
    }
}

impl Condition<RuntimeContext> for NamedGuard {
    fn name(&self) -> &str {
        &self.name
    }

    fn holds(&self, ctx: &RuntimeContext, event: &RuntimeEvent) -> bool {
        self.guard.evaluate(ctx, event)
    }
}
