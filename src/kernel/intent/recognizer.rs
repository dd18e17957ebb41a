use std::collections::BTreeMap;

use tracing::debug;

use super::types::{ends_with, ActionConstraint, ActionDefinition, ActionInstance, StepConstraint};
use crate::kernel::memory::{EpisodeMemory, PoseSegment};

/// Final action recognition: exact suffix match plus optional timing constraints.
///
/// Actions are tried in name order and templates in declaration order; the first
/// template that passes every check wins.
#[derive(Debug, Clone)]
pub struct ActionRecognizer {
    actions: BTreeMap<String, ActionDefinition>,
}

impl ActionRecognizer {
    pub fn new(actions: BTreeMap<String, ActionDefinition>) -> Self {
        Self { actions }
    }

    pub fn actions(&self) -> &BTreeMap<String, ActionDefinition> {
        &self.actions
    }

    /// Matches the episode's current suffix. On success the instance is appended to
    /// the episode's recognized-action history and returned.
    pub fn detect_action(&self, memory: &mut EpisodeMemory, now: f64) -> Option<ActionInstance> {
        let labels = memory.labels();

        for (name, def) in &self.actions {
            for (idx, template) in def.templates().iter().enumerate() {
                if !ends_with(&labels, template.labels()) {
                    continue;
                }

                let window = memory.tail(template.len());

                if !check_step_constraints(&window, template.step_constraints()) {
                    debug!(
                        action = %name,
                        template = idx,
                        "suffix matched, step constraints rejected"
                    );
                    continue;
                }
                if !check_action_constraint(&window, def.action_constraint.as_ref()) {
                    debug!(
                        action = %name,
                        template = idx,
                        "suffix matched, action constraint rejected"
                    );
                    continue;
                }

                let instance = ActionInstance {
                    name: name.clone(),
                    matched_sequence: template.labels().to_vec(),
                    start_time: window[0].start_time,
                    end_time: now,
                    confidence: 1.0,
                };
                memory.recognized_actions.push(instance.clone());
                return Some(instance);
            }
        }

        None
    }
}

fn check_step_constraints(window: &[&PoseSegment], constraints: Option<&[StepConstraint]>) -> bool {
    let Some(constraints) = constraints else {
        return true;
    };
    if constraints.len() != window.len() {
        return false;
    }

    for (i, (segment, c)) in window.iter().zip(constraints).enumerate() {
        if segment.label != c.pose {
            return false;
        }

        let duration = segment.duration();
        if c.min_duration.is_some_and(|min| duration < min) {
            return false;
        }
        if c.max_duration.is_some_and(|max| duration > max) {
            return false;
        }

        if i > 0 {
            if let Some(max_gap) = c.max_gap_after_prev {
                let gap = segment.start_time - window[i - 1].end_time;
                if gap > max_gap {
                    return false;
                }
            }
        }
    }

    true
}

fn check_action_constraint(window: &[&PoseSegment], constraint: Option<&ActionConstraint>) -> bool {
    let Some(constraint) = constraint else {
        return true;
    };
    let (Some(first), Some(last)) = (window.first(), window.last()) else {
        return false;
    };

    let total = last.end_time - first.start_time;
    if constraint.min_total_duration.is_some_and(|min| total < min) {
        return false;
    }
    if constraint.max_total_duration.is_some_and(|max| total > max) {
        return false;
    }
    true
}
