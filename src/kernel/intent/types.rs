use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::ConfigError;

pub type ActionName = String;
pub type FamilyId = String;

/// Optional timing bounds for one pose step of a template. `None` means unconstrained.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepConstraint {
    pub pose: String,
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
    pub max_gap_after_prev: Option<f64>,
}

impl StepConstraint {
    pub fn unconstrained(pose: impl Into<String>) -> Self {
        Self {
            pose: pose.into(),
            min_duration: None,
            max_duration: None,
            max_gap_after_prev: None,
        }
    }
}

/// Bounds over the whole matched window, first segment start to last segment end.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionConstraint {
    pub min_total_duration: Option<f64>,
    pub max_total_duration: Option<f64>,
}

/// One concrete label sequence for an action, with its optional per-step constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionTemplate {
    labels: Vec<String>,
    step_constraints: Option<Vec<StepConstraint>>,
}

impl ActionTemplate {
    /// Plain suffix template, no timing constraints.
    pub fn new(labels: Vec<String>) -> Self {
        Self {
            labels,
            step_constraints: None,
        }
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn step_constraints(&self) -> Option<&[StepConstraint]> {
        self.step_constraints.as_deref()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Immutable action: a name, one or more templates, an optional whole-action bound.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionDefinition {
    pub name: ActionName,
    templates: Vec<ActionTemplate>,
    pub action_constraint: Option<ActionConstraint>,
}

impl ActionDefinition {
    /// Validates every template. Constraint lists must line up with the template
    /// position by position, otherwise construction fails.
    pub fn new(
        name: impl Into<String>,
        templates: Vec<(Vec<String>, Option<Vec<StepConstraint>>)>,
        action_constraint: Option<ActionConstraint>,
    ) -> Result<Self, ConfigError> {
        let name = name.into();
        let mut built = Vec::with_capacity(templates.len());

        for (idx, (labels, constraints)) in templates.into_iter().enumerate() {
            if labels.is_empty() {
                return Err(ConfigError::EmptyTemplate {
                    action: name.clone(),
                    template: idx,
                });
            }

            if let Some(steps) = &constraints {
                if steps.len() != labels.len() {
                    return Err(ConfigError::ConstraintLengthMismatch {
                        action: name.clone(),
                        template: idx,
                        expected: labels.len(),
                        actual: steps.len(),
                    });
                }
                for (position, (label, step)) in labels.iter().zip(steps).enumerate() {
                    if &step.pose != label {
                        return Err(ConfigError::ConstraintPoseMismatch {
                            action: name.clone(),
                            template: idx,
                            position,
                            expected: label.clone(),
                            declared: step.pose.clone(),
                        });
                    }
                }
            }

            built.push(ActionTemplate {
                labels,
                step_constraints: constraints,
            });
        }

        Ok(Self {
            name,
            templates: built,
            action_constraint,
        })
    }

    pub fn templates(&self) -> &[ActionTemplate] {
        &self.templates
    }
}

/// A recognized action occurrence. Never mutated after creation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionInstance {
    pub name: ActionName,
    pub matched_sequence: Vec<String>,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: f64,
}

/// Actions sharing a common label prefix.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionFamily {
    pub family_id: FamilyId,
    pub prefix: Vec<String>,
    pub members: BTreeSet<ActionName>,
    pub pretask: Option<String>,
}

impl ActionFamily {
    /// Family ids are a pure function of the prefix.
    pub fn id_for(prefix: &[String]) -> FamilyId {
        format!("F_{}", prefix.join("_"))
    }
}

/// Result of one early-intent estimation for an actor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarlyIntent {
    /// action -> longest template prefix equal to the current suffix
    pub candidate_actions: BTreeMap<ActionName, usize>,
    /// family -> prefix length, only families whose entire prefix matched
    pub candidate_families: BTreeMap<FamilyId, usize>,
    pub best_family_id: Option<FamilyId>,
    pub best_family_prefix_len: usize,
}

/// True when `labels` ends with exactly `pattern`.
pub(crate) fn ends_with(labels: &[String], pattern: &[String]) -> bool {
    !pattern.is_empty()
        && pattern.len() <= labels.len()
        && labels[labels.len() - pattern.len()..] == *pattern
}
