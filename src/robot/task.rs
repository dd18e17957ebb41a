use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// One primitive robot behavior with optional string parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BehaviorStep {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<BTreeMap<String, String>>,
}

impl BehaviorStep {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: None,
        }
    }

    pub fn with_param(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.params
            .get_or_insert_with(BTreeMap::new)
            .insert(key.into(), value.into());
        self
    }
}

/// An ordered list of behavior steps. Used for both final tasks and pretasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskDefinition {
    pub name: String,
    pub steps: Vec<BehaviorStep>,
}

impl TaskDefinition {
    pub fn new(name: impl Into<String>, steps: Vec<BehaviorStep>) -> Self {
        Self {
            name: name.into(),
            steps,
        }
    }
}

pub fn build_task_definitions(
    raw: &BTreeMap<String, Vec<BehaviorStep>>,
) -> BTreeMap<String, TaskDefinition> {
    raw.iter()
        .map(|(name, steps)| (name.clone(), TaskDefinition::new(name.clone(), steps.clone())))
        .collect()
}
