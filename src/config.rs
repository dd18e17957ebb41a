//! Static configuration: vocabulary, actions, tasks, families and thresholds.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::kernel::intent::{ActionConstraint, ActionDefinition, FamilyThresholds, StepConstraint};
use crate::robot::BehaviorStep;

pub const CONFIG_PATH_ENV: &str = "POSE_INTENT_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemConfig {
    pub system_name: String,
    pub pose_vocabulary: BTreeSet<String>,
    /// action -> templates
    pub actions: BTreeMap<String, Vec<Vec<String>>>,
    /// action -> per-template step constraints, parallel to `actions[action]`
    pub step_constraints: BTreeMap<String, Vec<Option<Vec<StepConstraintConfig>>>>,
    pub action_constraints: BTreeMap<String, ActionConstraint>,
    pub family_pretasks: Vec<FamilyPretask>,
    pub action_to_task: BTreeMap<String, String>,
    pub tasks: BTreeMap<String, Vec<BehaviorStep>>,
    pub pretasks: BTreeMap<String, Vec<BehaviorStep>>,
    pub thresholds: Thresholds,
    pub simulation: SimulationSettings,
    pub trace: TraceSettings,
}

/// A step constraint as written in configuration. `pose` may be omitted and is then
/// taken from the template; when present it must match the template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepConstraintConfig {
    pub pose: Option<String>,
    pub min_duration: Option<f64>,
    pub max_duration: Option<f64>,
    pub max_gap_after_prev: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FamilyPretask {
    pub prefix: Vec<String>,
    pub pretask: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub max_buffer_len: usize,
    pub min_prefix_len: usize,
    pub min_family_members: usize,
    pub cancel_join_timeout_ms: u64,
    pub max_events_per_cycle: usize,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            max_buffer_len: 50,
            min_prefix_len: 2,
            min_family_members: 2,
            cancel_join_timeout_ms: 5_000,
            max_events_per_cycle: crate::kernel::scheduler::DEFAULT_MAX_EVENTS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectorMode {
    Random,
    ActionSequence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub actor_id: String,
    pub robot_id: String,
    pub pose_tick_ms: u64,
    pub behavior_step_ms: u64,
    pub step_tick_ms: u64,
    pub detector_mode: DetectorMode,
    pub dwell_ticks_min: u32,
    pub dwell_ticks_max: u32,
    pub noise_between_actions: bool,
    pub noise_ticks_min: u32,
    pub noise_ticks_max: u32,
    pub seed: Option<u64>,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        Self {
            actor_id: "human_1".to_string(),
            robot_id: "spot_sim_1".to_string(),
            pose_tick_ms: 500,
            behavior_step_ms: 700,
            step_tick_ms: 50,
            detector_mode: DetectorMode::ActionSequence,
            dwell_ticks_min: 1,
            dwell_ticks_max: 4,
            noise_between_actions: true,
            noise_ticks_min: 0,
            noise_ticks_max: 4,
            seed: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TraceSettings {
    pub jsonl_path: Option<PathBuf>,
    pub include_payload: bool,
}

impl Default for TraceSettings {
    fn default() -> Self {
        Self {
            jsonl_path: None,
            include_payload: true,
        }
    }
}

fn labels(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

fn fetch_and_deliver(object: &str) -> Vec<BehaviorStep> {
    vec![
        BehaviorStep::new("search_object").with_param("object", object),
        BehaviorStep::new("approach_object").with_param("object", object),
        BehaviorStep::new("grasp_object").with_param("object", object),
        BehaviorStep::new("search_object").with_param("object", "human"),
        BehaviorStep::new("approach_object").with_param("object", "human"),
        BehaviorStep::new("release_object").with_param("object", object),
        BehaviorStep::new("return_to_start"),
    ]
}

impl Default for SystemConfig {
    fn default() -> Self {
        let pose_vocabulary = [
            "sitting",
            "standing",
            "raising_hand",
            "picking",
            "bowing",
            "walking",
            "drinking",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let mut actions = BTreeMap::new();
        actions.insert(
            "drinking_water".to_string(),
            vec![labels(&["sitting", "standing", "walking", "picking", "walking", "sitting"])],
        );
        actions.insert(
            "requesting_for_a_book".to_string(),
            vec![labels(&["walking", "sitting", "raising_hand"])],
        );
        actions.insert(
            "waste_disposal".to_string(),
            vec![labels(&[
                "sitting", "standing", "walking", "picking", "walking", "sitting", "drinking",
            ])],
        );
        actions.insert(
            "picking_objects_from_floor".to_string(),
            vec![labels(&["standing", "picking", "raising_hand"])],
        );
        actions.insert(
            "washing_hands".to_string(),
            vec![labels(&["sitting", "standing", "walking", "bowing"])],
        );

        let action_to_task = [
            ("drinking_water", "localise_and_deliver_bottle_of_water"),
            ("requesting_for_a_book", "localise_and_deliver_book"),
            ("waste_disposal", "approach_collect_and_bin_can"),
            ("picking_objects_from_floor", "localise_and_deliver_object_from_floor"),
            ("washing_hands", "localise_and_deliver_sponge"),
        ]
        .iter()
        .map(|(a, t)| (a.to_string(), t.to_string()))
        .collect();

        let mut tasks = BTreeMap::new();
        tasks.insert(
            "localise_and_deliver_bottle_of_water".to_string(),
            fetch_and_deliver("bottle_of_water"),
        );
        tasks.insert("localise_and_deliver_book".to_string(), fetch_and_deliver("book"));
        tasks.insert(
            "localise_and_deliver_object_from_floor".to_string(),
            fetch_and_deliver("object_on_floor"),
        );
        tasks.insert("localise_and_deliver_sponge".to_string(), fetch_and_deliver("sponge"));
        tasks.insert(
            "approach_collect_and_bin_can".to_string(),
            vec![
                BehaviorStep::new("search_object").with_param("object", "human"),
                BehaviorStep::new("approach_object").with_param("object", "human"),
                BehaviorStep::new("collect_object").with_param("object", "empty_can"),
                BehaviorStep::new("navigate_to").with_param("location", "bin"),
                BehaviorStep::new("drop_object").with_param("object", "empty_can"),
                BehaviorStep::new("return_to_start"),
            ],
        );

        let mut pretasks = BTreeMap::new();
        pretasks.insert(
            "move_towards_kitchen".to_string(),
            vec![
                BehaviorStep::new("navigate_to").with_param("location", "kitchen_staging_area"),
                BehaviorStep::new("search_object").with_param("object", "human"),
            ],
        );
        pretasks.insert(
            "prepare_for_handover".to_string(),
            vec![
                BehaviorStep::new("navigate_to").with_param("location", "handover_point"),
                BehaviorStep::new("open_gripper"),
            ],
        );

        let family_pretasks = vec![
            FamilyPretask {
                prefix: labels(&["sitting", "standing", "walking"]),
                pretask: "move_towards_kitchen".to_string(),
            },
            FamilyPretask {
                prefix: labels(&["sitting", "standing", "walking", "picking"]),
                pretask: "prepare_for_handover".to_string(),
            },
        ];

        Self {
            system_name: "pose_intent".to_string(),
            pose_vocabulary,
            actions,
            step_constraints: BTreeMap::new(),
            action_constraints: BTreeMap::new(),
            family_pretasks,
            action_to_task,
            tasks,
            pretasks,
            thresholds: Thresholds::default(),
            simulation: SimulationSettings::default(),
            trace: TraceSettings::default(),
        }
    }
}

impl SystemConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let cfg: Self = serde_json::from_str(&text)?;
        debug!(path = %path.as_ref().display(), "configuration loaded");
        Ok(cfg)
    }

    /// Defaults, or the file named by `POSE_INTENT_CONFIG`, then `POSE_INTENT_*`
    /// overrides for the numeric thresholds.
    pub fn load() -> Result<Self> {
        let mut cfg = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_file(path)?,
            Err(_) => Self::default(),
        };

        if let Some(v) = env_parse("POSE_INTENT_MAX_BUFFER_LEN") {
            cfg.thresholds.max_buffer_len = v;
        }
        if let Some(v) = env_parse("POSE_INTENT_MIN_PREFIX_LEN") {
            cfg.thresholds.min_prefix_len = v;
        }
        if let Some(v) = env_parse("POSE_INTENT_MIN_FAMILY_MEMBERS") {
            cfg.thresholds.min_family_members = v;
        }
        if let Some(v) = env_parse("POSE_INTENT_CANCEL_JOIN_TIMEOUT_MS") {
            cfg.thresholds.cancel_join_timeout_ms = v;
        }
        if let Some(v) = env_parse("POSE_INTENT_POSE_TICK_MS") {
            cfg.simulation.pose_tick_ms = v;
        }
        if let Some(v) = env_parse("POSE_INTENT_BEHAVIOR_STEP_MS") {
            cfg.simulation.behavior_step_ms = v;
        }
        if let Some(v) = env_parse("POSE_INTENT_SEED") {
            cfg.simulation.seed = Some(v);
        }
        if let Ok(path) = std::env::var("POSE_INTENT_TRACE_PATH") {
            cfg.trace.jsonl_path = Some(PathBuf::from(path));
        }

        Ok(cfg)
    }

    pub fn family_thresholds(&self) -> FamilyThresholds {
        FamilyThresholds {
            min_prefix_len: self.thresholds.min_prefix_len,
            min_members: self.thresholds.min_family_members,
        }
    }

    pub fn cancel_join_timeout(&self) -> Duration {
        Duration::from_millis(self.thresholds.cancel_join_timeout_ms)
    }

    pub fn pretask_by_prefix(&self) -> BTreeMap<Vec<String>, String> {
        self.family_pretasks
            .iter()
            .map(|fp| (fp.prefix.clone(), fp.pretask.clone()))
            .collect()
    }

    /// Builds the immutable action set. Every template label must be in the
    /// vocabulary and every constraint list must line up with its template.
    pub fn build_action_definitions(
        &self,
    ) -> std::result::Result<BTreeMap<String, ActionDefinition>, ConfigError> {
        let mut out = BTreeMap::new();

        for (name, templates) in &self.actions {
            if templates.is_empty() {
                return Err(ConfigError::Invalid(format!("action {name:?} has no templates")));
            }

            let raw_constraints = self.step_constraints.get(name);
            let mut built = Vec::with_capacity(templates.len());

            for (idx, template) in templates.iter().enumerate() {
                if let Some(label) = template.iter().find(|l| !self.pose_vocabulary.contains(*l)) {
                    return Err(ConfigError::UnknownPose {
                        action: name.clone(),
                        label: label.clone(),
                    });
                }

                // Templates past the end of the constraint list are unconstrained.
                let constraints = raw_constraints
                    .and_then(|per_template| per_template.get(idx))
                    .and_then(Option::as_ref)
                    .map(|steps| resolve_step_constraints(template, steps));

                built.push((template.clone(), constraints));
            }

            let constraint = self.action_constraints.get(name).cloned();
            let def = ActionDefinition::new(name.clone(), built, constraint)?;
            out.insert(name.clone(), def);
        }

        Ok(out)
    }
}

/// Fills omitted poses from the template. Length mismatches are left for
/// `ActionDefinition::new` to reject.
fn resolve_step_constraints(
    template: &[String],
    steps: &[StepConstraintConfig],
) -> Vec<StepConstraint> {
    steps
        .iter()
        .enumerate()
        .map(|(i, c)| StepConstraint {
            pose: c
                .pose
                .clone()
                .or_else(|| template.get(i).cloned())
                .unwrap_or_default(),
            min_duration: c.min_duration,
            max_duration: c.max_duration,
            max_gap_after_prev: c.max_gap_after_prev,
        })
        .collect()
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse().ok())
}
