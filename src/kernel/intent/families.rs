use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use super::types::{ends_with, ActionDefinition, ActionFamily, EarlyIntent, FamilyId};
use crate::error::ConfigError;
use crate::kernel::memory::EpisodeMemory;

/// Thresholds controlling which shared prefixes become families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyThresholds {
    pub min_prefix_len: usize,
    pub min_members: usize,
}

impl Default for FamilyThresholds {
    fn default() -> Self {
        Self {
            min_prefix_len: 2,
            min_members: 2,
        }
    }
}

/// Early-intent estimator over prefix families shared by several actions.
///
/// Families are derived once from the action set and are read-only afterwards.
#[derive(Debug, Clone)]
pub struct IntentEstimator {
    actions: BTreeMap<String, ActionDefinition>,
    families: BTreeMap<FamilyId, ActionFamily>,
}

impl IntentEstimator {
    /// Groups every template prefix across actions. A prefix becomes a family when it
    /// is long enough and shared by enough distinct actions. `pretask_by_prefix`
    /// attaches a preparation routine by exact prefix; every referenced pretask must
    /// be one of `known_pretasks`.
    pub fn build(
        actions: BTreeMap<String, ActionDefinition>,
        thresholds: FamilyThresholds,
        pretask_by_prefix: &BTreeMap<Vec<String>, String>,
        known_pretasks: &BTreeSet<String>,
    ) -> Result<Self, ConfigError> {
        let mut prefix_members: BTreeMap<Vec<String>, BTreeSet<String>> = BTreeMap::new();

        for (name, def) in &actions {
            for template in def.templates() {
                for k in 1..=template.len() {
                    prefix_members
                        .entry(template.labels()[..k].to_vec())
                        .or_default()
                        .insert(name.clone());
                }
            }
        }

        let mut families: BTreeMap<FamilyId, ActionFamily> = BTreeMap::new();
        for (prefix, members) in prefix_members {
            if prefix.len() < thresholds.min_prefix_len || members.len() < thresholds.min_members {
                continue;
            }

            let family_id = ActionFamily::id_for(&prefix);
            if let Some(existing) = families.get(&family_id) {
                return Err(ConfigError::FamilyIdCollision {
                    family_id,
                    first: existing.prefix.clone(),
                    second: prefix,
                });
            }

            let pretask = pretask_by_prefix.get(&prefix).cloned();
            if let Some(name) = &pretask {
                if !known_pretasks.contains(name) {
                    return Err(ConfigError::UnknownPretask {
                        family: family_id,
                        pretask: name.clone(),
                    });
                }
            }

            families.insert(
                family_id.clone(),
                ActionFamily {
                    family_id,
                    prefix,
                    members,
                    pretask,
                },
            );
        }

        debug!(families = families.len(), "action families built");
        Ok(Self { actions, families })
    }

    pub fn families(&self) -> &BTreeMap<FamilyId, ActionFamily> {
        &self.families
    }

    pub fn family(&self, id: &str) -> Option<&ActionFamily> {
        self.families.get(id)
    }

    /// Candidate actions by longest matching template prefix, candidate families by
    /// full-prefix match, and the single best family. Among equally long matches the
    /// lexicographically smallest family id wins.
    pub fn compute_early_intent(&self, memory: &EpisodeMemory) -> EarlyIntent {
        let labels = memory.labels();
        let mut intent = EarlyIntent::default();

        for (name, def) in &self.actions {
            let best = def
                .templates()
                .iter()
                .flat_map(|t| (1..=t.len()).map(move |k| &t.labels()[..k]))
                .filter(|prefix| ends_with(&labels, prefix))
                .map(<[String]>::len)
                .max();
            if let Some(len) = best {
                intent.candidate_actions.insert(name.clone(), len);
            }
        }

        // BTreeMap iteration is sorted by id, so a strict `>` keeps the smallest id on ties.
        for (id, family) in &self.families {
            let len = family.prefix.len();
            if !ends_with(&labels, &family.prefix) {
                continue;
            }
            intent.candidate_families.insert(id.clone(), len);
            if len > intent.best_family_prefix_len {
                intent.best_family_prefix_len = len;
                intent.best_family_id = Some(id.clone());
            }
        }

        intent
    }
}
