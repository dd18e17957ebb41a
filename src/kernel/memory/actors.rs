use std::collections::HashMap;

use serde::{Deserialize, Serialize};

pub type ActorId = String;

/// Per-actor storage with explicit lazy insertion.
///
/// An entry is created the first time `get_or_insert` sees an actor, using the
/// factory supplied at construction. Entries are never removed, so actor
/// identity outlives any single episode.
pub struct ActorMap<V> {
    entries: HashMap<ActorId, V>,
    make: Box<dyn Fn(&str) -> V + Send>,
}

impl<V> ActorMap<V> {
    pub fn new(make: impl Fn(&str) -> V + Send + 'static) -> Self {
        Self {
            entries: HashMap::new(),
            make: Box::new(make),
        }
    }

    pub fn get_or_insert(&mut self, actor: &str) -> &mut V {
        let make = &self.make;
        self.entries
            .entry(actor.to_string())
            .or_insert_with(|| make(actor))
    }

    pub fn get(&self, actor: &str) -> Option<&V> {
        self.entries.get(actor)
    }

    pub fn contains(&self, actor: &str) -> bool {
        self.entries.contains_key(actor)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Actor ids in sorted order.
    pub fn actors(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}

/// Latest observed pose for one actor.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HumanState {
    pub actor_id: ActorId,
    pub current_pose: Option<String>,
    pub last_update_time: Option<f64>,
}

impl HumanState {
    pub fn new(actor_id: &str) -> Self {
        Self {
            actor_id: actor_id.to_string(),
            ..Self::default()
        }
    }

    pub fn update(&mut self, pose: &str, t: f64) {
        self.current_pose = Some(pose.to_string());
        self.last_update_time = Some(t);
    }
}
