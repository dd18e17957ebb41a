use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use super::segment::PoseSegment;
use crate::kernel::intent::types::ActionInstance;

/// Per-actor episode: the compressed pose buffer plus what was recognized and executed.
///
/// The buffer never holds two adjacent segments with the same label and never grows
/// past `max_segments`; the oldest segment is dropped on overflow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpisodeMemory {
    segments: VecDeque<PoseSegment>,
    max_segments: usize,
    pub recognized_actions: Vec<ActionInstance>,
    pub executed_tasks: Vec<String>,
}

impl EpisodeMemory {
    pub fn new(max_segments: usize) -> Self {
        Self {
            segments: VecDeque::with_capacity(max_segments.min(256)),
            max_segments: max_segments.max(1),
            recognized_actions: Vec::new(),
            executed_tasks: Vec::new(),
        }
    }

    /// Feeds one raw label. A repeat of the last label extends that segment,
    /// anything else opens a new one. Returns the segment the label landed in.
    pub fn ingest(&mut self, label: &str, t: f64, confidence: Option<f64>) -> &PoseSegment {
        let extends_last = self.segments.back().is_some_and(|last| last.label == label);

        if extends_last {
            if let Some(last) = self.segments.back_mut() {
                last.extend_to(t);
                if confidence.is_some() {
                    last.confidence = confidence;
                }
            }
        } else {
            let mut segment = PoseSegment::new(label, t);
            segment.confidence = confidence;
            self.segments.push_back(segment);

            while self.segments.len() > self.max_segments {
                self.segments.pop_front();
            }
        }

        &self.segments[self.segments.len() - 1]
    }

    pub fn segments(&self) -> &VecDeque<PoseSegment> {
        &self.segments
    }

    /// The last `n` segments in arrival order.
    pub fn tail(&self, n: usize) -> Vec<&PoseSegment> {
        self.segments.iter().skip(self.segments.len().saturating_sub(n)).collect()
    }

    pub fn labels(&self) -> Vec<String> {
        self.segments.iter().map(|s| s.label.clone()).collect()
    }

    pub fn last_label(&self) -> Option<&str> {
        self.segments.back().map(|s| s.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn max_segments(&self) -> usize {
        self.max_segments
    }

    /// Empties the episode in place. The actor entry itself survives.
    pub fn clear(&mut self) {
        self.segments.clear();
        self.recognized_actions.clear();
        self.executed_tasks.clear();
    }
}
