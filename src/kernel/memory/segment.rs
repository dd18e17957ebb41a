use serde::{Deserialize, Serialize};

/// A maximal run of identical consecutive pose labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseSegment {
    pub label: String,
    pub start_time: f64,
    pub end_time: f64,
    pub confidence: Option<f64>,
}

impl PoseSegment {
    pub fn new(label: impl Into<String>, t: f64) -> Self {
        Self {
            label: label.into(),
            start_time: t,
            end_time: t,
            confidence: None,
        }
    }

    pub fn duration(&self) -> f64 {
        (self.end_time - self.start_time).max(0.0)
    }

    /// Extends the segment forward in time. Out-of-order timestamps never shrink it.
    pub fn extend_to(&mut self, t: f64) {
        if t > self.end_time {
            self.end_time = t;
        }
    }
}
