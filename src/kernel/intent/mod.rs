pub mod families;
pub mod recognizer;
pub mod types;

pub use families::{FamilyThresholds, IntentEstimator};
pub use recognizer::ActionRecognizer;
pub use types::*;
