pub mod detector;

pub use detector::{PoseDetectorSim, PoseObservation};
