pub mod actors;
pub mod episode;
pub mod segment;

pub use actors::{ActorId, ActorMap, HumanState};
pub use episode::EpisodeMemory;
pub use segment::PoseSegment;
