use thiserror::Error;

/// Result alias used across the library.
pub type Result<T> = std::result::Result<T, HriError>;

#[derive(Debug, Error)]
pub enum HriError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("dispatch error: {0}")]
    Dispatch(#[from] DispatchError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Static configuration defects. Raised while building definitions and never retried.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error(
        "action {action:?} template #{template}: expected {expected} step constraints, got {actual}"
    )]
    ConstraintLengthMismatch {
        action: String,
        template: usize,
        expected: usize,
        actual: usize,
    },

    #[error(
        "action {action:?} template #{template} step {position}: \
         constraint declares pose {declared:?} but template has {expected:?}"
    )]
    ConstraintPoseMismatch {
        action: String,
        template: usize,
        position: usize,
        expected: String,
        declared: String,
    },

    #[error("action {action:?} template #{template} is empty")]
    EmptyTemplate { action: String, template: usize },

    #[error("action {action:?} uses pose {label:?} outside the vocabulary")]
    UnknownPose { action: String, label: String },

    #[error("family {family} references unknown pretask {pretask:?}")]
    UnknownPretask { family: String, pretask: String },

    #[error("prefixes {first:?} and {second:?} both map to family id {family_id}")]
    FamilyIdCollision {
        family_id: String,
        first: Vec<String>,
        second: Vec<String>,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures of a committed recognition cycle.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("no task mapping for action {0:?}")]
    NoTaskMapping(String),

    #[error("action {action:?} maps to unknown task {task:?}")]
    UnknownTask { action: String, task: String },

    #[error("unknown pretask {0:?}")]
    UnknownPretask(String),
}
