pub mod config;
pub mod error;
pub mod kernel;
pub mod perception;
pub mod robot;

pub use config::SystemConfig;
pub use error::{ConfigError, DispatchError, HriError, Result};
pub use kernel::reactor::Reactor;
