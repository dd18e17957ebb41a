pub mod event;
pub mod guard;
pub mod intent;
pub mod memory;
pub mod mode;
pub mod reactor;
pub mod scheduler;
pub mod state;
pub mod telemetry;
