pub mod actuator;
pub mod coordinator;
pub mod task;

pub use actuator::{Actuator, SimulatedActuator, StepRecord};
pub use coordinator::{
    ActuatorMonitor, ActuatorState, JoinOutcome, PrepareOutcome, PreparationCoordinator,
    PreparationRecord,
};
pub use task::{build_task_definitions, BehaviorStep, TaskDefinition};
