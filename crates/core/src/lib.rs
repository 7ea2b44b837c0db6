pub mod config;
pub mod domain;
pub mod errors;
pub mod sourced;

pub use domain::agent_config::{AgentConfig, AgentConfigDraft};
pub use domain::call::{
    CallLog, CallOutcome, CallTrigger, DriverStatus, EmergencyOutcome, EmergencyReport,
    EmergencyType, EscalationStatus, RoutineOutcome, RoutineUpdate, StructuredCallData,
};
pub use errors::ApiError;
pub use sourced::{DegradedReason, Sourced};
