use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::ApiError;

pub const DRIVER_NAME_MAX_LEN: usize = 255;
pub const PHONE_MIN_LEN: usize = 10;
pub const PHONE_MAX_LEN: usize = 20;
pub const LOAD_NUMBER_MAX_LEN: usize = 100;

/// One row per outbound call attempt. `call_id` arrives after the row is
/// created; `transcript` and `structured_data` arrive with the final
/// webhook.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallLog {
    pub id: String,
    pub driver_name: String,
    pub phone_number: String,
    pub load_number: String,
    pub agent_config_id: String,
    pub call_id: Option<String>,
    pub transcript: Option<String>,
    pub structured_data: Option<StructuredCallData>,
    pub call_outcome: CallOutcome,
    pub created_at: DateTime<Utc>,
}

/// Trigger-request payload as accepted at the API boundary.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallTrigger {
    pub driver_name: String,
    pub phone_number: String,
    pub load_number: String,
}

impl CallTrigger {
    pub fn validate(&self) -> Result<(), ApiError> {
        let driver_name = self.driver_name.trim();
        if driver_name.is_empty() || driver_name.len() > DRIVER_NAME_MAX_LEN {
            return Err(ApiError::Validation(format!(
                "driver_name must be between 1 and {DRIVER_NAME_MAX_LEN} characters"
            )));
        }

        let phone_number = self.phone_number.trim();
        if phone_number.len() < PHONE_MIN_LEN || phone_number.len() > PHONE_MAX_LEN {
            return Err(ApiError::Validation(format!(
                "phone_number must be between {PHONE_MIN_LEN} and {PHONE_MAX_LEN} characters"
            )));
        }

        let load_number = self.load_number.trim();
        if load_number.is_empty() || load_number.len() > LOAD_NUMBER_MAX_LEN {
            return Err(ApiError::Validation(format!(
                "load_number must be between 1 and {LOAD_NUMBER_MAX_LEN} characters"
            )));
        }

        Ok(())
    }
}

/// Lifecycle states of a call log row, rendered with the provider-visible
/// labels. Progression is one-way and driven by webhook arrival order;
/// legality of a transition is not enforced here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallOutcome {
    #[serde(rename = "Initiated")]
    Initiated,
    #[serde(rename = "In Progress")]
    InProgress,
    #[serde(rename = "In-Transit Update")]
    InTransitUpdate,
    #[serde(rename = "Arrival Confirmation")]
    ArrivalConfirmation,
    #[serde(rename = "Unable to Reach")]
    UnableToReach,
    #[serde(rename = "Incomplete")]
    Incomplete,
    #[serde(rename = "Emergency Detected")]
    EmergencyDetected,
    #[serde(rename = "Processing Error")]
    ProcessingError,
    #[serde(rename = "Test Completed")]
    TestCompleted,
    #[serde(rename = "Completed")]
    Completed,
}

impl CallOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initiated => "Initiated",
            Self::InProgress => "In Progress",
            Self::InTransitUpdate => "In-Transit Update",
            Self::ArrivalConfirmation => "Arrival Confirmation",
            Self::UnableToReach => "Unable to Reach",
            Self::Incomplete => "Incomplete",
            Self::EmergencyDetected => "Emergency Detected",
            Self::ProcessingError => "Processing Error",
            Self::TestCompleted => "Test Completed",
            Self::Completed => "Completed",
        }
    }
}

impl std::fmt::Display for CallOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for CallOutcome {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "Initiated" => Ok(Self::Initiated),
            "In Progress" => Ok(Self::InProgress),
            "In-Transit Update" => Ok(Self::InTransitUpdate),
            "Arrival Confirmation" => Ok(Self::ArrivalConfirmation),
            "Unable to Reach" => Ok(Self::UnableToReach),
            "Incomplete" => Ok(Self::Incomplete),
            "Emergency Detected" => Ok(Self::EmergencyDetected),
            "Processing Error" => Ok(Self::ProcessingError),
            "Test Completed" => Ok(Self::TestCompleted),
            "Completed" => Ok(Self::Completed),
            other => Err(format!("unknown call outcome `{other}`")),
        }
    }
}

/// Structured record extracted from a finished call's transcript.
///
/// Serialized untagged so the stored JSON keeps the flat provider-facing
/// shapes. Deserialization doubles as validation: a field value outside
/// the enumerated vocabulary fails the parse and the caller falls back to
/// the processing-error record.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StructuredCallData {
    Emergency(EmergencyReport),
    Routine(RoutineUpdate),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RoutineUpdate {
    pub call_outcome: RoutineOutcome,
    pub driver_status: DriverStatus,
    pub current_location: Option<String>,
    pub eta: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmergencyReport {
    pub call_outcome: EmergencyOutcome,
    pub emergency_type: EmergencyType,
    pub emergency_location: Option<String>,
    pub escalation_status: EscalationStatus,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoutineOutcome {
    #[serde(rename = "In-Transit Update")]
    InTransitUpdate,
    #[serde(rename = "Arrival Confirmation")]
    ArrivalConfirmation,
    #[serde(rename = "Unable to Reach")]
    UnableToReach,
    #[serde(rename = "Incomplete")]
    Incomplete,
    // Internal outcomes, never requested from the extraction model.
    #[serde(rename = "Test Completed")]
    TestCompleted,
    #[serde(rename = "Processing Error")]
    ProcessingError,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DriverStatus {
    #[serde(rename = "Driving")]
    Driving,
    #[serde(rename = "Delayed")]
    Delayed,
    #[serde(rename = "Arrived")]
    Arrived,
    #[serde(rename = "Unknown")]
    Unknown,
    #[serde(rename = "Unresponsive")]
    Unresponsive,
    #[serde(rename = "Unavailable")]
    Unavailable,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyOutcome {
    #[serde(rename = "Emergency Detected")]
    EmergencyDetected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EmergencyType {
    #[serde(rename = "Accident")]
    Accident,
    #[serde(rename = "Breakdown")]
    Breakdown,
    #[serde(rename = "Medical")]
    Medical,
    #[serde(rename = "Other")]
    Other,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EscalationStatus {
    #[serde(rename = "Escalation Flagged")]
    EscalationFlagged,
}

impl StructuredCallData {
    /// Call-log outcome implied by this record.
    pub fn outcome(&self) -> CallOutcome {
        match self {
            Self::Emergency(_) => CallOutcome::EmergencyDetected,
            Self::Routine(update) => match update.call_outcome {
                RoutineOutcome::InTransitUpdate => CallOutcome::InTransitUpdate,
                RoutineOutcome::ArrivalConfirmation => CallOutcome::ArrivalConfirmation,
                RoutineOutcome::UnableToReach => CallOutcome::UnableToReach,
                RoutineOutcome::Incomplete => CallOutcome::Incomplete,
                RoutineOutcome::TestCompleted => CallOutcome::TestCompleted,
                RoutineOutcome::ProcessingError => CallOutcome::ProcessingError,
            },
        }
    }

    /// Fallback record stored when the extraction output cannot be used.
    pub fn processing_error() -> Self {
        Self::Routine(RoutineUpdate {
            call_outcome: RoutineOutcome::ProcessingError,
            driver_status: DriverStatus::Unknown,
            current_location: None,
            eta: None,
        })
    }

    /// Canned record produced when no extraction model is configured.
    pub fn test_mode() -> Self {
        Self::Routine(RoutineUpdate {
            call_outcome: RoutineOutcome::TestCompleted,
            driver_status: DriverStatus::Driving,
            current_location: Some("Highway I-10, near Phoenix".to_string()),
            eta: Some("Tomorrow morning, 9 AM".to_string()),
        })
    }
}
