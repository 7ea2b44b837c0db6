use std::fmt;

/// Why a provider call fell back to a locally produced value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DegradedReason {
    MissingCredentials,
    RequestFailed(String),
    MalformedResponse(String),
}

impl fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingCredentials => f.write_str("credentials not configured"),
            Self::RequestFailed(detail) => write!(f, "provider request failed: {detail}"),
            Self::MalformedResponse(detail) => write!(f, "provider response malformed: {detail}"),
        }
    }
}

/// A value that is always usable, tagged with how it was obtained.
///
/// The voice and LLM clients never fail outward; when the upstream
/// provider is unavailable they substitute a deterministic fallback.
/// Callers that care (logging, health, tests) inspect the variant instead
/// of sniffing sentinel strings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Sourced<T> {
    Live(T),
    Degraded { value: T, reason: DegradedReason },
}

impl<T> Sourced<T> {
    pub fn degraded(value: T, reason: DegradedReason) -> Self {
        Self::Degraded { value, reason }
    }

    pub fn value(&self) -> &T {
        match self {
            Self::Live(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Self::Live(value) | Self::Degraded { value, .. } => value,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }

    pub fn reason(&self) -> Option<&DegradedReason> {
        match self {
            Self::Live(_) => None,
            Self::Degraded { reason, .. } => Some(reason),
        }
    }
}
