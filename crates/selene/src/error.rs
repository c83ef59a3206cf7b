use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors produced while solving a cycle report.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CycleError {
    #[error("Invalid {field}: {value:?}. Expected format {expected}")]
    InputFormat {
        field: String,
        value: String,
        expected: &'static str,
    },
    #[error("Ephemeris oracle unavailable: {message}")]
    OracleUnavailable { message: String },
    #[error("Ephemeris oracle returned malformed data: {message}")]
    OracleMalformed { message: String },
    #[error("No crossing of {target_deg}° found within {steps} steps from {seed}")]
    EventNotFound {
        target_deg: f64,
        seed: DateTime<Utc>,
        steps: usize,
    },
    #[error("Invalid search configuration: {0}")]
    InvalidConfig(String),
}

impl CycleError {
    pub(crate) fn input(field: &str, value: &str, expected: &'static str) -> Self {
        CycleError::InputFormat {
            field: field.to_string(),
            value: value.to_string(),
            expected,
        }
    }

    /// HTTP-equivalent status for surfacing this error at a request boundary.
    pub fn status_code(&self) -> u16 {
        match self {
            CycleError::InputFormat { .. } => 400,
            CycleError::OracleUnavailable { .. } | CycleError::OracleMalformed { .. } => 502,
            CycleError::EventNotFound { .. } => 404,
            CycleError::InvalidConfig(_) => 500,
        }
    }

    pub fn is_event_not_found(&self) -> bool {
        matches!(self, CycleError::EventNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, CycleError>;
