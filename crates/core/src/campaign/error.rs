//! Error types for campaign dispatch.

use thiserror::Error;

use crate::telephony::CallStatus;

/// Errors that stop a campaign from starting or reporting.
#[derive(Debug, Error)]
pub enum CampaignError {
    /// Preconditions unmet; nothing was enqueued or dialed.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The campaign supervisor ended without producing a summary.
    #[error("campaign interrupted before completion")]
    Interrupted,
}

/// Per-recipient failures. These never escape a dispatch worker; they are
/// turned into retry-log entries.
#[derive(Debug, Clone, Error)]
pub enum CallError {
    #[error("speech synthesis failed: {0}")]
    Synthesis(String),

    #[error("call placement failed: {0}")]
    Dial(String),

    #[error("no terminal status for call {call_id} after {waited_secs}s (last status: {last_status})")]
    PollTimeout {
        call_id: String,
        waited_secs: u64,
        last_status: CallStatus,
    },

    #[error("provider error while polling call {call_id}: {message}")]
    TransientProvider { call_id: String, message: String },

    /// The provider refused the status request in a way retrying cannot fix.
    #[error("status check for call {call_id} rejected: {message}")]
    StatusRejected { call_id: String, message: String },

    #[error("stopped polling call {call_id} after cancel")]
    Abandoned { call_id: String },
}

impl CallError {
    /// Reason written to the retry log.
    pub fn reason(&self) -> String {
        match self {
            Self::Synthesis(_) | Self::Dial(_) => self.to_string(),
            Self::PollTimeout { .. } => "timeout".to_string(),
            Self::TransientProvider { message, .. } => format!("provider_error: {}", message),
            Self::StatusRejected { message, .. } => format!("status_rejected: {}", message),
            Self::Abandoned { .. } => "abandoned".to_string(),
        }
    }

    /// Short label for metrics.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Synthesis(_) => "synthesis_error",
            Self::Dial(_) => "dial_error",
            Self::PollTimeout { .. } => "timeout",
            Self::TransientProvider { .. } => "provider_error",
            Self::StatusRejected { .. } => "status_rejected",
            Self::Abandoned { .. } => "abandoned",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = CampaignError::Configuration("no recipients to call".to_string());
        assert_eq!(err.to_string(), "configuration error: no recipients to call");

        let err = CallError::PollTimeout {
            call_id: "CA1".to_string(),
            waited_secs: 5,
            last_status: CallStatus::Ringing,
        };
        assert_eq!(
            err.to_string(),
            "no terminal status for call CA1 after 5s (last status: ringing)"
        );
    }

    #[test]
    fn test_reasons() {
        assert_eq!(
            CallError::Dial("Request rejected (400): invalid number".to_string()).reason(),
            "call placement failed: Request rejected (400): invalid number"
        );
        assert_eq!(
            CallError::TransientProvider {
                call_id: "CA1".to_string(),
                message: "Request timeout".to_string(),
            }
            .reason(),
            "provider_error: Request timeout"
        );
        assert_eq!(
            CallError::StatusRejected {
                call_id: "CA1".to_string(),
                message: "Call not found: CA1".to_string(),
            }
            .reason(),
            "status_rejected: Call not found: CA1"
        );
        assert_eq!(
            CallError::Abandoned {
                call_id: "CA1".to_string()
            }
            .label(),
            "abandoned"
        );
    }
}
