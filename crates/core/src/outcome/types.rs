//! Outcome records and the sink abstraction.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::recipient::Recipient;
use crate::telephony::CallStatus;

/// Call reference written when a failure happened before any call id existed.
pub const ERROR_PLACEHOLDER: &str = "ERROR";

/// Call reference written for recipients skipped by a cancel.
pub const SKIPPED_PLACEHOLDER: &str = "SKIPPED";

/// Errors persisting outcomes.
#[derive(Debug, Error)]
pub enum OutcomeError {
    #[error("Failed to write outcome log {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Outcome writer unavailable: {0}")]
    Unavailable(String),
}

/// Which log a record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeLog {
    /// Delivered calls.
    Success,
    /// Everything worth another attempt.
    Retry,
}

impl fmt::Display for OutcomeLog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Retry => f.write_str("retry"),
        }
    }
}

/// One line of an outcome log: `recipient,call_ref,detail`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRecord {
    pub log: OutcomeLog,
    pub recipient: Recipient,
    /// Provider call id, or a placeholder when no call was placed.
    pub call_ref: String,
    /// Terminal status or failure reason.
    pub detail: String,
}

impl OutcomeRecord {
    pub fn success(recipient: &Recipient, call_id: &str, status: CallStatus) -> Self {
        Self {
            log: OutcomeLog::Success,
            recipient: recipient.clone(),
            call_ref: call_id.to_string(),
            detail: status.to_string(),
        }
    }

    pub fn failure(recipient: &Recipient, call_id: Option<&str>, reason: &str) -> Self {
        Self {
            log: OutcomeLog::Retry,
            recipient: recipient.clone(),
            call_ref: call_id.unwrap_or(ERROR_PLACEHOLDER).to_string(),
            detail: reason.to_string(),
        }
    }

    pub fn skipped(recipient: &Recipient) -> Self {
        Self {
            log: OutcomeLog::Retry,
            recipient: recipient.clone(),
            call_ref: SKIPPED_PLACEHOLDER.to_string(),
            detail: CallStatus::Canceled.to_string(),
        }
    }

    /// Serialize as a single newline-terminated line with exactly three fields.
    pub fn to_line(&self) -> String {
        format!(
            "{},{},{}\n",
            self.recipient,
            sanitize_field(&self.call_ref),
            sanitize_field(&self.detail)
        )
    }

    /// Parse a line previously produced by [`OutcomeRecord::to_line`].
    pub fn parse_line(log: OutcomeLog, line: &str) -> Option<Self> {
        let mut fields = line.trim_end_matches(['\r', '\n']).splitn(3, ',');
        let recipient = Recipient::parse(fields.next()?)?;
        let call_ref = fields.next()?.to_string();
        let detail = fields.next()?.to_string();
        Some(Self {
            log,
            recipient,
            call_ref,
            detail,
        })
    }
}

/// Keep a field on one line and free of the separator.
fn sanitize_field(value: &str) -> String {
    value
        .chars()
        .map(|c| match c {
            ',' => ';',
            '\r' | '\n' => ' ',
            c => c,
        })
        .collect::<String>()
        .trim()
        .to_string()
}

/// Append-only destination for call outcomes.
///
/// Implementations must make each append indivisible with respect to
/// concurrent callers and must never rewrite earlier records.
#[async_trait]
pub trait OutcomeSink: Send + Sync {
    /// Append one record to the log it belongs to.
    async fn append(&self, record: &OutcomeRecord) -> Result<(), OutcomeError>;

    /// Record a delivered call.
    async fn record_success(
        &self,
        recipient: &Recipient,
        call_id: &str,
        status: CallStatus,
    ) -> Result<(), OutcomeError> {
        self.append(&OutcomeRecord::success(recipient, call_id, status))
            .await
    }

    /// Record a failed attempt. `call_id` is `None` for errors before dialing.
    async fn record_failure(
        &self,
        recipient: &Recipient,
        call_id: Option<&str>,
        reason: &str,
    ) -> Result<(), OutcomeError> {
        self.append(&OutcomeRecord::failure(recipient, call_id, reason))
            .await
    }
}
