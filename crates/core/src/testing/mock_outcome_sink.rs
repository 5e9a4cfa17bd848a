//! In-memory outcome sink for testing.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::outcome::{OutcomeError, OutcomeLog, OutcomeRecord, OutcomeSink};

/// Mock implementation of the OutcomeSink trait.
///
/// Keeps every appended record in memory. Can be switched into a failing
/// mode to exercise persistence-failure handling.
#[derive(Debug, Default)]
pub struct MockOutcomeSink {
    records: Arc<RwLock<Vec<OutcomeRecord>>>,
    failing: Arc<RwLock<bool>>,
    rejected: Arc<RwLock<usize>>,
}

impl MockOutcomeSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// When true, every append fails and nothing is stored.
    pub async fn set_failing(&self, failing: bool) {
        *self.failing.write().await = failing;
    }

    /// All stored records in append order.
    pub async fn records(&self) -> Vec<OutcomeRecord> {
        self.records.read().await.clone()
    }

    pub async fn successes(&self) -> Vec<OutcomeRecord> {
        self.by_log(OutcomeLog::Success).await
    }

    pub async fn failures(&self) -> Vec<OutcomeRecord> {
        self.by_log(OutcomeLog::Retry).await
    }

    /// Number of appends refused while failing.
    pub async fn rejected_count(&self) -> usize {
        *self.rejected.read().await
    }

    async fn by_log(&self, log: OutcomeLog) -> Vec<OutcomeRecord> {
        self.records
            .read()
            .await
            .iter()
            .filter(|r| r.log == log)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl OutcomeSink for MockOutcomeSink {
    async fn append(&self, record: &OutcomeRecord) -> Result<(), OutcomeError> {
        if *self.failing.read().await {
            *self.rejected.write().await += 1;
            return Err(OutcomeError::Unavailable("mock sink failing".to_string()));
        }
        self.records.write().await.push(record.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recipient::Recipient;
    use tokio_test::{assert_err, assert_ok};
    use crate::telephony::CallStatus;

    #[tokio::test]
    async fn test_splits_by_log() {
        let sink = MockOutcomeSink::new();
        let a = Recipient::parse("5551234567").unwrap();
        let b = Recipient::parse("5559876543").unwrap();

        assert_ok!(sink.record_success(&a, "CA1", CallStatus::Completed).await);
        assert_ok!(sink.record_failure(&b, Some("CA2"), "busy").await);

        assert_eq!(sink.records().await.len(), 2);
        assert_eq!(sink.successes().await[0].recipient, a);
        assert_eq!(sink.failures().await[0].detail, "busy");
    }

    #[tokio::test]
    async fn test_failing_mode() {
        let sink = MockOutcomeSink::new();
        sink.set_failing(true).await;
        let a = Recipient::parse("5551234567").unwrap();

        assert_err!(sink.record_success(&a, "CA1", CallStatus::Completed).await);
        assert!(sink.records().await.is_empty());
        assert_eq!(sink.rejected_count().await, 1);
    }
}
