//! Testing utilities and mock implementations.
//!
//! Mocks for every external seam of a campaign, so the dispatch engine can
//! be exercised end to end without a telephony account or TTS service.
//!
//! # Example
//!
//! ```rust,ignore
//! use callcast_core::testing::{MockOutcomeSink, MockSynthesizer, MockTelephonyClient};
//!
//! let telephony = Arc::new(MockTelephonyClient::new());
//! telephony.set_statuses("+15551234567", vec![CallStatus::Busy]).await;
//!
//! let controller = fixtures::controller(config, telephony.clone(), synth, sink);
//! ```

mod mock_outcome_sink;
mod mock_synthesizer;
mod mock_telephony;

pub use mock_outcome_sink::MockOutcomeSink;
pub use mock_synthesizer::MockSynthesizer;
pub use mock_telephony::{MockTelephonyClient, RecordedCall};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::sync::Arc;

    use crate::campaign::{CallerId, CampaignConfig, CampaignController};
    use crate::outcome::OutcomeSink;
    use crate::recipient::Recipient;
    use crate::telephony::TelephonyClient;
    use crate::tts::SpeechSynthesizer;
    use crate::webhook::WebhookEndpoints;

    pub const CALLER_NUMBER: &str = "+15550001111";
    pub const PUBLIC_URL: &str = "https://hooks.example";

    /// Caller id for US numbers.
    pub fn caller() -> CallerId {
        CallerId {
            from_number: CALLER_NUMBER.to_string(),
            country_code: "1".to_string(),
        }
    }

    pub fn endpoints() -> WebhookEndpoints {
        WebhookEndpoints::new(PUBLIC_URL)
    }

    /// Parse a list of raw numbers, skipping invalid ones.
    pub fn recipients(raw: &[&str]) -> Vec<Recipient> {
        raw.iter().filter_map(|r| Recipient::parse(r)).collect()
    }

    /// `count` distinct ten-digit recipients.
    pub fn numbered_recipients(count: usize) -> Vec<Recipient> {
        (0..count)
            .filter_map(|i| Recipient::parse(&format!("555{:07}", i)))
            .collect()
    }

    /// Campaign config with fast polling, suitable for paused-clock tests.
    pub fn fast_config() -> CampaignConfig {
        CampaignConfig {
            poll_interval_ms: 10,
            max_wait_secs: 5,
            progress_interval_ms: 50,
            ..CampaignConfig::default()
        }
    }

    /// Controller wired to the given seams with default caller and endpoints.
    pub fn controller(
        config: CampaignConfig,
        telephony: Arc<dyn TelephonyClient>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        sink: Arc<dyn OutcomeSink>,
    ) -> CampaignController {
        CampaignController::new(config, caller(), endpoints(), telephony, synthesizer, sink)
    }
}
