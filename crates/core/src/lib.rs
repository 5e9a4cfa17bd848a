pub mod campaign;
pub mod config;
pub mod metrics;
pub mod outcome;
pub mod recipient;
pub mod telephony;
pub mod testing;
pub mod tts;
pub mod webhook;

pub use campaign::{
    CallError, CallerId, CampaignConfig, CampaignController, CampaignError, CampaignHandle,
    CampaignProgress, CampaignSummary,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use outcome::{FileOutcomeSink, OutcomeRecord, OutcomeSink};
pub use recipient::{load_recipients, parse_recipients, Recipient};
pub use telephony::{CallStatus, TelephonyClient, TwilioClient};
pub use tts::{ElevenLabsSynthesizer, SpeechSynthesizer};
pub use webhook::WebhookEndpoints;
