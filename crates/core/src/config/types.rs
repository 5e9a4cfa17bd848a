use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::campaign::CampaignConfig;

/// Root configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub telephony: TelephonyConfig,
    pub tts: TtsConfig,
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub campaign: CampaignConfig,
    #[serde(default)]
    pub output: OutputConfig,
    #[serde(default)]
    pub input: InputConfig,
}

/// Telephony provider (Twilio) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TelephonyConfig {
    /// Account SID
    pub account_sid: String,
    /// Auth token
    pub auth_token: String,
    /// Caller id used for every call
    pub from_number: String,
    /// Country calling code prepended to bare national numbers
    #[serde(default = "default_country_code")]
    pub country_code: String,
    /// REST API base URL
    #[serde(default = "default_twilio_url")]
    pub api_url: String,
    /// Request timeout in seconds (default: 15)
    #[serde(default = "default_request_timeout")]
    pub timeout_secs: u32,
}

fn default_country_code() -> String {
    "1".to_string()
}

fn default_twilio_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_request_timeout() -> u32 {
    15
}

/// Speech synthesis (ElevenLabs) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TtsConfig {
    pub api_key: String,
    #[serde(default = "default_voice_id")]
    pub voice_id: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_tts_url")]
    pub api_url: String,
    /// Directory synthesized audio is written to (and served from)
    #[serde(default = "default_audio_dir")]
    pub audio_dir: PathBuf,
    /// Request timeout in seconds (default: 60)
    #[serde(default = "default_tts_timeout")]
    pub timeout_secs: u32,
}

fn default_voice_id() -> String {
    // "Rachel"
    "21m00Tcm4TlvDq8ikWAM".to_string()
}

fn default_model() -> String {
    "eleven_multilingual_v2".to_string()
}

fn default_tts_url() -> String {
    "https://api.elevenlabs.io".to_string()
}

fn default_audio_dir() -> PathBuf {
    PathBuf::from("audio_files")
}

fn default_tts_timeout() -> u32 {
    60
}

/// Public webhook exposure (tunnel URL) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WebhookConfig {
    /// Public base URL that serves `/audio/*` and receives `/status-callback`
    pub public_url: String,
}

/// Outcome log locations
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OutputConfig {
    #[serde(default = "default_success_file")]
    pub success_file: PathBuf,
    #[serde(default = "default_retry_file")]
    pub retry_file: PathBuf,
    /// Prometheus text-format snapshot written when the campaign ends
    #[serde(default)]
    pub metrics_file: Option<PathBuf>,
    /// Truncate both outcome logs before the campaign starts
    #[serde(default)]
    pub reset_on_start: bool,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            success_file: default_success_file(),
            retry_file: default_retry_file(),
            metrics_file: None,
            reset_on_start: false,
        }
    }
}

fn default_success_file() -> PathBuf {
    PathBuf::from("success.txt")
}

fn default_retry_file() -> PathBuf {
    PathBuf::from("retries.txt")
}

/// Campaign input files
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct InputConfig {
    /// One recipient per line
    #[serde(default = "default_recipients_file")]
    pub recipients_file: PathBuf,
    /// Script text read verbatim (trimmed)
    #[serde(default = "default_script_file")]
    pub script_file: PathBuf,
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            recipients_file: default_recipients_file(),
            script_file: default_script_file(),
        }
    }
}

fn default_recipients_file() -> PathBuf {
    PathBuf::from("numbers.txt")
}

fn default_script_file() -> PathBuf {
    PathBuf::from("script.txt")
}

/// Sanitized config for logging (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub telephony: SanitizedTelephonyConfig,
    pub tts: SanitizedTtsConfig,
    pub webhook: WebhookConfig,
    pub campaign: CampaignConfig,
    pub output: OutputConfig,
    pub input: InputConfig,
}

/// Sanitized telephony config (auth token hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTelephonyConfig {
    pub account_sid: String,
    pub auth_token_configured: bool,
    pub from_number: String,
    pub country_code: String,
    pub api_url: String,
    pub timeout_secs: u32,
}

/// Sanitized TTS config (API key hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTtsConfig {
    pub api_key_configured: bool,
    pub voice_id: String,
    pub model: String,
    pub api_url: String,
    pub audio_dir: PathBuf,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            telephony: SanitizedTelephonyConfig {
                account_sid: config.telephony.account_sid.clone(),
                auth_token_configured: !config.telephony.auth_token.is_empty(),
                from_number: config.telephony.from_number.clone(),
                country_code: config.telephony.country_code.clone(),
                api_url: config.telephony.api_url.clone(),
                timeout_secs: config.telephony.timeout_secs,
            },
            tts: SanitizedTtsConfig {
                api_key_configured: !config.tts.api_key.is_empty(),
                voice_id: config.tts.voice_id.clone(),
                model: config.tts.model.clone(),
                api_url: config.tts.api_url.clone(),
                audio_dir: config.tts.audio_dir.clone(),
                timeout_secs: config.tts.timeout_secs,
            },
            webhook: config.webhook.clone(),
            campaign: config.campaign.clone(),
            output: config.output.clone(),
            input: config.input.clone(),
        }
    }
}
