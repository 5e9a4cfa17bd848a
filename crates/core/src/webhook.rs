//! Public webhook endpoints the telephony provider talks to.

use crate::tts::AudioRef;

/// URLs derived from the public base URL of the audio/callback server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebhookEndpoints {
    base: String,
}

impl WebhookEndpoints {
    pub fn new(public_url: impl Into<String>) -> Self {
        let base = public_url.into().trim_end_matches('/').to_string();
        Self { base }
    }

    pub fn base_url(&self) -> &str {
        &self.base
    }

    /// URL the provider fetches to play `audio`.
    pub fn audio_url(&self, audio: &AudioRef) -> String {
        format!("{}/audio/{}", self.base, urlencoding::encode(&audio.file_name))
    }

    /// URL the provider posts call status changes to.
    pub fn status_callback_url(&self) -> String {
        format!("{}/status-callback", self.base)
    }
}
