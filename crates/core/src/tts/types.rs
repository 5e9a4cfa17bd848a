//! Types for the speech synthesis abstraction.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors returned by a speech synthesizer.
#[derive(Debug, Error)]
pub enum SynthesisError {
    #[error("Synthesizer not configured: {0}")]
    NotConfigured(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Request timeout")]
    Timeout,

    #[error("Synthesizer returned empty audio")]
    EmptyAudio,

    #[error("Failed to write audio to {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Explicit reference to a synthesized audio file.
///
/// Threaded from synthesis to call placement so each call plays exactly
/// the audio that was produced for it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioRef {
    /// File name under the served audio directory.
    pub file_name: String,
    /// Local path of the audio file.
    pub path: PathBuf,
}

/// A text-to-speech backend.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Synthesize `text` and return a reference to the stored audio.
    async fn synthesize(&self, text: &str) -> Result<AudioRef, SynthesisError>;
}
