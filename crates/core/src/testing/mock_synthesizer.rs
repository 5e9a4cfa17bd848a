//! Mock speech synthesizer for testing.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::tts::{AudioRef, SpeechSynthesizer, SynthesisError};

/// Mock implementation of the SpeechSynthesizer trait.
///
/// Every successful request yields a fresh `mock_{n}.mp3` reference; no
/// audio is written to disk.
#[derive(Debug)]
pub struct MockSynthesizer {
    /// Texts passed to synthesize(), in request order.
    texts: Arc<RwLock<Vec<String>>>,
    /// If set, synthesize() fails with ApiError(message).
    failure: Arc<RwLock<Option<String>>>,
    /// Simulated latency.
    delay: Arc<RwLock<Duration>>,
    /// Directory reported in AudioRef::path.
    audio_dir: PathBuf,
}

impl Default for MockSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self {
            texts: Arc::new(RwLock::new(Vec::new())),
            failure: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
            audio_dir: PathBuf::from("/tmp/callcast-mock-audio"),
        }
    }

    /// Make all subsequent requests fail.
    pub async fn set_failure(&self, message: impl Into<String>) {
        *self.failure.write().await = Some(message.into());
    }

    /// Clear a previously set failure.
    pub async fn clear_failure(&self) {
        *self.failure.write().await = None;
    }

    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Texts requested so far, including failed requests.
    pub async fn synthesized_texts(&self) -> Vec<String> {
        self.texts.read().await.clone()
    }

    pub async fn request_count(&self) -> usize {
        self.texts.read().await.len()
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    fn name(&self) -> &str {
        "mock"
    }

    async fn synthesize(&self, text: &str) -> Result<AudioRef, SynthesisError> {
        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let n = {
            let mut texts = self.texts.write().await;
            texts.push(text.to_string());
            texts.len()
        };

        if let Some(message) = self.failure.read().await.as_ref() {
            return Err(SynthesisError::ApiError(message.clone()));
        }

        let file_name = format!("mock_{}.mp3", n);
        Ok(AudioRef {
            path: self.audio_dir.join(&file_name),
            file_name,
        })
    }
}
