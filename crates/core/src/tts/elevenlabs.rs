//! ElevenLabs text-to-speech backend.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, info};

use crate::config::TtsConfig;

use super::{AudioRef, SpeechSynthesizer, SynthesisError};

const OUTPUT_FORMAT: &str = "mp3_44100_128";

#[derive(Debug, Serialize)]
struct VoiceSettings {
    stability: f32,
    similarity_boost: f32,
    style: f32,
    use_speaker_boost: bool,
}

#[derive(Debug, Serialize)]
struct SpeechRequest<'a> {
    text: &'a str,
    model_id: &'a str,
    voice_settings: VoiceSettings,
}

/// ElevenLabs synthesizer writing MP3 files into the audio directory.
pub struct ElevenLabsSynthesizer {
    client: Client,
    config: TtsConfig,
}

impl ElevenLabsSynthesizer {
    /// Create a new synthesizer.
    pub fn new(config: TtsConfig) -> Result<Self, SynthesisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| SynthesisError::NotConfigured(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn base_url(&self) -> &str {
        self.config.api_url.trim_end_matches('/')
    }

    async fn store(&self, file_name: String, audio: &[u8]) -> Result<AudioRef, SynthesisError> {
        let dir = &self.config.audio_dir;
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|source| SynthesisError::Io {
                path: dir.clone(),
                source,
            })?;

        let path = dir.join(&file_name);
        // Write then rename so a concurrent reader never sees a partial file.
        let tmp = dir.join(format!("{}.{}.tmp", file_name, uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, audio)
            .await
            .map_err(|source| SynthesisError::Io {
                path: tmp.clone(),
                source,
            })?;
        tokio::fs::rename(&tmp, &path)
            .await
            .map_err(|source| SynthesisError::Io {
                path: path.clone(),
                source,
            })?;

        Ok(AudioRef { file_name, path })
    }
}

/// Content-addressed file name for a voice/model/text combination.
///
/// Identical scripts share one file; different scripts never collide.
pub(crate) fn audio_file_name(voice_id: &str, model: &str, text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(voice_id.as_bytes());
    hasher.update([0u8]);
    hasher.update(model.as_bytes());
    hasher.update([0u8]);
    hasher.update(text.as_bytes());
    let digest = format!("{:x}", hasher.finalize());
    format!("tts_{}.mp3", &digest[..16])
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsSynthesizer {
    fn name(&self) -> &str {
        "elevenlabs"
    }

    async fn synthesize(&self, text: &str) -> Result<AudioRef, SynthesisError> {
        if self.config.api_key.trim().is_empty() {
            return Err(SynthesisError::NotConfigured(
                "ElevenLabs API key is not set".to_string(),
            ));
        }

        let file_name = audio_file_name(&self.config.voice_id, &self.config.model, text);
        let path = self.config.audio_dir.join(&file_name);
        if tokio::fs::metadata(&path).await.is_ok_and(|m| m.len() > 0) {
            debug!("Reusing synthesized audio {}", file_name);
            return Ok(AudioRef { file_name, path });
        }

        let url = format!(
            "{}/v1/text-to-speech/{}?output_format={}",
            self.base_url(),
            urlencoding::encode(&self.config.voice_id),
            OUTPUT_FORMAT
        );
        let body = SpeechRequest {
            text,
            model_id: &self.config.model,
            voice_settings: VoiceSettings {
                stability: 0.71,
                similarity_boost: 0.5,
                style: 0.0,
                use_speaker_boost: true,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", &self.config.api_key)
            .header("accept", "audio/mpeg")
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SynthesisError::Timeout
                } else if e.is_connect() {
                    SynthesisError::ConnectionFailed(e.to_string())
                } else {
                    SynthesisError::ApiError(e.to_string())
                }
            })?;

        let status = response.status();
        if status.as_u16() == 401 || status.as_u16() == 403 {
            return Err(SynthesisError::AuthenticationFailed(format!("HTTP {}", status)));
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(SynthesisError::ApiError(format!(
                "HTTP {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| SynthesisError::ApiError(e.to_string()))?;
        if audio.is_empty() {
            return Err(SynthesisError::EmptyAudio);
        }

        let audio_ref = self.store(file_name, &audio).await?;
        info!(
            "Synthesized {} bytes of speech into {}",
            audio.len(),
            audio_ref.file_name
        );
        Ok(audio_ref)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn config(api_key: &str, audio_dir: PathBuf) -> TtsConfig {
        TtsConfig {
            api_key: api_key.to_string(),
            voice_id: "voice".to_string(),
            model: "model".to_string(),
            api_url: "http://127.0.0.1:9".to_string(),
            audio_dir,
            timeout_secs: 1,
        }
    }

    #[test]
    fn test_audio_file_name_is_stable() {
        let a = audio_file_name("voice", "model", "Hello");
        let b = audio_file_name("voice", "model", "Hello");
        assert_eq!(a, b);
        assert!(a.starts_with("tts_"));
        assert!(a.ends_with(".mp3"));
        assert_eq!(a.len(), "tts_".len() + 16 + ".mp3".len());
    }

    #[test]
    fn test_audio_file_name_differs_by_input() {
        let base = audio_file_name("voice", "model", "Hello");
        assert_ne!(base, audio_file_name("voice", "model", "Hello there"));
        assert_ne!(base, audio_file_name("other", "model", "Hello"));
        assert_ne!(base, audio_file_name("voice", "other", "Hello"));
    }

    #[tokio::test]
    async fn test_missing_api_key() {
        let dir = TempDir::new().unwrap();
        let synth = ElevenLabsSynthesizer::new(config("", dir.path().to_path_buf())).unwrap();
        let result = synth.synthesize("Hello").await;
        assert!(matches!(result, Err(SynthesisError::NotConfigured(_))));
    }

    #[tokio::test]
    async fn test_reuses_existing_audio() {
        let dir = TempDir::new().unwrap();
        let file_name = audio_file_name("voice", "model", "Hello");
        std::fs::write(dir.path().join(&file_name), b"ID3").unwrap();

        let synth = ElevenLabsSynthesizer::new(config("key", dir.path().to_path_buf())).unwrap();
        let audio = synth.synthesize("Hello").await.unwrap();
        assert_eq!(audio.file_name, file_name);
        assert_eq!(audio.path, dir.path().join(&file_name));
    }
}
