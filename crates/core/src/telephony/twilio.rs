//! Twilio REST telephony client.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::TelephonyConfig;

use super::{CallStatus, PlaceCallRequest, TelephonyClient, TelephonyError};

/// Status changes the provider reports to the callback URL.
const STATUS_CALLBACK_EVENTS: [&str; 4] = ["initiated", "ringing", "answered", "completed"];

#[derive(Debug, Deserialize)]
struct CallResource {
    sid: String,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    message: Option<String>,
}

/// Twilio client implementation.
pub struct TwilioClient {
    client: Client,
    config: TelephonyConfig,
}

impl TwilioClient {
    /// Create a new Twilio client.
    pub fn new(config: TelephonyConfig) -> Result<Self, TelephonyError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .build()
            .map_err(|e| TelephonyError::NotConfigured(e.to_string()))?;

        Ok(Self { client, config })
    }

    fn calls_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Calls",
            self.config.api_url.trim_end_matches('/'),
            urlencoding::encode(&self.config.account_sid)
        )
    }

    fn map_send_error(e: reqwest::Error) -> TelephonyError {
        if e.is_timeout() {
            TelephonyError::Timeout
        } else if e.is_connect() {
            TelephonyError::ConnectionFailed(e.to_string())
        } else {
            TelephonyError::ApiError(e.to_string())
        }
    }

    /// Turn a non-success response into a typed error.
    async fn error_from(response: Response, call_id: Option<&str>) -> TelephonyError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .ok()
            .and_then(|b| {
                b.message
                    .map(|m| b.code.map(|c| format!("{} (code {})", m, c)).unwrap_or(m))
            })
            .unwrap_or_else(|| body.chars().take(200).collect());

        match status.as_u16() {
            401 | 403 => TelephonyError::AuthenticationFailed(message),
            404 => TelephonyError::CallNotFound(call_id.unwrap_or_default().to_string()),
            code if status.is_server_error() => {
                TelephonyError::ApiError(format!("HTTP {}: {}", code, message))
            }
            code => TelephonyError::Rejected {
                status: code,
                message,
            },
        }
    }
}

/// Inline TwiML that plays the given audio URL once the call is answered.
pub(crate) fn play_twiml(audio_url: &str) -> String {
    let escaped = audio_url
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;");
    format!("<Response><Play>{}</Play></Response>", escaped)
}

#[async_trait]
impl TelephonyClient for TwilioClient {
    fn name(&self) -> &str {
        "twilio"
    }

    async fn place_call(&self, request: &PlaceCallRequest) -> Result<String, TelephonyError> {
        let twiml = play_twiml(&request.audio_url);
        let mut form: Vec<(&str, &str)> = vec![
            ("To", request.to.as_str()),
            ("From", request.from.as_str()),
            ("Twiml", twiml.as_str()),
            ("StatusCallback", request.status_callback_url.as_str()),
            ("StatusCallbackMethod", "POST"),
        ];
        for event in STATUS_CALLBACK_EVENTS {
            form.push(("StatusCallbackEvent", event));
        }

        let response = self
            .client
            .post(format!("{}.json", self.calls_url()))
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, None).await);
        }

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| TelephonyError::ApiError(format!("Invalid call resource: {}", e)))?;

        info!(
            "Call to {} created: {} ({})",
            request.to,
            call.sid,
            call.status.as_deref().unwrap_or("unknown")
        );
        Ok(call.sid)
    }

    async fn get_call_status(&self, call_id: &str) -> Result<CallStatus, TelephonyError> {
        let url = format!("{}/{}.json", self.calls_url(), urlencoding::encode(call_id));
        let response = self
            .client
            .get(&url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .send()
            .await
            .map_err(Self::map_send_error)?;

        if !response.status().is_success() {
            return Err(Self::error_from(response, Some(call_id)).await);
        }

        let call: CallResource = response
            .json()
            .await
            .map_err(|e| TelephonyError::ApiError(format!("Invalid call resource: {}", e)))?;

        let status = call
            .status
            .as_deref()
            .map(CallStatus::from_wire)
            .unwrap_or(CallStatus::Unknown);
        debug!("Call {} status: {}", call.sid, status);
        Ok(status)
    }

    fn validate(&self) -> Result<(), TelephonyError> {
        if self.config.account_sid.trim().is_empty() || self.config.auth_token.trim().is_empty() {
            return Err(TelephonyError::NotConfigured(
                "Twilio account SID and auth token are required".to_string(),
            ));
        }
        Ok(())
    }
}
