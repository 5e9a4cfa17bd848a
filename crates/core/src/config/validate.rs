use super::{types::Config, ConfigError};

/// Validate configuration
///
/// Rejects missing credentials, a missing caller id or webhook URL,
/// and a zero poll interval.
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    let required = [
        ("telephony.account_sid", &config.telephony.account_sid),
        ("telephony.auth_token", &config.telephony.auth_token),
        ("telephony.from_number", &config.telephony.from_number),
        ("tts.api_key", &config.tts.api_key),
        ("webhook.public_url", &config.webhook.public_url),
    ];
    for (name, value) in required {
        if value.trim().is_empty() {
            return Err(ConfigError::ValidationError(format!("{} is required", name)));
        }
    }

    if !config.webhook.public_url.starts_with("http://")
        && !config.webhook.public_url.starts_with("https://")
    {
        return Err(ConfigError::ValidationError(
            "webhook.public_url must be an http(s) URL".to_string(),
        ));
    }

    if config.campaign.poll_interval_ms == 0 {
        return Err(ConfigError::ValidationError(
            "campaign.poll_interval_ms cannot be 0".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::load_config_from_str;

    fn valid_config() -> Config {
        load_config_from_str(
            r#"
[telephony]
account_sid = "AC123"
auth_token = "token"
from_number = "+15550001111"

[tts]
api_key = "xi-key"

[webhook]
public_url = "https://example.ngrok.app"
"#,
        )
        .unwrap()
    }

    #[test]
    fn test_validate_valid_config() {
        assert!(validate_config(&valid_config()).is_ok());
    }

    #[test]
    fn test_validate_missing_auth_token() {
        let mut config = valid_config();
        config.telephony.auth_token = "  ".to_string();
        let err = validate_config(&config).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("telephony.auth_token"));
    }

    #[test]
    fn test_validate_webhook_scheme() {
        let mut config = valid_config();
        config.webhook.public_url = "example.ngrok.app".to_string();
        assert!(validate_config(&config).is_err());
    }

    #[test]
    fn test_validate_zero_poll_interval() {
        let mut config = valid_config();
        config.campaign.poll_interval_ms = 0;
        assert!(validate_config(&config).is_err());
    }
}
