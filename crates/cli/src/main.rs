mod metrics;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use callcast_core::{
    load_config, load_recipients, validate_config, CallerId, CampaignController, Config,
    ElevenLabsSynthesizer, FileOutcomeSink, OutcomeSink, SanitizedConfig, SpeechSynthesizer,
    TelephonyClient, TwilioClient, WebhookEndpoints,
};

/// Application version
const VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,reqwest=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("callcast {}", VERSION);

    // Determine config path
    let config_path = std::env::var("CALLCAST_CONFIG")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("config.toml"));

    // Load configuration
    info!("Loading configuration from {:?}", config_path);
    let config = load_config(&config_path)
        .with_context(|| format!("Failed to load config from {:?}", config_path))?;

    // Validate configuration
    validate_config(&config).context("Configuration validation failed")?;

    let sanitized = SanitizedConfig::from(&config);
    info!(
        "Configuration loaded: {}",
        serde_json::to_string(&sanitized).unwrap_or_default()
    );

    // Campaign inputs
    let recipients = load_recipients(&config.input.recipients_file).with_context(|| {
        format!(
            "Failed to load recipients from {:?}",
            config.input.recipients_file
        )
    })?;
    let script = std::fs::read_to_string(&config.input.script_file).with_context(|| {
        format!("Failed to read script from {:?}", config.input.script_file)
    })?;
    info!(
        "Loaded {} recipients from {:?}",
        recipients.len(),
        config.input.recipients_file
    );

    let controller = build_controller(&config)?;
    let handle = controller
        .start(recipients, &script, config.campaign.concurrency)
        .context("Failed to start campaign")?;

    // Cancel on Ctrl+C / SIGTERM, then keep waiting for workers to drain
    let summary = tokio::select! {
        summary = handle.wait() => summary,
        _ = shutdown_signal() => {
            warn!("Shutdown requested, no further calls will be placed");
            handle.request_cancel();
            handle.wait().await
        }
    }
    .context("Campaign did not finish")?;

    metrics::collect_campaign_metrics(&handle.progress());
    if let Some(path) = &config.output.metrics_file {
        metrics::write_metrics(path)?;
        info!("Metrics written to {:?}", path);
    }

    info!(
        "Summary: {}",
        serde_json::to_string(&summary).unwrap_or_default()
    );

    if summary.is_degraded() {
        bail!(
            "{} outcomes could not be written; check {:?} and {:?}",
            summary.persistence_failures,
            config.output.success_file,
            config.output.retry_file
        );
    }

    Ok(())
}

/// Wire the production telephony, synthesis and outcome backends.
fn build_controller(config: &Config) -> Result<CampaignController> {
    let telephony: Arc<dyn TelephonyClient> = Arc::new(
        TwilioClient::new(config.telephony.clone()).context("Failed to create telephony client")?,
    );
    info!("Using telephony provider: {}", telephony.name());

    let synthesizer: Arc<dyn SpeechSynthesizer> = Arc::new(
        ElevenLabsSynthesizer::new(config.tts.clone())
            .context("Failed to create speech synthesizer")?,
    );
    info!(
        "Using speech synthesizer: {} (voice {})",
        synthesizer.name(),
        config.tts.voice_id
    );

    let sink = FileOutcomeSink::open(&config.output.success_file, &config.output.retry_file)
        .context("Failed to open outcome logs")?;
    if config.output.reset_on_start {
        sink.reset().context("Failed to reset outcome logs")?;
    }
    let sink: Arc<dyn OutcomeSink> = Arc::new(sink);

    let caller = CallerId {
        from_number: config.telephony.from_number.clone(),
        country_code: config.telephony.country_code.clone(),
    };
    let endpoints = WebhookEndpoints::new(config.webhook.public_url.clone());
    info!(
        "Audio served from {}/audio, status callbacks to {}",
        endpoints.base_url(),
        endpoints.status_callback_url()
    );

    Ok(CampaignController::new(
        config.campaign.clone(),
        caller,
        endpoints,
        telephony,
        synthesizer,
        sink,
    ))
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
