//! Prometheus registry for a campaign run.
//!
//! Registers the engine's counters plus a few gauges describing the final
//! campaign state, and renders them in the text exposition format.

use std::path::Path;

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use prometheus::{Encoder, IntGauge, IntGaugeVec, Opts, Registry, TextEncoder};

use callcast_core::CampaignProgress;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Recipients in the campaign.
pub static CAMPAIGN_RECIPIENTS: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "callcast_campaign_recipients",
        "Number of recipients in the campaign",
    )
    .unwrap()
});

/// Recipients by progress bucket.
pub static CAMPAIGN_PROGRESS: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new("callcast_campaign_progress", "Recipients by progress bucket"),
        &["bucket"], // "completed", "failed", "in_progress", "remaining", "skipped"
    )
    .unwrap()
});

/// Whether a cancel was requested (0 or 1).
pub static CAMPAIGN_CANCELLED: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "callcast_campaign_cancel_requested",
        "Whether the campaign was asked to stop",
    )
    .unwrap()
});

fn register_metrics(registry: &Registry) {
    for metric in callcast_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }

    registry
        .register(Box::new(CAMPAIGN_RECIPIENTS.clone()))
        .unwrap();
    registry
        .register(Box::new(CAMPAIGN_PROGRESS.clone()))
        .unwrap();
    registry
        .register(Box::new(CAMPAIGN_CANCELLED.clone()))
        .unwrap();
}

/// Copy a progress snapshot into the campaign gauges.
pub fn collect_campaign_metrics(progress: &CampaignProgress) {
    CAMPAIGN_RECIPIENTS.set(progress.total as i64);
    for (bucket, value) in [
        ("completed", progress.completed),
        ("failed", progress.failed),
        ("in_progress", progress.in_progress),
        ("remaining", progress.remaining),
        ("skipped", progress.skipped),
    ] {
        CAMPAIGN_PROGRESS
            .with_label_values(&[bucket])
            .set(value as i64);
    }
    CAMPAIGN_CANCELLED.set(i64::from(progress.cancel_requested));
}

/// Encode all registered metrics in Prometheus text format.
pub fn encode_metrics() -> Result<String> {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    encoder
        .encode(&metric_families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics are not valid UTF-8")
}

/// Write the current metrics snapshot to `path`.
pub fn write_metrics(path: &Path) -> Result<()> {
    let text = encode_metrics()?;
    std::fs::write(path, text)
        .with_context(|| format!("Failed to write metrics to {:?}", path))
}
