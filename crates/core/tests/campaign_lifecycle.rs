//! Campaign lifecycle integration tests.
//!
//! These tests drive a full campaign through the controller against mock
//! telephony, synthesis and outcome seams:
//! validate -> enqueue -> dispatch -> poll -> record -> summarize

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;

use callcast_core::{
    campaign::CampaignPhase,
    outcome::{read_outcome_log, OutcomeLog, ERROR_PLACEHOLDER, SKIPPED_PLACEHOLDER},
    telephony::TelephonyError,
    testing::{fixtures, MockOutcomeSink, MockSynthesizer, MockTelephonyClient},
    CallStatus, CampaignConfig, CampaignController, CampaignError, FileOutcomeSink,
};

/// Test helper holding every mock seam of a campaign.
struct TestHarness {
    telephony: Arc<MockTelephonyClient>,
    synthesizer: Arc<MockSynthesizer>,
    sink: Arc<MockOutcomeSink>,
}

impl TestHarness {
    fn new() -> Self {
        Self {
            telephony: Arc::new(MockTelephonyClient::new()),
            synthesizer: Arc::new(MockSynthesizer::new()),
            sink: Arc::new(MockOutcomeSink::new()),
        }
    }

    fn controller(&self, config: CampaignConfig) -> CampaignController {
        fixtures::controller(
            config,
            self.telephony.clone(),
            self.synthesizer.clone(),
            self.sink.clone(),
        )
    }
}

#[tokio::test(start_paused = true)]
async fn test_completed_and_busy_recipients() {
    let harness = TestHarness::new();
    harness
        .telephony
        .set_statuses("+15551234567", vec![CallStatus::Ringing, CallStatus::Completed])
        .await;
    harness
        .telephony
        .set_statuses("+15559876543", vec![CallStatus::Ringing, CallStatus::Busy])
        .await;

    let recipients = fixtures::recipients(&["555-123-4567", "(555) 987-6543"]);
    let handle = harness
        .controller(fixtures::fast_config())
        .start(recipients, "Your appointment is tomorrow.", 2)
        .expect("campaign should start");

    let summary = handle.wait().await.expect("campaign should finish");
    assert_eq!(summary.total, 2);
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);
    assert!(!summary.cancelled);
    assert!(!summary.is_degraded());

    let successes = harness.sink.successes().await;
    assert_eq!(successes.len(), 1);
    assert_eq!(successes[0].recipient.as_str(), "5551234567");
    assert_eq!(successes[0].detail, "completed");
    assert!(successes[0].call_ref.starts_with("CA"));

    let failures = harness.sink.failures().await;
    assert_eq!(failures.len(), 1);
    assert_eq!(failures[0].recipient.as_str(), "5559876543");
    assert_eq!(failures[0].detail, "busy");

    let progress = handle.progress();
    assert_eq!(progress.phase, CampaignPhase::Completed);
    assert_eq!(progress.in_progress, 0);
    assert_eq!(progress.remaining, 0);
    assert!(handle.is_finished());
}

#[tokio::test(start_paused = true)]
async fn test_each_recipient_dialed_exactly_once() {
    let harness = TestHarness::new();
    harness
        .telephony
        .set_place_delay(Duration::from_millis(20))
        .await;

    let recipients = fixtures::numbered_recipients(25);
    let handle = harness
        .controller(fixtures::fast_config())
        .start(recipients, "Reminder", 4)
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.completed, 25);
    assert_eq!(summary.failed, 0);

    let placed = harness.telephony.placed_calls().await;
    assert_eq!(placed.len(), 25);
    let destinations: HashSet<_> = placed.iter().map(|c| c.request.to.clone()).collect();
    assert_eq!(destinations.len(), 25);

    let records = harness.sink.records().await;
    assert_eq!(records.len(), 25);
    let recorded: HashSet<_> = records.into_iter().map(|r| r.recipient).collect();
    assert_eq!(recorded.len(), 25);
}

#[tokio::test(start_paused = true)]
async fn test_more_workers_than_recipients() {
    let harness = TestHarness::new();
    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(3), "Reminder", 10)
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(harness.telephony.placed_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_zero_concurrency_runs_one_worker() {
    let harness = TestHarness::new();
    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(2), "Reminder", 0)
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.completed, 2);
}

#[tokio::test(start_paused = true)]
async fn test_cancel_skips_undialed_recipients() {
    let harness = TestHarness::new();
    harness
        .telephony
        .set_place_delay(Duration::from_millis(100))
        .await;

    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(5), "Reminder", 1)
        .unwrap();

    // First call is done by now; the second placement is in flight.
    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.request_cancel();
    assert!(handle.progress().cancel_requested);

    let summary = handle.wait().await.unwrap();
    assert!(summary.cancelled);
    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 3);
    assert_eq!(summary.skipped, 3);
    assert_eq!(harness.telephony.placed_count().await, 2);

    let failures = harness.sink.failures().await;
    assert_eq!(failures.len(), 3);
    for record in &failures {
        assert_eq!(record.call_ref, SKIPPED_PLACEHOLDER);
        assert_eq!(record.detail, "canceled");
    }
}

#[tokio::test(start_paused = true)]
async fn test_cancel_lets_in_flight_call_finish() {
    let harness = TestHarness::new();
    harness
        .telephony
        .set_statuses(
            "+15550000000",
            vec![
                CallStatus::Ringing,
                CallStatus::Ringing,
                CallStatus::Ringing,
                CallStatus::Answered,
                CallStatus::Completed,
            ],
        )
        .await;

    let config = CampaignConfig {
        poll_interval_ms: 100,
        ..fixtures::fast_config()
    };
    let handle = harness
        .controller(config)
        .start(fixtures::numbered_recipients(2), "Reminder", 1)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(150)).await;
    handle.request_cancel();

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.completed, 1);
    assert_eq!(summary.skipped, 1);
    assert_eq!(harness.sink.successes().await[0].detail, "completed");
}

#[tokio::test(start_paused = true)]
async fn test_cancel_abandons_in_flight_when_configured() {
    let harness = TestHarness::new();
    harness
        .telephony
        .set_statuses("+15550000000", vec![CallStatus::Ringing])
        .await;

    let config = CampaignConfig {
        poll_interval_ms: 100,
        max_wait_secs: 600,
        abandon_in_flight_on_cancel: true,
        ..fixtures::fast_config()
    };
    let handle = harness
        .controller(config)
        .start(fixtures::numbered_recipients(1), "Reminder", 1)
        .unwrap();

    tokio::time::sleep(Duration::from_millis(250)).await;
    handle.request_cancel();

    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.skipped, 0);

    let failures = harness.sink.failures().await;
    assert_eq!(failures[0].detail, "abandoned");
    assert!(failures[0].call_ref.starts_with("CA"));
}

#[tokio::test(start_paused = true)]
async fn test_poll_timeout_is_recorded() {
    let harness = TestHarness::new();
    harness
        .telephony
        .set_statuses("+15550000000", vec![CallStatus::Ringing])
        .await;

    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(1), "Reminder", 1)
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.failed, 1);
    assert_eq!(harness.sink.failures().await[0].detail, "timeout");
}

#[tokio::test]
async fn test_invalid_campaigns_are_rejected() {
    let harness = TestHarness::new();

    let result = harness
        .controller(fixtures::fast_config())
        .start(Vec::new(), "Reminder", 1);
    assert!(matches!(result, Err(CampaignError::Configuration(_))));

    let result = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(1), "   ", 1);
    assert!(matches!(result, Err(CampaignError::Configuration(_))));

    let mut caller = fixtures::caller();
    caller.from_number = String::new();
    let result = CampaignController::new(
        fixtures::fast_config(),
        caller,
        fixtures::endpoints(),
        harness.telephony.clone(),
        harness.synthesizer.clone(),
        harness.sink.clone(),
    )
    .start(fixtures::numbered_recipients(1), "Reminder", 1);
    assert!(matches!(result, Err(CampaignError::Configuration(_))));

    let result = fixtures::controller(
        fixtures::fast_config(),
        Arc::new(MockTelephonyClient::unconfigured()),
        harness.synthesizer.clone(),
        harness.sink.clone(),
    )
    .start(fixtures::numbered_recipients(1), "Reminder", 1);
    assert!(matches!(result, Err(CampaignError::Configuration(_))));

    assert_eq!(harness.telephony.placed_count().await, 0);
    assert_eq!(harness.synthesizer.request_count().await, 0);
    assert!(harness.sink.records().await.is_empty());
}

#[tokio::test]
async fn test_zero_poll_interval_is_rejected() {
    let harness = TestHarness::new();
    let config = CampaignConfig {
        poll_interval_ms: 0,
        max_wait_secs: 1,
        ..fixtures::fast_config()
    };

    let result = harness
        .controller(config)
        .start(fixtures::numbered_recipients(1), "Reminder", 1);

    match result {
        Err(CampaignError::Configuration(message)) => assert!(message.contains("poll interval")),
        Err(other) => panic!("expected configuration error, got {:?}", other),
        Ok(_) => panic!("campaign with zero poll interval started"),
    }
    assert_eq!(harness.telephony.placed_count().await, 0);
}

#[tokio::test(start_paused = true)]
async fn test_rejected_status_check_fails_recipient_at_once() {
    let harness = TestHarness::new();
    harness
        .telephony
        .set_statuses("+15550000000", vec![CallStatus::Ringing])
        .await;
    harness
        .telephony
        .fail_status_polls(
            "+15550000000",
            usize::MAX,
            TelephonyError::AuthenticationFailed("token revoked".to_string()),
        )
        .await;

    let config = CampaignConfig {
        max_wait_secs: 300,
        ..fixtures::fast_config()
    };
    let handle = harness
        .controller(config)
        .start(fixtures::numbered_recipients(1), "Reminder", 1)
        .unwrap();

    let started = tokio::time::Instant::now();
    let summary = handle.wait().await.unwrap();
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(summary.failed, 1);

    let failures = harness.sink.failures().await;
    assert!(failures[0].detail.starts_with("status_rejected:"));
    assert!(failures[0].detail.contains("token revoked"));
}

#[tokio::test(start_paused = true)]
async fn test_shared_audio_synthesized_once() {
    let harness = TestHarness::new();
    harness
        .synthesizer
        .set_delay(Duration::from_millis(50))
        .await;

    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(10), "Reminder", 4)
        .unwrap();
    handle.wait().await.unwrap();

    assert_eq!(harness.synthesizer.request_count().await, 1);

    let urls: HashSet<_> = harness
        .telephony
        .placed_calls()
        .await
        .into_iter()
        .map(|c| c.request.audio_url)
        .collect();
    assert_eq!(urls.len(), 1);
    assert!(urls.contains("https://hooks.example/audio/mock_1.mp3"));
}

#[tokio::test(start_paused = true)]
async fn test_personalized_audio_per_recipient() {
    let harness = TestHarness::new();
    let config = CampaignConfig {
        personalize: true,
        ..fixtures::fast_config()
    };

    let recipients = fixtures::recipients(&["5551234567", "5559876543"]);
    let handle = harness
        .controller(config)
        .start(recipients, "Hello {recipient}, see you tomorrow.", 1)
        .unwrap();
    handle.wait().await.unwrap();

    let texts = harness.synthesizer.synthesized_texts().await;
    assert_eq!(
        texts,
        vec![
            "Hello 5551234567, see you tomorrow.",
            "Hello 5559876543, see you tomorrow.",
        ]
    );

    let placed = harness.telephony.placed_calls().await;
    assert_ne!(placed[0].request.audio_url, placed[1].request.audio_url);
}

#[tokio::test(start_paused = true)]
async fn test_call_requests_carry_webhooks_and_caller() {
    let harness = TestHarness::new();
    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::recipients(&["+44 20 7946 0958"]), "Reminder", 1)
        .unwrap();
    handle.wait().await.unwrap();

    let placed = harness.telephony.placed_calls().await;
    let request = &placed[0].request;
    assert_eq!(request.to, "+442079460958");
    assert_eq!(request.from, fixtures::CALLER_NUMBER);
    assert_eq!(
        request.status_callback_url,
        "https://hooks.example/status-callback"
    );
}

#[tokio::test(start_paused = true)]
async fn test_dial_failure_is_recorded_without_call_id() {
    let harness = TestHarness::new();
    harness
        .telephony
        .fail_place_call(
            "+15550000001",
            TelephonyError::Rejected {
                status: 400,
                message: "unverified number".to_string(),
            },
        )
        .await;

    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(3), "Reminder", 2)
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.completed, 2);
    assert_eq!(summary.failed, 1);

    let failures = harness.sink.failures().await;
    assert_eq!(failures[0].recipient.as_str(), "5550000001");
    assert_eq!(failures[0].call_ref, ERROR_PLACEHOLDER);
    assert!(failures[0].detail.contains("unverified number"));
}

#[tokio::test(start_paused = true)]
async fn test_synthesis_failure_fails_every_recipient() {
    let harness = TestHarness::new();
    harness.synthesizer.set_failure("quota exceeded").await;

    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(4), "Reminder", 2)
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.completed, 0);
    assert_eq!(summary.failed, 4);
    assert_eq!(summary.skipped, 0);
    assert_eq!(harness.synthesizer.request_count().await, 1);
    assert_eq!(harness.telephony.placed_count().await, 0);

    for record in harness.sink.failures().await {
        assert_eq!(record.call_ref, ERROR_PLACEHOLDER);
        assert!(record.detail.contains("quota exceeded"));
    }
}

#[tokio::test(start_paused = true)]
async fn test_persistence_failures_degrade_summary() {
    let harness = TestHarness::new();
    harness.sink.set_failing(true).await;

    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(3), "Reminder", 2)
        .unwrap();
    let summary = handle.wait().await.unwrap();

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.persistence_failures, 3);
    assert!(summary.is_degraded());
    assert_eq!(harness.sink.rejected_count().await, 3);
}

#[tokio::test(start_paused = true)]
async fn test_progress_is_always_consistent() {
    let harness = TestHarness::new();
    harness
        .telephony
        .set_place_delay(Duration::from_millis(15))
        .await;
    harness
        .telephony
        .set_status_delay(Duration::from_millis(5))
        .await;

    let handle = harness
        .controller(fixtures::fast_config())
        .start(fixtures::numbered_recipients(20), "Reminder", 3)
        .unwrap();

    let mut saw_running = false;
    while !handle.is_finished() {
        let progress = handle.progress();
        assert!(progress.is_consistent(), "inconsistent snapshot: {:?}", progress);
        assert!(progress.in_progress <= 3);
        if progress.phase == CampaignPhase::Running {
            saw_running = true;
        }
        tokio::time::sleep(Duration::from_millis(3)).await;
    }

    assert!(saw_running);
    let summary = handle.wait().await.unwrap();
    assert_eq!(summary.completed + summary.failed, 20);
}

#[tokio::test]
async fn test_file_sink_end_to_end() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let success_path = temp_dir.path().join("success.txt");
    let retry_path = temp_dir.path().join("retries.txt");
    let sink = Arc::new(FileOutcomeSink::open(&success_path, &retry_path).unwrap());

    let telephony = Arc::new(MockTelephonyClient::new());
    telephony
        .set_statuses("+15550000002", vec![CallStatus::NoAnswer])
        .await;

    let config = CampaignConfig {
        poll_interval_ms: 1,
        ..fixtures::fast_config()
    };
    let handle = fixtures::controller(
        config,
        telephony,
        Arc::new(MockSynthesizer::new()),
        sink,
    )
    .start(fixtures::numbered_recipients(5), "Reminder", 3)
    .unwrap();
    handle.wait().await.unwrap();

    let successes = read_outcome_log(&success_path, OutcomeLog::Success).unwrap();
    let retries = read_outcome_log(&retry_path, OutcomeLog::Retry).unwrap();
    assert_eq!(successes.len(), 4);
    assert_eq!(retries.len(), 1);
    assert_eq!(retries[0].recipient.as_str(), "5550000002");
    assert_eq!(retries[0].detail, "no-answer");

    let raw = std::fs::read_to_string(&success_path).unwrap();
    assert_eq!(raw.lines().count(), 4);
    assert!(raw.lines().all(|l| l.split(',').count() == 3));
}
