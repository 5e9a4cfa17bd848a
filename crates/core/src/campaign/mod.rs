//! Campaign dispatch engine.
//!
//! A campaign drains a shared queue of recipients with a fixed pool of
//! workers. Each worker synthesizes (or reuses) the script audio, places a
//! call, polls it to a terminal status and appends the outcome to the
//! success or retry log. The controller exposes live counters and
//! cooperative cancellation through a [`CampaignHandle`].

mod config;
mod controller;
mod error;
mod poller;
mod queue;
mod state;
mod types;
mod worker;

pub use config::CampaignConfig;
pub use controller::{CampaignController, CampaignHandle};
pub use error::{CallError, CampaignError};
pub use poller::CallStatusPoller;
pub use queue::WorkQueue;
pub use types::{
    AttemptOutcome, CallAttempt, CallerId, CampaignPhase, CampaignProgress, CampaignSummary,
};
pub use worker::{personalize_script, RECIPIENT_PLACEHOLDER};
