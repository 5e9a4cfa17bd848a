//! Telephony provider abstraction.
//!
//! This module provides a `TelephonyClient` trait for placing outbound calls
//! and reading their status. `TwilioClient` is the REST backend.

mod twilio;
mod types;

pub use twilio::TwilioClient;
pub use types::*;
