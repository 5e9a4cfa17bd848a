//! Campaign recipients and input-file parsing.

use std::fmt;
use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

static NON_DIGIT: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^0-9]").unwrap());

/// Longest national number (without country code).
const NATIONAL_NUMBER_LEN: usize = 10;

/// Errors reading a recipient list.
#[derive(Debug, Error)]
pub enum RecipientError {
    #[error("Failed to read recipients from {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A normalized destination: digits only, never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Recipient(String);

impl Recipient {
    /// Normalize a raw destination by stripping every non-digit.
    /// Returns `None` when nothing is left.
    pub fn parse(raw: &str) -> Option<Self> {
        let digits = NON_DIGIT.replace_all(raw.trim(), "");
        if digits.is_empty() {
            None
        } else {
            Some(Self(digits.into_owned()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format for dialing. National numbers get `country_code` prepended;
    /// longer numbers are assumed to already carry one.
    pub fn to_e164(&self, country_code: &str) -> String {
        if self.0.len() > NATIONAL_NUMBER_LEN {
            format!("+{}", self.0)
        } else {
            format!("+{}{}", country_code.trim_start_matches('+'), self.0)
        }
    }
}

impl fmt::Display for Recipient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Parse a recipient list, one destination per line.
///
/// Only the first comma-separated field is read, so an outcome log can be
/// fed back in as the input of a retry run. Blank lines and lines with no
/// digits are skipped.
pub fn parse_recipients(text: &str) -> Vec<Recipient> {
    text.lines()
        .filter_map(|line| line.split(',').next())
        .filter_map(Recipient::parse)
        .collect()
}

/// Read and parse a recipient file.
pub fn load_recipients(path: &Path) -> Result<Vec<Recipient>, RecipientError> {
    let text = std::fs::read_to_string(path).map_err(|source| RecipientError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_recipients(&text))
}
