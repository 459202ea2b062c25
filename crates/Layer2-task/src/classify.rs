//! Status classification
//!
//! Maps every raw check result onto a closed set of outcomes. The vendor
//! vocabulary (which strings are fatal, which mean success) comes from
//! `PollingConfig`, never from literals in the poll loop.

use cadence_foundation::{PollingConfig, Track};
use cadence_provider::{RawStatus, RemoteError};
use std::collections::HashSet;

/// Class of a vendor status string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// In progress, pending, queued or unrecognized
    Continue,
    /// Success marker with at least one track
    Success,
    /// Vendor-declared terminal failure
    Fatal,
}

/// What a single check means for the poll loop
#[derive(Debug, Clone, PartialEq)]
pub enum PollOutcome {
    /// Keep polling
    Continue { status: String, tracks: Vec<Track> },

    /// Finished with tracks
    Success { tracks: Vec<Track> },

    /// Remote job failed
    Fatal {
        status: String,
        reason: String,
        code: Option<String>,
    },

    /// Check failed but may succeed later
    TransientError(RemoteError),

    /// Check failed and will keep failing
    PermanentError(RemoteError),
}

impl PollOutcome {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            PollOutcome::Success { .. } | PollOutcome::Fatal { .. } | PollOutcome::PermanentError(_)
        )
    }
}

/// Classifies raw statuses using configured vocabularies
#[derive(Debug, Clone)]
pub struct StatusClassifier {
    fatal_statuses: HashSet<String>,
    fatal_substrings: Vec<String>,
    success_statuses: HashSet<String>,
}

impl StatusClassifier {
    pub fn new<I, J, K>(fatal_statuses: I, fatal_substrings: J, success_statuses: K) -> Self
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
        J: IntoIterator,
        J::Item: AsRef<str>,
        K: IntoIterator,
        K::Item: AsRef<str>,
    {
        Self {
            fatal_statuses: fatal_statuses.into_iter().map(|s| normalize(s.as_ref())).collect(),
            fatal_substrings: fatal_substrings
                .into_iter()
                .map(|s| normalize(s.as_ref()))
                .filter(|s| !s.is_empty())
                .collect(),
            success_statuses: success_statuses.into_iter().map(|s| normalize(s.as_ref())).collect(),
        }
    }

    pub fn from_config(config: &PollingConfig) -> Self {
        Self::new(
            &config.fatal_statuses,
            &config.fatal_substrings,
            &config.success_statuses,
        )
    }

    /// Classify a status string. Case and surrounding whitespace are ignored.
    pub fn classify_status(&self, status: &str, has_tracks: bool) -> StatusClass {
        let status = normalize(status);

        if self.fatal_statuses.contains(&status)
            || self.fatal_substrings.iter().any(|s| status.contains(s.as_str()))
        {
            return StatusClass::Fatal;
        }

        // Success without tracks is still in progress
        if self.success_statuses.contains(&status) && has_tracks {
            return StatusClass::Success;
        }

        StatusClass::Continue
    }

    /// Classify a successful check
    pub fn classify_raw(&self, raw: RawStatus) -> PollOutcome {
        match self.classify_status(&raw.status, !raw.tracks.is_empty()) {
            StatusClass::Success => PollOutcome::Success { tracks: raw.tracks },
            StatusClass::Fatal => {
                let reason = raw
                    .error_message
                    .unwrap_or_else(|| format!("Generation failed with status {}", raw.status));
                PollOutcome::Fatal {
                    status: raw.status,
                    reason,
                    code: raw.error_code,
                }
            }
            StatusClass::Continue => PollOutcome::Continue {
                status: raw.status,
                tracks: raw.tracks,
            },
        }
    }

    /// Classify a failed check
    pub fn classify_error(&self, err: RemoteError) -> PollOutcome {
        if err.retryable {
            PollOutcome::TransientError(err)
        } else {
            PollOutcome::PermanentError(err)
        }
    }

    pub fn classify(&self, result: Result<RawStatus, RemoteError>) -> PollOutcome {
        match result {
            Ok(raw) => self.classify_raw(raw),
            Err(err) => self.classify_error(err),
        }
    }
}

impl Default for StatusClassifier {
    fn default() -> Self {
        Self::from_config(&PollingConfig::default())
    }
}

fn normalize(status: &str) -> String {
    status.trim().to_ascii_uppercase()
}
