use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One entry of the portal's open-dates feed.
///
/// The portal returns these in ascending order; selection code relies on
/// that order being preserved, so never re-sort a fetched sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableDate {
    pub date: NaiveDate,
}

/// Inclusive date window the user is willing to move their appointment into.
/// Configured once, immutable for the run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TargetWindow {
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

/// Outcome of the single reschedule attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClaimResult {
    Success {
        date: NaiveDate,
        time: String,
    },
    Failure {
        date: NaiveDate,
        time: String,
        raw_response: String,
    },
}

impl ClaimResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ClaimResult::Success { .. })
    }

    pub fn summary(&self) -> String {
        match self {
            ClaimResult::Success { date, time } => {
                format!("Rescheduled successfully: {} {}", date, time)
            }
            ClaimResult::Failure { date, time, .. } => {
                format!("Reschedule failed: {} {}", date, time)
            }
        }
    }
}
