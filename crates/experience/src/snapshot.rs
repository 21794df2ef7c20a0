//! Captured page content and the pass/fail verdict

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rendered markup of a page at a point in time
#[derive(Debug, Clone)]
pub struct PageSnapshot {
    pub url: String,
    pub html: String,
    pub captured_at: DateTime<Utc>,
}

impl PageSnapshot {
    pub fn new(url: impl Into<String>, html: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: html.into(),
            captured_at: Utc::now(),
        }
    }

    /// Plain substring containment; no markup parsing
    pub fn contains(&self, expected: &str) -> bool {
        assert_contains(self, expected)
    }
}

/// The only verification primitive
pub fn assert_contains(snapshot: &PageSnapshot, expected: &str) -> bool {
    snapshot.html.contains(expected)
}

/// Binary verdict of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestOutcome {
    Success,
    Failure,
}

impl TestOutcome {
    pub fn exit_code(&self) -> i32 {
        match self {
            TestOutcome::Success => 0,
            TestOutcome::Failure => 1,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TestOutcome::Success)
    }
}
