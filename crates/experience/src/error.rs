//! Error types for the experience test

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExperienceError {
    #[error("Playwright not found. Install with: npx playwright install chromium")]
    PlaywrightNotFound,

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("Precondition failed: expected {expected:?} on {url} before the stimulus")]
    PreconditionMismatch { url: String, expected: String },

    #[error("Outcome failed: expected {expected:?} on {url} after the stimulus")]
    OutcomeMismatch { url: String, expected: String },

    #[error("Cluster CLI not usable: {0}")]
    ClusterCli(String),

    #[error("Manifest not found: {0}")]
    ManifestNotFound(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl ExperienceError {
    /// Whether this error is a verification mismatch rather than an
    /// infrastructure problem
    pub fn is_mismatch(&self) -> bool {
        matches!(
            self,
            ExperienceError::PreconditionMismatch { .. } | ExperienceError::OutcomeMismatch { .. }
        )
    }
}

pub type ExperienceResult<T> = Result<T, ExperienceError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatches_are_told_apart_from_driver_errors() {
        let precondition = ExperienceError::PreconditionMismatch {
            url: "http://x/v1/events".to_string(),
            expected: "No events found".to_string(),
        };
        let outcome = ExperienceError::OutcomeMismatch {
            url: "http://x/v1/events".to_string(),
            expected: "Hello world!".to_string(),
        };
        assert!(precondition.is_mismatch());
        assert!(outcome.is_mismatch());
        assert!(!ExperienceError::Browser("timeout".to_string()).is_mismatch());
        assert!(!ExperienceError::PlaywrightNotFound.is_mismatch());
    }
}
