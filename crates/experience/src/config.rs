//! Experience test configuration

use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::{ExperienceError, ExperienceResult};

/// Environment variable holding the base URL of the app under test
pub const APP_URL_ENV: &str = "APP_URL";

/// Which phases a run exercises
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Scenario {
    /// Probe, check the empty state, apply the resource, check the outcome
    #[default]
    Full,
    /// Probe and check the empty state only
    EmptyState,
    /// Apply the resource and check the outcome without the initial check
    SkipPrecondition,
}

impl Scenario {
    pub fn checks_precondition(&self) -> bool {
        !matches!(self, Scenario::SkipPrecondition)
    }

    pub fn applies_stimulus(&self) -> bool {
        !matches!(self, Scenario::EmptyState)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Scenario::Full => "full",
            Scenario::EmptyState => "empty-state",
            Scenario::SkipPrecondition => "skip-precondition",
        }
    }
}

/// Top-level configuration for one experience run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperienceConfig {
    /// Base URL of the app under test, normally taken from `APP_URL`
    pub app_url: Option<String>,

    /// Path of the events page, relative to the base URL
    pub events_path: String,

    /// Text the events page shows while the store is empty
    pub empty_marker: String,

    /// Text the events page shows once the ping source has delivered
    pub expected_marker: String,

    /// Phases to exercise
    pub scenario: Scenario,

    /// Directory the run report is written to
    pub output_dir: PathBuf,

    pub browser: BrowserConfig,
    pub cluster: ClusterConfig,
    pub timing: TimingConfig,
}

impl Default for ExperienceConfig {
    fn default() -> Self {
        Self {
            app_url: None,
            events_path: "/v1/events".to_string(),
            empty_marker: "No events found".to_string(),
            expected_marker: "Hello world!".to_string(),
            scenario: Scenario::Full,
            output_dir: PathBuf::from("test-results"),
            browser: BrowserConfig::default(),
            cluster: ClusterConfig::default(),
            timing: TimingConfig::default(),
        }
    }
}

/// Headless browser settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BrowserConfig {
    pub browser: BrowserKind,
    pub headless: bool,

    /// Extra arguments passed to the browser process at launch
    pub launch_args: Vec<String>,

    /// Node.js binary used to run the generated Playwright script
    pub node_binary: PathBuf,

    /// npx binary used to check Playwright is installed
    pub npx_binary: PathBuf,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            browser: BrowserKind::Chromium,
            headless: true,
            launch_args: vec![
                "--no-sandbox".to_string(),
                "--disable-dev-shm-usage".to_string(),
            ],
            node_binary: PathBuf::from("node"),
            npx_binary: PathBuf::from("npx"),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum BrowserKind {
    #[default]
    Chromium,
    Firefox,
    Webkit,
}

impl BrowserKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BrowserKind::Chromium => "chromium",
            BrowserKind::Firefox => "firefox",
            BrowserKind::Webkit => "webkit",
        }
    }
}

/// Cluster control-plane settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClusterConfig {
    /// Path to the kubectl binary
    pub kubectl: PathBuf,

    /// Manifest declaring the ping source
    pub manifest: PathBuf,

    /// Resource kind passed to `kubectl delete`
    pub resource_kind: String,

    /// Resource name passed to `kubectl delete`
    pub resource_name: String,

    /// Namespace for both apply and delete (None = current context)
    pub namespace: Option<String>,
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            kubectl: PathBuf::from("kubectl"),
            manifest: PathBuf::from("ping-source.yaml"),
            resource_kind: "pingsource".to_string(),
            resource_name: "cron-pingsource".to_string(),
            namespace: None,
        }
    }
}

/// Fixed waits, in seconds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TimingConfig {
    /// Wait after each navigation before the page is read
    pub settle_secs: u64,

    /// Wait after applying the resource before probing again
    pub convergence_secs: u64,

    /// Wait after clearing the store before the final observation
    pub clear_secs: u64,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            settle_secs: 3,
            convergence_secs: 60,
            clear_secs: 10,
        }
    }
}

impl TimingConfig {
    /// All waits zeroed
    pub fn immediate() -> Self {
        Self {
            settle_secs: 0,
            convergence_secs: 0,
            clear_secs: 0,
        }
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }

    pub fn convergence(&self) -> Duration {
        Duration::from_secs(self.convergence_secs)
    }

    pub fn clear(&self) -> Duration {
        Duration::from_secs(self.clear_secs)
    }
}

impl ExperienceConfig {
    /// Load configuration from a TOML file, falling back to defaults when the
    /// file does not exist
    pub fn load(path: &Path) -> ExperienceResult<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Self = toml::from_str(&content)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// The base URL with any trailing slash removed
    pub fn base_url(&self) -> ExperienceResult<String> {
        let url = self
            .app_url
            .as_deref()
            .map(str::trim)
            .filter(|u| !u.is_empty())
            .ok_or_else(|| ExperienceError::Config(format!("{} is not set", APP_URL_ENV)))?;

        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(ExperienceError::Config(format!(
                "{} must be an http(s) URL, got {:?}",
                APP_URL_ENV, url
            )));
        }

        Ok(url.trim_end_matches('/').to_string())
    }

    /// Full URL of the events page
    pub fn events_url(&self) -> ExperienceResult<String> {
        Ok(format!("{}{}", self.base_url()?, self.events_path))
    }

    /// Full URL that asks the app to delete every stored event
    pub fn clear_url(&self) -> ExperienceResult<String> {
        Ok(format!("{}?deleteAll=true", self.events_url()?))
    }
}
