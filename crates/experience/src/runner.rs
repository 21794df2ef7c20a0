//! Probe, stimulate, verify and clean up

use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::browser::{PageSource, PlaywrightBrowser};
use crate::cluster::{inspect_manifest, ClusterCli, Kubectl};
use crate::config::{ExperienceConfig, Scenario};
use crate::error::{ExperienceError, ExperienceResult};
use crate::remote::{HttpEventStore, RemoteStore};
use crate::snapshot::{assert_contains, PageSnapshot, TestOutcome};

/// Where a run currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Probed,
    Verified,
    Failed,
    Stimulated,
    Cleanup,
    Terminated,
}

impl Phase {
    pub fn can_transition_to(&self, next: Phase) -> bool {
        use Phase::*;
        matches!(
            (self, next),
            (Idle, Probed)
                | (Idle, Stimulated)
                | (Idle, Failed)
                | (Probed, Verified)
                | (Probed, Failed)
                | (Verified, Stimulated)
                | (Verified, Cleanup)
                | (Stimulated, Verified)
                | (Stimulated, Failed)
                | (Failed, Cleanup)
                | (Cleanup, Terminated)
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PhaseRecord {
    pub phase: Phase,
    pub at: DateTime<Utc>,
}

/// Result of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub scenario: Scenario,
    pub events_url: String,
    pub outcome: TestOutcome,
    pub failure: Option<String>,
    pub phases: Vec<PhaseRecord>,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.outcome.exit_code()
    }

    /// Phase names in the order they were entered
    pub fn phase_trail(&self) -> Vec<Phase> {
        self.phases.iter().map(|r| r.phase).collect()
    }
}

/// Drives one experience run against the app under test
pub struct ExperienceRunner {
    config: ExperienceConfig,
    base_url: String,
    browser: Box<dyn PageSource>,
    cluster: Box<dyn ClusterCli>,
    remote: Box<dyn RemoteStore>,
    phase: Phase,
    phases: Vec<PhaseRecord>,
}

impl ExperienceRunner {
    /// Create a runner over explicit browser, cluster and store handles
    pub fn new(
        config: ExperienceConfig,
        browser: Box<dyn PageSource>,
        cluster: Box<dyn ClusterCli>,
        remote: Box<dyn RemoteStore>,
    ) -> ExperienceResult<Self> {
        let base_url = config.base_url()?;
        Ok(Self {
            config,
            base_url,
            browser,
            cluster,
            remote,
            phase: Phase::Idle,
            phases: Vec::new(),
        })
    }

    /// Create a runner backed by Playwright, kubectl and HTTP, after
    /// checking each of them is usable
    pub async fn from_config(config: ExperienceConfig) -> ExperienceResult<Self> {
        let clear_url = config.clear_url()?;

        let kubectl = Kubectl::new(&config.cluster);
        kubectl.check_available().await?;
        check_manifest(&config)?;

        let browser = PlaywrightBrowser::launch(config.browser.clone()).await?;
        let remote = HttpEventStore::new(clear_url)?;

        Self::new(config, Box::new(browser), Box::new(kubectl), Box::new(remote))
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Load `<base><path>` and capture the rendered markup
    pub async fn probe(&self, path: &str) -> ExperienceResult<PageSnapshot> {
        let url = format!("{}{}", self.base_url, path);
        let html = self
            .browser
            .page_content(&url, self.config.timing.settle())
            .await?;
        info!("The page content is: {}", html);
        Ok(PageSnapshot::new(url, html))
    }

    /// Run the configured scenario, always finishing with cleanup
    pub async fn run(&mut self) -> RunReport {
        let start = Instant::now();
        let started_at = Utc::now();
        self.phase = Phase::Idle;
        self.phases.clear();

        info!(
            "Starting {} experience test against {}",
            self.config.scenario.as_str(),
            self.base_url
        );

        let result = self.exercise().await;
        if result.is_err() && self.phase != Phase::Failed {
            self.transition(Phase::Failed);
        }

        self.cleanup().await;
        self.transition(Phase::Terminated);

        let outcome = match &result {
            Ok(()) => {
                info!("Experience Test Successful");
                TestOutcome::Success
            }
            Err(e) if e.is_mismatch() => {
                error!("Experience Test Failed: {}", e);
                TestOutcome::Failure
            }
            Err(e) => {
                warn!("Could not observe the app: {}", e);
                error!("Experience Test Failed: the events page was not checked");
                TestOutcome::Failure
            }
        };

        RunReport {
            scenario: self.config.scenario,
            events_url: format!("{}{}", self.base_url, self.config.events_path),
            outcome,
            failure: result.err().map(|e| e.to_string()),
            phases: self.phases.clone(),
            started_at,
            duration_ms: start.elapsed().as_millis() as u64,
        }
    }

    async fn exercise(&mut self) -> ExperienceResult<()> {
        let scenario = self.config.scenario;

        if scenario.checks_precondition() {
            let snapshot = self.probe(&self.config.events_path).await?;
            self.transition(Phase::Probed);

            if !assert_contains(&snapshot, &self.config.empty_marker) {
                self.transition(Phase::Failed);
                return Err(ExperienceError::PreconditionMismatch {
                    url: snapshot.url,
                    expected: self.config.empty_marker.clone(),
                });
            }
            info!("Confirmed the event store is empty");
            self.transition(Phase::Verified);
        }

        if !scenario.applies_stimulus() {
            return Ok(());
        }

        info!("Starting ping source to send events to the event store...");
        if let Err(e) = self
            .cluster
            .apply_resource(&self.config.cluster.manifest)
            .await
        {
            warn!("Applying {} failed: {}", self.config.cluster.manifest.display(), e);
        }

        let convergence = self.config.timing.convergence();
        debug!("Waiting {:?} for events to arrive", convergence);
        tokio::time::sleep(convergence).await;
        self.transition(Phase::Stimulated);

        let snapshot = self.probe(&self.config.events_path).await?;
        if !assert_contains(&snapshot, &self.config.expected_marker) {
            self.transition(Phase::Failed);
            return Err(ExperienceError::OutcomeMismatch {
                url: snapshot.url,
                expected: self.config.expected_marker.clone(),
            });
        }
        self.transition(Phase::Verified);

        Ok(())
    }

    /// Best-effort teardown; failures are logged and never change the outcome
    async fn cleanup(&mut self) {
        self.transition(Phase::Cleanup);
        info!("Deleting ping source and clearing the event store...");

        let cluster = &self.config.cluster;
        if let Err(e) = self
            .cluster
            .delete_resource(&cluster.resource_kind, &cluster.resource_name)
            .await
        {
            warn!(
                "Deleting {} {} failed: {}",
                cluster.resource_kind, cluster.resource_name, e
            );
        }

        match self.remote.clear_all().await {
            Ok(body) => info!("Clear response: {}", body.trim()),
            Err(e) => warn!("Clearing the event store failed: {}", e),
        }

        tokio::time::sleep(self.config.timing.clear()).await;

        // Observation only; the verdict is already decided
        if let Err(e) = self.probe(&self.config.events_path).await {
            warn!("Could not load the events page after clearing: {}", e);
        }
    }

    fn transition(&mut self, next: Phase) {
        debug_assert!(
            self.phase.can_transition_to(next),
            "invalid phase transition {:?} -> {:?}",
            self.phase,
            next
        );
        debug!("Phase {:?} -> {:?}", self.phase, next);
        self.phase = next;
        self.phases.push(PhaseRecord {
            phase: next,
            at: Utc::now(),
        });
    }

    /// Write the run report as JSON into `dir`
    pub fn write_report(&self, report: &RunReport, dir: &Path) -> ExperienceResult<PathBuf> {
        std::fs::create_dir_all(dir)?;

        let path = dir.join("experience-report.json");
        let json = serde_json::to_string_pretty(report)?;
        std::fs::write(&path, json)?;

        info!("Report written to: {}", path.display());
        Ok(path)
    }
}

/// Make sure the manifest exists and warn when it declares something other
/// than what cleanup will delete
fn check_manifest(config: &ExperienceConfig) -> ExperienceResult<()> {
    let cluster = &config.cluster;
    match inspect_manifest(&cluster.manifest) {
        Ok(info) if !info.matches(&cluster.resource_kind, &cluster.resource_name) => {
            warn!(
                "{} declares {} {}, but cleanup deletes {} {}",
                cluster.manifest.display(),
                info.kind,
                info.name,
                cluster.resource_kind,
                cluster.resource_name
            );
            Ok(())
        }
        Ok(_) => Ok(()),
        Err(ExperienceError::Yaml(e)) => {
            warn!("Could not read {}: {}", cluster.manifest.display(), e);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
