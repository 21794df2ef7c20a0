use std::path::PathBuf;
use std::process::Command;

use eventing_experience::{ExperienceConfig, ExperienceRunner, TestOutcome};

fn in_path(bin: &str) -> bool {
    Command::new("sh")
        .arg("-lc")
        .arg(format!("command -v {bin} >/dev/null 2>&1"))
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Live Experience Test
///
/// Runs the full scenario against the app at `APP_URL` using the bundled
/// ping source manifest. Needs kubectl pointed at a cluster with Knative
/// Eventing, Node.js with Playwright, and takes over a minute.
#[tokio::test]
#[ignore]
async fn live_ping_source_reaches_event_display() {
    let Ok(app_url) = std::env::var("APP_URL") else {
        eprintln!("Skipping: APP_URL not set");
        return;
    };
    if !in_path("kubectl") || !in_path("node") {
        eprintln!("Skipping: kubectl or node not available in PATH");
        return;
    }

    let workspace_root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|p| p.parent())
        .expect("crates/experience has a workspace root")
        .to_path_buf();

    let mut config = ExperienceConfig {
        app_url: Some(app_url),
        ..Default::default()
    };
    config.cluster.manifest = workspace_root.join("ping-source.yaml");

    let mut runner = ExperienceRunner::from_config(config)
        .await
        .expect("runner preflight");
    let report = runner.run().await;

    assert_eq!(
        report.outcome,
        TestOutcome::Success,
        "experience test failed: {:?}",
        report.failure
    );
}
