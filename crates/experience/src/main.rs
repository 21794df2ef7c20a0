//! Experience test entry point
//!
//! Exits 0 on success, 1 when a check fails, 2 when the run could not start.

use std::path::PathBuf;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use eventing_experience::config::BrowserKind;
use eventing_experience::{ExperienceConfig, ExperienceRunner, Scenario};

#[derive(Parser, Debug)]
#[command(name = "experience-test")]
#[command(author, version, about = "Experience test for the Knative eventing event display app")]
struct Args {
    /// Base URL of the app under test
    #[arg(long, env = "APP_URL")]
    app_url: Option<String>,

    /// TOML configuration file
    #[arg(short, long, default_value = "experience.toml")]
    config: PathBuf,

    /// Phases to run
    #[arg(long, value_enum)]
    scenario: Option<Scenario>,

    /// Manifest declaring the ping source
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Namespace for kubectl apply/delete
    #[arg(short, long)]
    namespace: Option<String>,

    /// Browser to drive
    #[arg(long, value_enum)]
    browser: Option<BrowserKind>,

    /// Seconds to wait for the ping source to deliver
    #[arg(long)]
    convergence_secs: Option<u64>,

    /// Output directory for the run report
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();

    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)),
        )
        .with_target(false)
        .init();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            std::process::exit(2);
        }
    };

    match rt.block_on(async_main(args)) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}

async fn async_main(args: Args) -> anyhow::Result<i32> {
    let mut config = ExperienceConfig::load(&args.config)?;

    if args.app_url.is_some() {
        config.app_url = args.app_url;
    }
    if let Some(scenario) = args.scenario {
        config.scenario = scenario;
    }
    if let Some(manifest) = args.manifest {
        config.cluster.manifest = manifest;
    }
    if args.namespace.is_some() {
        config.cluster.namespace = args.namespace;
    }
    if let Some(browser) = args.browser {
        config.browser.browser = browser;
    }
    if let Some(secs) = args.convergence_secs {
        config.timing.convergence_secs = secs;
    }
    if let Some(output) = args.output {
        config.output_dir = output;
    }

    let output_dir = config.output_dir.clone();
    let mut runner = ExperienceRunner::from_config(config).await?;
    let report = runner.run().await;

    if let Err(e) = runner.write_report(&report, &output_dir) {
        tracing::warn!("Could not write report: {}", e);
    }

    if !report.outcome.is_success() {
        eprintln!(
            "Experience Test Failed: {}",
            report.failure.as_deref().unwrap_or("unknown error")
        );
    }

    Ok(report.exit_code())
}
