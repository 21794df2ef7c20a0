//! Headless browser access through generated Playwright scripts

use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::io::AsyncWriteExt;
use tokio::process::Command as TokioCommand;
use tracing::debug;

use crate::config::BrowserConfig;
use crate::error::{ExperienceError, ExperienceResult};

/// Navigation timeout handed to `page.goto`
const NAVIGATION_TIMEOUT_MS: u64 = 30_000;

/// Something that can load a URL and hand back the rendered document
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Load `url`, wait `settle`, return the full rendered markup
    async fn page_content(&self, url: &str, settle: Duration) -> ExperienceResult<String>;
}

/// Playwright browser handle
///
/// Acquired once per run. Every navigation launches the configured browser
/// with the configured launch arguments and closes it before returning.
pub struct PlaywrightBrowser {
    config: BrowserConfig,
}

/// Last line printed by the generated script
#[derive(Debug, Deserialize)]
struct ScriptReport {
    success: bool,
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl PlaywrightBrowser {
    /// Create a new handle after checking Playwright is installed
    pub async fn launch(config: BrowserConfig) -> ExperienceResult<Self> {
        Self::check_playwright_installed(&config).await?;
        Ok(Self { config })
    }

    async fn check_playwright_installed(config: &BrowserConfig) -> ExperienceResult<()> {
        let status = TokioCommand::new(&config.npx_binary)
            .args(["playwright", "--version"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            _ => Err(ExperienceError::PlaywrightNotFound),
        }
    }

    /// Build the script that loads `url` and prints the page markup as JSON
    pub fn build_script(&self, url: &str, settle: Duration) -> String {
        build_script(&self.config, url, settle)
    }

    async fn run_script(&self, script: &str) -> ExperienceResult<String> {
        // Fed through stdin so `require('playwright')` resolves from the
        // working directory's node_modules.
        let mut child = TokioCommand::new(&self.config.node_binary)
            .arg("-")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                ExperienceError::Browser(format!(
                    "Failed to spawn {}: {}",
                    self.config.node_binary.display(),
                    e
                ))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(script.as_bytes()).await?;
            stdin.shutdown().await?;
        }

        let output = child.wait_with_output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);

        if !output.status.success() {
            return Err(ExperienceError::Browser(format!(
                "Script failed:\nstdout: {}\nstderr: {}",
                stdout, stderr
            )));
        }

        parse_script_output(&stdout)
    }
}

#[async_trait]
impl PageSource for PlaywrightBrowser {
    async fn page_content(&self, url: &str, settle: Duration) -> ExperienceResult<String> {
        debug!("Loading {} in {}", url, self.config.browser.as_str());
        let script = self.build_script(url, settle);
        self.run_script(&script).await
    }
}

fn build_script(config: &BrowserConfig, url: &str, settle: Duration) -> String {
    // serde_json string literals are valid JS string literals
    let url_literal = serde_json::Value::from(url).to_string();
    let args_literal = serde_json::Value::from(config.launch_args.clone()).to_string();

    format!(
        r#"
const {{ chromium, firefox, webkit }} = require('playwright');

(async () => {{
  const browser = await {browser}.launch({{ headless: {headless}, args: {args} }});
  try {{
    const page = await browser.newPage();
    await page.goto({url}, {{ timeout: {nav_timeout} }});
    await page.waitForTimeout({settle_ms});
    const content = await page.content();
    console.log(JSON.stringify({{ success: true, content }}));
  }} catch (error) {{
    console.log(JSON.stringify({{ success: false, error: error.message }}));
    process.exitCode = 1;
  }} finally {{
    await browser.close();
  }}
}})();
"#,
        browser = config.browser.as_str(),
        headless = config.headless,
        args = args_literal,
        url = url_literal,
        nav_timeout = NAVIGATION_TIMEOUT_MS,
        settle_ms = settle.as_millis(),
    )
}

/// Pull the page markup out of the script's final JSON line
fn parse_script_output(stdout: &str) -> ExperienceResult<String> {
    let line = stdout
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .ok_or_else(|| ExperienceError::Browser("Script produced no output".to_string()))?;

    let report: ScriptReport = serde_json::from_str(line.trim())?;
    if !report.success {
        return Err(ExperienceError::Browser(
            report.error.unwrap_or_else(|| "unknown error".to_string()),
        ));
    }

    report
        .content
        .ok_or_else(|| ExperienceError::Browser("Script reported no page content".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BrowserKind;

    #[test]
    fn test_script_disables_sandbox_and_shm() {
        let script = build_script(
            &BrowserConfig::default(),
            "http://x/v1/events",
            Duration::from_secs(3),
        );
        assert!(script.contains(
            "chromium.launch({ headless: true, args: [\"--no-sandbox\",\"--disable-dev-shm-usage\"] })"
        ));
        assert!(script.contains("await page.goto(\"http://x/v1/events\""));
        assert!(script.contains("page.waitForTimeout(3000)"));
        assert!(script.contains("page.content()"));
    }

    #[test]
    fn test_script_escapes_url() {
        let script = build_script(
            &BrowserConfig::default(),
            "http://x/v1/events?q='a\"b'",
            Duration::ZERO,
        );
        assert!(script.contains(r#"page.goto("http://x/v1/events?q='a\"b'""#));
    }

    #[test]
    fn test_script_uses_configured_browser() {
        let config = BrowserConfig {
            browser: BrowserKind::Firefox,
            headless: false,
            launch_args: vec![],
            ..Default::default()
        };
        let script = build_script(&config, "http://x", Duration::ZERO);
        assert!(script.contains("firefox.launch({ headless: false, args: [] })"));
    }

    #[test]
    fn test_parse_output_takes_last_line() {
        let stdout = concat!(
            "some playwright noise\n",
            "{\"success\":true,\"content\":\"<body>Hello world!</body>\"}\n\n",
        );
        assert_eq!(
            parse_script_output(stdout).unwrap(),
            "<body>Hello world!</body>"
        );
    }

    #[test]
    fn test_parse_output_reports_script_error() {
        let stdout = "{\"success\":false,\"error\":\"net::ERR_CONNECTION_REFUSED\"}";
        match parse_script_output(stdout) {
            Err(ExperienceError::Browser(msg)) => assert!(msg.contains("ERR_CONNECTION_REFUSED")),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_parse_output_empty() {
        assert!(parse_script_output("\n  \n").is_err());
        assert!(parse_script_output("not json").is_err());
    }

    #[tokio::test]
    async fn test_launch_without_playwright() {
        let config = BrowserConfig {
            npx_binary: "/nonexistent/npx".into(),
            ..Default::default()
        };
        assert!(matches!(
            PlaywrightBrowser::launch(config).await,
            Err(ExperienceError::PlaywrightNotFound)
        ));
    }
}
