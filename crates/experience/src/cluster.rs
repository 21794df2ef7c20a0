//! Cluster control-plane access through kubectl

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use serde::Deserialize;
use serde_yaml::Value;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::ClusterConfig;
use crate::error::{ExperienceError, ExperienceResult};

/// Create and delete the ping source
///
/// Both operations are best-effort: a non-zero exit is logged, not
/// returned. `Err` means the command could not be run at all.
#[async_trait]
pub trait ClusterCli: Send + Sync {
    /// Create the resource declared in `manifest`
    async fn apply_resource(&self, manifest: &Path) -> ExperienceResult<()>;

    /// Delete the resource `kind/name`
    async fn delete_resource(&self, kind: &str, name: &str) -> ExperienceResult<()>;
}

/// kubectl invoked as a subprocess
pub struct Kubectl {
    binary: PathBuf,
    namespace: Option<String>,
}

impl Kubectl {
    pub fn new(config: &ClusterConfig) -> Self {
        Self {
            binary: config.kubectl.clone(),
            namespace: config.namespace.clone(),
        }
    }

    /// Check the binary runs at all
    pub async fn check_available(&self) -> ExperienceResult<()> {
        let status = Command::new(&self.binary)
            .args(["version", "--client"])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(status) if status.success() => Ok(()),
            Ok(status) => Err(ExperienceError::ClusterCli(format!(
                "{} version --client exited with {}",
                self.binary.display(),
                status
            ))),
            Err(e) => Err(ExperienceError::ClusterCli(format!(
                "{}: {}",
                self.binary.display(),
                e
            ))),
        }
    }

    fn args<'a>(&'a self, base: &[&'a str]) -> Vec<&'a str> {
        let mut args = base.to_vec();
        if let Some(ns) = &self.namespace {
            args.push("--namespace");
            args.push(ns);
        }
        args
    }

    async fn run(&self, args: &[&str]) -> ExperienceResult<()> {
        let command = format!("{} {}", self.binary.display(), args.join(" "));
        debug!("Running: {}", command);

        let output = Command::new(&self.binary).args(args).output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        for line in stdout.lines() {
            info!("    {}", line);
        }

        if !output.status.success() {
            warn!(
                "`{}` exited with {}: {}",
                command,
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(())
    }
}

#[async_trait]
impl ClusterCli for Kubectl {
    async fn apply_resource(&self, manifest: &Path) -> ExperienceResult<()> {
        let manifest = manifest.to_string_lossy().into_owned();
        let args = self.args(&["apply", "-f", manifest.as_str()]);
        self.run(&args).await
    }

    async fn delete_resource(&self, kind: &str, name: &str) -> ExperienceResult<()> {
        let args = self.args(&["delete", kind, name]);
        self.run(&args).await
    }
}

/// Identity of the object declared in a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestInfo {
    pub kind: String,
    pub name: String,
}

#[derive(Debug, Deserialize)]
struct ManifestHead {
    kind: String,
    metadata: ManifestMetadata,
}

#[derive(Debug, Deserialize)]
struct ManifestMetadata {
    name: String,
}

/// Read the kind and name of the first object in a manifest
pub fn inspect_manifest(path: &Path) -> ExperienceResult<ManifestInfo> {
    if !path.exists() {
        return Err(ExperienceError::ManifestNotFound(path.display().to_string()));
    }

    let content = std::fs::read_to_string(path)?;
    let mut first = Value::Null;
    for document in serde_yaml::Deserializer::from_str(&content) {
        let value = Value::deserialize(document)?;
        if !value.is_null() {
            first = value;
            break;
        }
    }
    let head: ManifestHead = serde_yaml::from_value(first)?;

    Ok(ManifestInfo {
        kind: head.kind,
        name: head.metadata.name,
    })
}

impl ManifestInfo {
    /// Whether `kubectl delete <kind> <name>` would target this object.
    /// Kinds compare case-insensitively since kubectl accepts either form.
    pub fn matches(&self, kind: &str, name: &str) -> bool {
        self.kind.eq_ignore_ascii_case(kind) && self.name == name
    }
}
