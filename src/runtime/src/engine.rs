//! Distribution inspection through a local container engine.

use std::path::PathBuf;
use std::process::Stdio;

use a3s_app_core::error::{AppError, Result};
use a3s_app_core::PlatformDescriptor;
use async_trait::async_trait;
use tokio::process::Command;

use crate::oci::manifest::{sha256_digest, ManifestKind};
use crate::oci::ImageReference;

/// What an engine reports about a remote image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DistributionInfo {
    /// Digest of the manifest (or manifest list) the tag points at
    pub digest: String,
    /// Platforms the image is published for; empty for single-platform images
    pub platforms: Vec<PlatformDescriptor>,
}

/// Engine capability: inspect a reference's distribution metadata.
#[async_trait]
pub trait DistributionInspector: Send + Sync {
    async fn inspect(&self, reference: &ImageReference) -> Result<DistributionInfo>;
}

/// Inspector that shells out to the Docker CLI.
///
/// Runs `docker buildx imagetools inspect --raw <ref>`; the digest is the
/// hash of the raw manifest bytes the registry served.
pub struct DockerCli {
    binary: PathBuf,
}

impl Default for DockerCli {
    fn default() -> Self {
        Self::new("docker")
    }
}

impl DockerCli {
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
        }
    }
}

#[async_trait]
impl DistributionInspector for DockerCli {
    async fn inspect(&self, reference: &ImageReference) -> Result<DistributionInfo> {
        let target = reference.to_string();
        tracing::debug!(reference = %target, binary = %self.binary.display(), "Inspecting distribution");

        let output = Command::new(&self.binary)
            .args(["buildx", "imagetools", "inspect", "--raw"])
            .arg(&target)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                AppError::resolution(
                    &target,
                    format!("failed to run {}: {}", self.binary.display(), e),
                )
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(AppError::resolution(&target, stderr.trim().to_string()));
        }

        distribution_from_raw(&target, &output.stdout)
    }
}

/// Build [`DistributionInfo`] from a raw manifest payload.
pub fn distribution_from_raw(reference: &str, raw: &[u8]) -> Result<DistributionInfo> {
    let kind = ManifestKind::from_raw(reference, raw)?;
    Ok(DistributionInfo {
        digest: sha256_digest(raw),
        platforms: kind.platforms().to_vec(),
    })
}
