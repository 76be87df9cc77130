use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{AppError, Result};

/// Default descriptor file name substituted inside bundles.
pub const DEFAULT_DESCRIPTOR_FILE: &str = "docker-compose.yml";

/// Default ignore file name at the bundle root.
pub const DEFAULT_IGNORE_FILE: &str = ".composeappignores";

/// Annotation version literal written into bundle manifests.
pub const BUNDLE_VERSION: &str = "v1";

/// Bundle configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Descriptor file name inside the bundle
    pub descriptor_file: String,

    /// Ignore file name at the bundle root
    pub ignore_file: String,

    /// Directory packaged into the bundle
    pub bundle_root: PathBuf,

    /// Artifact kind written into the manifest annotations
    pub kind: ArtifactKind,

    /// Digest resolution strategy used when pinning
    pub resolver: ResolverKind,

    /// Skip the whole subtree of a directory matched by an ignore pattern
    pub prune_ignored_dirs: bool,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            descriptor_file: DEFAULT_DESCRIPTOR_FILE.to_string(),
            ignore_file: DEFAULT_IGNORE_FILE.to_string(),
            bundle_root: PathBuf::from("."),
            kind: ArtifactKind::App,
            resolver: ResolverKind::Registry,
            prune_ignored_dirs: false,
        }
    }
}

impl BundleConfig {
    /// Load configuration from a YAML file. Missing keys take defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(content).map_err(|e| AppError::ConfigError(e.to_string()))
    }
}

/// Kind of artifact a bundle manifest announces
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ArtifactKind {
    /// A runnable multi-service application
    App,
    /// A generic bundle of files
    Bundle,
}

impl ArtifactKind {
    /// Annotation key marking the manifest kind.
    pub fn marker(&self) -> &'static str {
        match self {
            ArtifactKind::App => "compose-app",
            ArtifactKind::Bundle => "compose-bundle",
        }
    }
}

impl std::str::FromStr for ArtifactKind {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "app" => Ok(ArtifactKind::App),
            "bundle" => Ok(ArtifactKind::Bundle),
            other => Err(AppError::ConfigError(format!(
                "unknown artifact kind '{}', expected 'app' or 'bundle'",
                other
            ))),
        }
    }
}

/// Digest resolution strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolverKind {
    /// Query the registry directly
    Registry,
    /// Ask the local container engine
    Engine,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = BundleConfig::default();
        assert_eq!(config.descriptor_file, "docker-compose.yml");
        assert_eq!(config.ignore_file, ".composeappignores");
        assert_eq!(config.bundle_root, PathBuf::from("."));
        assert_eq!(config.kind, ArtifactKind::App);
        assert_eq!(config.resolver, ResolverKind::Registry);
        assert!(!config.prune_ignored_dirs);
    }

    #[test]
    fn test_partial_yaml_takes_defaults() {
        let config = BundleConfig::from_yaml("kind: bundle\nresolver: engine\n").unwrap();
        assert_eq!(config.kind, ArtifactKind::Bundle);
        assert_eq!(config.resolver, ResolverKind::Engine);
        assert_eq!(config.descriptor_file, DEFAULT_DESCRIPTOR_FILE);
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = BundleConfig::from_yaml("  \n").unwrap();
        assert_eq!(config.ignore_file, DEFAULT_IGNORE_FILE);
    }

    #[test]
    fn test_invalid_kind_is_config_error() {
        let err = BundleConfig::from_yaml("kind: image\n").unwrap_err();
        assert!(matches!(err, AppError::ConfigError(_)));
    }

    #[test]
    fn test_kind_markers() {
        assert_eq!(ArtifactKind::App.marker(), "compose-app");
        assert_eq!(ArtifactKind::Bundle.marker(), "compose-bundle");
    }

    #[test]
    fn test_kind_from_str() {
        assert_eq!("app".parse::<ArtifactKind>().unwrap(), ArtifactKind::App);
        assert_eq!("bundle".parse::<ArtifactKind>().unwrap(), ArtifactKind::Bundle);
        assert!("other".parse::<ArtifactKind>().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a3s-app.yaml");
        std::fs::write(&path, "bundle_root: ./app\nprune_ignored_dirs: true\n").unwrap();
        let config = BundleConfig::load(&path).unwrap();
        assert_eq!(config.bundle_root, PathBuf::from("./app"));
        assert!(config.prune_ignored_dirs);
    }
}
