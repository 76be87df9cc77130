//! Registry credentials saved by `a3s-app login`.
//!
//! Lives at `~/.a3s/auth/credentials.json` and is rewritten atomically
//! (temp file, then rename) on every change.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use a3s_app_core::error::{AppError, Result};
use serde::{Deserialize, Serialize};

/// Hostname Docker Hub credentials are filed under.
const DOCKER_HUB: &str = "index.docker.io";

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Login {
    username: String,
    password: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct LoginFile {
    #[serde(default)]
    registries: BTreeMap<String, Login>,
}

/// Per-registry username/password store.
pub struct CredentialStore {
    path: PathBuf,
}

impl CredentialStore {
    /// Store at `~/.a3s/auth/credentials.json`.
    pub fn default_path() -> Result<Self> {
        let home = dirs::home_dir().ok_or_else(|| {
            AppError::ConfigError("cannot determine home directory for credentials".to_string())
        })?;
        Ok(Self::new(home.join(".a3s").join("auth").join("credentials.json")))
    }

    /// Store at a custom path.
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Backing file location.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Save credentials for a registry, replacing any previous login.
    pub fn store(&self, registry: &str, username: &str, password: &str) -> Result<()> {
        let mut file = self.read()?;
        file.registries.insert(
            registry_key(registry),
            Login {
                username: username.to_string(),
                password: password.to_string(),
            },
        );
        self.write(&file)
    }

    /// `(username, password)` for a registry, if logged in.
    pub fn get(&self, registry: &str) -> Result<Option<(String, String)>> {
        Ok(self
            .read()?
            .registries
            .remove(&registry_key(registry))
            .map(|login| (login.username, login.password)))
    }

    /// Forget a registry. Returns whether a login existed.
    pub fn remove(&self, registry: &str) -> Result<bool> {
        let mut file = self.read()?;
        if file.registries.remove(&registry_key(registry)).is_none() {
            return Ok(false);
        }
        self.write(&file)?;
        Ok(true)
    }

    fn read(&self) -> Result<LoginFile> {
        let data = match std::fs::read_to_string(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(LoginFile::default()),
            Err(e) => {
                return Err(AppError::ConfigError(format!(
                    "Failed to read {}: {}",
                    self.path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&data).map_err(|e| {
            AppError::ConfigError(format!("Failed to parse {}: {}", self.path.display(), e))
        })
    }

    fn write(&self, file: &LoginFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let tmp_path = self.path.with_extension("tmp");
        std::fs::write(&tmp_path, serde_json::to_string_pretty(file)?)?;
        std::fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

/// Docker Hub answers to several hostnames; file them all under one key.
fn registry_key(registry: &str) -> String {
    let r = registry.trim().to_lowercase();
    match r.as_str() {
        "docker.io" | "registry-1.docker.io" => DOCKER_HUB.to_string(),
        _ => r,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store(dir: &TempDir) -> CredentialStore {
        CredentialStore::new(dir.path().join("auth").join("credentials.json"))
    }

    #[test]
    fn test_store_and_get() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.store("ghcr.io", "user1", "pass1").unwrap();
        assert_eq!(
            store.get("ghcr.io").unwrap(),
            Some(("user1".to_string(), "pass1".to_string()))
        );
    }

    #[test]
    fn test_get_without_file() {
        let dir = TempDir::new().unwrap();
        assert_eq!(test_store(&dir).get("ghcr.io").unwrap(), None);
    }

    #[test]
    fn test_store_replaces_login() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.store("ghcr.io", "user1", "pass1").unwrap();
        store.store("ghcr.io", "user2", "pass2").unwrap();
        assert_eq!(
            store.get("ghcr.io").unwrap(),
            Some(("user2".to_string(), "pass2".to_string()))
        );
    }

    #[test]
    fn test_remove() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.store("ghcr.io", "user1", "pass1").unwrap();
        assert!(store.remove("ghcr.io").unwrap());
        assert!(!store.remove("ghcr.io").unwrap());
        assert_eq!(store.get("ghcr.io").unwrap(), None);
    }

    #[test]
    fn test_docker_hub_aliases_share_login() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);

        store.store("docker.io", "user", "pass").unwrap();
        let expected = Some(("user".to_string(), "pass".to_string()));
        assert_eq!(store.get("index.docker.io").unwrap(), expected);
        assert_eq!(store.get("registry-1.docker.io").unwrap(), expected);
    }

    #[test]
    fn test_persists_across_instances() {
        let dir = TempDir::new().unwrap();
        test_store(&dir).store("quay.io", "u", "p").unwrap();
        assert!(test_store(&dir).get("quay.io").unwrap().is_some());
        assert!(!test_store(&dir).path().with_extension("tmp").exists());
    }

    #[test]
    fn test_corrupt_file_is_config_error() {
        let dir = TempDir::new().unwrap();
        let store = test_store(&dir);
        std::fs::create_dir_all(store.path().parent().unwrap()).unwrap();
        std::fs::write(store.path(), "not json").unwrap();
        assert!(matches!(store.get("ghcr.io"), Err(AppError::ConfigError(_))));
    }
}
