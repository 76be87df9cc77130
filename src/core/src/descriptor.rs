//! Application descriptor (compose file) model.
//!
//! Shape checks happen once, when the descriptor is loaded. Everything
//! downstream (pinning, bundling) works on the typed model and never
//! re-checks field shapes.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// A multi-service application descriptor.
///
/// Services are keyed by name, so names are unique and serialization order
/// is stable. Keys other than `services` are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppDescriptor {
    /// Services by name
    pub services: BTreeMap<String, ServiceSpec>,

    /// Other top-level keys (version, networks, volumes, ...)
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

/// A single service record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceSpec {
    /// Image reference, e.g. `nginx:stable`
    pub image: String,

    /// Fields opaque to this crate
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

impl ServiceSpec {
    /// Create a service with only an image.
    pub fn new(image: impl Into<String>) -> Self {
        Self {
            image: image.into(),
            extra: BTreeMap::new(),
        }
    }
}

impl AppDescriptor {
    /// Parse and validate a descriptor from YAML text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(content)?;
        validate(&value)?;
        Ok(serde_yaml::from_value(value)?)
    }

    /// Read, parse and validate a descriptor file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            AppError::ConfigError(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&content)
    }

    /// Serialize to the canonical YAML form stored inside bundles.
    pub fn to_yaml(&self) -> Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Look up a service by name.
    pub fn service(&self, name: &str) -> Option<&ServiceSpec> {
        self.services.get(name)
    }

    /// Look up a service by name for in-place updates.
    pub fn service_mut(&mut self, name: &str) -> Option<&mut ServiceSpec> {
        self.services.get_mut(name)
    }

    /// Service names in serialization order.
    pub fn service_names(&self) -> Vec<String> {
        self.services.keys().cloned().collect()
    }
}

/// Check the service/image shape on the raw document.
fn validate(value: &serde_yaml::Value) -> Result<()> {
    let root = value
        .as_mapping()
        .ok_or_else(|| AppError::ConfigError("descriptor must be a mapping".to_string()))?;
    let services = root
        .get("services")
        .ok_or_else(|| AppError::ConfigError("descriptor has no 'services' section".to_string()))?
        .as_mapping()
        .ok_or_else(|| AppError::ConfigError("'services' must be a mapping".to_string()))?;

    for (key, service) in services {
        let name = key
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| format!("{:?}", key));
        let service = service
            .as_mapping()
            .ok_or_else(|| AppError::input(&name, "has invalid format"))?;
        match service.get("image") {
            None => return Err(AppError::input(&name, "missing 'image' attribute")),
            Some(image) if !image.is_string() => {
                return Err(AppError::input(&name, "invalid 'image' attribute"))
            }
            Some(_) => {}
        }
    }
    Ok(())
}
