//! Platform descriptors enumerated from manifest lists.

use serde::{Deserialize, Serialize};

/// A target platform advertised by a manifest-list entry.
///
/// Purely informational: pinning keeps a single digest, not a platform map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformDescriptor {
    /// CPU architecture (e.g., "amd64", "arm64", "arm")
    pub architecture: String,
    /// Operating system (e.g., "linux")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os: Option<String>,
    /// Architecture variant (e.g., "v7" for arm)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub variant: Option<String>,
}

impl PlatformDescriptor {
    /// Create a platform with only an architecture.
    pub fn new(architecture: impl Into<String>) -> Self {
        Self {
            architecture: architecture.into(),
            os: None,
            variant: None,
        }
    }

    /// Set the operating system.
    pub fn with_os(mut self, os: impl Into<String>) -> Self {
        self.os = Some(os.into());
        self
    }

    /// Set the architecture variant.
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }
}

/// Architecture name, with the variant glued on for `arm` (e.g., `armv7`).
impl std::fmt::Display for PlatformDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.architecture)?;
        if self.architecture == "arm" {
            if let Some(ref variant) = self.variant {
                f.write_str(variant)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_plain_architecture() {
        let p = PlatformDescriptor::new("amd64").with_os("linux");
        assert_eq!(p.to_string(), "amd64");
    }

    #[test]
    fn test_display_arm_variant_appended() {
        let p = PlatformDescriptor::new("arm").with_variant("v7");
        assert_eq!(p.to_string(), "armv7");
    }

    #[test]
    fn test_display_arm64_variant_ignored() {
        let p = PlatformDescriptor::new("arm64").with_variant("v8");
        assert_eq!(p.to_string(), "arm64");
    }

    #[test]
    fn test_display_arm_without_variant() {
        assert_eq!(PlatformDescriptor::new("arm").to_string(), "arm");
    }

    #[test]
    fn test_serde_skips_missing_fields() {
        let json = serde_json::to_string(&PlatformDescriptor::new("s390x")).unwrap();
        assert_eq!(json, r#"{"architecture":"s390x"}"#);
    }
}
