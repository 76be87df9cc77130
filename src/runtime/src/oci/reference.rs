//! OCI image reference parsing.
//!
//! Parses image references like `ghcr.io/org/app:v1` into structured components,
//! normalized the way Docker does (`nginx` → `docker.io/library/nginx`).

use a3s_app_core::error::{AppError, Result};

/// Default registry when none is specified.
const DEFAULT_DOMAIN: &str = "docker.io";

/// Default tag applied by [`ImageReference::with_default_tag`].
pub const DEFAULT_TAG: &str = "latest";

/// Maximum tag length accepted by registries.
const MAX_TAG_LEN: usize = 128;

/// Parsed OCI image reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry hostname (e.g., "ghcr.io", "docker.io")
    pub domain: String,
    /// Repository path (e.g., "library/nginx", "org/app")
    pub path: String,
    /// Tag (e.g., "stable", "v0.1.0")
    pub tag: Option<String>,
    /// Digest (e.g., "sha256:abc123...")
    pub digest: Option<String>,
}

impl ImageReference {
    /// Parse an image reference string.
    ///
    /// Supports formats:
    /// - `nginx` → docker.io/library/nginx
    /// - `nginx:1.25` → docker.io/library/nginx:1.25
    /// - `myuser/myimage` → docker.io/myuser/myimage
    /// - `ghcr.io/org/image:tag` → ghcr.io/org/image:tag
    /// - `ghcr.io/org/image@sha256:abc...` → ghcr.io/org/image@sha256:abc...
    ///
    /// No tag is invented; see [`ImageReference::with_default_tag`].
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(AppError::reference(reference, "empty image reference"));
        }

        // Split off digest first (@ separator)
        let (name_tag, digest) = match reference.rfind('@') {
            Some(at_pos) => {
                let digest = &reference[at_pos + 1..];
                validate_digest(reference, digest)?;
                (&reference[..at_pos], Some(digest.to_string()))
            }
            None => (reference, None),
        };

        // Tag separator is the last colon after the last slash; a colon before
        // any slash is a registry port.
        let last_slash = name_tag.rfind('/').map(|p| p + 1).unwrap_or(0);
        let (name, tag) = match name_tag[last_slash..].rfind(':') {
            Some(colon_pos) => {
                let split = last_slash + colon_pos;
                (&name_tag[..split], Some(name_tag[split + 1..].to_string()))
            }
            None => (name_tag, None),
        };

        if let Some(ref tag) = tag {
            validate_tag(reference, tag)?;
        }

        let (domain, path) = split_domain_path(reference, name)?;

        Ok(ImageReference {
            domain,
            path,
            tag,
            digest,
        })
    }

    /// Return a copy carrying `latest` when no tag is present.
    pub fn with_default_tag(mut self) -> Self {
        if self.tag.is_none() {
            self.tag = Some(DEFAULT_TAG.to_string());
        }
        self
    }

    /// Return the digest-pinned form: same domain and path, tag cleared.
    pub fn pinned(&self, digest: impl Into<String>) -> Self {
        ImageReference {
            domain: self.domain.clone(),
            path: self.path.clone(),
            tag: None,
            digest: Some(digest.into()),
        }
    }

    /// Repository name without tag or digest (`domain/path`).
    pub fn repository(&self) -> String {
        format!("{}/{}", self.domain, self.path)
    }

    /// Get the full reference string.
    pub fn full_reference(&self) -> String {
        let mut s = self.repository();
        if let Some(ref tag) = self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            s.push('@');
            s.push_str(digest);
        }
        s
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

/// Split a name into domain and repository path components.
fn split_domain_path(reference: &str, name: &str) -> Result<(String, String)> {
    // The first component is a registry hostname when it contains a dot or
    // colon, or is "localhost"
    let (domain, mut path) = match name.split_once('/') {
        Some((first, rest))
            if first.contains('.') || first.contains(':') || first == "localhost" =>
        {
            (first.to_string(), rest.to_string())
        }
        _ => (DEFAULT_DOMAIN.to_string(), name.to_string()),
    };

    // Single name like "nginx" → "library/nginx" on Docker Hub
    if domain == DEFAULT_DOMAIN && !path.is_empty() && !path.contains('/') {
        path = format!("library/{}", path);
    }
    validate_path(reference, &path)?;
    Ok((domain, path))
}

fn validate_path(reference: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(AppError::reference(reference, "empty repository path"));
    }
    for component in path.split('/') {
        if component.is_empty() {
            return Err(AppError::reference(reference, "empty path component"));
        }
        if component.chars().any(|c| c.is_ascii_uppercase()) {
            return Err(AppError::reference(
                reference,
                "repository name must be lowercase",
            ));
        }
        let valid = component
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c));
        let edges_ok = component
            .chars()
            .next()
            .zip(component.chars().last())
            .map_or(false, |(first, last)| {
                first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric()
            });
        if !valid || !edges_ok {
            return Err(AppError::reference(
                reference,
                format!("invalid path component '{}'", component),
            ));
        }
    }
    Ok(())
}

fn validate_tag(reference: &str, tag: &str) -> Result<()> {
    let mut chars = tag.chars();
    let first_ok = chars
        .next()
        .map_or(false, |c| c.is_ascii_alphanumeric() || c == '_');
    let rest_ok = chars.all(|c| c.is_ascii_alphanumeric() || "_.-".contains(c));
    if !first_ok || !rest_ok || tag.len() > MAX_TAG_LEN {
        return Err(AppError::reference(reference, format!("invalid tag '{}'", tag)));
    }
    Ok(())
}

fn validate_digest(reference: &str, digest: &str) -> Result<()> {
    match digest.split_once(':') {
        Some((algorithm, hex))
            if !algorithm.is_empty()
                && !hex.is_empty()
                && hex.chars().all(|c| c.is_ascii_hexdigit()) =>
        {
            Ok(())
        }
        _ => Err(AppError::reference(
            reference,
            "invalid digest format: expected algorithm:hex",
        )),
    }
}
