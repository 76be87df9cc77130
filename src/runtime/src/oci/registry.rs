//! Registry client used for pinning and publishing.
//!
//! [`RegistryClient`] is the capability surface the pinner and publisher
//! consume; [`OciRegistryClient`] implements it with the `oci-distribution`
//! crate against real registries (Docker Hub, GHCR, etc.).

use a3s_app_core::error::{AppError, Result};
use async_trait::async_trait;
use oci_distribution::client::{ClientConfig, ClientProtocol};
use oci_distribution::manifest::{OciImageManifest, OciManifest};
use oci_distribution::secrets::RegistryAuth as OciRegistryAuth;
use oci_distribution::{Client, Reference, RegistryOperation};

use super::credentials::CredentialStore;
use super::manifest::{canonical_json, sha256_digest, BlobDescriptor, BundleManifest, ManifestKind};
use super::reference::ImageReference;
use a3s_app_core::PlatformDescriptor;

/// Authentication credentials for a container registry.
#[derive(Debug, Clone)]
pub struct RegistryAuth {
    username: Option<String>,
    password: Option<String>,
}

impl RegistryAuth {
    /// Create anonymous authentication (no credentials).
    pub fn anonymous() -> Self {
        Self {
            username: None,
            password: None,
        }
    }

    /// Create basic authentication with username and password.
    pub fn basic(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: Some(username.into()),
            password: Some(password.into()),
        }
    }

    /// Create authentication from environment variables.
    ///
    /// Reads `REGISTRY_USERNAME` and `REGISTRY_PASSWORD`.
    /// Falls back to anonymous if not set.
    pub fn from_env() -> Self {
        let username = std::env::var("REGISTRY_USERNAME").ok();
        let password = std::env::var("REGISTRY_PASSWORD").ok();

        if username.is_some() && password.is_some() {
            Self { username, password }
        } else {
            Self::anonymous()
        }
    }

    /// Create authentication from the credential store, falling back to env vars,
    /// then anonymous.
    pub fn from_credential_store(registry: &str) -> Self {
        if let Ok(store) = CredentialStore::default_path() {
            if let Ok(Some((username, password))) = store.get(registry) {
                return Self::basic(username, password);
            }
        }
        Self::from_env()
    }

    /// Convert to oci-distribution auth type.
    fn to_oci_auth(&self) -> OciRegistryAuth {
        match (&self.username, &self.password) {
            (Some(u), Some(p)) => OciRegistryAuth::Basic(u.clone(), p.clone()),
            _ => OciRegistryAuth::Anonymous,
        }
    }
}

/// Registry operations needed to pin images and publish bundles.
#[async_trait]
pub trait RegistryClient: Send + Sync {
    /// Resolve the reference's tag to the digest of the manifest it points at.
    async fn resolve_tag(&self, reference: &ImageReference) -> Result<String>;

    /// Fetch the manifest stored under `digest` in the reference's repository.
    async fn get_manifest(&self, reference: &ImageReference, digest: &str) -> Result<ManifestKind>;

    /// Upload an opaque blob into the reference's repository.
    async fn put_blob(
        &self,
        repository: &ImageReference,
        media_type: &str,
        data: &[u8],
    ) -> Result<BlobDescriptor>;

    /// Push a manifest under `tag`. Returns the manifest digest.
    async fn put_manifest(
        &self,
        repository: &ImageReference,
        manifest: &BundleManifest,
        tag: &str,
    ) -> Result<String>;
}

/// Where a client takes its credentials from.
#[derive(Debug, Clone)]
enum AuthSource {
    /// The same credentials for every registry
    Fixed(RegistryAuth),
    /// Looked up per registry host on each request
    PerRegistry,
}

/// [`RegistryClient`] backed by `oci-distribution`.
pub struct OciRegistryClient {
    client: Client,
    auth: AuthSource,
}

impl Default for OciRegistryClient {
    fn default() -> Self {
        Self::new()
    }
}

impl OciRegistryClient {
    /// Create a new registry client with anonymous authentication.
    pub fn new() -> Self {
        Self::with_auth(RegistryAuth::anonymous())
    }

    /// Create a new registry client with the given authentication.
    pub fn with_auth(auth: RegistryAuth) -> Self {
        Self::with_source(AuthSource::Fixed(auth))
    }

    /// Create a client that picks credentials for each registry host from
    /// the credential store, then the environment.
    pub fn from_credential_store() -> Self {
        Self::with_source(AuthSource::PerRegistry)
    }

    fn with_source(auth: AuthSource) -> Self {
        let config = ClientConfig {
            protocol: ClientProtocol::Https,
            ..Default::default()
        };
        let client = Client::new(config);
        Self { client, auth }
    }

    fn auth_for(&self, registry: &str) -> OciRegistryAuth {
        match &self.auth {
            AuthSource::Fixed(auth) => auth.to_oci_auth(),
            AuthSource::PerRegistry => RegistryAuth::from_credential_store(registry).to_oci_auth(),
        }
    }

    /// Authenticate for pushing into the reference's repository.
    async fn authenticate_push(&self, oci_ref: &Reference, registry: &str) -> Result<()> {
        self.client
            .auth(oci_ref, &self.auth_for(registry), RegistryOperation::Push)
            .await
            .map_err(|e| AppError::publish(registry, format!("Authentication failed: {}", e)))?;
        Ok(())
    }
}

#[async_trait]
impl RegistryClient for OciRegistryClient {
    async fn resolve_tag(&self, reference: &ImageReference) -> Result<String> {
        let oci_ref = to_oci_reference(reference)?;
        let digest = self
            .client
            .fetch_manifest_digest(&oci_ref, &self.auth_for(&reference.domain))
            .await
            .map_err(|e| AppError::resolution(reference.to_string(), e.to_string()))?;

        tracing::debug!(reference = %reference, digest = %digest, "Resolved tag");
        Ok(digest)
    }

    async fn get_manifest(&self, reference: &ImageReference, digest: &str) -> Result<ManifestKind> {
        let by_digest = reference.pinned(digest);
        let oci_ref = to_oci_reference(&by_digest)?;
        let (manifest, _) = self
            .client
            .pull_manifest(&oci_ref, &self.auth_for(&reference.domain))
            .await
            .map_err(|e| AppError::resolution(by_digest.to_string(), e.to_string()))?;

        Ok(match manifest {
            OciManifest::Image(_) => ManifestKind::SinglePlatform,
            OciManifest::ImageIndex(index) => ManifestKind::PlatformList(
                index
                    .manifests
                    .into_iter()
                    .map(|entry| match entry.platform {
                        Some(p) => PlatformDescriptor {
                            architecture: p.architecture,
                            os: Some(p.os),
                            variant: p.variant,
                        },
                        None => PlatformDescriptor::new("unknown"),
                    })
                    .collect(),
            ),
        })
    }

    async fn put_blob(
        &self,
        repository: &ImageReference,
        media_type: &str,
        data: &[u8],
    ) -> Result<BlobDescriptor> {
        let oci_ref = to_oci_reference(repository)?;
        self.authenticate_push(&oci_ref, &repository.domain).await?;

        let descriptor = BlobDescriptor::for_bytes(media_type, data);
        self.client
            .push_blob(&oci_ref, data, &descriptor.digest)
            .await
            .map_err(|e| {
                AppError::publish(
                    &repository.domain,
                    format!("Failed to upload blob {}: {}", descriptor.digest, e),
                )
            })?;

        tracing::debug!(
            repository = %repository.repository(),
            digest = %descriptor.digest,
            size = descriptor.size,
            "Uploaded blob"
        );
        Ok(descriptor)
    }

    async fn put_manifest(
        &self,
        repository: &ImageReference,
        manifest: &BundleManifest,
        tag: &str,
    ) -> Result<String> {
        let mut tagged = repository.clone();
        tagged.tag = Some(tag.to_string());
        tagged.digest = None;
        let oci_ref = to_oci_reference(&tagged)?;

        let image_manifest: OciImageManifest = serde_json::from_value(serde_json::to_value(manifest)?)?;
        let manifest = OciManifest::Image(image_manifest);

        // The client uploads canonical JSON; hash the same form.
        let digest = sha256_digest(&canonical_json(&serde_json::to_value(&manifest)?)?);

        self.authenticate_push(&oci_ref, &repository.domain).await?;
        let url = self
            .client
            .push_manifest(&oci_ref, &manifest)
            .await
            .map_err(|e| {
                AppError::publish(&repository.domain, format!("Failed to push manifest: {}", e))
            })?;

        tracing::info!(reference = %tagged, digest = %digest, url = %url, "Pushed manifest");
        Ok(digest)
    }
}

/// Convert an ImageReference to an oci-distribution Reference.
fn to_oci_reference(reference: &ImageReference) -> Result<Reference> {
    let ref_str = if let Some(ref digest) = reference.digest {
        format!("{}@{}", reference.repository(), digest)
    } else if let Some(ref tag) = reference.tag {
        format!("{}:{}", reference.repository(), tag)
    } else {
        format!("{}:latest", reference.repository())
    };

    ref_str
        .parse::<Reference>()
        .map_err(|e| AppError::reference(ref_str.clone(), e.to_string()))
}
