//! Bundle publishing: archive the descriptor and its directory, upload the
//! archive as a blob and push a single-layer manifest under a tag.

use a3s_app_core::config::BUNDLE_VERSION;
use a3s_app_core::error::Result;
use a3s_app_core::{AppDescriptor, BundleConfig, EventEmitter, EventPayload};

use crate::bundle::ArchiveBuilder;
use crate::oci::manifest::{BUNDLE_MEDIA_TYPE, CONFIG_MEDIA_TYPE};
use crate::oci::reference::DEFAULT_TAG;
use crate::oci::{BundleManifest, ImageReference, RegistryClient};

/// Config blob content referenced by every bundle manifest.
const EMPTY_CONFIG: &[u8] = b"{}";

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishResult {
    /// Target reference the manifest was pushed to (tag applied)
    pub reference: ImageReference,
    pub tag: String,
    /// Digest of the uploaded archive blob
    pub blob_digest: String,
    /// Size of the uploaded archive blob in bytes
    pub blob_size: u64,
    /// Digest of the pushed manifest
    pub manifest_digest: String,
    /// Number of entries in the archive
    pub entries: usize,
}

/// Publishes bundles to a registry.
pub struct BundlePublisher<C> {
    client: C,
    config: BundleConfig,
    events: EventEmitter,
}

impl<C: RegistryClient> BundlePublisher<C> {
    pub fn new(client: C, config: BundleConfig, events: EventEmitter) -> Self {
        Self {
            client,
            config,
            events,
        }
    }

    /// Registry client in use.
    pub fn client(&self) -> &C {
        &self.client
    }

    /// Archive `descriptor` with the configured bundle root and push it to
    /// `target`. An untagged target is published as `latest`.
    ///
    /// Blobs uploaded before a failure are left in the registry.
    pub async fn publish(&self, descriptor: &AppDescriptor, target: &str) -> Result<PublishResult> {
        let content = descriptor.to_yaml()?;
        let archive = ArchiveBuilder::from_config(&self.config)
            .with_events(self.events.clone())
            .build(content.as_bytes())?;

        let reference = ImageReference::parse(target)?.with_default_tag();
        let tag = reference
            .tag
            .clone()
            .unwrap_or_else(|| DEFAULT_TAG.to_string());

        tracing::info!(
            target = %reference,
            kind = self.config.kind.marker(),
            size = archive.data.len(),
            "Publishing bundle"
        );

        let config = self
            .client
            .put_blob(&reference, CONFIG_MEDIA_TYPE, EMPTY_CONFIG)
            .await?;
        let blob = self
            .client
            .put_blob(&reference, BUNDLE_MEDIA_TYPE, &archive.data)
            .await?;
        self.events.emit(EventPayload::BlobUploaded {
            repository: reference.repository(),
            digest: blob.digest.clone(),
            size: blob.size,
        });

        let manifest = BundleManifest::new(config, blob, self.config.kind.marker(), BUNDLE_VERSION);
        let manifest_digest = self.client.put_manifest(&reference, &manifest, &tag).await?;
        self.events.emit(EventPayload::ManifestPushed {
            repository: reference.repository(),
            tag: tag.clone(),
            digest: manifest_digest.clone(),
        });

        Ok(PublishResult {
            blob_digest: manifest.blob().digest.clone(),
            blob_size: manifest.blob().size,
            reference,
            tag,
            manifest_digest,
            entries: archive.entries.len(),
        })
    }
}
