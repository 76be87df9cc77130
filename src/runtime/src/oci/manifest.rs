//! Manifest model: platform enumeration for pinning and the single-layer
//! manifest that wraps a published bundle.

use std::collections::BTreeMap;

use a3s_app_core::error::{AppError, Result};
use a3s_app_core::PlatformDescriptor;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Media type of the bundle blob.
pub const BUNDLE_MEDIA_TYPE: &str = "application/tar+gzip";

/// Media type of the (empty) config blob referenced by bundle manifests.
pub const CONFIG_MEDIA_TYPE: &str = "application/vnd.oci.image.config.v1+json";

/// Media type of an OCI image manifest.
pub const OCI_MANIFEST_MEDIA_TYPE: &str = "application/vnd.oci.image.manifest.v1+json";

/// What a tag resolves to, as far as platforms are concerned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ManifestKind {
    /// A single image manifest; no platform list is enumerated
    SinglePlatform,
    /// A manifest list / image index, one entry per sub-manifest, in order
    PlatformList(Vec<PlatformDescriptor>),
}

impl ManifestKind {
    /// Platforms advertised by the manifest (empty for single-platform).
    pub fn platforms(&self) -> &[PlatformDescriptor] {
        match self {
            ManifestKind::SinglePlatform => &[],
            ManifestKind::PlatformList(platforms) => platforms,
        }
    }

    /// Classify raw manifest bytes (OCI or Docker schema 2).
    pub fn from_raw(reference: &str, raw: &[u8]) -> Result<Self> {
        let manifest: RawManifest = serde_json::from_slice(raw).map_err(|e| {
            AppError::resolution(reference, format!("unreadable manifest: {}", e))
        })?;

        match (manifest.manifests, manifest.layers) {
            (Some(entries), _) => Ok(ManifestKind::PlatformList(
                entries.into_iter().map(RawIndexEntry::into_platform).collect(),
            )),
            (None, Some(_)) => Ok(ManifestKind::SinglePlatform),
            (None, None) => Err(AppError::resolution(
                reference,
                format!(
                    "unexpected manifest type {}",
                    manifest.media_type.as_deref().unwrap_or("<none>")
                ),
            )),
        }
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawManifest {
    media_type: Option<String>,
    manifests: Option<Vec<RawIndexEntry>>,
    layers: Option<Vec<serde_json::Value>>,
}

#[derive(Deserialize)]
struct RawIndexEntry {
    platform: Option<RawPlatform>,
}

#[derive(Deserialize)]
struct RawPlatform {
    architecture: String,
    os: Option<String>,
    variant: Option<String>,
}

impl RawIndexEntry {
    fn into_platform(self) -> PlatformDescriptor {
        match self.platform {
            Some(p) => PlatformDescriptor {
                architecture: p.architecture,
                os: p.os,
                variant: p.variant,
            },
            None => PlatformDescriptor::new("unknown"),
        }
    }
}

/// Content descriptor of an uploaded blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobDescriptor {
    /// Media type the blob was uploaded with
    pub media_type: String,
    /// Content digest (`sha256:<hex>`)
    pub digest: String,
    /// Size in bytes
    pub size: u64,
}

impl BlobDescriptor {
    /// Describe a byte payload.
    pub fn for_bytes(media_type: impl Into<String>, data: &[u8]) -> Self {
        Self {
            media_type: media_type.into(),
            digest: sha256_digest(data),
            size: data.len() as u64,
        }
    }
}

/// Single-layer OCI manifest referencing a bundle blob.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleManifest {
    /// Always 2
    pub schema_version: u32,
    /// Manifest media type
    pub media_type: String,
    /// Empty config blob
    pub config: BlobDescriptor,
    /// Exactly one layer: the bundle archive
    pub layers: Vec<BlobDescriptor>,
    /// `{<kind marker>: <version>}`
    pub annotations: BTreeMap<String, String>,
}

impl BundleManifest {
    /// Build a manifest referencing `blob`, annotated with `{kind: version}`.
    pub fn new(config: BlobDescriptor, blob: BlobDescriptor, kind: &str, version: &str) -> Self {
        let mut annotations = BTreeMap::new();
        annotations.insert(kind.to_string(), version.to_string());
        Self {
            schema_version: 2,
            media_type: OCI_MANIFEST_MEDIA_TYPE.to_string(),
            config,
            layers: vec![blob],
            annotations,
        }
    }

    /// The bundle blob this manifest references.
    pub fn blob(&self) -> &BlobDescriptor {
        &self.layers[0]
    }

    /// Canonical JSON bytes (sorted keys, compact).
    pub fn canonical_json(&self) -> Result<Vec<u8>> {
        canonical_json(&serde_json::to_value(self)?)
    }
}

/// Serialize a JSON value with sorted keys and no insignificant whitespace.
pub fn canonical_json(value: &serde_json::Value) -> Result<Vec<u8>> {
    // serde_json::Value keeps object keys in a BTreeMap, so a plain compact
    // serialization is already key-sorted.
    Ok(serde_json::to_vec(value)?)
}

/// SHA256 digest of raw bytes in OCI form (`sha256:<hex>`).
pub fn sha256_digest(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    format!("sha256:{}", hex::encode(hasher.finalize()))
}
