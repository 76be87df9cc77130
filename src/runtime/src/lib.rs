//! A3S App Runtime - pinning, bundling and publishing.
//!
//! Turns a compose descriptor into an immutable registry artifact: service
//! images are pinned to digests, the descriptor and its directory are packed
//! into a gzip tar bundle, and the bundle is pushed as a tagged OCI manifest.

pub mod bundle;
pub mod engine;
pub mod oci;
pub mod pin;
pub mod publish;

// Re-export common types
pub use bundle::{Archive, ArchiveBuilder, ArchiveEntry, EntryKind, IgnoreRules};
pub use engine::{DistributionInfo, DistributionInspector, DockerCli};
pub use oci::{BlobDescriptor, BundleManifest, ManifestKind};
pub use oci::{CredentialStore, ImageReference, OciRegistryClient, RegistryAuth, RegistryClient};
pub use pin::{DigestResolver, EngineResolver, PinnedImage, ReferencePinner, RegistryResolver, ResolvedImage};
pub use publish::{BundlePublisher, PublishResult};

/// A3S App Runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
