//! OCI registry support.
//!
//! - Image reference parsing and normalization
//! - Manifest classification (single image vs. platform list)
//! - Bundle manifest construction and content digests
//! - Registry client and stored login credentials

pub mod credentials;
pub mod manifest;
pub mod reference;
pub mod registry;

pub use credentials::CredentialStore;
pub use manifest::{BlobDescriptor, BundleManifest, ManifestKind};
pub use reference::ImageReference;
pub use registry::{OciRegistryClient, RegistryAuth, RegistryClient};
