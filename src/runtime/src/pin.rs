//! Image pinning: rewrite each service's tag reference to a digest reference.
//!
//! Pinning is best-effort and non-atomic. Services are visited in name order
//! and the first failure stops the pass; services pinned before it keep their
//! new value.

use a3s_app_core::error::{AppError, Result};
use a3s_app_core::{AppDescriptor, EventEmitter, EventPayload, PlatformDescriptor};
use async_trait::async_trait;

use crate::engine::DistributionInspector;
use crate::oci::{ImageReference, ManifestKind, RegistryClient};

/// Digest and platform set a tag resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedImage {
    pub digest: String,
    pub manifest: ManifestKind,
}

/// Strategy for resolving a tagged reference to a digest.
#[async_trait]
pub trait DigestResolver: Send + Sync {
    async fn resolve(&self, reference: &ImageReference) -> Result<ResolvedImage>;
}

/// Resolves through a registry: tag → digest, then digest → manifest.
pub struct RegistryResolver<C> {
    client: C,
}

impl<C: RegistryClient> RegistryResolver<C> {
    pub fn new(client: C) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<C: RegistryClient> DigestResolver for RegistryResolver<C> {
    async fn resolve(&self, reference: &ImageReference) -> Result<ResolvedImage> {
        let digest = self.client.resolve_tag(reference).await?;
        let manifest = self.client.get_manifest(reference, &digest).await?;
        Ok(ResolvedImage { digest, manifest })
    }
}

/// Resolves through a local container engine's distribution inspection.
pub struct EngineResolver<I> {
    inspector: I,
}

impl<I: DistributionInspector> EngineResolver<I> {
    pub fn new(inspector: I) -> Self {
        Self { inspector }
    }
}

#[async_trait]
impl<I: DistributionInspector> DigestResolver for EngineResolver<I> {
    async fn resolve(&self, reference: &ImageReference) -> Result<ResolvedImage> {
        let info = self.inspector.inspect(reference).await?;
        let manifest = if info.platforms.is_empty() {
            ManifestKind::SinglePlatform
        } else {
            ManifestKind::PlatformList(info.platforms)
        };
        Ok(ResolvedImage {
            digest: info.digest,
            manifest,
        })
    }
}

/// Outcome of pinning one service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PinnedImage {
    pub service: String,
    pub original: String,
    pub platforms: Vec<PlatformDescriptor>,
    pub pinned: ImageReference,
}

/// Rewrites service images in an [`AppDescriptor`] to digest references.
pub struct ReferencePinner {
    resolver: Box<dyn DigestResolver>,
    events: EventEmitter,
}

impl ReferencePinner {
    pub fn new(resolver: impl DigestResolver + 'static, events: EventEmitter) -> Self {
        Self {
            resolver: Box::new(resolver),
            events,
        }
    }

    /// Pin every service's image in place.
    pub async fn pin_images(&self, descriptor: &mut AppDescriptor) -> Result<Vec<PinnedImage>> {
        let mut pinned = Vec::with_capacity(descriptor.services.len());
        for name in descriptor.service_names() {
            let original = match descriptor.service(&name) {
                Some(service) => service.image.clone(),
                None => continue,
            };
            let result = self.pin_service(&name, &original).await?;

            if let Some(service) = descriptor.service_mut(&name) {
                service.image = result.pinned.to_string();
            }
            pinned.push(result);
        }
        Ok(pinned)
    }

    async fn pin_service(&self, name: &str, image: &str) -> Result<PinnedImage> {
        if image.trim().is_empty() {
            return Err(AppError::input(name, "has an empty 'image' attribute"));
        }
        let image = strip_default_placeholder(image)?;

        self.events.emit(EventPayload::ServicePinning {
            service: name.to_string(),
            image: image.to_string(),
        });

        let reference = ImageReference::parse(image)?;
        if reference.tag.is_none() {
            return Err(AppError::reference(
                image,
                format!("images must be tagged. e.g {}:stable", image),
            ));
        }

        let resolved = self.resolver.resolve(&reference).await?;
        let pinned = reference.pinned(resolved.digest);
        let platforms = resolved.manifest.platforms().to_vec();

        tracing::info!(
            service = %name,
            image = %image,
            pinned = %pinned,
            platforms = platforms.len(),
            "Pinned service image"
        );
        self.events.emit(EventPayload::ServicePinned {
            service: name.to_string(),
            original: image.to_string(),
            platforms: platforms.clone(),
            pinned: pinned.to_string(),
        });

        Ok(PinnedImage {
            service: name.to_string(),
            original: image.to_string(),
            platforms,
            pinned,
        })
    }
}

/// Reduce `${VAR-default}` to `default`.
///
/// Only this one form is understood; it exists so descriptors written for
/// variable interpolation can still be pinned without an environment.
fn strip_default_placeholder(image: &str) -> Result<&str> {
    if !image.starts_with('$') {
        return Ok(image);
    }
    let inner = image
        .strip_prefix("${")
        .and_then(|rest| rest.strip_suffix('}'))
        .ok_or_else(|| {
            AppError::reference(
                image,
                "this does not look like a properly formatted ${variable-defval}",
            )
        })?;
    match inner.split_once('-') {
        Some((_, default)) if !default.is_empty() => Ok(default),
        _ => Err(AppError::reference(
            image,
            "variable does not appear to have a default value",
        )),
    }
}
