//! Integration test: pin a descriptor and publish it to an in-memory registry.
//!
//! Exercises the full flow the `publish` command drives:
//!
//! 1. Resolve every service tag through the registry and rewrite it to a digest
//! 2. Archive the pinned descriptor together with the bundle directory
//! 3. Upload the archive and push the manifest under a tag
//! 4. Read the uploaded blob back and check what landed in it

use std::collections::HashMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

use a3s_app_core::error::{AppError, Result};
use a3s_app_core::{AppDescriptor, BundleConfig, EventEmitter, EventPayload, PlatformDescriptor};
use a3s_app_runtime::oci::manifest::sha256_digest;
use a3s_app_runtime::{
    BlobDescriptor, BundleManifest, BundlePublisher, ImageReference, ManifestKind,
    ReferencePinner, RegistryClient, RegistryResolver,
};
use async_trait::async_trait;
use tempfile::TempDir;

const NGINX_DIGEST: &str =
    "sha256:aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
const REDIS_DIGEST: &str =
    "sha256:bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

#[derive(Default)]
struct State {
    tags: HashMap<String, String>,
    manifests: HashMap<String, ManifestKind>,
    blobs: HashMap<String, Vec<u8>>,
    pushed: HashMap<String, BundleManifest>,
}

/// Registry kept entirely in memory, shared between pinner and publisher.
#[derive(Clone, Default)]
struct MemoryRegistry {
    state: Arc<Mutex<State>>,
}

impl MemoryRegistry {
    fn seed(&self, reference: &str, digest: &str, manifest: ManifestKind) {
        let mut state = self.state.lock().unwrap();
        state.tags.insert(reference.to_string(), digest.to_string());
        state.manifests.insert(digest.to_string(), manifest);
    }
}

#[async_trait]
impl RegistryClient for MemoryRegistry {
    async fn resolve_tag(&self, reference: &ImageReference) -> Result<String> {
        self.state
            .lock()
            .unwrap()
            .tags
            .get(&reference.to_string())
            .cloned()
            .ok_or_else(|| AppError::resolution(reference.to_string(), "manifest unknown"))
    }

    async fn get_manifest(&self, reference: &ImageReference, digest: &str) -> Result<ManifestKind> {
        self.state
            .lock()
            .unwrap()
            .manifests
            .get(digest)
            .cloned()
            .ok_or_else(|| AppError::resolution(reference.to_string(), "manifest unknown"))
    }

    async fn put_blob(
        &self,
        _repository: &ImageReference,
        media_type: &str,
        data: &[u8],
    ) -> Result<BlobDescriptor> {
        let descriptor = BlobDescriptor::for_bytes(media_type, data);
        self.state
            .lock()
            .unwrap()
            .blobs
            .insert(descriptor.digest.clone(), data.to_vec());
        Ok(descriptor)
    }

    async fn put_manifest(
        &self,
        repository: &ImageReference,
        manifest: &BundleManifest,
        tag: &str,
    ) -> Result<String> {
        let digest = sha256_digest(&manifest.canonical_json()?);
        self.state
            .lock()
            .unwrap()
            .pushed
            .insert(format!("{}:{}", repository.repository(), tag), manifest.clone());
        Ok(digest)
    }
}

fn unpack(data: &[u8]) -> HashMap<String, Vec<u8>> {
    let mut archive = tar::Archive::new(flate2::read::GzDecoder::new(data));
    archive
        .entries()
        .unwrap()
        .map(|e| {
            let mut e = e.unwrap();
            let name = e.path().unwrap().to_string_lossy().into_owned();
            let mut content = Vec::new();
            e.read_to_end(&mut content).unwrap();
            (name, content)
        })
        .collect()
}

#[tokio::test]
async fn test_pin_then_publish() {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("docker-compose.yml"),
        "services:\n  web:\n    image: nginx:stable\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("nginx.conf"), "server {}\n").unwrap();
    std::fs::create_dir_all(dir.path().join("secrets")).unwrap();
    std::fs::write(dir.path().join("secrets/token"), "hunter2").unwrap();
    std::fs::write(dir.path().join(".composeappignores"), "secrets/*\n").unwrap();

    let registry = MemoryRegistry::default();
    registry.seed(
        "docker.io/library/nginx:stable",
        NGINX_DIGEST,
        ManifestKind::PlatformList(vec![
            PlatformDescriptor::new("amd64").with_os("linux"),
            PlatformDescriptor::new("arm").with_os("linux").with_variant("v7"),
        ]),
    );
    registry.seed(
        "docker.io/library/redis:7",
        REDIS_DIGEST,
        ManifestKind::SinglePlatform,
    );

    let events = EventEmitter::new(128);
    let mut rx = events.subscribe();

    let mut descriptor = AppDescriptor::load(&dir.path().join("docker-compose.yml")).unwrap();
    descriptor
        .services
        .insert("cache".to_string(), a3s_app_core::ServiceSpec::new("redis:7"));

    let pinner = ReferencePinner::new(RegistryResolver::new(registry.clone()), events.clone());
    let pinned = pinner.pin_images(&mut descriptor).await.unwrap();
    assert_eq!(pinned.len(), 2);
    assert_eq!(
        descriptor.service("web").unwrap().image,
        format!("docker.io/library/nginx@{}", NGINX_DIGEST)
    );
    assert_eq!(
        descriptor.service("cache").unwrap().image,
        format!("docker.io/library/redis@{}", REDIS_DIGEST)
    );

    let config = BundleConfig {
        bundle_root: dir.path().to_path_buf(),
        ..Default::default()
    };
    let publisher = BundlePublisher::new(registry.clone(), config, events.clone());
    let result = publisher
        .publish(&descriptor, "registry.example.com/team/shop")
        .await
        .unwrap();
    assert_eq!(result.tag, "latest");

    let state = registry.state.lock().unwrap();
    let manifest = state
        .pushed
        .get("registry.example.com/team/shop:latest")
        .unwrap();
    assert_eq!(manifest.blob().digest, result.blob_digest);
    assert_eq!(manifest.annotations.get("compose-app").map(String::as_str), Some("v1"));

    let files = unpack(state.blobs.get(&result.blob_digest).unwrap());
    let mut names: Vec<&String> = files.keys().collect();
    names.sort();
    assert_eq!(names, vec!["docker-compose.yml", "nginx.conf"]);

    let archived = String::from_utf8(files["docker-compose.yml"].clone()).unwrap();
    let reloaded = AppDescriptor::from_yaml(&archived).unwrap();
    assert_eq!(reloaded, descriptor);
    assert_eq!(archived, descriptor.to_yaml().unwrap());

    let mut keys = Vec::new();
    while let Ok(event) = rx.try_recv() {
        if let EventPayload::PatternIgnored { pattern, .. } = &event.payload {
            assert_eq!(pattern, "secrets/*");
        }
        keys.push(event.key());
    }
    assert!(keys.contains(&"pin.service.pinned"));
    assert!(keys.contains(&"archive.pattern.ignored"));
    assert_eq!(keys.last(), Some(&"publish.manifest.pushed"));
}

#[tokio::test]
async fn test_unknown_tag_stops_before_publish() {
    let registry = MemoryRegistry::default();
    let pinner = ReferencePinner::new(RegistryResolver::new(registry.clone()), EventEmitter::default());
    let mut descriptor =
        AppDescriptor::from_yaml("services:\n  web:\n    image: nginx:does-not-exist\n").unwrap();

    let err = pinner.pin_images(&mut descriptor).await.unwrap_err();
    assert!(matches!(err, AppError::ResolutionError { .. }));
    assert!(registry.state.lock().unwrap().blobs.is_empty());
}
