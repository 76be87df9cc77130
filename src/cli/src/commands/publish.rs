//! `a3s-app publish` command: pin, bundle and push an app to a registry.

use std::path::PathBuf;

use a3s_app_core::{AppDescriptor, ArtifactKind, BundleConfig, EventEmitter, ResolverKind};
use a3s_app_runtime::{BundlePublisher, OciRegistryClient, PublishResult};
use clap::Args;

use crate::output;

#[derive(Args)]
pub struct PublishArgs {
    /// Target reference (e.g., "ghcr.io/org/app:v1"); defaults to tag "latest"
    pub target: String,

    /// Compose file (default: <dir>/docker-compose.yml)
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Directory to bundle
    #[arg(short, long)]
    pub dir: Option<PathBuf>,

    /// Artifact kind announced in the manifest: app or bundle
    #[arg(long)]
    pub kind: Option<ArtifactKind>,

    /// Resolve digests through the local Docker engine
    #[arg(long)]
    pub engine: bool,

    /// Publish the compose file as-is, without pinning images
    #[arg(long)]
    pub no_pin: bool,

    /// Skip the contents of directories matched by an ignore pattern
    #[arg(long)]
    pub prune_ignored_dirs: bool,

    /// Bundle configuration file (YAML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}

pub async fn execute(args: PublishArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(args.config.as_deref())?;
    if let Some(dir) = args.dir {
        config.bundle_root = dir;
    }
    if let Some(kind) = args.kind {
        config.kind = kind;
    }
    if args.engine {
        config.resolver = ResolverKind::Engine;
    }
    if args.prune_ignored_dirs {
        config.prune_ignored_dirs = true;
    }

    let file = args
        .file
        .unwrap_or_else(|| config.bundle_root.join(&config.descriptor_file));
    let mut descriptor = AppDescriptor::load(&file)?;

    let events = EventEmitter::default();
    let printer = output::spawn_printer(&events, false);
    let result = pin_and_publish(&mut descriptor, &config, &args.target, !args.no_pin, &events).await;
    drop(events);
    printer.await?;

    let published = result?;
    tracing::info!(
        reference = %published.reference,
        manifest = %published.manifest_digest,
        "Published"
    );
    println!("{}", output::publish_summary(&published));

    Ok(())
}

async fn pin_and_publish(
    descriptor: &mut AppDescriptor,
    config: &BundleConfig,
    target: &str,
    pin: bool,
    events: &EventEmitter,
) -> a3s_app_core::Result<PublishResult> {
    if pin {
        super::build_pinner(config.resolver, events.clone())
            .pin_images(descriptor)
            .await?;
    }
    BundlePublisher::new(
        OciRegistryClient::from_credential_store(),
        config.clone(),
        events.clone(),
    )
    .publish(descriptor, target)
    .await
}
