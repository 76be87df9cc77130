//! `a3s-app pin` command: pin service images to digests.

use std::path::PathBuf;

use a3s_app_core::{AppDescriptor, EventEmitter, ResolverKind};
use clap::Args;

use crate::output;

#[derive(Args)]
pub struct PinArgs {
    /// Compose file to pin
    #[arg(short, long, default_value = "docker-compose.yml")]
    pub file: PathBuf,

    /// Resolve digests through the local Docker engine
    #[arg(long)]
    pub engine: bool,

    /// Rewrite the compose file in place instead of printing it
    #[arg(short, long)]
    pub write: bool,
}

pub async fn execute(args: PinArgs) -> Result<(), Box<dyn std::error::Error>> {
    let mut descriptor = AppDescriptor::load(&args.file)?;

    let resolver = if args.engine {
        ResolverKind::Engine
    } else {
        ResolverKind::Registry
    };

    let events = EventEmitter::default();
    let printer = output::spawn_printer(&events, !args.write);
    let pinner = super::build_pinner(resolver, events);

    let result = pinner.pin_images(&mut descriptor).await;
    drop(pinner);
    printer.await?;
    result?;

    let yaml = descriptor.to_yaml()?;
    if args.write {
        std::fs::write(&args.file, yaml)?;
        println!("Pinned {}", args.file.display());
    } else {
        print!("{}", yaml);
    }

    Ok(())
}
