//! CLI command definitions and dispatch.

mod login;
mod logout;
mod pin;
mod publish;
mod version;

use std::path::Path;

use a3s_app_core::{BundleConfig, EventEmitter, ResolverKind};
use a3s_app_runtime::{DockerCli, EngineResolver, OciRegistryClient, ReferencePinner, RegistryResolver};
use clap::{Parser, Subcommand};

/// A3S App: pin, bundle and publish multi-service applications.
#[derive(Parser)]
#[command(name = "a3s-app", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Pin every service image in a compose file to a digest
    Pin(pin::PinArgs),
    /// Pin, bundle and publish an app to a registry
    Publish(publish::PublishArgs),
    /// Log in to a registry
    Login(login::LoginArgs),
    /// Log out from a registry
    Logout(logout::LogoutArgs),
    /// Show version information
    Version(version::VersionArgs),
}

/// Bundle configuration from `path`, or defaults when no file is given.
pub(crate) fn load_config(path: Option<&Path>) -> Result<BundleConfig, Box<dyn std::error::Error>> {
    match path {
        Some(path) => Ok(BundleConfig::load(path)?),
        None => Ok(BundleConfig::default()),
    }
}

/// Pinner using the requested resolution strategy.
pub(crate) fn build_pinner(resolver: ResolverKind, events: EventEmitter) -> ReferencePinner {
    match resolver {
        ResolverKind::Registry => ReferencePinner::new(
            RegistryResolver::new(OciRegistryClient::from_credential_store()),
            events,
        ),
        ResolverKind::Engine => {
            ReferencePinner::new(EngineResolver::new(DockerCli::default()), events)
        }
    }
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Pin(args) => pin::execute(args).await,
        Command::Publish(args) => publish::execute(args).await,
        Command::Login(args) => login::execute(args).await,
        Command::Logout(args) => logout::execute(args).await,
        Command::Version(args) => version::execute(args).await,
    }
}
