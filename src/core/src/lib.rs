//! A3S App Core - Foundational Types
//!
//! This crate provides the types shared across A3S App: the application
//! descriptor model, error taxonomy, bundle configuration, and the event
//! stream used to report progress.

pub mod config;
pub mod descriptor;
pub mod error;
pub mod event;
pub mod platform;

// Re-export commonly used types
pub use config::{ArtifactKind, BundleConfig, ResolverKind};
pub use descriptor::{AppDescriptor, ServiceSpec};
pub use error::{AppError, Result};
pub use event::{AppEvent, EventEmitter, EventPayload};
pub use platform::PlatformDescriptor;

/// A3S App version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
