//! A3S App CLI - pin, bundle and publish compose applications.

pub mod commands;
pub mod output;
