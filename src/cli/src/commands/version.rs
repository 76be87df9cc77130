//! `a3s-app version` command.

use clap::Args;

#[derive(Args)]
pub struct VersionArgs;

pub async fn execute(_args: VersionArgs) -> Result<(), Box<dyn std::error::Error>> {
    println!("a3s-app version {}", a3s_app_core::VERSION);
    println!("runtime {}", a3s_app_runtime::VERSION);
    Ok(())
}
