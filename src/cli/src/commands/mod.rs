//! CLI command definitions and dispatch.

mod files;
mod login;
mod logout;
mod packages;
mod push;
mod show;

use clap::{Parser, Subcommand};
use obom_core::LogLevel;

/// obom - push SPDX SBOMs to OCI registries.
#[derive(Parser)]
#[command(name = "obom", version, about)]
pub struct Cli {
    /// Enable debug logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn log_level(&self) -> LogLevel {
        if self.verbose {
            LogLevel::Debug
        } else {
            LogLevel::default()
        }
    }
}

/// Available commands.
#[derive(Subcommand)]
pub enum Command {
    /// Push an SPDX SBOM to a registry, optionally attaching artifacts
    Push(push::PushArgs),
    /// Show the summary of an SPDX SBOM
    Show(show::ShowArgs),
    /// List the files in an SPDX SBOM
    Files(files::FilesArgs),
    /// List the packages in an SPDX SBOM
    Packages(packages::PackagesArgs),
    /// Store registry credentials
    Login(login::LoginArgs),
    /// Remove stored registry credentials
    Logout(logout::LogoutArgs),
}

/// Dispatch a parsed CLI to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Command::Push(args) => push::execute(args).await,
        Command::Show(args) => show::execute(args).await,
        Command::Files(args) => files::execute(args).await,
        Command::Packages(args) => packages::execute(args).await,
        Command::Login(args) => login::execute(args).await,
        Command::Logout(args) => logout::execute(args).await,
    }
}
