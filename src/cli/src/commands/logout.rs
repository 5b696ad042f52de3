//! `obom logout` command: remove stored registry credentials.

use clap::Args;
use obom_runtime::oci::CredentialStore;

#[derive(Args)]
pub struct LogoutArgs {
    /// Registry server (e.g., "ghcr.io", "localhost:5000")
    pub server: String,
}

pub async fn execute(args: LogoutArgs) -> Result<(), Box<dyn std::error::Error>> {
    let store = CredentialStore::default_path()?;

    if store.remove(&args.server)? {
        println!("Removing login credentials for {}", args.server);
    } else {
        println!("Not logged in to {}", args.server);
    }

    Ok(())
}
