//! `obom login` command: store registry credentials.

use clap::Args;
use obom_runtime::oci::{Credential, CredentialStore};

#[derive(Args)]
pub struct LoginArgs {
    /// Registry server (e.g., "ghcr.io", "localhost:5000")
    pub server: String,

    /// Username
    #[arg(short, long)]
    pub username: Option<String>,

    /// Password
    #[arg(short, long)]
    pub password: Option<String>,

    /// Read password from stdin
    #[arg(long)]
    pub password_stdin: bool,
}

fn prompt(label: &str) -> std::io::Result<String> {
    eprint!("{}", label);
    read_line()
}

fn read_line() -> std::io::Result<String> {
    let mut input = String::new();
    std::io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

pub async fn execute(args: LoginArgs) -> Result<(), Box<dyn std::error::Error>> {
    let username = match args.username {
        Some(u) => u,
        None => prompt("Username: ")?,
    };

    let password = if args.password_stdin {
        read_line()?
    } else {
        match args.password {
            Some(p) => p,
            None => prompt("Password: ")?,
        }
    };

    if username.is_empty() || password.is_empty() {
        return Err("Username and password are required".into());
    }

    let store = CredentialStore::default_path()?;
    store.store(&args.server, Credential::new(username, password))?;

    println!("Login Succeeded");
    Ok(())
}
