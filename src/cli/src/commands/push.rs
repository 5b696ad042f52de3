//! `obom push` command: push an SBOM and its attachments to a registry.

use std::path::PathBuf;
use std::sync::Arc;

use clap::{ArgAction, Args};
use obom_core::config::RegistryConfig;
use obom_runtime::oci::{
    AttachmentSet, Credential, CredentialResolver, CredentialStore, ImageReference, Publisher,
    StaticCredential, StoreCredential,
};
use obom_runtime::push::{push_sbom, PushRequest};
use obom_runtime::sbom::{load_sbom_from_file, parse_annotation_flags};

use crate::output::format_sbom_summary;

#[derive(Args)]
pub struct PushArgs {
    /// Path to the SPDX SBOM file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Target reference (e.g., "ghcr.io/org/sbom:v1"); defaults to the "latest" tag
    pub reference: String,

    /// Manifest annotation as key=value (repeatable)
    #[arg(short = 'a', long = "annotation")]
    pub annotations: Vec<String>,

    /// Registry username
    #[arg(short, long)]
    pub username: Option<String>,

    /// Registry password
    #[arg(short, long)]
    pub password: Option<String>,

    /// Push a JSON summary of the SBOM as an extra layer
    #[arg(short = 's', long)]
    pub push_summary: bool,

    /// Enforce SPDX conformance when loading the SBOM
    #[arg(short = 'r', long, default_value_t = true, action = ArgAction::Set)]
    pub strict: bool,

    /// Artifact to attach as type=path (repeatable)
    #[arg(short = 't', long)]
    pub attach: Vec<String>,
}

/// Explicit credentials when both halves are given, else the stored chain
/// (obom store, Docker config, environment).
fn credential_resolver(
    args: &PushArgs,
    registry: &str,
) -> Result<Arc<dyn CredentialResolver>, Box<dyn std::error::Error>> {
    match (&args.username, &args.password) {
        (Some(username), Some(password)) => Ok(Arc::new(StaticCredential::new(
            registry,
            Credential::new(username, password),
        ))),
        _ => Ok(Arc::new(StoreCredential::new(CredentialStore::default_path()?))),
    }
}

pub async fn execute(args: PushArgs) -> Result<(), Box<dyn std::error::Error>> {
    // Validate every input before touching the file system or the network
    let reference = ImageReference::parse(&args.reference)?;
    let annotations = parse_annotation_flags(&args.annotations)?;
    let attachments = AttachmentSet::from_flags(&args.attach)?;

    tracing::debug!(
        file = %args.file.display(),
        annotations = annotations.len(),
        attachments = attachments.len(),
        "Loading SBOM"
    );
    let loaded = load_sbom_from_file(&args.file, args.strict)?;
    print!("{}", format_sbom_summary(&loaded.sbom, &loaded.descriptor));

    let resolver = credential_resolver(&args, &reference.registry)?;
    let publisher = Publisher::new(RegistryConfig::default());
    let repository = publisher.repository(&reference, resolver);

    let request = PushRequest {
        reference,
        annotations,
        push_summary: args.push_summary,
        attachments,
    };

    println!("Pushing SBOM to {}@{}...", args.reference, loaded.descriptor.digest());
    let outcome = push_sbom(&loaded, &request, &repository, &publisher).await?;
    println!("SBOM pushed to {}@{}", args.reference, outcome.sbom.digest());

    for attached in &outcome.attachments {
        println!(
            "Attached {} ({}) as {}@{}",
            attached.path,
            attached.artifact_type,
            request.reference.repository_reference(),
            attached.descriptor.digest()
        );
    }

    Ok(())
}
