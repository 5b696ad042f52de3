//! `obom files` command.

use std::path::PathBuf;

use clap::{ArgAction, Args};
use obom_runtime::sbom::{file_names, load_sbom_from_file};

#[derive(Args)]
pub struct FilesArgs {
    /// Path to the SPDX SBOM file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Enforce SPDX conformance when loading the SBOM
    #[arg(short = 'r', long, default_value_t = true, action = ArgAction::Set)]
    pub strict: bool,
}

pub async fn execute(args: FilesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_sbom_from_file(&args.file, args.strict)?;
    for name in file_names(&loaded.sbom.document) {
        println!("{}", name);
    }
    Ok(())
}
