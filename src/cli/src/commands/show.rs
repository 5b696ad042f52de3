//! `obom show` command.

use std::path::PathBuf;

use clap::{ArgAction, Args};
use obom_runtime::sbom::load_sbom_from_file;

use crate::output::format_sbom_summary;

#[derive(Args)]
pub struct ShowArgs {
    /// Path to the SPDX SBOM file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Enforce SPDX conformance when loading the SBOM
    #[arg(short = 'r', long, default_value_t = true, action = ArgAction::Set)]
    pub strict: bool,
}

pub async fn execute(args: ShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_sbom_from_file(&args.file, args.strict)?;
    print!("{}", format_sbom_summary(&loaded.sbom, &loaded.descriptor));
    Ok(())
}
