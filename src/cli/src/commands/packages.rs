//! `obom packages` command.

use std::path::PathBuf;

use clap::{ArgAction, Args};
use obom_runtime::sbom::{load_sbom_from_file, package_locators, package_summaries};

use crate::output::packages_table;

#[derive(Args)]
pub struct PackagesArgs {
    /// Path to the SPDX SBOM file
    #[arg(short, long)]
    pub file: PathBuf,

    /// Enforce SPDX conformance when loading the SBOM
    #[arg(short = 'r', long, default_value_t = true, action = ArgAction::Set)]
    pub strict: bool,

    /// Print every external reference locator instead of the table
    #[arg(long)]
    pub locators: bool,
}

pub async fn execute(args: PackagesArgs) -> Result<(), Box<dyn std::error::Error>> {
    let loaded = load_sbom_from_file(&args.file, args.strict)?;
    let document = &loaded.sbom.document;

    if args.locators {
        for locator in package_locators(document) {
            println!("{}", locator);
        }
        return Ok(());
    }

    println!("{}", packages_table(&package_summaries(document)));
    Ok(())
}
