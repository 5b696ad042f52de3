//! Formatting helpers for CLI output.

use std::fmt::Write as _;

use comfy_table::{ContentArrangement, Table};
use obom_runtime::oci::Descriptor;
use obom_runtime::sbom::{PackageSummary, SbomDocument};

const RULE_WIDTH: usize = 80;
const LABEL_WIDTH: usize = 23;

/// Create a styled table with the given headers.
pub fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.load_preset(comfy_table::presets::NOTHING);
    table.set_header(headers);
    table
}

/// Format a byte count as a human-readable string.
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = 1024 * KB;

    if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

fn line(out: &mut String, label: &str, value: impl std::fmt::Display) {
    let _ = writeln!(out, "{:<width$}{}", label, value, width = LABEL_WIDTH);
}

/// Human-readable SBOM summary framed by rules.
pub fn format_sbom_summary(sbom: &SbomDocument, descriptor: &Descriptor) -> String {
    let document = &sbom.document;
    let mut out = String::new();
    let rule = "=".repeat(RULE_WIDTH);

    let _ = writeln!(out, "{}", rule);
    line(&mut out, "Document Name:", &document.name);
    line(&mut out, "Document Namespace:", &document.document_namespace);
    line(&mut out, "SPDX Version:", &sbom.version);

    let creation = &document.creation_info;
    if !creation.created.is_empty() {
        line(&mut out, "Creation Date:", &creation.created);
    }
    match creation.creators.as_slice() {
        [] => {}
        [only] => line(&mut out, "Creator:", only),
        [first, rest @ ..] => {
            line(&mut out, "Creators:", first);
            for creator in rest {
                line(&mut out, "", creator);
            }
        }
    }

    if !document.packages.is_empty() {
        line(&mut out, "Packages:", document.packages.len());
    }
    if !document.files.is_empty() {
        line(&mut out, "Files:", document.files.len());
    }
    line(&mut out, "Size:", format_bytes(descriptor.size().max(0) as u64));
    line(&mut out, "Digest:", descriptor.digest());
    let _ = writeln!(out, "{}", rule);
    out
}

/// Package summaries as a table.
pub fn packages_table(packages: &[PackageSummary]) -> Table {
    let mut table = new_table(&["NAME", "VERSION", "LICENSE", "PACKAGE MANAGER"]);
    for package in packages {
        table.add_row(vec![
            package.name.as_str(),
            package.version.as_str(),
            package.license.as_str(),
            package.package_manager.as_str(),
        ]);
    }
    table
}
