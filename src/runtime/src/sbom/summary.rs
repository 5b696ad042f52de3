//! Document queries and the machine-readable SBOM summary blob.

use std::str::FromStr;

use packageurl::PackageUrl;
use serde::{Deserialize, Serialize};

use super::document::{ExternalRef, Package, SpdxDocument};

/// Media type of the summary layer pushed with `--push-summary`.
pub const MEDIA_TYPE_SUMMARY: &str = "application/json";

const CATEGORY_PACKAGE_MANAGER: [&str; 2] = ["PACKAGE-MANAGER", "PACKAGE_MANAGER"];
const TYPE_PURL: &str = "purl";

/// `{"sbomSummary": {...}}` envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryEnvelope {
    pub sbom_summary: SbomSummary,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SbomSummary {
    pub files: Vec<String>,
    pub packages: Vec<PackageSummary>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageSummary {
    pub name: String,
    pub version: String,
    pub license: String,
    /// purl type of the package manager reference, empty when none
    pub package_manager: String,
}

impl PackageSummary {
    pub fn from_package(package: &Package) -> Self {
        Self {
            name: package.name.clone(),
            version: package.version_info.clone(),
            license: package.license_declared.clone(),
            package_manager: package_manager(&package.external_refs).unwrap_or_default(),
        }
    }
}

/// Every file name, in document order.
pub fn file_names(document: &SpdxDocument) -> Vec<String> {
    document.files.iter().map(|f| f.file_name.clone()).collect()
}

/// Every external-reference locator of every package, in document order.
pub fn package_locators(document: &SpdxDocument) -> Vec<String> {
    document
        .packages
        .iter()
        .flat_map(|p| p.external_refs.iter())
        .map(|r| r.reference_locator.clone())
        .collect()
}

pub fn package_summaries(document: &SpdxDocument) -> Vec<PackageSummary> {
    document
        .packages
        .iter()
        .map(PackageSummary::from_package)
        .collect()
}

/// Build the summary envelope for `document`.
pub fn summarize(document: &SpdxDocument) -> SummaryEnvelope {
    SummaryEnvelope {
        sbom_summary: SbomSummary {
            files: file_names(document),
            packages: package_summaries(document),
        },
    }
}

/// purl type of the first package-manager purl reference, if any.
///
/// A locator that is not a valid package URL yields `None` and a warning;
/// one bad reference never fails the whole summary.
pub fn package_manager(refs: &[ExternalRef]) -> Option<String> {
    let reference = refs.iter().find(|r| {
        CATEGORY_PACKAGE_MANAGER.contains(&r.reference_category.as_str())
            && r.reference_type == TYPE_PURL
    })?;

    match PackageUrl::from_str(&reference.reference_locator) {
        Ok(purl) => Some(purl.ty().to_string()),
        Err(e) => {
            tracing::warn!(
                locator = %reference.reference_locator,
                error = %e,
                "Ignoring malformed package URL"
            );
            None
        }
    }
}
