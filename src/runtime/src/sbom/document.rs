//! SPDX 2.x JSON document model.
//!
//! Only the fields obom reads are modelled. Every field defaults when
//! absent so permissive loading can accept partial documents; strict
//! loading runs [`SpdxDocument::validate`] on top.
//!
//! # Strict conformance rules
//!
//! - `SPDXID` is `SPDXRef-DOCUMENT`
//! - `spdxVersion` has the form `SPDX-<major>.<minor>`
//! - `name` and `documentNamespace` are present
//! - `creationInfo.created` is an RFC 3339 timestamp
//! - at least one creator, each `Person: ...`, `Organization: ...` or `Tool: ...`
//! - every package `SPDXID` starts with `SPDXRef-`

use std::fmt;

use obom_core::error::{ObomError, Result};
use serde::{Deserialize, Serialize};

/// SPDX identifier every document must carry.
pub const DOCUMENT_SPDX_ID: &str = "SPDXRef-DOCUMENT";

const SPDX_ID_PREFIX: &str = "SPDXRef-";
const CREATOR_TYPES: [&str; 3] = ["Person", "Organization", "Tool"];

/// Parsed SPDX document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SpdxDocument {
    #[serde(rename = "SPDXID")]
    pub spdx_id: String,
    pub spdx_version: String,
    pub data_license: String,
    pub name: String,
    pub document_namespace: String,
    pub creation_info: CreationInfo,
    pub packages: Vec<Package>,
    pub files: Vec<File>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CreationInfo {
    pub created: String,
    pub creators: Vec<Creator>,
}

/// A `Type: identity` creator entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub struct Creator {
    /// `Person`, `Organization` or `Tool`; empty when the entry has no type
    pub creator_type: String,
    pub creator: String,
}

impl Creator {
    pub fn new(creator_type: impl Into<String>, creator: impl Into<String>) -> Self {
        Self {
            creator_type: creator_type.into(),
            creator: creator.into(),
        }
    }
}

impl From<String> for Creator {
    fn from(entry: String) -> Self {
        match entry.split_once(':') {
            Some((creator_type, creator)) => Creator::new(creator_type.trim(), creator.trim()),
            None => Creator::new("", entry.trim()),
        }
    }
}

impl From<Creator> for String {
    fn from(creator: Creator) -> Self {
        creator.to_string()
    }
}

impl fmt::Display for Creator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.creator_type.is_empty() {
            f.write_str(&self.creator)
        } else {
            write!(f, "{}: {}", self.creator_type, self.creator)
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Package {
    #[serde(rename = "SPDXID")]
    pub spdx_id: String,
    pub name: String,
    pub version_info: String,
    pub license_declared: String,
    pub external_refs: Vec<ExternalRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ExternalRef {
    pub reference_category: String,
    pub reference_type: String,
    pub reference_locator: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct File {
    #[serde(rename = "SPDXID")]
    pub spdx_id: String,
    pub file_name: String,
}

impl SpdxDocument {
    /// Check the strict conformance rules, reporting every violation at once.
    pub fn validate(&self) -> Result<()> {
        let mut violations = Vec::new();

        if self.spdx_id != DOCUMENT_SPDX_ID {
            violations.push(format!(
                "SPDXID must be {}, got '{}'",
                DOCUMENT_SPDX_ID, self.spdx_id
            ));
        }
        if !is_spdx_version(&self.spdx_version) {
            violations.push(format!(
                "spdxVersion must look like SPDX-2.3, got '{}'",
                self.spdx_version
            ));
        }
        if self.name.is_empty() {
            violations.push("name is required".to_string());
        }
        if self.document_namespace.is_empty() {
            violations.push("documentNamespace is required".to_string());
        }
        if chrono::DateTime::parse_from_rfc3339(&self.creation_info.created).is_err() {
            violations.push(format!(
                "creationInfo.created must be an RFC 3339 timestamp, got '{}'",
                self.creation_info.created
            ));
        }
        if self.creation_info.creators.is_empty() {
            violations.push("creationInfo.creators must not be empty".to_string());
        }
        for creator in &self.creation_info.creators {
            if !CREATOR_TYPES.contains(&creator.creator_type.as_str()) || creator.creator.is_empty() {
                violations.push(format!("invalid creator '{}'", creator));
            }
        }
        for package in &self.packages {
            if !package.spdx_id.starts_with(SPDX_ID_PREFIX) {
                violations.push(format!(
                    "package '{}' has invalid SPDXID '{}'",
                    package.name, package.spdx_id
                ));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(ObomError::SpdxParse(violations.join("; ")))
        }
    }
}

fn is_spdx_version(version: &str) -> bool {
    let numeric = |s: &str| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit());
    version
        .strip_prefix("SPDX-")
        .and_then(|v| v.split_once('.'))
        .is_some_and(|(major, minor)| numeric(major) && numeric(minor))
}
