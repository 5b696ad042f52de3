//! Manifest annotations derived from SBOM metadata and `--annotation` flags.

use obom_core::error::{ObomError, Result};

use super::loader::SbomDocument;
use crate::oci::descriptor::Annotations;

pub const ANNOTATION_DOCUMENT_NAME: &str = "org.spdx.name";
pub const ANNOTATION_DOCUMENT_NAMESPACE: &str = "org.spdx.namespace";
pub const ANNOTATION_SPDX_VERSION: &str = "org.spdx.version";
pub const ANNOTATION_CREATION_DATE: &str = "org.spdx.created";
pub const ANNOTATION_CREATORS: &str = "org.spdx.creator";

/// Project the SBOM's document metadata onto the fixed `org.spdx.*` keys.
///
/// Creators are rendered `type: identity` and joined with `", "`; a
/// document without creators yields an empty string, not a missing key.
pub fn extract(sbom: &SbomDocument) -> Annotations {
    let document = &sbom.document;
    let creators = document
        .creation_info
        .creators
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ");

    Annotations::from([
        (ANNOTATION_DOCUMENT_NAME.to_string(), document.name.clone()),
        (
            ANNOTATION_DOCUMENT_NAMESPACE.to_string(),
            document.document_namespace.clone(),
        ),
        (ANNOTATION_SPDX_VERSION.to_string(), sbom.version.clone()),
        (
            ANNOTATION_CREATION_DATE.to_string(),
            document.creation_info.created.clone(),
        ),
        (ANNOTATION_CREATORS.to_string(), creators),
    ])
}

/// Parse `key=value` flags, rejecting malformed entries and repeated keys.
///
/// Values may be empty and may themselves contain `=`.
pub fn parse_annotation_flags(flags: &[String]) -> Result<Annotations> {
    let mut annotations = Annotations::new();
    for flag in flags {
        let (key, value) = flag
            .split_once('=')
            .ok_or_else(|| ObomError::AnnotationFormat(flag.clone()))?;
        if key.is_empty() {
            return Err(ObomError::AnnotationFormat(flag.clone()));
        }
        if annotations.contains_key(key) {
            return Err(ObomError::AnnotationDuplicate(key.to_string()));
        }
        annotations.insert(key.to_string(), value.to_string());
    }
    Ok(annotations)
}

/// `base` overlaid with `overlay`; overlay wins on shared keys.
pub fn merge(base: Annotations, overlay: Annotations) -> Annotations {
    let mut merged = base;
    merged.extend(overlay);
    merged
}
