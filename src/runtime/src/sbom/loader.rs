//! Loading SPDX SBOMs from bytes, readers and files.

use std::io::Read;
use std::path::Path;

use obom_core::error::{ObomError, Result};
use serde_json::Value;

use super::document::SpdxDocument;
use crate::oci::artifact::{base_name, load_from_bytes, LoadOptions};
use crate::oci::descriptor::Descriptor;

/// Media type of SPDX JSON documents, also the SBOM manifest's artifact type.
pub const MEDIA_TYPE_SPDX: &str = "application/spdx+json";

/// A parsed SBOM together with its raw version string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SbomDocument {
    /// `spdxVersion` as found in the raw JSON
    pub version: String,
    pub document: SpdxDocument,
}

/// Options for [`load_sbom_from_reader`].
#[derive(Debug, Clone, Default)]
pub struct SbomLoadOptions {
    /// Enforce SPDX conformance instead of accepting partial documents
    pub strict: bool,
    /// Display name for the title annotation
    pub name: Option<String>,
}

/// A loaded SBOM: document, descriptor and exact bytes.
#[derive(Debug, Clone)]
pub struct LoadedSbom {
    pub sbom: SbomDocument,
    pub descriptor: Descriptor,
    pub bytes: Vec<u8>,
}

/// Parse SBOM bytes.
///
/// The version comes straight from the raw JSON, so a missing `spdxVersion`
/// fails in both modes. Strict mode then enforces the conformance rules;
/// permissive mode logs violations and carries on.
pub fn parse_sbom(bytes: &[u8], strict: bool) -> Result<SbomDocument> {
    let raw: Value = serde_json::from_slice(bytes)
        .map_err(|e| ObomError::SpdxParse(format!("invalid JSON: {}", e)))?;

    if !raw.is_object() {
        return Err(ObomError::SpdxParse(
            "expected a JSON object at the top level".to_string(),
        ));
    }

    let version = raw
        .get("spdxVersion")
        .and_then(Value::as_str)
        .ok_or(ObomError::MissingSpdxVersion)?
        .to_string();

    let document: SpdxDocument =
        serde_json::from_value(raw).map_err(|e| ObomError::SpdxParse(e.to_string()))?;

    if strict {
        document.validate()?;
    } else if let Err(e) = document.validate() {
        tracing::warn!(version = %version, error = %e, "Accepting non-conformant SBOM");
    }

    Ok(SbomDocument { version, document })
}

/// Read an SBOM to the end and parse it.
pub fn load_sbom_from_reader<R: Read>(mut reader: R, options: &SbomLoadOptions) -> Result<LoadedSbom> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;

    let sbom = parse_sbom(&bytes, options.strict)?;

    let mut load_options = LoadOptions::new(MEDIA_TYPE_SPDX);
    load_options.name = options.name.clone();
    let descriptor = load_from_bytes(&bytes, &load_options);

    Ok(LoadedSbom {
        sbom,
        descriptor,
        bytes,
    })
}

/// Load an SBOM file, titling the descriptor with the file's base name.
pub fn load_sbom_from_file(path: impl AsRef<Path>, strict: bool) -> Result<LoadedSbom> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| ObomError::ArtifactLoad {
        path: path.to_path_buf(),
        source: e,
    })?;

    let display = path.to_string_lossy();
    let options = SbomLoadOptions {
        strict,
        name: Some(base_name(&display).to_string()),
    };

    let loaded = load_sbom_from_reader(file, &options).map_err(|e| match e {
        ObomError::IoError(source) => ObomError::ArtifactLoad {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })?;

    tracing::debug!(
        path = %path.display(),
        digest = %loaded.descriptor.digest(),
        version = %loaded.sbom.version,
        "Loaded SBOM"
    );
    Ok(loaded)
}
