//! Loading arbitrary artifacts (files or streams) into descriptors.
//!
//! Artifacts are small, human-auditable documents, so they are read fully
//! into memory before hashing.

use std::io::Read;
use std::path::Path;

use obom_core::error::{ObomError, Result};

use super::descriptor::{describe, Descriptor, DescriptorExt};

/// What to record about a loaded artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadOptions {
    /// Media type stamped on the descriptor
    pub media_type: String,
    /// Display name for the title annotation; `None` or empty means no title
    pub name: Option<String>,
}

impl LoadOptions {
    pub fn new(media_type: impl Into<String>) -> Self {
        Self {
            media_type: media_type.into(),
            name: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

/// An artifact's descriptor together with its exact bytes.
#[derive(Debug, Clone)]
pub struct LoadedArtifact {
    pub descriptor: Descriptor,
    pub bytes: Vec<u8>,
}

/// Describe an in-memory byte sequence.
pub fn load_from_bytes(bytes: &[u8], options: &LoadOptions) -> Descriptor {
    let descriptor = describe(bytes, &options.media_type);
    match options.name.as_deref() {
        Some(name) => descriptor.with_title(name),
        None => descriptor,
    }
}

/// Read `reader` to the end and describe its contents.
pub fn load_from_reader<R: Read>(mut reader: R, options: &LoadOptions) -> Result<LoadedArtifact> {
    let mut bytes = Vec::new();
    reader.read_to_end(&mut bytes)?;
    let descriptor = load_from_bytes(&bytes, options);
    Ok(LoadedArtifact { descriptor, bytes })
}

/// Load a file, titling the descriptor with the file's base name.
pub fn load_from_file(path: impl AsRef<Path>, media_type: &str) -> Result<LoadedArtifact> {
    let path = path.as_ref();
    let file = std::fs::File::open(path).map_err(|e| ObomError::ArtifactLoad {
        path: path.to_path_buf(),
        source: e,
    })?;

    let display = path.to_string_lossy();
    let options = LoadOptions::new(media_type).with_name(base_name(&display));

    tracing::debug!(path = %path.display(), media_type, "Loading artifact");

    load_from_reader(file, &options).map_err(|e| match e {
        ObomError::IoError(source) => ObomError::ArtifactLoad {
            path: path.to_path_buf(),
            source,
        },
        other => other,
    })
}

/// Last path component, splitting on both `/` and `\` regardless of platform.
pub fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}
