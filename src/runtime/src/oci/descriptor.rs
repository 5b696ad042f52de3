//! OCI content descriptors.
//!
//! Descriptors are the `oci-spec` image types; this module adds the
//! constructors and value-semantics helpers the packing code needs.

use std::collections::HashMap;

use obom_core::error::Result;
pub use oci_spec::image::{Descriptor, MediaType, ANNOTATION_TITLE};

use super::digest::Digest;

/// Annotation map as carried by `oci-spec` descriptors and manifests.
pub type Annotations = HashMap<String, String>;

/// Build the descriptor of `bytes` under `media_type`.
///
/// Pure and deterministic; the empty slice is valid input.
pub fn describe(bytes: &[u8], media_type: &str) -> Descriptor {
    Descriptor::new(
        MediaType::from(media_type),
        bytes.len() as i64,
        Digest::from_bytes(bytes).to_string(),
    )
}

/// Lookups and copy-on-write edits over a [`Descriptor`].
pub trait DescriptorExt {
    /// Value of the title annotation, if set and non-empty.
    fn title(&self) -> Option<&str>;

    fn annotation(&self, key: &str) -> Option<&str>;

    /// Copy of this descriptor with `key` set to `value`.
    fn with_annotation(&self, key: impl Into<String>, value: impl Into<String>) -> Descriptor;

    /// Copy of this descriptor carrying `name` as its title.
    ///
    /// An empty `name` or an already present non-empty title leaves the
    /// descriptor unchanged.
    fn with_title(&self, name: &str) -> Descriptor;

    /// Identity-only copy: media type, digest and size.
    fn plain(&self) -> Descriptor;

    /// The digest string, parsed and validated.
    fn content_digest(&self) -> Result<Digest>;
}

impl DescriptorExt for Descriptor {
    fn title(&self) -> Option<&str> {
        self.annotation(ANNOTATION_TITLE).filter(|t| !t.is_empty())
    }

    fn annotation(&self, key: &str) -> Option<&str> {
        self.annotations()
            .as_ref()
            .and_then(|a| a.get(key))
            .map(String::as_str)
    }

    fn with_annotation(&self, key: impl Into<String>, value: impl Into<String>) -> Descriptor {
        let mut annotations = self.annotations().clone().unwrap_or_default();
        annotations.insert(key.into(), value.into());
        let mut updated = self.clone();
        updated.set_annotations(Some(annotations));
        updated
    }

    fn with_title(&self, name: &str) -> Descriptor {
        if name.is_empty() || self.title().is_some() {
            return self.clone();
        }
        self.with_annotation(ANNOTATION_TITLE, name)
    }

    fn plain(&self) -> Descriptor {
        Descriptor::new(self.media_type().clone(), self.size(), self.digest().as_str())
    }

    fn content_digest(&self) -> Result<Digest> {
        Digest::parse(self.digest())
    }
}
