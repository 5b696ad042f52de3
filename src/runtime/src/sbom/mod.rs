//! SPDX SBOM support: document model, loading, annotations and summaries.

pub mod annotations;
pub mod document;
pub mod loader;
pub mod summary;

pub use annotations::{extract, merge, parse_annotation_flags};
pub use document::{Creator, SpdxDocument};
pub use loader::{
    load_sbom_from_file, load_sbom_from_reader, parse_sbom, LoadedSbom, SbomDocument,
    SbomLoadOptions, MEDIA_TYPE_SPDX,
};
pub use summary::{file_names, package_locators, package_summaries, summarize, PackageSummary};
