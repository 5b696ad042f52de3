//! obom runtime - SBOM loading and OCI artifact publication.
//!
//! Loads SPDX documents, projects their metadata into manifest annotations,
//! packs them as OCI artifacts in an in-memory stage and copies the staged
//! graph, attachments included, to a registry.

#![allow(clippy::result_large_err)]

pub mod oci;
pub mod push;
pub mod sbom;

// Re-export common types
pub use oci::{Descriptor, DescriptorExt, Digest, ImageReference, MediaType, MemoryStore};
pub use oci::{Publisher, RemoteRepository};
pub use oci::{AttachmentSet, Credential, CredentialResolver, CredentialStore};
pub use oci::{ReferrerLister, StaticCredential, StoreCredential, Target};
pub use push::{push_sbom, PushOutcome, PushRequest};
pub use sbom::{LoadedSbom, SbomDocument, SpdxDocument, MEDIA_TYPE_SPDX};

/// obom runtime version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
