//! OCI artifact support for obom.
//!
//! Everything needed to turn byte blobs into an annotated OCI artifact
//! graph and move it to a registry:
//!
//! - digests and descriptors (`oci-spec` image types)
//! - artifact loading
//! - the in-memory staging store and the remote repository
//! - manifest packing (including subject-linked referrers)
//! - extended copy, publishing and attachments
//!
//! # Artifact graph
//!
//! ```text
//! ┌──────────────────────────────┐        subject
//! │ SBOM manifest                │◄───────────────────┐
//! │ artifactType: spdx+json      │                    │
//! │ annotations:  org.spdx.*     │   ┌────────────────┴───┐
//! ├──────────────────────────────┤   │ attachment manifest │
//! │ config: {} (empty JSON)      │   │ artifactType: <t>   │
//! │ layer:  SBOM document        │   ├─────────────────────┤
//! │ layer:  summary (optional)   │   │ layer: <file>       │
//! └──────────────────────────────┘   └─────────────────────┘
//! ```

pub mod artifact;
pub mod attach;
pub mod copy;
pub mod credentials;
pub mod descriptor;
pub mod digest;
pub mod manifest;
pub mod publish;
pub mod reference;
pub mod registry;
pub mod store;
pub mod target;

pub use artifact::{load_from_bytes, load_from_file, load_from_reader, LoadOptions, LoadedArtifact};
pub use attach::{attach_all, AttachOutcome, AttachmentSet};
pub use copy::extended_copy;
pub use credentials::{
    Credential, CredentialResolver, CredentialStore, DockerConfigCredential, StaticCredential,
    StoreCredential,
};
pub use descriptor::{describe, Annotations, Descriptor, DescriptorExt, MediaType, ANNOTATION_TITLE};
pub use digest::{Digest, DigestAlgorithm};
pub use manifest::{pack_manifest, pack_referrer, parse_manifest, ImageManifest, PackOptions};
pub use publish::Publisher;
pub use reference::ImageReference;
pub use registry::RemoteRepository;
pub use store::MemoryStore;
pub use target::{ReferrerLister, Target};
