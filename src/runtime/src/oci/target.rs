//! Content store contract shared by the local stage and remote registries.

use async_trait::async_trait;
use obom_core::error::Result;

use super::descriptor::Descriptor;

/// A digest-addressed store of blobs and manifests with named tags.
#[async_trait]
pub trait Target: Send + Sync {
    /// Whether content matching `descriptor` is present.
    async fn exists(&self, descriptor: &Descriptor) -> Result<bool>;

    /// Exact bytes of `descriptor`; fails with `NotFound` when absent.
    async fn fetch(&self, descriptor: &Descriptor) -> Result<Vec<u8>>;

    /// Store `content` under `descriptor`.
    ///
    /// Pushing content that is already present is a no-op.
    async fn push(&self, descriptor: &Descriptor, content: &[u8]) -> Result<()>;

    /// Bind `reference` (a tag or a digest string) to `descriptor`.
    async fn tag(&self, descriptor: &Descriptor, reference: &str) -> Result<()>;

    /// Descriptor bound to a tag or digest string.
    async fn resolve(&self, reference: &str) -> Result<Descriptor>;
}

/// Stores that can answer "which manifests declare this subject".
#[async_trait]
pub trait ReferrerLister: Send + Sync {
    /// Referrer manifests of `subject`, optionally filtered by artifact type.
    async fn referrers(
        &self,
        subject: &Descriptor,
        artifact_type: Option<&str>,
    ) -> Result<Vec<Descriptor>>;
}
