//! Publishing staged artifact graphs to a destination store.

use std::sync::Arc;

use obom_core::config::RegistryConfig;
use obom_core::error::Result;

use super::copy::extended_copy;
use super::credentials::CredentialResolver;
use super::descriptor::Descriptor;
use super::reference::ImageReference;
use super::registry::RemoteRepository;
use super::target::{ReferrerLister, Target};

/// Copies staged graphs to registries.
///
/// Holds the registry configuration (user agent, transport heuristic) so
/// that nothing about transport lives in process-wide state.
#[derive(Debug, Clone, Default)]
pub struct Publisher {
    config: RegistryConfig,
}

impl Publisher {
    pub fn new(config: RegistryConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Open the remote repository named by `reference`.
    pub fn repository(
        &self,
        reference: &ImageReference,
        resolver: Arc<dyn CredentialResolver>,
    ) -> RemoteRepository {
        tracing::debug!(
            registry = %reference.registry,
            repository = %reference.repository,
            plain_http = self.config.is_plain_http(&reference.registry),
            "Opening repository"
        );
        RemoteRepository::new(reference, resolver, &self.config)
    }

    /// Copy the graph at `reference` in `source` to `destination`, under the
    /// same reference. Referrers known to `source` travel along.
    pub async fn publish<S, D>(&self, source: &S, reference: &str, destination: &D) -> Result<Descriptor>
    where
        S: Target + ReferrerLister + ?Sized,
        D: Target + ?Sized,
    {
        tracing::info!(reference, "Publishing artifact");
        let root = extended_copy(source, reference, destination, reference).await?;
        tracing::info!(
            reference,
            digest = %root.digest(),
            size = root.size(),
            "Artifact published"
        );
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::credentials::{Credential, StaticCredential};
    use crate::oci::descriptor::describe;
    use crate::oci::manifest::{pack_manifest, PackOptions};
    use crate::oci::store::MemoryStore;

    #[tokio::test]
    async fn test_publish_to_memory_destination() {
        let stage = MemoryStore::new();
        let layer = describe(b"{}", "application/json");
        stage.push(&layer, b"{}").await.unwrap();
        let manifest = pack_manifest(
            &stage,
            "application/vnd.test",
            PackOptions {
                layers: vec![layer],
                ..Default::default()
            },
        )
        .await
        .unwrap();
        stage.tag(&manifest, "latest").await.unwrap();

        let destination = MemoryStore::new();
        let published = Publisher::default()
            .publish(&stage, "latest", &destination)
            .await
            .unwrap();

        assert_eq!(published.digest(), manifest.digest());
        assert_eq!(
            destination.resolve("latest").await.unwrap().digest(),
            manifest.digest()
        );
    }

    #[test]
    fn test_repository_uses_config() {
        let publisher = Publisher::new(RegistryConfig::default());
        assert_eq!(publisher.config().user_agent, "obom");

        let reference = ImageReference::parse("localhost:5000/sbom:v1").unwrap();
        let resolver = Arc::new(StaticCredential::new("localhost:5000", Credential::anonymous()));
        let repo = publisher.repository(&reference, resolver);
        assert!(repo.plain_http());
        assert_eq!(repo.registry(), "localhost:5000");
    }
}
