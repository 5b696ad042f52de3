//! Remote registry repository.
//!
//! Implements the content store contract against an OCI registry through
//! the `oci-client` crate. Manifests are pushed by digest and tags are
//! bound by re-pushing the same bytes under the tag.

use std::sync::Arc;

use async_trait::async_trait;
use obom_core::config::RegistryConfig;
use obom_core::error::{ObomError, Result};
use oci_client::client::{ClientConfig, ClientProtocol};
use oci_client::errors::{OciDistributionError, OciErrorCode};
use oci_client::manifest::ImageIndexEntry;
use oci_client::secrets::RegistryAuth as OciRegistryAuth;
use oci_client::{Client, Reference, RegistryOperation};
use tokio::sync::OnceCell;

use super::credentials::{Credential, CredentialResolver};
use super::descriptor::{Descriptor, DescriptorExt, MediaType};
use super::digest::Digest;
use super::manifest::{is_manifest, parse_manifest};
use super::reference::ImageReference;
use super::target::{ReferrerLister, Target};

/// Convert a resolved credential to oci-client auth.
fn to_oci_auth(credential: &Credential) -> OciRegistryAuth {
    if credential.is_anonymous() {
        OciRegistryAuth::Anonymous
    } else {
        OciRegistryAuth::Basic(credential.username.clone(), credential.password.clone())
    }
}

/// Whether a registry error means "no such content".
///
/// Registries report a miss as a bare 404, or as a 4xx carrying an OCI
/// error envelope with one of the "unknown" codes.
fn is_not_found(err: &OciDistributionError) -> bool {
    match err {
        OciDistributionError::ImageManifestNotFoundError(_) => true,
        OciDistributionError::ServerError { code, .. } => *code == 404,
        OciDistributionError::RequestError(e) => e.status().map(|s| s.as_u16()) == Some(404),
        OciDistributionError::RegistryError { envelope, .. } => {
            envelope.errors.iter().any(|e| {
                matches!(
                    e.code,
                    OciErrorCode::BlobUnknown
                        | OciErrorCode::ManifestUnknown
                        | OciErrorCode::NameUnknown
                        | OciErrorCode::NotFound
                )
            })
        }
        _ => false,
    }
}

/// Descriptor of a manifest listed in a referrers index.
fn from_index_entry(entry: ImageIndexEntry) -> Result<Descriptor> {
    Digest::parse(&entry.digest)?;
    let mut descriptor = Descriptor::new(
        MediaType::from(entry.media_type.as_str()),
        entry.size,
        entry.digest,
    );
    descriptor.set_artifact_type(entry.artifact_type.as_deref().map(MediaType::from));
    descriptor.set_annotations(entry.annotations.map(|a| a.into_iter().collect()));
    Ok(descriptor)
}

/// One repository on a remote registry.
pub struct RemoteRepository {
    client: Client,
    reference: ImageReference,
    plain_http: bool,
    resolver: Arc<dyn CredentialResolver>,
    auth: OnceCell<OciRegistryAuth>,
}

impl RemoteRepository {
    /// Create a repository handle. No network traffic happens until first use.
    pub fn new(
        reference: &ImageReference,
        resolver: Arc<dyn CredentialResolver>,
        config: &RegistryConfig,
    ) -> Self {
        let plain_http = config.is_plain_http(&reference.registry);
        let client = Client::new(ClientConfig {
            protocol: if plain_http {
                ClientProtocol::Http
            } else {
                ClientProtocol::Https
            },
            user_agent: config.user_agent,
            ..Default::default()
        });

        Self {
            client,
            reference: reference.clone(),
            plain_http,
            resolver,
            auth: OnceCell::new(),
        }
    }

    pub fn registry(&self) -> &str {
        &self.reference.registry
    }

    /// Whether requests go over plain HTTP rather than TLS.
    pub fn plain_http(&self) -> bool {
        self.plain_http
    }

    fn registry_error(&self, action: &str, err: impl std::fmt::Display) -> ObomError {
        ObomError::RegistryError {
            registry: self.reference.registry.clone(),
            message: format!("{}: {}", action, err),
        }
    }

    /// Reference to `tag_or_digest` within this repository.
    fn to_oci_reference(&self, tag_or_digest: &str) -> Result<Reference> {
        let separator = if Digest::parse(tag_or_digest).is_ok() {
            '@'
        } else {
            ':'
        };
        let ref_str = format!(
            "{}{}{}",
            self.reference.repository_reference(),
            separator,
            tag_or_digest
        );

        ref_str.parse::<Reference>().map_err(|e| {
            ObomError::InvalidReference(format!("Invalid OCI reference '{}': {}", ref_str, e))
        })
    }

    /// Resolve credentials and authenticate for push, once per repository.
    ///
    /// The client keeps the credential and fetches pull-scoped tokens
    /// itself when a later request needs one.
    async fn authenticate(&self) -> Result<&OciRegistryAuth> {
        self.auth
            .get_or_try_init(|| async {
                let credential = self.resolver.resolve(&self.reference.registry)?;
                let auth = to_oci_auth(&credential);
                let oci_ref = self.to_oci_reference(&self.reference.tag_or_default())?;

                tracing::debug!(
                    registry = %self.reference.registry,
                    anonymous = credential.is_anonymous(),
                    "Authenticating with registry"
                );

                self.client
                    .auth(&oci_ref, &auth, RegistryOperation::Push)
                    .await
                    .map_err(|e| self.registry_error("Authentication failed", e))?;
                Ok(auth)
            })
            .await
    }

    async fn fetch_manifest(&self, reference: &str) -> Result<(Vec<u8>, String)> {
        let auth = self.authenticate().await?;
        let oci_ref = self.to_oci_reference(reference)?;
        let accepted = MediaType::ImageManifest.to_string();
        let (content, digest) = self
            .client
            .pull_manifest_raw(&oci_ref, auth, &[accepted.as_str()])
            .await
            .map_err(|e| {
                if is_not_found(&e) {
                    ObomError::NotFound(reference.to_string())
                } else {
                    self.registry_error("Failed to pull manifest", e)
                }
            })?;
        Ok((content.to_vec(), digest))
    }

    async fn push_manifest(&self, reference: &str, media_type: &MediaType, content: &[u8]) -> Result<()> {
        let oci_ref = self.to_oci_reference(reference)?;
        let content_type = media_type
            .to_string()
            .parse()
            .map_err(|_| ObomError::OciError(format!("Invalid media type '{}'", media_type)))?;
        self.client
            .push_manifest_raw(&oci_ref, content.to_vec(), content_type)
            .await
            .map_err(|e| self.registry_error("Failed to push manifest", e))?;
        Ok(())
    }
}

/// Reject content whose bytes do not match the descriptor.
fn verify_fetched(descriptor: &Descriptor, content: &[u8]) -> Result<()> {
    let digest = descriptor.content_digest()?;
    if !digest.verifies(content) {
        return Err(ObomError::DigestMismatch {
            expected: digest.to_string(),
            actual: Digest::from_bytes(content).to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl Target for RemoteRepository {
    /// HEAD request against the manifest or blob endpoint; every shape of
    /// "not found" the registry may answer with is `Ok(false)`.
    async fn exists(&self, descriptor: &Descriptor) -> Result<bool> {
        let auth = self.authenticate().await?;
        let digest = descriptor.content_digest()?.to_string();
        let oci_ref = self.to_oci_reference(&digest)?;

        let outcome = if is_manifest(descriptor.media_type()) {
            self.client
                .fetch_manifest_digest(&oci_ref, auth)
                .await
                .map(|_| true)
        } else {
            self.client.blob_exists(&oci_ref, &digest).await
        };

        match outcome {
            Ok(found) => Ok(found),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => Err(self.registry_error("Failed to check content", e)),
        }
    }

    async fn fetch(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        let digest = descriptor.content_digest()?.to_string();

        let content = if is_manifest(descriptor.media_type()) {
            self.fetch_manifest(&digest).await?.0
        } else {
            self.authenticate().await?;
            let oci_ref = self.to_oci_reference(&digest)?;
            let mut content = Vec::new();
            self.client
                .pull_blob(&oci_ref, digest.as_str(), &mut content)
                .await
                .map_err(|e| {
                    if is_not_found(&e) {
                        ObomError::NotFound(digest.clone())
                    } else {
                        self.registry_error("Failed to pull blob", e)
                    }
                })?;
            content
        };

        verify_fetched(descriptor, &content)?;
        Ok(content)
    }

    async fn push(&self, descriptor: &Descriptor, content: &[u8]) -> Result<()> {
        verify_fetched(descriptor, content)?;
        self.authenticate().await?;
        let digest = descriptor.digest();

        if is_manifest(descriptor.media_type()) {
            self.push_manifest(digest, descriptor.media_type(), content)
                .await?;
        } else {
            let oci_ref = self.to_oci_reference(digest)?;
            self.client
                .push_blob(&oci_ref, content.to_vec(), digest)
                .await
                .map_err(|e| self.registry_error("Failed to push blob", e))?;
        }

        tracing::debug!(
            registry = %self.reference.registry,
            digest = %digest,
            size = descriptor.size(),
            "Pushed content"
        );
        Ok(())
    }

    async fn tag(&self, descriptor: &Descriptor, reference: &str) -> Result<()> {
        if let Ok(digest) = Digest::parse(reference) {
            // Manifests are already addressable by their own digest.
            if digest.to_string() != *descriptor.digest() {
                return Err(ObomError::DigestMismatch {
                    expected: digest.to_string(),
                    actual: descriptor.digest().clone(),
                });
            }
            return Ok(());
        }

        let content = self.fetch(descriptor).await?;
        self.push_manifest(reference, descriptor.media_type(), &content)
            .await?;

        tracing::debug!(
            registry = %self.reference.registry,
            tag = reference,
            digest = %descriptor.digest(),
            "Tagged manifest"
        );
        Ok(())
    }

    async fn resolve(&self, reference: &str) -> Result<Descriptor> {
        let (content, digest) = self.fetch_manifest(reference).await?;
        let manifest = parse_manifest(&content)?;
        let media_type = manifest
            .media_type()
            .clone()
            .unwrap_or(MediaType::ImageManifest);

        let digest = Digest::parse(&digest)?;
        let mut descriptor = Descriptor::new(media_type, content.len() as i64, digest.to_string());
        descriptor.set_artifact_type(manifest.artifact_type().clone());
        Ok(descriptor)
    }
}

#[async_trait]
impl ReferrerLister for RemoteRepository {
    async fn referrers(
        &self,
        subject: &Descriptor,
        artifact_type: Option<&str>,
    ) -> Result<Vec<Descriptor>> {
        self.authenticate().await?;
        let oci_ref = self.to_oci_reference(subject.digest())?;
        let index = self
            .client
            .pull_referrers(&oci_ref, artifact_type)
            .await
            .map_err(|e| self.registry_error("Failed to list referrers", e))?;

        index.manifests.into_iter().map(from_index_entry).collect()
    }
}
