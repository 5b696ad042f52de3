//! In-memory content store used to stage artifacts before publishing.
//!
//! Content is keyed by (digest, size, media type). Manifests that declare a
//! `subject` are indexed on push so the store can list referrers, which is
//! what lets an extended copy carry attached artifacts along.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use obom_core::error::{ObomError, Result};
use tokio::sync::RwLock;

use super::descriptor::{Descriptor, DescriptorExt};
use super::digest::Digest;
use super::manifest::{effective_artifact_type, is_manifest, parse_manifest};
use super::target::{ReferrerLister, Target};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct ContentKey {
    digest: String,
    size: i64,
    media_type: String,
}

impl From<&Descriptor> for ContentKey {
    fn from(descriptor: &Descriptor) -> Self {
        Self {
            digest: descriptor.digest().clone(),
            size: descriptor.size(),
            media_type: descriptor.media_type().to_string(),
        }
    }
}

#[derive(Debug, Default)]
struct StoreIndex {
    content: HashMap<ContentKey, Vec<u8>>,
    /// First descriptor pushed for each digest, for resolving digest strings
    descriptors: HashMap<String, Descriptor>,
    tags: HashMap<String, Descriptor>,
    /// Subject digest → referrer manifests, in push order
    referrers: HashMap<String, Vec<Descriptor>>,
}

/// Content-addressed in-memory store.
///
/// Cheap to clone; clones share the same content.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    index: Arc<RwLock<StoreIndex>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of distinct content entries held.
    pub async fn len(&self) -> usize {
        self.index.read().await.content.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Total size of held content in bytes.
    pub async fn total_size(&self) -> u64 {
        let index = self.index.read().await;
        index.content.values().map(|c| c.len() as u64).sum()
    }

    /// All tags, sorted.
    pub async fn list_tags(&self) -> Vec<String> {
        let index = self.index.read().await;
        let mut tags: Vec<String> = index.tags.keys().cloned().collect();
        tags.sort();
        tags
    }
}

/// Check `content` against the size and digest `descriptor` claims.
fn verify(descriptor: &Descriptor, content: &[u8]) -> Result<()> {
    let digest = descriptor.content_digest()?;
    let actual_size = content.len() as i64;
    if actual_size != descriptor.size() {
        return Err(ObomError::SizeMismatch {
            digest: digest.to_string(),
            expected: descriptor.size(),
            actual: actual_size,
        });
    }
    if !digest.verifies(content) {
        return Err(ObomError::DigestMismatch {
            expected: digest.to_string(),
            actual: Digest::from_bytes(content).to_string(),
        });
    }
    Ok(())
}

#[async_trait]
impl Target for MemoryStore {
    async fn exists(&self, descriptor: &Descriptor) -> Result<bool> {
        let index = self.index.read().await;
        Ok(index.content.contains_key(&ContentKey::from(descriptor)))
    }

    async fn fetch(&self, descriptor: &Descriptor) -> Result<Vec<u8>> {
        let index = self.index.read().await;
        index
            .content
            .get(&ContentKey::from(descriptor))
            .cloned()
            .ok_or_else(|| ObomError::NotFound(descriptor.digest().clone()))
    }

    async fn push(&self, descriptor: &Descriptor, content: &[u8]) -> Result<()> {
        verify(descriptor, content)?;

        let key = ContentKey::from(descriptor);
        if self.index.read().await.content.contains_key(&key) {
            tracing::debug!(digest = %descriptor.digest(), "Content already staged");
            return Ok(());
        }

        // Parse before inserting so a malformed manifest leaves no trace.
        let subject = if is_manifest(descriptor.media_type()) {
            let manifest = parse_manifest(content)?;
            manifest.subject().as_ref().map(|subject| {
                let mut referrer = descriptor.plain();
                referrer.set_artifact_type(Some(effective_artifact_type(&manifest)));
                referrer.set_annotations(manifest.annotations().clone());
                (subject.digest().clone(), referrer)
            })
        } else {
            None
        };

        let mut index = self.index.write().await;
        if index.content.contains_key(&key) {
            return Ok(());
        }
        index.content.insert(key, content.to_vec());
        index
            .descriptors
            .entry(descriptor.digest().clone())
            .or_insert_with(|| descriptor.clone());
        if let Some((subject, referrer)) = subject {
            index.referrers.entry(subject).or_default().push(referrer);
        }

        tracing::debug!(
            digest = %descriptor.digest(),
            size = descriptor.size(),
            media_type = %descriptor.media_type(),
            "Staged content"
        );
        Ok(())
    }

    async fn tag(&self, descriptor: &Descriptor, reference: &str) -> Result<()> {
        if reference.is_empty() {
            return Err(ObomError::InvalidReference("empty tag".to_string()));
        }
        if let Ok(digest) = Digest::parse(reference) {
            if digest.to_string() != *descriptor.digest() {
                return Err(ObomError::DigestMismatch {
                    expected: digest.to_string(),
                    actual: descriptor.digest().clone(),
                });
            }
        }

        let mut index = self.index.write().await;
        if !index.content.contains_key(&ContentKey::from(descriptor)) {
            return Err(ObomError::NotFound(descriptor.digest().clone()));
        }
        index.tags.insert(reference.to_string(), descriptor.clone());
        Ok(())
    }

    async fn resolve(&self, reference: &str) -> Result<Descriptor> {
        let index = self.index.read().await;
        if let Some(descriptor) = index.tags.get(reference) {
            return Ok(descriptor.clone());
        }
        Digest::parse(reference)
            .ok()
            .and_then(|digest| index.descriptors.get(&digest.to_string()).cloned())
            .ok_or_else(|| ObomError::NotFound(reference.to_string()))
    }
}

#[async_trait]
impl ReferrerLister for MemoryStore {
    async fn referrers(
        &self,
        subject: &Descriptor,
        artifact_type: Option<&str>,
    ) -> Result<Vec<Descriptor>> {
        let index = self.index.read().await;
        let referrers = index
            .referrers
            .get(subject.digest())
            .map(|list| {
                list.iter()
                    .filter(|r| artifact_type.map_or(true, |t| has_artifact_type(r, t)))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();
        Ok(referrers)
    }
}

fn has_artifact_type(descriptor: &Descriptor, artifact_type: &str) -> bool {
    descriptor
        .artifact_type()
        .as_ref()
        .is_some_and(|t| t.to_string() == artifact_type)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::oci::descriptor::{describe, MediaType};
    use crate::oci::manifest::{pack_manifest, pack_referrer, PackOptions};

    #[tokio::test]
    async fn test_new_store_is_empty() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);
        assert_eq!(store.total_size().await, 0);
        assert!(store.list_tags().await.is_empty());
    }

    #[tokio::test]
    async fn test_push_and_fetch() {
        let store = MemoryStore::new();
        let desc = describe(b"hello", "text/plain");
        store.push(&desc, b"hello").await.unwrap();

        assert!(store.exists(&desc).await.unwrap());
        assert_eq!(store.fetch(&desc).await.unwrap(), b"hello");
        assert_eq!(store.total_size().await, 5);
    }

    #[tokio::test]
    async fn test_push_is_idempotent() {
        let store = MemoryStore::new();
        let desc = describe(b"hello", "text/plain");
        store.push(&desc, b"hello").await.unwrap();
        store.push(&desc, b"hello").await.unwrap();
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_same_bytes_different_media_type_are_distinct() {
        let store = MemoryStore::new();
        store.push(&describe(b"x", "text/plain"), b"x").await.unwrap();
        store
            .push(&describe(b"x", "application/octet-stream"), b"x")
            .await
            .unwrap();
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_push_rejects_size_mismatch() {
        let store = MemoryStore::new();
        let desc = describe(b"hello", "text/plain");
        let err = store.push(&desc, b"hello!").await.unwrap_err();
        assert!(matches!(err, ObomError::SizeMismatch { expected: 5, actual: 6, .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_push_rejects_digest_mismatch() {
        let store = MemoryStore::new();
        let desc = describe(b"hello", "text/plain");
        let err = store.push(&desc, b"world").await.unwrap_err();
        assert!(matches!(err, ObomError::DigestMismatch { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_push_rejects_malformed_manifest() {
        let store = MemoryStore::new();
        let desc = describe(b"not json", &MediaType::ImageManifest.to_string());
        assert!(store.push(&desc, b"not json").await.is_err());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_fetch_missing() {
        let store = MemoryStore::new();
        let desc = describe(b"missing", "text/plain");
        assert!(!store.exists(&desc).await.unwrap());
        let err = store.fetch(&desc).await.unwrap_err();
        assert!(matches!(err, ObomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_tag_and_resolve() {
        let store = MemoryStore::new();
        let desc = describe(b"hello", "text/plain");
        store.push(&desc, b"hello").await.unwrap();
        store.tag(&desc, "v1").await.unwrap();

        assert_eq!(store.resolve("v1").await.unwrap(), desc);
        assert_eq!(store.resolve(desc.digest()).await.unwrap(), desc);
        assert_eq!(store.list_tags().await, vec!["v1".to_string()]);
    }

    #[tokio::test]
    async fn test_tag_moves_to_new_descriptor() {
        let store = MemoryStore::new();
        let first = describe(b"one", "text/plain");
        let second = describe(b"two", "text/plain");
        store.push(&first, b"one").await.unwrap();
        store.push(&second, b"two").await.unwrap();

        store.tag(&first, "latest").await.unwrap();
        store.tag(&second, "latest").await.unwrap();
        assert_eq!(store.resolve("latest").await.unwrap(), second);
    }

    #[tokio::test]
    async fn test_tag_missing_content() {
        let store = MemoryStore::new();
        let desc = describe(b"absent", "text/plain");
        let err = store.tag(&desc, "v1").await.unwrap_err();
        assert!(matches!(err, ObomError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_tag_with_foreign_digest() {
        let store = MemoryStore::new();
        let desc = describe(b"hello", "text/plain");
        store.push(&desc, b"hello").await.unwrap();

        let other = Digest::from_bytes(b"other").to_string();
        let err = store.tag(&desc, &other).await.unwrap_err();
        assert!(matches!(err, ObomError::DigestMismatch { .. }));

        store.tag(&desc, desc.digest()).await.unwrap();
    }

    #[tokio::test]
    async fn test_resolve_unknown() {
        let store = MemoryStore::new();
        assert!(matches!(
            store.resolve("nope").await.unwrap_err(),
            ObomError::NotFound(_)
        ));
    }

    #[tokio::test]
    async fn test_referrers_indexed_on_push() {
        let store = MemoryStore::new();
        let subject = pack_manifest(&store, "application/spdx+json", PackOptions::default())
            .await
            .unwrap();

        let sig = describe(b"test signature", "application/cose");
        store.push(&sig, b"test signature").await.unwrap();
        let note = describe(b"note", "text/plain");
        store.push(&note, b"note").await.unwrap();

        let a = pack_referrer(&store, &store, "application/cose", vec![sig], &subject)
            .await
            .unwrap();
        let b = pack_referrer(&store, &store, "text/plain", vec![note], &subject)
            .await
            .unwrap();

        let all = store.referrers(&subject, None).await.unwrap();
        let digests: Vec<_> = all.iter().map(|d| d.digest().clone()).collect();
        assert_eq!(digests, vec![a.digest().clone(), b.digest().clone()]);
        assert_eq!(
            all[0].artifact_type(),
            &Some(MediaType::from("application/cose"))
        );

        let filtered = store.referrers(&subject, Some("text/plain")).await.unwrap();
        assert_eq!(filtered.len(), 1);
        assert_eq!(filtered[0].digest(), b.digest());

        // Referrers of a manifest nobody points at.
        assert!(store.referrers(&a, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_clones_share_content() {
        let store = MemoryStore::new();
        let clone = store.clone();
        let desc = describe(b"shared", "text/plain");
        clone.push(&desc, b"shared").await.unwrap();
        assert!(store.exists(&desc).await.unwrap());
    }
}
