//! Attaching artifacts to a published manifest as OCI referrers.

use obom_core::error::{ObomError, Result};

use super::artifact::load_from_file;
use super::descriptor::Descriptor;
use super::manifest::pack_referrer;
use super::publish::Publisher;
use super::store::MemoryStore;
use super::target::Target;

/// Artifact type → file paths, in the order supplied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AttachmentSet {
    entries: Vec<(String, Vec<String>)>,
}

impl AttachmentSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse `type=path` flags. Repeated types accumulate paths.
    pub fn from_flags(flags: &[String]) -> Result<Self> {
        let mut set = Self::new();
        for flag in flags {
            let (artifact_type, path) = flag
                .split_once('=')
                .ok_or_else(|| ObomError::AttachFormat(flag.clone()))?;
            let (artifact_type, path) = (artifact_type.trim(), path.trim());
            if artifact_type.is_empty() || path.is_empty() {
                return Err(ObomError::AttachFormat(flag.clone()));
            }
            set.add(artifact_type, path);
        }
        Ok(set)
    }

    pub fn add(&mut self, artifact_type: &str, path: &str) {
        match self.entries.iter_mut().find(|(t, _)| t == artifact_type) {
            Some((_, paths)) => paths.push(path.to_string()),
            None => self
                .entries
                .push((artifact_type.to_string(), vec![path.to_string()])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of paths across all artifact types.
    pub fn len(&self) -> usize {
        self.entries.iter().map(|(_, paths)| paths.len()).sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries
            .iter()
            .map(|(t, paths)| (t.as_str(), paths.as_slice()))
    }
}

/// One published attachment.
#[derive(Debug, Clone)]
pub struct AttachOutcome {
    pub artifact_type: String,
    pub path: String,
    pub descriptor: Descriptor,
}

/// Attach every file in `set` to `subject` at `destination`.
///
/// Stops at the first failure; attachments published before it stay
/// published.
pub async fn attach_all<D>(
    set: &AttachmentSet,
    subject: &Descriptor,
    destination: &D,
    publisher: &Publisher,
) -> Result<Vec<AttachOutcome>>
where
    D: Target + ?Sized,
{
    let mut outcomes = Vec::with_capacity(set.len());
    for (artifact_type, paths) in set.iter() {
        for path in paths {
            let descriptor = attach_one(artifact_type, path, subject, destination, publisher)
                .await
                .map_err(|e| ObomError::Attachment {
                    artifact_type: artifact_type.to_string(),
                    path: path.clone(),
                    source: Box::new(e),
                })?;

            tracing::info!(
                artifact_type,
                path = %path,
                digest = %descriptor.digest(),
                subject = %subject.digest(),
                "Attached artifact"
            );
            outcomes.push(AttachOutcome {
                artifact_type: artifact_type.to_string(),
                path: path.clone(),
                descriptor,
            });
        }
    }
    Ok(outcomes)
}

async fn attach_one<D>(
    artifact_type: &str,
    path: &str,
    subject: &Descriptor,
    destination: &D,
    publisher: &Publisher,
) -> Result<Descriptor>
where
    D: Target + ?Sized,
{
    let stage = MemoryStore::new();
    let loaded = load_from_file(path, artifact_type)?;
    stage.push(&loaded.descriptor, &loaded.bytes).await?;

    let manifest = pack_referrer(
        &stage,
        destination,
        artifact_type,
        vec![loaded.descriptor],
        subject,
    )
    .await?;

    // Tag by digest so attachments never compete for a shared tag.
    let tag = manifest.digest().clone();
    stage.tag(&manifest, &tag).await?;
    publisher.publish(&stage, &tag, destination).await
}
