//! Registry reference parsing.
//!
//! Parses references like `ghcr.io/org/sbom:v1` or
//! `localhost:5000/sbom@sha256:...` into structured components.
//! Unlike image pulls there is no default registry: the host is required.

use obom_core::error::{ObomError, Result};

use super::digest::Digest;

/// Tag used when a reference names neither a tag nor a digest.
pub const DEFAULT_TAG: &str = "latest";

/// Parsed registry reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    /// Registry host, with port if any (e.g., "ghcr.io", "localhost:5000")
    pub registry: String,
    /// Repository path (e.g., "org/sbom")
    pub repository: String,
    /// Tag (e.g., "v1")
    pub tag: Option<String>,
    /// Digest (e.g., "sha256:abc123...")
    pub digest: Option<Digest>,
}

impl ImageReference {
    /// Parse a reference string.
    ///
    /// Supports formats:
    /// - `ghcr.io/org/sbom` → no tag; resolves to `latest`
    /// - `ghcr.io/org/sbom:v1`
    /// - `localhost:5000/sbom@sha256:abc...`
    /// - `ghcr.io/org/sbom:v1@sha256:abc...` → the digest wins
    pub fn parse(reference: &str) -> Result<Self> {
        let reference = reference.trim();
        if reference.is_empty() {
            return Err(ObomError::InvalidReference(
                "Empty reference".to_string(),
            ));
        }

        // Split off digest first (@ separator)
        let (name_tag, digest) = match reference.rsplit_once('@') {
            Some((name_tag, digest)) => {
                let digest = Digest::parse(digest).map_err(|e| {
                    ObomError::InvalidReference(format!("'{}': {}", reference, e))
                })?;
                (name_tag, Some(digest))
            }
            None => (reference, None),
        };

        let (registry, path) = name_tag.split_once('/').ok_or_else(|| {
            ObomError::InvalidReference(format!(
                "'{}': expected host[:port]/repository[:tag|@digest]",
                reference
            ))
        })?;

        if !Self::looks_like_host(registry) {
            return Err(ObomError::InvalidReference(format!(
                "'{}': missing registry host",
                reference
            )));
        }

        // The port lives in the host, so any colon left in the path starts the tag.
        let (repository, tag) = match path.rsplit_once(':') {
            Some((repository, tag)) => (repository, Some(tag)),
            None => (path, None),
        };

        Self::validate_repository(reference, repository)?;
        if let Some(tag) = tag {
            Self::validate_tag(reference, tag)?;
        }

        Ok(ImageReference {
            registry: registry.to_string(),
            repository: repository.to_string(),
            tag: tag.map(str::to_string),
            digest,
        })
    }

    /// Whether a first path component names a registry host.
    fn looks_like_host(component: &str) -> bool {
        component.contains('.') || component.contains(':') || component == "localhost"
    }

    fn validate_repository(reference: &str, repository: &str) -> Result<()> {
        if repository.is_empty() {
            return Err(ObomError::InvalidReference(format!(
                "Empty repository in reference '{}'",
                reference
            )));
        }
        let valid = repository.split('/').all(|component| {
            !component.is_empty()
                && component
                    .chars()
                    .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || "._-".contains(c))
        });
        if !valid {
            return Err(ObomError::InvalidReference(format!(
                "'{}': invalid repository name '{}'",
                reference, repository
            )));
        }
        Ok(())
    }

    fn validate_tag(reference: &str, tag: &str) -> Result<()> {
        let mut chars = tag.chars();
        let valid = tag.len() <= 128
            && chars
                .next()
                .is_some_and(|c| c.is_ascii_alphanumeric() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || "_.-".contains(c));
        if !valid {
            return Err(ObomError::InvalidReference(format!(
                "'{}': invalid tag '{}'",
                reference, tag
            )));
        }
        Ok(())
    }

    /// The explicit digest (preferred) or tag, if any.
    pub fn reference(&self) -> Option<String> {
        self.digest
            .as_ref()
            .map(Digest::to_string)
            .or_else(|| self.tag.clone())
    }

    /// [`reference`](Self::reference), defaulting to `latest`.
    pub fn tag_or_default(&self) -> String {
        self.reference().unwrap_or_else(|| DEFAULT_TAG.to_string())
    }

    /// Whether the registry is reached over plain HTTP.
    pub fn is_plain_http(&self) -> bool {
        obom_core::config::RegistryConfig::default().is_plain_http(&self.registry)
    }

    /// `registry/repository` without tag or digest.
    pub fn repository_reference(&self) -> String {
        format!("{}/{}", self.registry, self.repository)
    }

    /// Get the full reference string.
    pub fn full_reference(&self) -> String {
        let mut s = self.repository_reference();
        if let Some(ref tag) = self.tag {
            s.push(':');
            s.push_str(tag);
        }
        if let Some(ref digest) = self.digest {
            s.push('@');
            s.push_str(&digest.to_string());
        }
        s
    }
}

impl std::fmt::Display for ImageReference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.full_reference())
    }
}

impl std::str::FromStr for ImageReference {
    type Err = ObomError;

    fn from_str(s: &str) -> Result<Self> {
        ImageReference::parse(s)
    }
}
