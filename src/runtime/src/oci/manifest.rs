//! OCI image manifests and manifest packing.
//!
//! Packed manifests follow the OCI 1.1 artifact layout: an empty JSON
//! config, an `artifactType`, the caller's layers, and an optional
//! `subject` that turns the manifest into a referrer of another one.

use obom_core::error::{ObomError, Result};
use oci_spec::image::ImageManifestBuilder;
pub use oci_spec::image::ImageManifest;
use oci_spec::OciSpecError;
use olpc_cjson::CanonicalFormatter;
use serde::Serialize;

use super::descriptor::{describe, Annotations, Descriptor, DescriptorExt, MediaType};
use super::target::Target;

const EMPTY_JSON: &[u8] = b"{}";

/// Whether blobs of `media_type` are manifests (and so have children).
pub fn is_manifest(media_type: &MediaType) -> bool {
    *media_type == MediaType::ImageManifest
}

pub(crate) fn spec_error(err: OciSpecError) -> ObomError {
    ObomError::OciError(err.to_string())
}

pub fn parse_manifest(bytes: &[u8]) -> Result<ImageManifest> {
    ImageManifest::from_reader(bytes)
        .map_err(|e| ObomError::OciError(format!("Invalid image manifest: {}", e)))
}

/// Canonical JSON (sorted keys, no whitespace), so equal manifests hash equal.
pub fn manifest_bytes(manifest: &ImageManifest) -> Result<Vec<u8>> {
    let mut body = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut body, CanonicalFormatter::new());
    manifest.serialize(&mut serializer)?;
    Ok(body)
}

/// Blobs a manifest references: config first, then layers in order.
pub fn manifest_children(manifest: &ImageManifest) -> impl Iterator<Item = &Descriptor> {
    std::iter::once(manifest.config()).chain(manifest.layers().iter())
}

/// Artifact type, falling back to the config media type.
pub fn effective_artifact_type(manifest: &ImageManifest) -> MediaType {
    manifest
        .artifact_type()
        .clone()
        .unwrap_or_else(|| manifest.config().media_type().clone())
}

/// Inputs to [`pack_manifest`] besides the store and artifact type.
#[derive(Debug, Clone, Default)]
pub struct PackOptions {
    /// Layer descriptors, in order; each must already be in the store
    pub layers: Vec<Descriptor>,
    /// Manifest-level annotations (the layers keep their own)
    pub annotations: Annotations,
    /// Manifest this one is attached to
    pub subject: Option<Descriptor>,
}

/// Build a manifest over already-staged layers and write it into `store`.
///
/// Returns the manifest descriptor, carrying the artifact type and the
/// manifest annotations. The manifest is not tagged.
pub async fn pack_manifest<S>(
    store: &S,
    artifact_type: &str,
    options: PackOptions,
) -> Result<Descriptor>
where
    S: Target + ?Sized,
{
    if artifact_type.is_empty() {
        return Err(ObomError::OciError(
            "artifact type is required when packing a manifest".to_string(),
        ));
    }

    for layer in &options.layers {
        if !store.exists(layer).await? {
            return Err(ObomError::NotFound(format!(
                "layer {} is not staged",
                layer.digest()
            )));
        }
    }

    let config = describe(EMPTY_JSON, &MediaType::EmptyJSON.to_string());
    store.push(&config, EMPTY_JSON).await?;

    let layer_count = options.layers.len();
    let referrer = options.subject.is_some();
    let annotations = if options.annotations.is_empty() {
        None
    } else {
        Some(options.annotations)
    };

    let mut builder = ImageManifestBuilder::default()
        .schema_version(2u32)
        .media_type(MediaType::ImageManifest)
        .artifact_type(MediaType::from(artifact_type))
        .config(config)
        .layers(options.layers);
    if let Some(subject) = options.subject {
        builder = builder.subject(subject);
    }
    if let Some(annotations) = annotations.clone() {
        builder = builder.annotations(annotations);
    }
    let manifest = builder.build().map_err(spec_error)?;
    let bytes = manifest_bytes(&manifest)?;

    let mut descriptor = describe(&bytes, &MediaType::ImageManifest.to_string());
    descriptor.set_artifact_type(Some(MediaType::from(artifact_type)));
    descriptor.set_annotations(annotations);

    store.push(&descriptor, &bytes).await?;

    tracing::debug!(
        digest = %descriptor.digest(),
        artifact_type,
        layers = layer_count,
        referrer,
        "Packed manifest"
    );

    Ok(descriptor)
}

/// Pack a manifest attached to `subject`.
///
/// `subject` must already exist in `destination`; otherwise nothing is
/// written and `SubjectNotPresent` is returned.
pub async fn pack_referrer<S, D>(
    store: &S,
    destination: &D,
    artifact_type: &str,
    layers: Vec<Descriptor>,
    subject: &Descriptor,
) -> Result<Descriptor>
where
    S: Target + ?Sized,
    D: Target + ?Sized,
{
    if !destination.exists(subject).await? {
        return Err(ObomError::SubjectNotPresent {
            digest: subject.digest().clone(),
        });
    }

    pack_manifest(
        store,
        artifact_type,
        PackOptions {
            layers,
            annotations: Annotations::new(),
            subject: Some(subject.plain()),
        },
    )
    .await
}
