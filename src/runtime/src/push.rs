//! End-to-end SBOM push: stage, annotate, pack, publish, attach.

use obom_core::error::Result;

use crate::oci::attach::{attach_all, AttachOutcome, AttachmentSet};
use crate::oci::descriptor::{describe, Annotations, Descriptor};
use crate::oci::manifest::{pack_manifest, PackOptions};
use crate::oci::publish::Publisher;
use crate::oci::reference::ImageReference;
use crate::oci::store::MemoryStore;
use crate::oci::target::Target;
use crate::sbom::annotations::{extract, merge};
use crate::sbom::loader::{LoadedSbom, MEDIA_TYPE_SPDX};
use crate::sbom::summary::{summarize, MEDIA_TYPE_SUMMARY};

/// Everything a push needs besides the SBOM and the destination.
#[derive(Debug, Clone)]
pub struct PushRequest {
    /// Where the SBOM goes; its tag (or digest) names the manifest
    pub reference: ImageReference,
    /// Caller-supplied annotations, overriding the extracted ones
    pub annotations: Annotations,
    /// Add the JSON summary as a second layer
    pub push_summary: bool,
    /// Artifacts to attach to the published SBOM
    pub attachments: AttachmentSet,
}

impl PushRequest {
    pub fn new(reference: ImageReference) -> Self {
        Self {
            reference,
            annotations: Annotations::new(),
            push_summary: false,
            attachments: AttachmentSet::new(),
        }
    }
}

/// Published SBOM manifest and attachment manifests.
#[derive(Debug, Clone)]
pub struct PushOutcome {
    pub sbom: Descriptor,
    pub attachments: Vec<AttachOutcome>,
}

/// Stage `loaded` as an SBOM artifact and publish it to `destination`,
/// then attach every artifact in the request to it.
///
/// A fresh staging store is used per call and dropped on return.
pub async fn push_sbom<D>(
    loaded: &LoadedSbom,
    request: &PushRequest,
    destination: &D,
    publisher: &Publisher,
) -> Result<PushOutcome>
where
    D: Target + ?Sized,
{
    let stage = MemoryStore::new();
    stage.push(&loaded.descriptor, &loaded.bytes).await?;
    let mut layers = vec![loaded.descriptor.clone()];

    if request.push_summary {
        let summary = serde_json::to_vec(&summarize(&loaded.sbom.document))?;
        let descriptor = describe(&summary, MEDIA_TYPE_SUMMARY);
        stage.push(&descriptor, &summary).await?;
        layers.push(descriptor);
    }

    let annotations = merge(extract(&loaded.sbom), request.annotations.clone());
    let manifest = pack_manifest(
        &stage,
        MEDIA_TYPE_SPDX,
        PackOptions {
            layers,
            annotations,
            subject: None,
        },
    )
    .await?;

    let tag = request.reference.tag_or_default();
    stage.tag(&manifest, &tag).await?;

    tracing::info!(
        reference = %request.reference,
        tag = %tag,
        digest = %manifest.digest(),
        summary = request.push_summary,
        "Staged SBOM"
    );

    let sbom = publisher.publish(&stage, &tag, destination).await?;

    let attachments = if request.attachments.is_empty() {
        Vec::new()
    } else {
        tracing::info!(
            count = request.attachments.len(),
            subject = %sbom.digest(),
            "Attaching artifacts"
        );
        attach_all(&request.attachments, &sbom, destination, publisher).await?
    };

    Ok(PushOutcome { sbom, attachments })
}
