//! Extended graph copy between content stores.
//!
//! Copies a manifest, every blob it references and every referrer manifest
//! attached to it (transitively) from a source store into a destination.
//! Children are written before their parents, so a destination never holds
//! a manifest whose blobs are missing.

use std::collections::{HashSet, VecDeque};

use obom_core::error::Result;

use super::descriptor::Descriptor;
use super::manifest::{is_manifest, manifest_children, parse_manifest};
use super::target::{ReferrerLister, Target};

/// Copy the graph rooted at `src_ref` in `src` to `dst`, tagged `dst_ref`.
///
/// Returns the root manifest descriptor.
pub async fn extended_copy<S, D>(src: &S, src_ref: &str, dst: &D, dst_ref: &str) -> Result<Descriptor>
where
    S: Target + ReferrerLister + ?Sized,
    D: Target + ?Sized,
{
    let root = src.resolve(src_ref).await?;
    copy_graph(src, dst, &root).await?;
    dst.tag(&root, dst_ref).await?;

    let mut visited: HashSet<String> = HashSet::from([root.digest().clone()]);
    let mut pending = VecDeque::from([root.clone()]);
    while let Some(subject) = pending.pop_front() {
        for referrer in src.referrers(&subject, None).await? {
            if visited.insert(referrer.digest().clone()) {
                tracing::debug!(
                    subject = %subject.digest(),
                    referrer = %referrer.digest(),
                    "Copying referrer"
                );
                copy_graph(src, dst, &referrer).await?;
                pending.push_back(referrer);
            }
        }
    }

    Ok(root)
}

/// Copy one node and, for manifests, its children first.
async fn copy_graph<S, D>(src: &S, dst: &D, node: &Descriptor) -> Result<()>
where
    S: Target + ?Sized,
    D: Target + ?Sized,
{
    if dst.exists(node).await? {
        tracing::debug!(digest = %node.digest(), "Skipping existing content");
        return Ok(());
    }

    let content = src.fetch(node).await?;
    if is_manifest(node.media_type()) {
        let manifest = parse_manifest(&content)?;
        for child in manifest_children(&manifest) {
            copy_blob(src, dst, child).await?;
        }
    }

    dst.push(node, &content).await?;
    tracing::debug!(digest = %node.digest(), size = node.size(), "Copied content");
    Ok(())
}

async fn copy_blob<S, D>(src: &S, dst: &D, blob: &Descriptor) -> Result<()>
where
    S: Target + ?Sized,
    D: Target + ?Sized,
{
    if dst.exists(blob).await? {
        tracing::debug!(digest = %blob.digest(), "Skipping existing blob");
        return Ok(());
    }
    let content = src.fetch(blob).await?;
    dst.push(blob, &content).await?;
    tracing::debug!(digest = %blob.digest(), size = blob.size(), "Copied blob");
    Ok(())
}
