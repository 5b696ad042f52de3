//! obom CLI - push SPDX SBOMs to OCI registries.

pub mod commands;
pub mod output;
