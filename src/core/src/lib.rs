//! obom core - shared error, configuration and version types.
//!
//! Every other obom crate reports failures through [`ObomError`] and
//! receives its registry settings as a [`RegistryConfig`] value.

pub mod config;
pub mod error;

pub use config::{LogLevel, RegistryConfig, DEFAULT_USER_AGENT};
pub use error::{ObomError, Result};

/// obom version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
