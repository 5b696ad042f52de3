use std::path::PathBuf;

use thiserror::Error;

/// obom error types
#[derive(Error, Debug)]
pub enum ObomError {
    /// Registry reference could not be parsed
    #[error("Invalid reference: {0}")]
    InvalidReference(String),

    /// `--annotation` value without a `key=value` shape
    #[error("missing key in `--annotation` flag: {0}")]
    AnnotationFormat(String),

    /// The same annotation key was supplied twice
    #[error("duplicate annotation key: {0}")]
    AnnotationDuplicate(String),

    /// `--attach` value without a `type=path` shape
    #[error("missing key in `--attach` flag: {0}")]
    AttachFormat(String),

    /// Artifact file could not be opened or read
    #[error("error loading artifact from file {}: {source}", .path.display())]
    ArtifactLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// SPDX document failed structural parsing
    #[error("SPDX parse error: {0}")]
    SpdxParse(String),

    /// The raw document carries no `spdxVersion` string
    #[error("SPDX parse error: document has no spdxVersion field")]
    MissingSpdxVersion,

    /// Referrer subject is absent from the destination store
    #[error("subject not present: {digest}")]
    SubjectNotPresent { digest: String },

    /// Pushed bytes do not hash to the declared digest
    #[error("digest mismatch: expected {expected}, got {actual}")]
    DigestMismatch { expected: String, actual: String },

    /// Pushed bytes do not have the declared size
    #[error("size mismatch for {digest}: expected {expected} bytes, got {actual}")]
    SizeMismatch {
        digest: String,
        expected: i64,
        actual: i64,
    },

    /// Malformed or unsupported content digest
    #[error("Invalid digest: {0}")]
    InvalidDigest(String),

    /// Content or tag missing from a store
    #[error("not found: {0}")]
    NotFound(String),

    /// OCI manifest or packing error
    #[error("OCI error: {0}")]
    OciError(String),

    /// Container registry error
    #[error("Registry error: {registry} - {message}")]
    RegistryError { registry: String, message: String },

    /// Credential lookup failed
    #[error("Credential error: {0}")]
    CredentialError(String),

    /// A single attachment failed; names the artifact being processed
    #[error("error attaching artifact {path} ({artifact_type}): {source}")]
    Attachment {
        artifact_type: String,
        path: String,
        #[source]
        source: Box<ObomError>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for ObomError {
    fn from(err: serde_json::Error) -> Self {
        ObomError::SerializationError(err.to_string())
    }
}

/// Result type alias for obom operations
pub type Result<T> = std::result::Result<T, ObomError>;
