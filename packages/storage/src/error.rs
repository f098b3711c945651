use thiserror::Error;

/// Errors produced by the blob storage subsystem.
///
/// Validation errors (`PayloadTooLarge`, `UnsupportedType`) are raised before
/// any backend call and never leave partial state. Read failures (`NotFound`,
/// `CorruptData`) never trigger deletion of the referencing descriptor.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The payload exceeds the hard upload cap.
    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// The declared content type is not on the allow-list.
    #[error("unsupported content type: {0}")]
    UnsupportedType(String),

    /// A backend or record write failed. The enclosing record mutation is
    /// aborted and any previously attached file stays valid.
    #[error("storage write failed: {0}")]
    StorageWriteFailed(String),

    /// The referenced object or record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Stored data failed to decode.
    #[error("corrupt data: {0}")]
    CorruptData(String),

    #[error("storage IO error: {0}")]
    Io(#[from] std::io::Error),
}
