//! Error taxonomy for record writes.

/// Failure modes of the record store's write path.
///
/// `UnsupportedType` and `InvalidRecord` are validation failures and are never
/// retried; `Duplicate` means the identity tuple already exists and the caller
/// should update by key instead. `Database` is the only server-class failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unsupported DNS record type \"{0}\"")]
    UnsupportedType(String),

    #[error("invalid DNS record: {0}")]
    InvalidRecord(String),

    /// Fixed message, deliberately distinct from any validation reason.
    #[error("record already exists")]
    Duplicate,

    #[error("database error: {0}")]
    Database(String),
}

impl StoreError {
    /// Whether this error was caused by the caller's input rather than the
    /// storage layer.
    pub fn is_client_fault(&self) -> bool {
        !matches!(self, Self::Database(_))
    }
}
