/// Errors that can occur within the state store and repositories.
///
/// # Examples
///
/// ```rust
/// use vigil_store::error::StoreError;
///
/// let err = StoreError::NotFound {
///     entity: "tenant",
///     id: "tenant-99".to_string(),
/// };
/// assert!(err.to_string().contains("tenant"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A required record was not found.
    #[error("Store: {entity} not found (id={id})")]
    NotFound { entity: &'static str, id: String },

    /// A create collided with an existing record.
    #[error("Store: {entity} already exists (id={id})")]
    AlreadyExists { entity: &'static str, id: String },

    /// The backing store is temporarily unreachable. Callers on the hot
    /// path should treat the message as unhandled and rely on redelivery.
    #[error("Store: backend unavailable: {0}")]
    Unavailable(String),

    /// The store has been closed.
    #[error("Store: closed")]
    Closed,
}

impl StoreError {
    /// True for the not-found signalling variant, which callers routinely
    /// branch on (e.g. resolve-for-unknown-alert is a warn, not a failure).
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::NotFound { .. })
    }
}

/// Convenience `Result` alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
