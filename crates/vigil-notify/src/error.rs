/// Errors that can occur while delivering a notification.
///
/// These never cross the [`crate::Notifier`] boundary (delivery is
/// best-effort and failures are logged by the implementations), but the
/// webhook internals use them to distinguish transport problems from
/// endpoint rejections.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// The tenant has no webhook URL configured.
    #[error("Notify: no webhook URL configured")]
    NoWebhookUrl,

    /// An HTTP transport error from `reqwest`.
    #[error("Notify: HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered with a non-success status.
    #[error("Notify: webhook returned status={status}, body={body}")]
    Endpoint { status: u16, body: String },
}

/// Convenience `Result` alias for notification operations.
pub type Result<T> = std::result::Result<T, NotifyError>;
