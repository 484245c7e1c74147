use thiserror::Error;

use crate::channel::Channel;

/// Domain-level error for the notification pipeline.
///
/// Callers dispatch on the variant, never on the message text. The worker
/// uses [`NotifyError::is_retryable`] to decide whether a failed task goes
/// back on the queue.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("{0}")]
    Validation(String),

    #[error("{resource} with id '{id}' not found")]
    NotFound { resource: &'static str, id: String },

    #[error("{0}")]
    Unauthorized(String),

    #[error("{channel} provider error: {message}")]
    Provider { channel: Channel, message: String },

    #[error("store error: {0}")]
    Store(String),

    #[error("queue error: {0}")]
    Queue(String),

    #[error("template error: {0}")]
    Render(String),

    #[error("rate limiter error: {0}")]
    RateLimit(String),
}

impl NotifyError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn provider(channel: Channel, message: impl Into<String>) -> Self {
        Self::Provider {
            channel,
            message: message.into(),
        }
    }

    /// Whether a task that failed with this error should be retried.
    ///
    /// Bad input stays bad; infrastructure failures may be transient.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) | Self::NotFound { .. } | Self::Unauthorized(_) => false,
            Self::Provider { .. }
            | Self::Store(_)
            | Self::Queue(_)
            | Self::Render(_)
            | Self::RateLimit(_) => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryability_by_kind() {
        assert!(!NotifyError::validation("bad type").is_retryable());
        assert!(!NotifyError::not_found("notification", "abc").is_retryable());
        assert!(NotifyError::provider(Channel::Email, "upstream 500").is_retryable());
        assert!(NotifyError::Store("connection refused".into()).is_retryable());
        assert!(NotifyError::Render("missing template".into()).is_retryable());
    }

    #[test]
    fn test_messages() {
        let err = NotifyError::not_found("notification", "n-1");
        assert_eq!(err.to_string(), "notification with id 'n-1' not found");

        let err = NotifyError::provider(Channel::Email, "boom");
        assert_eq!(err.to_string(), "email provider error: boom");
    }
}
