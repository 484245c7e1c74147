//! Contracts between the notification pipeline and its infrastructure.
//!
//! The domain defines these traits; implementations live in the `store`,
//! `mq`, `server` and `worker` crates. Nothing here depends on a concrete
//! database, queue, or provider SDK.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};

use crate::channel::Channel;
use crate::error::NotifyError;
use crate::kind::NotificationKind;
use crate::record::{ListFilter, NewNotification, NotificationRecord};
use crate::status::NotificationStatus;

/// Durable persistence for notification records.
///
/// Status updates are last-writer-wins; callers take no explicit locks.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Insert a new record with `status = queued` and return it with its
    /// assigned id and timestamps.
    async fn create(&self, new: NewNotification) -> Result<NotificationRecord, NotifyError>;

    async fn get_by_id(&self, id: &str) -> Result<Option<NotificationRecord>, NotifyError>;

    /// Look up a record by idempotency key. `Ok(None)` when no record
    /// carries the key.
    async fn get_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<NotificationRecord>, NotifyError>;

    /// Update the status of a record, stamping `updated_at` and the
    /// status-specific timestamp. `provider_id` and `error_message` are
    /// only written when present.
    async fn update_status(
        &self,
        id: &str,
        status: NotificationStatus,
        provider_id: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), NotifyError>;

    /// Apply a provider-reported status by provider id. Matching no record
    /// is a success: events for out-of-scope messages are acknowledged so
    /// providers do not retry them.
    async fn update_webhook_status(
        &self,
        provider_id: &str,
        status: NotificationStatus,
    ) -> Result<(), NotifyError>;

    /// List records matching the filter, newest first, with the total
    /// match count.
    async fn list(
        &self,
        filter: &ListFilter,
    ) -> Result<(Vec<NotificationRecord>, u64), NotifyError>;

    /// Records stuck in `queued`/`processing` with `updated_at` older than
    /// the threshold, oldest first. Used by the reaper.
    async fn list_stale(
        &self,
        older_than: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<NotificationRecord>, NotifyError>;
}

/// Submits send tasks to the task queue.
#[async_trait]
pub trait Enqueuer: Send + Sync {
    async fn enqueue_send(&self, log_id: &str) -> Result<(), NotifyError>;
}

/// Per-recipient admission control.
#[async_trait]
pub trait RecipientRateLimiter: Send + Sync {
    /// `Ok(false)` is a denial; `Err` means the limiter could not decide
    /// (the intake service fails open on it).
    async fn allow(&self, recipient: &str) -> Result<bool, NotifyError>;
}

/// A rendered message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Subject and bodies produced by the template renderer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedMessage {
    pub subject: String,
    pub html: String,
    pub text: String,
}

/// Renders notification templates.
pub trait TemplateRenderer: Send + Sync {
    fn render(
        &self,
        kind: NotificationKind,
        data: &Map<String, Value>,
    ) -> Result<RenderedMessage, NotifyError>;
}

/// A delivery channel implementation (e.g. Resend for email).
#[async_trait]
pub trait Provider: Send + Sync {
    /// Deliver a rendered message and return the provider's message id.
    async fn send(&self, message: &Message) -> Result<String, NotifyError>;

    /// Which channel this provider handles.
    fn channel(&self) -> Channel;
}
