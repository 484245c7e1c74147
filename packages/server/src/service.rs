use std::sync::Arc;

use tracing::{error, info};

use common::contracts::{Enqueuer, NotificationStore, RecipientRateLimiter};
use common::record::{ListFilter, NewNotification, NotificationRecord};
use common::{NotificationStatus, NotifyError};

use crate::models::notification::{ListResponse, SendRequest, SendResponse};

/// Orchestrates the intake pipeline:
/// validate -> check idempotency -> check rate limit -> create log -> enqueue.
pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    enqueuer: Arc<dyn Enqueuer>,
    rate_limiter: Option<Arc<dyn RecipientRateLimiter>>,
}

impl NotificationService {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        enqueuer: Arc<dyn Enqueuer>,
        rate_limiter: Option<Arc<dyn RecipientRateLimiter>>,
    ) -> Self {
        Self {
            store,
            enqueuer,
            rate_limiter,
        }
    }

    /// Accept a send request: persist a `queued` record and put a send task
    /// on the queue. Returns the provisional acceptance.
    ///
    /// Idempotency runs before the rate limit so legitimate retries are
    /// never rate-limited. The record is created before the enqueue so the
    /// task payload always references a durable row and the reaper can
    /// recover from any post-create crash.
    pub async fn enqueue(&self, req: SendRequest) -> Result<SendResponse, NotifyError> {
        if req.to.trim().is_empty() {
            return Err(NotifyError::validation("recipient is required"));
        }

        // Idempotency: a request with the same key returns the existing
        // result. A lookup failure is logged and ignored so a store blip
        // doesn't block intake.
        if let Some(key) = req.idempotency_key.as_deref().filter(|k| !k.is_empty()) {
            match self.store.get_by_idempotency_key(key).await {
                Err(e) => {
                    error!(key = %key, error = %e, "Idempotency check failed, proceeding without it");
                }
                Ok(Some(existing)) => {
                    info!(
                        idempotency_key = %key,
                        existing_id = %existing.id,
                        existing_status = %existing.status,
                        "Idempotent request, returning existing result"
                    );
                    return Ok(SendResponse {
                        id: existing.id,
                        idempotency_key: existing.idempotency_key,
                        channel: existing.channel,
                        status: existing.status,
                    });
                }
                Ok(None) => {}
            }
        }

        // Per-recipient rate limit. Fail open on limiter errors: a dead
        // limiter store must not take intake down with it.
        if let Some(limiter) = &self.rate_limiter {
            match limiter.allow(&req.to).await {
                Err(e) => {
                    error!(recipient = %req.to, error = %e, "Rate limit check failed, proceeding without limit");
                }
                Ok(false) => {
                    return Err(NotifyError::Validation(format!(
                        "rate limit exceeded for recipient: {}",
                        req.to
                    )));
                }
                Ok(true) => {}
            }
        }

        let record = self
            .store
            .create(NewNotification {
                idempotency_key: req.idempotency_key.clone().filter(|k| !k.is_empty()),
                channel: req.channel.to_string(),
                kind: req.kind.to_string(),
                recipient: req.to.clone(),
                template_data: req.data,
            })
            .await?;

        if let Err(e) = self.enqueuer.enqueue_send(&record.id).await {
            // Best effort; if this also fails the reaper still recovers the
            // record once it goes stale in `queued`.
            let _ = self
                .store
                .update_status(
                    &record.id,
                    NotificationStatus::Failed,
                    None,
                    Some(&format!("failed to enqueue: {e}")),
                )
                .await;
            return Err(e);
        }

        info!(
            id = %record.id,
            channel = %record.channel,
            kind = %record.kind,
            to = %record.recipient,
            "Notification enqueued"
        );

        Ok(SendResponse {
            id: record.id,
            idempotency_key: record.idempotency_key,
            channel: record.channel,
            status: NotificationStatus::Queued,
        })
    }

    pub async fn get_notification(&self, id: &str) -> Result<NotificationRecord, NotifyError> {
        self.store
            .get_by_id(id)
            .await?
            .ok_or_else(|| NotifyError::not_found("notification", id.to_string()))
    }

    pub async fn list_notifications(
        &self,
        filter: ListFilter,
    ) -> Result<ListResponse, NotifyError> {
        let (notifications, total) = self.store.list(&filter).await?;

        Ok(ListResponse {
            notifications,
            total,
            page: filter.page(),
            page_size: filter.page_size(),
        })
    }

    /// Apply a provider-reported delivery status update. An unknown
    /// provider id is a silent success: the store matches no rows and the
    /// provider gets its acknowledgement.
    pub async fn handle_webhook_event(
        &self,
        provider_id: &str,
        status: NotificationStatus,
    ) -> Result<(), NotifyError> {
        if provider_id.is_empty() {
            return Err(NotifyError::validation("provider_id is required"));
        }
        if !status.is_webhook_reported() {
            return Err(NotifyError::Validation(format!(
                "not a provider-reported status: {status}"
            )));
        }

        self.store.update_webhook_status(provider_id, status).await?;

        info!(provider_id = %provider_id, status = %status, "Webhook status updated");
        Ok(())
    }
}
