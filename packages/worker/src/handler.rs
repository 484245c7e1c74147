use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{error, info};

use common::contracts::{Message, NotificationStore, Provider, TemplateRenderer};
use common::{Channel, NotificationKind, NotificationStatus, NotifyError};

/// Processes send tasks from the queue: fetch the record, render the
/// template, deliver via the matching channel provider, finalize the
/// status.
pub struct NotificationWorker {
    store: Arc<dyn NotificationStore>,
    renderer: Arc<dyn TemplateRenderer>,
    providers: HashMap<Channel, Arc<dyn Provider>>,
}

impl NotificationWorker {
    pub fn new(
        store: Arc<dyn NotificationStore>,
        renderer: Arc<dyn TemplateRenderer>,
        providers: Vec<Arc<dyn Provider>>,
    ) -> Self {
        let providers = providers.into_iter().map(|p| (p.channel(), p)).collect();
        Self {
            store,
            renderer,
            providers,
        }
    }

    /// Handle one send task. The returned error's kind decides whether the
    /// queue retries: validation and not-found are final, everything else
    /// may be transient.
    pub async fn process_task(&self, log_id: &str) -> Result<(), NotifyError> {
        let start = Instant::now();

        let record = self.store.get_by_id(log_id).await?;

        let Some(record) = record else {
            error!(log_id = %log_id, "Notification record not found");
            return Err(NotifyError::not_found("notification", log_id.to_string()));
        };

        // Best effort; a store blip here must not abort the delivery.
        if let Err(e) = self
            .store
            .update_status(log_id, NotificationStatus::Processing, None, None)
            .await
        {
            error!(log_id = %log_id, error = %e, "Failed to update status to processing");
        }

        // Revalidate the persisted type and channel; rows written by older
        // deployments may carry values we no longer recognize.
        let kind = match record.kind.parse::<NotificationKind>() {
            Ok(kind) => kind,
            Err(e) => {
                let msg = e.to_string();
                let _ = self
                    .store
                    .update_status(log_id, NotificationStatus::Failed, None, Some(&msg))
                    .await;
                return Err(NotifyError::Validation(msg));
            }
        };

        let provider = match record.channel.parse::<Channel>() {
            Ok(channel) => match self.providers.get(&channel) {
                Some(provider) => provider,
                None => {
                    let msg = format!("unsupported channel: {channel}");
                    let _ = self
                        .store
                        .update_status(log_id, NotificationStatus::Failed, None, Some(&msg))
                        .await;
                    return Err(NotifyError::Validation(msg));
                }
            },
            Err(e) => {
                let msg = e.to_string();
                let _ = self
                    .store
                    .update_status(log_id, NotificationStatus::Failed, None, Some(&msg))
                    .await;
                return Err(NotifyError::Validation(msg));
            }
        };

        let rendered = match self.renderer.render(kind, &record.template_data) {
            Ok(rendered) => rendered,
            Err(e) => {
                let msg = format!("rendering template: {e}");
                let _ = self
                    .store
                    .update_status(log_id, NotificationStatus::Failed, None, Some(&msg))
                    .await;
                return Err(NotifyError::Render(format!(
                    "rendering template {kind}: {e}"
                )));
            }
        };

        let message = Message {
            to: record.recipient.clone(),
            subject: rendered.subject,
            html: rendered.html,
            text: rendered.text,
        };

        let provider_id = match provider.send(&message).await {
            Ok(provider_id) => provider_id,
            Err(e) => {
                let detail = match &e {
                    NotifyError::Provider { message, .. } => message.clone(),
                    other => other.to_string(),
                };
                let msg = format!("provider error: {detail}");
                let _ = self
                    .store
                    .update_status(log_id, NotificationStatus::Failed, None, Some(&msg))
                    .await;

                error!(
                    log_id = %log_id,
                    channel = %record.channel,
                    kind = %kind,
                    to = %record.recipient,
                    error = %e,
                    duration = ?start.elapsed(),
                    "Notification delivery failed"
                );
                return Err(e);
            }
        };

        if let Err(e) = self
            .store
            .update_status(log_id, NotificationStatus::Sent, Some(&provider_id), None)
            .await
        {
            error!(log_id = %log_id, error = %e, "Failed to update status to sent");
        }

        info!(
            log_id = %log_id,
            channel = %record.channel,
            kind = %kind,
            to = %record.recipient,
            provider_id = %provider_id,
            duration = ?start.elapsed(),
            "Notification sent"
        );

        Ok(())
    }
}
