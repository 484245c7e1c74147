use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;
use uuid::Uuid;

use common::contracts::Enqueuer;
use common::task::Task;
use common::NotifyError;

use crate::broker::Mq;

/// [`Enqueuer`] backed by the broker queue. Publishes send-task envelopes
/// onto the notifications queue; the worker process consumes them.
pub struct QueueEnqueuer {
    mq: Arc<Mq>,
    queue_name: String,
}

impl QueueEnqueuer {
    pub fn new(mq: Arc<Mq>, queue_name: impl Into<String>) -> Self {
        Self {
            mq,
            queue_name: queue_name.into(),
        }
    }
}

#[async_trait]
impl Enqueuer for QueueEnqueuer {
    async fn enqueue_send(&self, log_id: &str) -> Result<(), NotifyError> {
        let task = Task::send_notification(log_id, Uuid::new_v4().to_string());

        self.mq
            .publish(&self.queue_name, None, &task, None)
            .await
            .map_err(|e| NotifyError::Queue(e.to_string()))?;

        debug!(log_id = %log_id, queue = %self.queue_name, "Send task enqueued");
        Ok(())
    }
}
