use serde::{Deserialize, Serialize};

use crate::error::NotifyError;

/// Queue the intake process publishes send tasks to and the worker
/// consumes from.
pub const NOTIFICATIONS_QUEUE: &str = "notifications";

/// Task type for sending a notification.
pub const TASK_TYPE_SEND: &str = "notification:send";

/// Task envelope published on the queue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: String,
    pub task_type: String,
    pub payload: serde_json::Value,
}

/// Payload of a `notification:send` task.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTaskPayload {
    pub log_id: String,
}

impl Task {
    /// Build a send task for the given record id.
    pub fn send_notification(log_id: &str, task_id: String) -> Self {
        Self {
            id: task_id,
            task_type: TASK_TYPE_SEND.to_string(),
            payload: serde_json::json!(SendTaskPayload {
                log_id: log_id.to_string(),
            }),
        }
    }

    /// Parse the payload of a send task.
    pub fn parse_send_payload(&self) -> Result<SendTaskPayload, NotifyError> {
        serde_json::from_value(self.payload.clone())
            .map_err(|e| NotifyError::Queue(format!("invalid task payload: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_send_task_roundtrip() {
        let task = Task::send_notification("log-42", "task-1".to_string());
        assert_eq!(task.task_type, TASK_TYPE_SEND);
        assert_eq!(task.payload["log_id"], "log-42");

        let json = serde_json::to_string(&task).unwrap();
        let parsed: Task = serde_json::from_str(&json).unwrap();
        let payload = parsed.parse_send_payload().unwrap();
        assert_eq!(payload.log_id, "log-42");
    }

    #[test]
    fn test_malformed_payload_is_rejected() {
        let task = Task {
            id: "task-1".into(),
            task_type: TASK_TYPE_SEND.into(),
            payload: serde_json::json!({"wrong_field": 1}),
        };
        assert!(matches!(
            task.parse_send_payload(),
            Err(NotifyError::Queue(_))
        ));
    }
}
