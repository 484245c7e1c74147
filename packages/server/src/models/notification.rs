use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use common::record::NotificationRecord;
use common::{Channel, NotificationKind, NotificationStatus};

/// Request payload for POST /api/v1/send.
///
/// `channel` and `type` bind as domain enums, so unrecognized values are
/// rejected with a 400 before the service runs.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct SendRequest {
    pub channel: Channel,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub to: String,
    /// Variables handed to the template renderer. A reserved `Subject` key
    /// overrides the default subject line.
    #[serde(default)]
    #[schema(value_type = Object)]
    pub data: Map<String, Value>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

/// Provisional acceptance returned by POST /api/v1/send.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct SendResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub channel: String,
    pub status: NotificationStatus,
}

/// Paginated list of notification records.
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct ListResponse {
    pub notifications: Vec<NotificationRecord>,
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

/// Resend webhook event envelope.
///
/// Only the event type and the provider message id matter; the rest of the
/// payload is ignored.
#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResendWebhookEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub data: ResendWebhookData,
}

#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct ResendWebhookData {
    #[serde(default)]
    pub email_id: String,
}

impl ResendWebhookEvent {
    /// Map a Resend event type to a notification status. `None` means the
    /// event is acknowledged but ignored.
    pub fn status(&self) -> Option<NotificationStatus> {
        match self.event_type.as_str() {
            "email.delivered" => Some(NotificationStatus::Delivered),
            "email.bounced" => Some(NotificationStatus::Bounced),
            "email.opened" => Some(NotificationStatus::Opened),
            _ => None,
        }
    }
}
