use common::record::NotificationRecord;
use common::NotificationStatus;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One notification record: a single logical send attempt and its observed
/// delivery lifecycle.
///
/// `channel` and `type` are stored as plain strings so the worker can
/// revalidate rows written by older deployments; `status` uses the shared
/// active enum.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "notification_log")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Caller-supplied dedup key. NULL when the caller sent none.
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,

    pub channel: String,
    #[sea_orm(column_name = "type")]
    pub kind: String,
    pub recipient: String,

    /// Renderer input, stored as a JSON object.
    #[sea_orm(column_type = "JsonBinary")]
    pub template_data: Json,

    /// Message id returned by the channel provider; set once sent.
    pub provider_id: Option<String>,

    pub status: NotificationStatus,

    /// Detail of the last failure. Only set when a step failed.
    #[sea_orm(column_type = "Text", nullable)]
    pub error_message: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
    pub sent_at: Option<DateTimeUtc>,
    pub delivered_at: Option<DateTimeUtc>,
    pub opened_at: Option<DateTimeUtc>,
    pub bounced_at: Option<DateTimeUtc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

impl From<Model> for NotificationRecord {
    fn from(model: Model) -> Self {
        let template_data = match model.template_data {
            serde_json::Value::Object(map) => map,
            _ => serde_json::Map::new(),
        };

        NotificationRecord {
            id: model.id.to_string(),
            idempotency_key: model.idempotency_key,
            channel: model.channel,
            kind: model.kind,
            recipient: model.recipient,
            template_data,
            provider_id: model.provider_id,
            status: model.status,
            error_message: model.error_message,
            created_at: model.created_at,
            updated_at: model.updated_at,
            sent_at: model.sent_at,
            delivered_at: model.delivered_at,
            opened_at: model.opened_at,
            bounced_at: model.bounced_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_model_to_record_conversion() {
        let now = Utc::now();
        let id = Uuid::new_v4();
        let model = Model {
            id,
            idempotency_key: Some("k1".into()),
            channel: "email".into(),
            kind: "confirm_signup".into(),
            recipient: "a@b.com".into(),
            template_data: serde_json::json!({"ConfirmationURL": "https://x/y"}),
            provider_id: None,
            status: NotificationStatus::Queued,
            error_message: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
            delivered_at: None,
            opened_at: None,
            bounced_at: None,
        };

        let record = NotificationRecord::from(model);
        assert_eq!(record.id, id.to_string());
        assert_eq!(record.kind, "confirm_signup");
        assert_eq!(
            record.template_data.get("ConfirmationURL").unwrap(),
            "https://x/y"
        );
    }

    #[test]
    fn test_non_object_template_data_becomes_empty_map() {
        let now = Utc::now();
        let model = Model {
            id: Uuid::new_v4(),
            idempotency_key: None,
            channel: "email".into(),
            kind: "magic_link".into(),
            recipient: "a@b.com".into(),
            template_data: serde_json::Value::Null,
            provider_id: None,
            status: NotificationStatus::Queued,
            error_message: None,
            created_at: now,
            updated_at: now,
            sent_at: None,
            delivered_at: None,
            opened_at: None,
            bounced_at: None,
        };

        let record = NotificationRecord::from(model);
        assert!(record.template_data.is_empty());
    }
}
