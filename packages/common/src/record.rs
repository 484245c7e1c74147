use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::status::NotificationStatus;

/// A persisted notification record: one logical send attempt and its
/// observed lifecycle.
///
/// `channel` and `kind` are kept as strings, mirroring the stored columns;
/// the worker re-parses them against the known sets so that rows written by
/// older deployments are revalidated instead of trusted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NotificationRecord {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idempotency_key: Option<String>,
    pub channel: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub recipient: String,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    #[schema(value_type = Object)]
    pub template_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_id: Option<String>,
    pub status: NotificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delivered_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounced_at: Option<DateTime<Utc>>,
}

/// The create subset of a notification record. The store assigns the id,
/// the timestamps, and the initial `queued` status.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub idempotency_key: Option<String>,
    pub channel: String,
    pub kind: String,
    pub recipient: String,
    pub template_data: Map<String, Value>,
}

/// Pagination and filtering options for listing notification records.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListFilter {
    /// 1-based page number. Defaults to 1.
    pub page: Option<u64>,
    /// Items per page, 1-100. Defaults to 20.
    pub page_size: Option<u64>,
    pub status: Option<NotificationStatus>,
    pub recipient: Option<String>,
    pub channel: Option<String>,
}

impl ListFilter {
    pub const DEFAULT_PAGE_SIZE: u64 = 20;
    pub const MAX_PAGE_SIZE: u64 = 100;

    /// Effective page number after applying defaults.
    pub fn page(&self) -> u64 {
        self.page.unwrap_or(1).max(1)
    }

    /// Effective page size after applying defaults and bounds.
    pub fn page_size(&self) -> u64 {
        match self.page_size {
            Some(size) if (1..=Self::MAX_PAGE_SIZE).contains(&size) => size,
            _ => Self::DEFAULT_PAGE_SIZE,
        }
    }

    pub fn offset(&self) -> u64 {
        (self.page() - 1) * self.page_size()
    }
}
