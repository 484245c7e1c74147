#[cfg(feature = "sea-orm")]
use sea_orm::prelude::StringLen;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery status of a notification record.
///
/// When the `sea-orm` feature is enabled, this enum can be used directly in
/// SeaORM entities.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, utoipa::ToSchema)]
#[cfg_attr(
    feature = "sea-orm",
    derive(sea_orm::DeriveActiveEnum, sea_orm::EnumIter),
    sea_orm(rs_type = "String", db_type = "String(StringLen::None)")
)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    /// Accepted by intake, waiting for a worker.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "queued"))]
    Queued,
    /// Claimed by a worker, delivery in progress.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "processing"))]
    Processing,
    /// Accepted by the channel provider.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "sent"))]
    Sent,
    /// Delivery attempt failed; the queue may retry.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "failed"))]
    Failed,
    /// Provider reported the message as delivered.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "delivered"))]
    Delivered,
    /// Provider reported the message as bounced.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "bounced"))]
    Bounced,
    /// Provider reported the message as opened by the recipient.
    #[cfg_attr(feature = "sea-orm", sea_orm(string_value = "opened"))]
    Opened,
}

impl NotificationStatus {
    /// Returns true once the worker pipeline is done with the record
    /// (successfully or not).
    pub fn is_terminal(&self) -> bool {
        !self.is_reapable()
    }

    /// Returns true if the reaper may reset this record back to `queued`
    /// when it goes stale.
    pub fn is_reapable(&self) -> bool {
        matches!(self, Self::Queued | Self::Processing)
    }

    /// Returns true if this status is reported by provider webhooks rather
    /// than the worker pipeline.
    pub fn is_webhook_reported(&self) -> bool {
        matches!(self, Self::Delivered | Self::Bounced | Self::Opened)
    }

    /// Whether `next` is a legal successor of `self` in the lifecycle.
    ///
    /// `queued` and `processing` may be reset to `queued` by the reaper.
    /// Webhook statuses overwrite `sent`; a repeated `opened` event is
    /// idempotent.
    pub fn can_transition(&self, next: NotificationStatus) -> bool {
        use NotificationStatus::*;
        matches!(
            (self, next),
            (Queued, Processing | Failed | Queued)
                | (Processing, Sent | Failed | Queued)
                | (Sent, Delivered | Bounced | Opened)
                | (Delivered, Opened)
                | (Failed, Queued)
                | (Opened, Opened)
        )
    }

    /// All possible status values.
    pub const ALL: &'static [NotificationStatus] = &[
        Self::Queued,
        Self::Processing,
        Self::Sent,
        Self::Failed,
        Self::Delivered,
        Self::Bounced,
        Self::Opened,
    ];

    /// Statuses the reaper scans for.
    pub const REAPABLE: &'static [NotificationStatus] = &[Self::Queued, Self::Processing];

    /// Returns the wire representation (snake_case).
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Sent => "sent",
            Self::Failed => "failed",
            Self::Delivered => "delivered",
            Self::Bounced => "bounced",
            Self::Opened => "opened",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Default for NotificationStatus {
    fn default() -> Self {
        Self::Queued
    }
}

/// Error when parsing an invalid status string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseStatusError {
    invalid: String,
}

impl fmt::Display for ParseStatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invalid status '{}'. Valid values: {}",
            self.invalid,
            NotificationStatus::ALL
                .iter()
                .map(|s| s.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        )
    }
}

impl std::error::Error for ParseStatusError {}

impl FromStr for NotificationStatus {
    type Err = ParseStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "queued" => Ok(Self::Queued),
            "processing" => Ok(Self::Processing),
            "sent" => Ok(Self::Sent),
            "failed" => Ok(Self::Failed),
            "delivered" => Ok(Self::Delivered),
            "bounced" => Ok(Self::Bounced),
            "opened" => Ok(Self::Opened),
            _ => Err(ParseStatusError {
                invalid: s.to_string(),
            }),
        }
    }
}
