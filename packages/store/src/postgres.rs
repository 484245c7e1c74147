use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, NotSet, Order, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use uuid::Uuid;

use common::contracts::NotificationStore;
use common::record::{ListFilter, NewNotification, NotificationRecord};
use common::{NotificationStatus, NotifyError};

use crate::entity::notification_log;

/// Postgres-backed [`NotificationStore`].
///
/// All status updates are last-writer-wins single-row writes; concurrency
/// control is the database's row lock, never an application lock.
pub struct PostgresStore {
    db: DatabaseConnection,
}

impl PostgresStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn map_db_err(e: sea_orm::DbErr) -> NotifyError {
    if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
        NotifyError::Store(format!("duplicate idempotency key: {e}"))
    } else {
        NotifyError::Store(e.to_string())
    }
}

/// Which event timestamp a status transition stamps.
fn event_timestamp_column(status: NotificationStatus) -> Option<notification_log::Column> {
    match status {
        NotificationStatus::Sent => Some(notification_log::Column::SentAt),
        NotificationStatus::Delivered => Some(notification_log::Column::DeliveredAt),
        NotificationStatus::Opened => Some(notification_log::Column::OpenedAt),
        NotificationStatus::Bounced => Some(notification_log::Column::BouncedAt),
        _ => None,
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn create(&self, new: NewNotification) -> Result<NotificationRecord, NotifyError> {
        let now = Utc::now();

        let model = notification_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            idempotency_key: Set(new.idempotency_key.filter(|k| !k.is_empty())),
            channel: Set(new.channel),
            kind: Set(new.kind),
            recipient: Set(new.recipient),
            template_data: Set(serde_json::Value::Object(new.template_data)),
            provider_id: Set(None),
            status: Set(NotificationStatus::Queued),
            error_message: Set(None),
            created_at: Set(now),
            updated_at: Set(now),
            sent_at: Set(None),
            delivered_at: Set(None),
            opened_at: Set(None),
            bounced_at: Set(None),
        };

        let inserted = model.insert(&self.db).await.map_err(map_db_err)?;
        Ok(inserted.into())
    }

    async fn get_by_id(&self, id: &str) -> Result<Option<NotificationRecord>, NotifyError> {
        // An unparseable id cannot match any row.
        let Ok(uuid) = Uuid::parse_str(id) else {
            return Ok(None);
        };

        let model = notification_log::Entity::find_by_id(uuid)
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.map(Into::into))
    }

    async fn get_by_idempotency_key(
        &self,
        key: &str,
    ) -> Result<Option<NotificationRecord>, NotifyError> {
        let model = notification_log::Entity::find()
            .filter(notification_log::Column::IdempotencyKey.eq(key))
            .one(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(model.map(Into::into))
    }

    async fn update_status(
        &self,
        id: &str,
        status: NotificationStatus,
        provider_id: Option<&str>,
        error_message: Option<&str>,
    ) -> Result<(), NotifyError> {
        let uuid = Uuid::parse_str(id)
            .map_err(|_| NotifyError::not_found("notification", id.to_string()))?;
        let now = Utc::now();

        let mut active = notification_log::ActiveModel {
            id: Set(uuid),
            status: Set(status),
            updated_at: Set(now),
            ..Default::default()
        };

        if let Some(provider_id) = provider_id {
            active.provider_id = Set(Some(provider_id.to_string()));
        }

        active.error_message = match error_message {
            Some(msg) => Set(Some(msg.to_string())),
            // A reaper reset back to `queued` wipes the stale failure detail.
            None if status == NotificationStatus::Queued => Set(None),
            None => NotSet,
        };

        if status == NotificationStatus::Sent {
            active.sent_at = Set(Some(now));
        }

        active.update(&self.db).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn update_webhook_status(
        &self,
        provider_id: &str,
        status: NotificationStatus,
    ) -> Result<(), NotifyError> {
        let now = Utc::now();

        let mut update = notification_log::Entity::update_many()
            .col_expr(notification_log::Column::Status, Expr::value(status))
            .col_expr(notification_log::Column::UpdatedAt, Expr::value(now))
            .filter(notification_log::Column::ProviderId.eq(provider_id));

        if let Some(column) = event_timestamp_column(status) {
            update = update.col_expr(column, Expr::value(Some(now)));
        }

        // Zero matched rows is fine: the event belongs to a message we
        // don't track, and the provider must not be asked to retry it.
        update.exec(&self.db).await.map_err(map_db_err)?;
        Ok(())
    }

    async fn list(
        &self,
        filter: &ListFilter,
    ) -> Result<(Vec<NotificationRecord>, u64), NotifyError> {
        let mut select = notification_log::Entity::find();

        if let Some(status) = filter.status {
            select = select.filter(notification_log::Column::Status.eq(status));
        }
        if let Some(ref recipient) = filter.recipient {
            select = select.filter(notification_log::Column::Recipient.eq(recipient.as_str()));
        }
        if let Some(ref channel) = filter.channel {
            select = select.filter(notification_log::Column::Channel.eq(channel.as_str()));
        }

        let total = select.clone().count(&self.db).await.map_err(map_db_err)?;

        let rows = select
            .order_by(notification_log::Column::CreatedAt, Order::Desc)
            .offset(Some(filter.offset()))
            .limit(Some(filter.page_size()))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok((rows.into_iter().map(Into::into).collect(), total))
    }

    async fn list_stale(
        &self,
        older_than: DateTime<Utc>,
        limit: u64,
    ) -> Result<Vec<NotificationRecord>, NotifyError> {
        let rows = notification_log::Entity::find()
            .filter(
                notification_log::Column::Status
                    .is_in(NotificationStatus::REAPABLE.iter().copied()),
            )
            .filter(notification_log::Column::UpdatedAt.lt(older_than))
            .order_by_asc(notification_log::Column::UpdatedAt)
            .limit(Some(limit))
            .all(&self.db)
            .await
            .map_err(map_db_err)?;

        Ok(rows.into_iter().map(Into::into).collect())
    }
}
