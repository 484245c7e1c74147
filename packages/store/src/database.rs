use std::time::Duration;

use sea_orm::sea_query::{Index, PostgresQueryBuilder};
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, DbErr, Schema};
use tracing::info;

use crate::entity::notification_log;

pub async fn init_db(db_url: &str) -> Result<DatabaseConnection, DbErr> {
    let mut opt = ConnectOptions::new(db_url.to_owned());

    // Set connection pool options
    opt.max_connections(100)
        .min_connections(5)
        .connect_timeout(Duration::from_secs(8))
        .acquire_timeout(Duration::from_secs(8))
        .idle_timeout(Duration::from_secs(8))
        .max_lifetime(Duration::from_secs(8))
        .sqlx_logging(false);

    let db = Database::connect(opt).await?;
    ensure_schema(&db).await?;

    Ok(db)
}

async fn ensure_schema(db: &DatabaseConnection) -> Result<(), DbErr> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut stmt = schema.create_table_from_entity(notification_log::Entity);
    stmt.if_not_exists();
    db.execute(backend.build(&stmt)).await?;

    Ok(())
}

/// Create the query-path indexes. Failures are logged and skipped so a
/// replica racing another instance at startup doesn't abort.
pub async fn ensure_indexes(db: &DatabaseConnection) -> Result<(), DbErr> {
    // Intake idempotency lookups and list filtering by recipient.
    for (name, column) in [
        ("idx_notification_log_recipient", notification_log::Column::Recipient),
        ("idx_notification_log_status", notification_log::Column::Status),
        ("idx_notification_log_created", notification_log::Column::CreatedAt),
        ("idx_notification_log_provider", notification_log::Column::ProviderId),
    ] {
        let stmt = Index::create()
            .if_not_exists()
            .name(name)
            .table(notification_log::Entity)
            .col(column)
            .to_string(PostgresQueryBuilder);

        match db.execute_unprepared(&stmt).await {
            Ok(_) => info!("Ensured index {name} exists"),
            Err(e) => tracing::warn!("Failed to create index {name}: {e}"),
        }
    }

    // Partial index for the reaper scan:
    // SELECT ... WHERE status IN ('queued','processing') AND updated_at < ?
    // Restricting to non-terminal rows keeps the common empty scan near-free.
    let stmt = "CREATE INDEX IF NOT EXISTS idx_notification_log_stale \
                ON notification_log (status, updated_at) \
                WHERE status IN ('queued', 'processing')";

    match db.execute_unprepared(stmt).await {
        Ok(_) => info!("Ensured index idx_notification_log_stale exists"),
        Err(e) => tracing::warn!("Failed to create index idx_notification_log_stale: {e}"),
    }

    Ok(())
}
