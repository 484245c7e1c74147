use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use common::contracts::{Enqueuer, NotificationStore, Provider};
use common::retry::{RetryDecision, RetryLedger, RetryPolicy};
use common::task::{Task, TASK_TYPE_SEND};
use mq::{BroccoliError, BrokerMessage, QueueEnqueuer};
use store::PostgresStore;
use worker::providers::ResendProvider;
use worker::{NotificationWorker, Reaper, ReaperConfig, TemplateEngine, WorkerAppConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_target(false).init();

    let config = WorkerAppConfig::load().context("Failed to load config")?;
    info!("Worker configuration loaded");

    let renderer = Arc::new(TemplateEngine::new().context("Failed to initialize template engine")?);
    info!("Template engine initialized");

    if config.email.provider != "resend" {
        anyhow::bail!("unsupported email provider: {}", config.email.provider);
    }
    let email_provider: Arc<dyn Provider> = Arc::new(ResendProvider::new(
        &config.email.api_key,
        &config.email.from_address,
        &config.email.from_name,
    )?);

    let db = store::init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    store::ensure_indexes(&db).await?;
    let notification_store: Arc<dyn NotificationStore> = Arc::new(PostgresStore::new(db));
    info!("Notification store initialized");

    let notification_worker = Arc::new(NotificationWorker::new(
        notification_store.clone(),
        renderer,
        vec![email_provider],
    ));

    let broker = Arc::new(
        mq::connect(&config.mq)
            .await
            .context("Failed to initialize MQ")?,
    );
    info!(
        queue_name = %config.mq.queue_name,
        concurrency = config.queue.concurrency,
        max_retry = config.queue.max_retry,
        "MQ connected"
    );

    // The reaper re-enqueues through the same path the intake uses.
    let enqueuer: Arc<dyn Enqueuer> = Arc::new(QueueEnqueuer::new(
        broker.clone(),
        config.mq.queue_name.clone(),
    ));

    let retry_policy = RetryPolicy::new(
        config.queue.retry_delay_secs,
        config.queue.retry_max_delay_secs,
    );
    let retry_ledger = Arc::new(Mutex::new(RetryLedger::new(
        config.queue.max_retry,
        retry_policy,
    )));

    // Evict ledger entries for tasks that vanished mid-retry.
    let eviction_ledger = retry_ledger.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(Duration::from_secs(600));
        loop {
            tick.tick().await;
            let evicted = eviction_ledger
                .lock()
                .await
                .evict_idle(Duration::from_secs(3600));
            if evicted > 0 {
                info!(evicted, "Evicted idle retry ledger entries");
            }
        }
    });

    let reaper_token = CancellationToken::new();
    let reaper = Reaper::new(
        notification_store,
        enqueuer,
        ReaperConfig {
            interval: Duration::from_secs(config.reaper.interval_secs),
            stale_threshold: Duration::from_secs(config.reaper.stale_threshold_secs),
            batch_size: config.reaper.batch_size,
        },
    );
    let reaper_handle = tokio::spawn(reaper.run(reaper_token.clone()));

    let queue_name = config.mq.queue_name.clone();
    let concurrency = config.queue.concurrency;

    let broker_for_consumer = broker.clone();
    let mut consumer = tokio::spawn(async move {
        let broker_for_handler = broker_for_consumer.clone();
        let handler_queue = queue_name.clone();
        broker_for_consumer
            .process_messages(
                &queue_name,
                Some(concurrency),
                None,
                move |message: BrokerMessage<Task>| {
                    let worker = notification_worker.clone();
                    let broker = broker_for_handler.clone();
                    let ledger = retry_ledger.clone();
                    let queue_name = handler_queue.clone();
                    async move {
                        process_message(message, worker, broker, queue_name, ledger).await
                    }
                },
            )
            .await
    });

    tokio::select! {
        result = &mut consumer => {
            match result {
                Ok(Ok(())) => info!("Consumer stopped"),
                Ok(Err(e)) => error!(error = %e, "Worker stopped unexpectedly"),
                Err(e) => error!(error = %e, "Consumer task failed"),
            }
            reaper_token.cancel();
            let _ = reaper_handle.await;
        }
        _ = shutdown_signal() => {
            info!("Shutting down worker");
            // Reaper first, then the consumer: anything it re-enqueued is
            // either picked up within the grace window or recovered by the
            // next worker's reaper.
            reaper_token.cancel();
            let _ = reaper_handle.await;
            if tokio::time::timeout(Duration::from_secs(10), &mut consumer).await.is_err() {
                consumer.abort();
            }
        }
    }

    info!("Worker exited gracefully");
    Ok(())
}

/// Handle one queue dispatch. Always acks the broker message; retries are
/// scheduled by re-publishing after a backoff so a poisoned task can't
/// wedge the queue.
async fn process_message(
    message: BrokerMessage<Task>,
    worker: Arc<NotificationWorker>,
    broker: Arc<mq::Mq>,
    queue_name: String,
    ledger: Arc<Mutex<RetryLedger>>,
) -> Result<(), BroccoliError> {
    let task = message.payload;

    if task.task_type != TASK_TYPE_SEND {
        warn!(task_type = %task.task_type, "Discarding unknown task type");
        return Ok(());
    }

    let payload = match task.parse_send_payload() {
        Ok(payload) => payload,
        Err(e) => {
            error!(error = %e, "Discarding malformed task payload");
            return Ok(());
        }
    };
    let log_id = payload.log_id;

    info!(log_id = %log_id, "Received send task");

    match worker.process_task(&log_id).await {
        Ok(()) => {
            ledger.lock().await.forget(&log_id);
        }
        Err(e) if !e.is_retryable() => {
            error!(log_id = %log_id, error = %e, "Send task failed permanently");
            ledger.lock().await.forget(&log_id);
        }
        Err(e) => match ledger.lock().await.note_failure(&log_id) {
            RetryDecision::Retry { attempt, delay } => {
                warn!(
                    log_id = %log_id,
                    attempt,
                    delay_secs = delay.as_secs(),
                    error = %e,
                    "Send task failed, scheduling retry"
                );
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    if let Err(e) = broker.publish(&queue_name, None, &task, None).await {
                        // The reaper recovers the record once it goes
                        // stale in the store.
                        error!(log_id = %task.id, error = %e, "Failed to re-enqueue task");
                    }
                });
            }
            RetryDecision::GiveUp { attempts } => {
                error!(
                    log_id = %log_id,
                    attempts,
                    error = %e,
                    "Send task exhausted retries"
                );
            }
        },
    }

    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
