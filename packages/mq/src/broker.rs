//! Connection to the Redis-backed broker that carries the notifications
//! queue.

use broccoli_queue::queue::BroccoliQueue;

use common::config::MqAppConfig;

use crate::error::MqError;

/// Broker handle shared by the intake enqueuer, the worker consumer, and
/// the reaper's re-publish path.
pub type Mq = BroccoliQueue;

/// Connect with the app-level MQ settings. The queue name in the config is
/// not consumed here; publishers and consumers address queues per call.
pub async fn connect(config: &MqAppConfig) -> Result<Mq, MqError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
        .map_err(MqError::from)
}
