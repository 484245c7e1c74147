pub mod broker;
pub mod enqueuer;
pub mod error;

pub use broker::{connect, Mq};
pub use enqueuer::QueueEnqueuer;
pub use error::MqError;

// The broker types that cross this crate's boundary: the consumer closure
// in the worker receives `BrokerMessage<Task>` and returns `BroccoliError`.
pub use broccoli_queue::{brokers::broker::BrokerMessage, error::BroccoliError};
