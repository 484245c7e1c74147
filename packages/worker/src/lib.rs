pub mod config;
pub mod error;
pub mod handler;
pub mod providers;
pub mod reaper;
pub mod template;

#[cfg(test)]
pub mod test_support;

pub use config::WorkerAppConfig;
pub use error::{Result, WorkerError};
pub use handler::NotificationWorker;
pub use reaper::{Reaper, ReaperConfig};
pub use template::TemplateEngine;
