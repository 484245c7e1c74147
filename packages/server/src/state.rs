use std::sync::Arc;

use crate::config::AppConfig;
use crate::middleware::IpRateLimiter;
use crate::service::NotificationService;

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<NotificationService>,
    /// Per-IP limiter cache. Created once in the composition root and
    /// shared with the middleware; never a global.
    pub ip_limiter: Arc<IpRateLimiter>,
    pub config: AppConfig,
}
