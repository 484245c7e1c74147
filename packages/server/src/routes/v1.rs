use utoipa_axum::{router::OpenApiRouter, routes};

use crate::handlers;
use crate::state::AppState;

pub fn routes() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(handlers::notification::send))
        .routes(routes!(handlers::notification::list_notifications))
        .routes(routes!(handlers::notification::get_notification))
        .routes(routes!(handlers::notification::resend_webhook))
}
