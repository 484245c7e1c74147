use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use tracing::{error, info, instrument};

use common::record::{ListFilter, NotificationRecord};

use crate::error::{ApiError, ApiResponse, AppError};
use crate::extractors::auth::ApiKey;
use crate::extractors::json::AppJson;
use crate::models::notification::{ListResponse, ResendWebhookEvent, SendRequest, SendResponse};
use crate::state::AppState;

/// Enqueue a notification for async delivery.
#[utoipa::path(
    post,
    path = "/send",
    tag = "Notifications",
    operation_id = "sendNotification",
    summary = "Send a notification",
    description = "Validates the request, applies idempotency and per-recipient rate limiting, persists a record, and enqueues it for asynchronous delivery. Returns 202 with the provisional record.",
    request_body = SendRequest,
    responses(
        (status = 202, description = "Notification accepted", body = SendResponse),
        (status = 400, description = "Validation error or rate limit exceeded", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 500, description = "Store or queue failure", body = ApiError),
    ),
    security(("api_key" = [])),
)]
#[instrument(skip(state, payload), fields(channel = %payload.channel, kind = %payload.kind))]
pub async fn send(
    _auth: ApiKey,
    State(state): State<AppState>,
    AppJson(payload): AppJson<SendRequest>,
) -> Result<impl IntoResponse, AppError> {
    let to = payload.to.clone();
    let resp = state.service.enqueue(payload).await.map_err(|e| {
        error!(error = %e, to = %to, "Enqueue notification failed");
        AppError::from(e)
    })?;

    Ok((StatusCode::ACCEPTED, Json(ApiResponse::success(resp))))
}

/// List notification records.
#[utoipa::path(
    get,
    path = "/notifications",
    tag = "Notifications",
    operation_id = "listNotifications",
    summary = "List notifications",
    description = "Returns a paginated list of notification records, newest first, optionally filtered by status, recipient, or channel.",
    params(ListFilter),
    responses(
        (status = 200, description = "List of notifications", body = ListResponse),
        (status = 400, description = "Invalid query parameters", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
    ),
    security(("api_key" = [])),
)]
#[instrument(skip(state, query))]
pub async fn list_notifications(
    _auth: ApiKey,
    State(state): State<AppState>,
    Query(query): Query<ListFilter>,
) -> Result<Json<ApiResponse<ListResponse>>, AppError> {
    let resp = state.service.list_notifications(query).await?;
    Ok(Json(ApiResponse::success(resp)))
}

/// Get a single notification record.
#[utoipa::path(
    get,
    path = "/notifications/{id}",
    tag = "Notifications",
    operation_id = "getNotification",
    summary = "Get notification details",
    params(
        ("id" = String, Path, description = "Notification record id")
    ),
    responses(
        (status = 200, description = "Notification record", body = NotificationRecord),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
        (status = 404, description = "Notification not found", body = ApiError),
    ),
    security(("api_key" = [])),
)]
#[instrument(skip(state), fields(id = %id))]
pub async fn get_notification(
    _auth: ApiKey,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<NotificationRecord>>, AppError> {
    let record = state.service.get_notification(&id).await?;
    Ok(Json(ApiResponse::success(record)))
}

/// Receive delivery status updates from Resend webhooks.
#[utoipa::path(
    post,
    path = "/webhooks/resend",
    tag = "Notifications",
    operation_id = "resendWebhook",
    summary = "Resend delivery webhook",
    description = "Applies `email.delivered`, `email.bounced`, and `email.opened` events to the matching record by provider id. Unrecognized event types are acknowledged and ignored so the provider does not retry them.",
    request_body = ResendWebhookEvent,
    responses(
        (status = 200, description = "Event processed or ignored"),
        (status = 400, description = "Malformed payload", body = ApiError),
        (status = 401, description = "Missing or invalid API key", body = ApiError),
    ),
    security(("api_key" = [])),
)]
#[instrument(skip(state, event), fields(event_type = %event.event_type))]
pub async fn resend_webhook(
    _auth: ApiKey,
    State(state): State<AppState>,
    AppJson(event): AppJson<ResendWebhookEvent>,
) -> Result<impl IntoResponse, AppError> {
    let Some(status) = event.status() else {
        info!(event_type = %event.event_type, "Ignoring webhook event");
        return Ok(Json(ApiResponse::success(
            serde_json::json!({"status": "ignored"}),
        )));
    };

    state
        .service
        .handle_webhook_event(&event.data.email_id, status)
        .await
        .map_err(|e| {
            error!(
                event_type = %event.event_type,
                email_id = %event.data.email_id,
                error = %e,
                "Webhook processing failed"
            );
            AppError::from(e)
        })?;

    Ok(Json(ApiResponse::success(
        serde_json::json!({"status": "processed"}),
    )))
}
