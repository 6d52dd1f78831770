//! HTTP endpoints.
//!
//! | Method | Path | Body |
//! |--------|------|------|
//! | `GET` | `/` | |
//! | `POST` | `/send_mail` | JSON payload |
//! | `POST` | `/send_mail_with_attachments` | multipart: `data` (JSON) + `attachments` (files) |
//!
//! Each send walks `Received → Validated → Sent`. Validation problems answer
//! 400 with every field error; transport problems answer 500 with a generic
//! message and are logged in full; upload limits answer 413.

use std::sync::Arc;

use axum::{
    extract::{
        multipart::MultipartRejection, rejection::JsonRejection, DefaultBodyLimit, Multipart,
        State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::Local;
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;
use tower_http::trace::TraceLayer;
use tracing::Instrument;

#[cfg(feature = "metrics")]
use std::time::Instant;

use crate::attachment::Attachment;
use crate::compose::compose;
use crate::config::Config;
use crate::error::MailError;
use crate::mailer::{DeliveryResult, Mailer};
use crate::request::{validate, EmailRequest, ValidationErrors};
use crate::template::render_body;
use crate::upload::{read_form, UploadError};

/// Body of `GET /`.
pub const INDEX_TEXT: &str = "API para gestionar correos";
/// Success message of `POST /send_mail`.
pub const SENT_MESSAGE: &str = "Correo enviado exitosamente";
/// Success message of `POST /send_mail_with_attachments`.
pub const SENT_WITH_ATTACHMENTS_MESSAGE: &str = "Correo enviado exitosamente con adjuntos";
/// The only detail callers get about a failed delivery.
pub const SEND_FAILED_MESSAGE: &str = "Failed to send email due to an internal error.";

/// Field name used for errors about the payload as a whole.
const ROOT_FIELD: &str = "__root__";

/// Shared state for routes.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: Config, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            config: Arc::new(config),
            mailer,
        }
    }
}

/// Create the API router.
pub fn router(state: AppState) -> Router {
    let body_limit = state.config.max_request_bytes();

    Router::new()
        .route("/", get(index))
        .route("/send_mail", post(send_mail))
        .route("/send_mail_with_attachments", post(send_mail_with_attachments))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Errors a send endpoint can answer with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    #[error("Payload too large: {0}")]
    TooLarge(String),

    #[error(transparent)]
    Mail(#[from] MailError),
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

impl From<UploadError> for ApiError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Limit(message) => Self::TooLarge(message),
            UploadError::Read(message) => Self::Mail(MailError::AttachmentError(message)),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            Self::TooLarge(rejection.body_text())
        } else {
            Self::Validation(ValidationErrors::single(ROOT_FIELD, rejection.body_text()))
        }
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::Validation(ValidationErrors::single(ROOT_FIELD, rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Validation(errors) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": errors.errors() })),
            )
                .into_response(),
            Self::TooLarge(message) => (
                StatusCode::PAYLOAD_TOO_LARGE,
                Json(json!({ "error": message })),
            )
                .into_response(),
            // Detail was logged where the failure happened
            Self::Mail(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({ "error": SEND_FAILED_MESSAGE })),
            )
                .into_response(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SendResponse {
    pub message: &'static str,
}

/// GET / - Identify the service.
async fn index() -> &'static str {
    INDEX_TEXT
}

/// POST /send_mail - Send a message without attachments.
async fn send_mail(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let Json(payload) = payload?;
    let request = validate(&payload)?;

    dispatch(&state, "send_mail", request, Vec::new()).await?;

    Ok(Json(SendResponse {
        message: SENT_MESSAGE,
    }))
}

/// POST /send_mail_with_attachments - Send a message with uploaded files.
async fn send_mail_with_attachments(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<SendResponse>, ApiError> {
    let form = read_form(multipart?, &state.config.limits)
        .await
        .inspect_err(|err| match err {
            UploadError::Read(_) => tracing::error!(error = %err, "Failed to read attachments"),
            UploadError::Limit(_) => tracing::warn!(error = %err, "Rejected upload"),
        })?;

    let request = validate(&form.payload()?)?;

    dispatch(
        &state,
        "send_mail_with_attachments",
        request,
        form.attachments,
    )
    .await?;

    Ok(Json(SendResponse {
        message: SENT_WITH_ATTACHMENTS_MESSAGE,
    }))
}

/// Render, compose, and deliver a validated request exactly once.
async fn dispatch(
    state: &AppState,
    endpoint: &'static str,
    request: EmailRequest,
    attachments: Vec<Attachment>,
) -> Result<DeliveryResult, MailError> {
    let span = tracing::info_span!(
        "mailgate.deliver",
        endpoint = endpoint,
        provider = state.mailer.provider_name(),
        recipients = request.recipients.len(),
        attachments = attachments.len(),
        subject = %request.subject,
    );

    async move {
        tracing::debug!("Delivering email");

        #[cfg(feature = "metrics")]
        let start = Instant::now();

        let result = compose_and_deliver(state, request, attachments).await;

        #[cfg(feature = "metrics")]
        {
            let status = if result.is_ok() { "success" } else { "error" };
            metrics::counter!("mailgate_emails_total", "endpoint" => endpoint, "status" => status)
                .increment(1);
            metrics::histogram!("mailgate_delivery_duration_seconds", "endpoint" => endpoint)
                .record(start.elapsed().as_secs_f64());
        }

        match &result {
            Ok(r) => tracing::info!(message_id = %r.message_id, "Email delivered"),
            Err(e) => tracing::error!(error = %e, "Email delivery failed"),
        }

        result
    }
    .instrument(span)
    .await
}

async fn compose_and_deliver(
    state: &AppState,
    request: EmailRequest,
    attachments: Vec<Attachment>,
) -> Result<DeliveryResult, MailError> {
    let html = render_body(&request.body);
    let email = compose(
        request,
        html,
        attachments,
        &state.config.defaults,
        Local::now(),
    )?;

    state.mailer.deliver(&email).await
}
