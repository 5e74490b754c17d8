pub mod emails;
pub mod payments;
pub mod webhooks;

use crate::email::Mailer;
use crate::health::{HealthChecker, HealthState, HealthStatus};
use crate::payments::PaymentGateway;
use crate::services::OrderWriter;
use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::sync::Arc;
use tracing::error;

/// Shared handler state. Provider and persistence access go through
/// trait objects so integration tests can drive the full router with
/// in-memory doubles.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<dyn PaymentGateway>,
    pub order_writer: Arc<OrderWriter>,
    pub mailer: Arc<dyn Mailer>,
    pub health_checker: HealthChecker,
    pub webhook_secret: String,
    pub admin_email: String,
    pub app_url: String,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(
            "/create-payment-intent",
            post(payments::create_payment_intent),
        )
        .route("/confirm-payment", post(payments::confirm_payment))
        .route(
            "/create-checkout-session",
            post(payments::create_checkout_session),
        )
        .route("/webhooks/stripe", post(webhooks::handle_stripe_webhook))
        .route("/send-email", post(emails::send_email))
        .route("/contact", post(emails::contact))
        .route("/health", get(health))
        .route("/health/live", get(liveness))
        .route("/health/ready", get(readiness))
        .with_state(state)
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok", "api": true }))
}

async fn liveness() -> &'static str {
    "OK"
}

/// Readiness checks the database; unhealthy dependencies take the
/// instance out of rotation with a 503.
async fn readiness(
    State(state): State<AppState>,
) -> Result<Json<HealthStatus>, (StatusCode, String)> {
    let status = state.health_checker.check_health().await;

    if status.status == HealthState::Unhealthy {
        error!("readiness check failed");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            "Service Unavailable".to_string(),
        ));
    }

    Ok(Json(status))
}
