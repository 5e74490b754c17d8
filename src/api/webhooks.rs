//! Stripe webhook endpoint
//!
//! The webhook path is the asynchronous safety net behind the client
//! confirmation flow: whichever of the two arrives first writes the
//! order, the other one finds it already there. Signature verification
//! runs against the raw body before anything in the payload is trusted.
//! Processing failures on recognized events return 500 so Stripe's
//! retry loop doubles as our recovery mechanism.

use crate::api::AppState;
use crate::error::{AppError, AppErrorKind, DomainError};
use crate::payments::stripe::construct_event;
use crate::payments::types::{from_minor_units, CheckoutSession, OrderMetadata, PaymentIntent};
use crate::services::OrderParams;
use axum::{body::Bytes, extract::State, http::HeaderMap, Json};
use serde_json::{json, Value as JsonValue};
use tracing::{info, warn};

/// POST /webhooks/stripe
pub async fn handle_stripe_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<JsonValue>, AppError> {
    let signature = headers
        .get("stripe-signature")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::missing_field("stripe-signature"))?;

    let event =
        construct_event(&body, signature, &state.webhook_secret).map_err(AppError::from)?;

    info!(event_id = %event.id, event_type = %event.event_type, "webhook event received");

    match event.event_type.as_str() {
        "checkout.session.completed" => {
            let session: CheckoutSession = serde_json::from_value(event.data.object)
                .map_err(|e| processing_error("unknown", format!("malformed session object: {}", e)))?;
            handle_checkout_session(&state, session).await
        }
        "payment_intent.succeeded" => {
            let intent: PaymentIntent = serde_json::from_value(event.data.object)
                .map_err(|e| processing_error("unknown", format!("malformed intent object: {}", e)))?;
            handle_payment_intent(&state, intent).await
        }
        _ => Ok(Json(json!({ "received": true }))),
    }
}

fn processing_error(payment_intent_id: &str, reason: String) -> AppError {
    AppError::new(AppErrorKind::Domain(DomainError::OrderCreationFailed {
        payment_intent_id: payment_intent_id.to_string(),
        reason,
    }))
}

/// Legacy hosted checkout flow. Metadata was written at session creation;
/// the session's payment intent id is the dedup key.
async fn handle_checkout_session(
    state: &AppState,
    session: CheckoutSession,
) -> Result<Json<JsonValue>, AppError> {
    let payment_intent_id = session
        .payment_intent
        .clone()
        .ok_or_else(|| processing_error(&session.id, "session has no payment intent".to_string()))?;

    let metadata = OrderMetadata::from_map(&session.metadata);
    let product_name = metadata
        .product_name
        .clone()
        .ok_or_else(|| processing_error(&payment_intent_id, "missing metadata in session".to_string()))?;
    if metadata.image_urls.is_empty() {
        return Err(processing_error(
            &payment_intent_id,
            "missing image urls in session metadata".to_string(),
        ));
    }

    let customer_email = session
        .customer_email
        .clone()
        .or_else(|| session.customer_details.as_ref().and_then(|d| d.email.clone()))
        .unwrap_or_default();

    let price = from_minor_units(session.amount_total.unwrap_or(0));

    let outcome = state
        .order_writer
        .record_paid_order(OrderParams {
            payment_intent_id,
            checkout_session_id: Some(session.id.clone()),
            customer_email,
            customer_name: metadata.customer_name,
            product_id: metadata.product_id,
            product_name,
            price,
            pregnancy_week: metadata.pregnancy_week,
            image_urls: metadata.image_urls,
        })
        .await?;

    Ok(Json(json!({ "received": true, "orderId": outcome.order.id })))
}

/// Current flow: the intent carries its own metadata. Intents created
/// outside the storefront lack it; those are acknowledged and skipped so
/// they do not poison Stripe's retry behavior.
async fn handle_payment_intent(
    state: &AppState,
    intent: PaymentIntent,
) -> Result<Json<JsonValue>, AppError> {
    let metadata = OrderMetadata::from_map(&intent.metadata);

    let (product_name, customer_email) = match (
        metadata.product_name.clone(),
        metadata.customer_email.clone(),
    ) {
        (Some(name), Some(email)) if !metadata.image_urls.is_empty() => (name, email),
        _ => {
            warn!(
                payment_intent_id = %intent.id,
                "missing metadata in payment intent, skipping order creation"
            );
            return Ok(Json(json!({ "received": true, "skipped": true })));
        }
    };

    let price = from_minor_units(intent.amount);

    let outcome = state
        .order_writer
        .record_paid_order(OrderParams {
            payment_intent_id: intent.id.clone(),
            checkout_session_id: None,
            customer_email,
            customer_name: metadata.customer_name,
            product_id: metadata.product_id,
            product_name,
            price,
            pregnancy_week: metadata.pregnancy_week,
            image_urls: metadata.image_urls,
        })
        .await?;

    Ok(Json(json!({ "received": true, "orderId": outcome.order.id })))
}
