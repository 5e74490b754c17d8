//! Payment endpoints: intent creation, client-side confirmation, and the
//! legacy hosted checkout flow.

use crate::api::AppState;
use crate::error::{
    AppError, AppErrorKind, DomainError, ValidationError as RequestValidationError,
};
use crate::middleware::error::get_request_id_from_headers;
use crate::payments::types::{to_minor_units, CreateCheckoutParams, CreateIntentParams, OrderMetadata};
use crate::services::OrderParams;
use axum::{extract::State, http::HeaderMap, Json};
use bigdecimal::BigDecimal;
use regex::Regex;
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};
use std::str::FromStr;
use std::sync::OnceLock;
use tracing::info;

/// Product line being purchased. The image-count bound is a property of
/// the line, not a global constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProductLine {
    #[default]
    Single,
    Package,
    PremiumPackage,
}

impl ProductLine {
    /// Inclusive image-count bounds for this product line.
    pub fn image_bounds(self) -> (usize, usize) {
        match self {
            ProductLine::Single => (1, 3),
            ProductLine::Package => (2, 10),
            ProductLine::PremiumPackage => (5, 10),
        }
    }
}

/// All fields optional so missing ones surface as 400 validation errors
/// instead of body-rejection responses.
#[derive(Debug, Deserialize)]
pub struct CreateIntentRequest {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub product_line: Option<ProductLine>,
    pub price: Option<JsonValue>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub pregnancy_week: Option<JsonValue>,
    pub image_urls: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct ConfirmPaymentRequest {
    pub payment_intent_id: Option<String>,
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub price: Option<JsonValue>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub pregnancy_week: Option<JsonValue>,
    pub image_urls: Option<Vec<String>>,
}

fn email_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid regex"))
}

fn require<'a, T>(value: &'a Option<T>, field: &str) -> Result<&'a T, AppError> {
    value.as_ref().ok_or_else(|| AppError::missing_field(field))
}

fn validate_email(email: &str) -> Result<(), AppError> {
    if email_regex().is_match(email) {
        Ok(())
    } else {
        Err(AppError::validation(RequestValidationError::InvalidEmail {
            email: email.to_string(),
        }))
    }
}

fn validate_image_count(image_urls: &[String], line: ProductLine) -> Result<(), AppError> {
    let (min, max) = line.image_bounds();
    if image_urls.len() < min || image_urls.len() > max {
        return Err(AppError::validation(
            RequestValidationError::ImageCountOutOfRange {
                count: image_urls.len(),
                min,
                max,
            },
        ));
    }
    Ok(())
}

/// Coerce a JSON price (number or numeric string) to an exact decimal.
/// Numbers go through their decimal literal form, never through f64
/// binary expansion.
fn parse_price(value: &JsonValue) -> Result<BigDecimal, AppError> {
    let text = match value {
        JsonValue::Number(n) => n.to_string(),
        JsonValue::String(s) => s.trim().to_string(),
        other => {
            return Err(AppError::validation(RequestValidationError::InvalidPrice {
                value: other.to_string(),
                reason: "price must be a number or numeric string".to_string(),
            }))
        }
    };

    let price = BigDecimal::from_str(&text).map_err(|_| {
        AppError::validation(RequestValidationError::InvalidPrice {
            value: text.clone(),
            reason: "price is not numeric".to_string(),
        })
    })?;

    if price <= BigDecimal::from(0) {
        return Err(AppError::validation(RequestValidationError::InvalidPrice {
            value: text,
            reason: "price must be greater than zero".to_string(),
        }));
    }

    Ok(price)
}

/// Optional pregnancy week: accepted as number or numeric string,
/// non-parseable values are dropped rather than rejected.
fn parse_pregnancy_week(value: Option<&JsonValue>) -> Option<i32> {
    match value {
        Some(JsonValue::Number(n)) => n.as_i64().and_then(|v| i32::try_from(v).ok()),
        Some(JsonValue::String(s)) if !s.is_empty() => s.trim().parse().ok(),
        _ => None,
    }
}

fn build_metadata(
    product_id: &str,
    product_name: &str,
    customer_email: &str,
    customer_name: Option<&String>,
    pregnancy_week: Option<i32>,
    image_urls: &[String],
) -> OrderMetadata {
    OrderMetadata {
        product_id: Some(product_id.to_string()),
        product_name: Some(product_name.to_string()),
        customer_email: Some(customer_email.to_string()),
        customer_name: customer_name.cloned(),
        image_urls: image_urls.to_vec(),
        pregnancy_week,
    }
}

/// POST /create-payment-intent
pub async fn create_payment_intent(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateIntentRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let attach_id = |err: AppError| match &request_id {
        Some(id) => err.with_request_id(id.clone()),
        None => err,
    };

    let product_id = require(&body.product_id, "product_id").map_err(attach_id)?;
    let product_name = require(&body.product_name, "product_name").map_err(attach_id)?;
    let price_raw = require(&body.price, "price").map_err(attach_id)?;
    let customer_email = require(&body.customer_email, "customer_email").map_err(attach_id)?;
    let image_urls = require(&body.image_urls, "image_urls").map_err(attach_id)?;

    validate_email(customer_email).map_err(attach_id)?;
    validate_image_count(image_urls, body.product_line.unwrap_or_default())
        .map_err(attach_id)?;
    let price = parse_price(price_raw).map_err(attach_id)?;

    let pregnancy_week = parse_pregnancy_week(body.pregnancy_week.as_ref());
    let metadata = build_metadata(
        product_id,
        product_name,
        customer_email,
        body.customer_name.as_ref(),
        pregnancy_week,
        image_urls,
    );

    let amount_minor = to_minor_units(&price).map_err(AppError::from).map_err(attach_id)?;
    let intent = state
        .gateway
        .create_payment_intent(CreateIntentParams {
            amount_minor,
            currency: "usd".to_string(),
            receipt_email: Some(customer_email.clone()),
            metadata: metadata.to_map(),
        })
        .await
        .map_err(AppError::from)
        .map_err(attach_id)?;

    info!(
        payment_intent_id = %intent.id,
        product_id = %product_id,
        amount_minor = amount_minor,
        "payment intent created"
    );

    Ok(Json(json!({
        "client_secret": intent.client_secret,
        "payment_intent_id": intent.id,
    })))
}

/// POST /confirm-payment
///
/// Presence-only validation: bounds were already checked when the intent
/// was issued, and the provider's view of the intent status is what
/// gates order creation.
pub async fn confirm_payment(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<ConfirmPaymentRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let attach_id = |err: AppError| match &request_id {
        Some(id) => err.with_request_id(id.clone()),
        None => err,
    };

    let payment_intent_id =
        require(&body.payment_intent_id, "payment_intent_id").map_err(attach_id)?;
    let product_name = require(&body.product_name, "product_name").map_err(attach_id)?;
    let price_raw = require(&body.price, "price").map_err(attach_id)?;
    let customer_email = require(&body.customer_email, "customer_email").map_err(attach_id)?;
    let image_urls = require(&body.image_urls, "image_urls").map_err(attach_id)?;

    let price = parse_price(price_raw).map_err(attach_id)?;

    let intent = state
        .gateway
        .retrieve_payment_intent(payment_intent_id)
        .await
        .map_err(AppError::from)
        .map_err(attach_id)?;

    if intent.status != "succeeded" {
        return Err(attach_id(AppError::new(AppErrorKind::Domain(
            DomainError::PaymentNotCompleted {
                status: intent.status,
            },
        ))));
    }

    let outcome = state
        .order_writer
        .record_paid_order(OrderParams {
            payment_intent_id: payment_intent_id.clone(),
            checkout_session_id: None,
            customer_email: customer_email.clone(),
            customer_name: body.customer_name.clone(),
            product_id: body.product_id.clone(),
            product_name: product_name.clone(),
            price,
            pregnancy_week: parse_pregnancy_week(body.pregnancy_week.as_ref()),
            image_urls: image_urls.clone(),
        })
        .await
        .map_err(attach_id)?;

    Ok(Json(json!({
        "success": true,
        "order_id": outcome.order.id,
        "order": outcome.order,
    })))
}

/// POST /create-checkout-session (legacy hosted flow, single product line)
pub async fn create_checkout_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateIntentRequest>,
) -> Result<Json<JsonValue>, AppError> {
    let request_id = get_request_id_from_headers(&headers);
    let attach_id = |err: AppError| match &request_id {
        Some(id) => err.with_request_id(id.clone()),
        None => err,
    };

    let product_id = require(&body.product_id, "product_id").map_err(attach_id)?;
    let product_name = require(&body.product_name, "product_name").map_err(attach_id)?;
    let price_raw = require(&body.price, "price").map_err(attach_id)?;
    let customer_email = require(&body.customer_email, "customer_email").map_err(attach_id)?;
    let image_urls = require(&body.image_urls, "image_urls").map_err(attach_id)?;

    validate_email(customer_email).map_err(attach_id)?;
    validate_image_count(image_urls, ProductLine::Single).map_err(attach_id)?;
    let price = parse_price(price_raw).map_err(attach_id)?;

    let metadata = build_metadata(
        product_id,
        product_name,
        customer_email,
        None,
        None,
        image_urls,
    );

    let amount_minor = to_minor_units(&price).map_err(AppError::from).map_err(attach_id)?;
    let session = state
        .gateway
        .create_checkout_session(CreateCheckoutParams {
            amount_minor,
            currency: "usd".to_string(),
            product_name: product_name.clone(),
            quantity: 1,
            customer_email: Some(customer_email.clone()),
            success_url: format!(
                "{}/checkout-success?session_id={{CHECKOUT_SESSION_ID}}",
                state.app_url
            ),
            cancel_url: format!("{}/checkout-cancel", state.app_url),
            metadata: metadata.to_map(),
        })
        .await
        .map_err(AppError::from)
        .map_err(attach_id)?;

    Ok(Json(json!({ "url": session.url })))
}
