//! Wire types shared between the Stripe client and the API layer.

use crate::payments::error::{PaymentError, PaymentResult};
use bigdecimal::{num_bigint::BigInt, BigDecimal, RoundingMode, ToPrimitive};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Payment intent as returned by the provider. Only the fields this
/// service reads are modelled.
#[derive(Debug, Clone, Deserialize)]
pub struct PaymentIntent {
    pub id: String,
    pub client_secret: Option<String>,
    pub status: String,
    pub amount: i64,
    pub currency: String,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub receipt_email: Option<String>,
}

/// Hosted checkout session.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckoutSession {
    pub id: String,
    pub url: Option<String>,
    pub payment_intent: Option<String>,
    pub payment_status: Option<String>,
    pub customer_email: Option<String>,
    pub amount_total: Option<i64>,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub customer_details: Option<CustomerDetails>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CustomerDetails {
    pub email: Option<String>,
    pub name: Option<String>,
}

/// Webhook event envelope. The object payload stays as raw JSON until
/// the event type is known.
#[derive(Debug, Clone, Deserialize)]
pub struct StripeEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: StripeEventData,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StripeEventData {
    pub object: serde_json::Value,
}

/// Parameters for creating a payment intent.
#[derive(Debug, Clone)]
pub struct CreateIntentParams {
    pub amount_minor: i64,
    pub currency: String,
    pub receipt_email: Option<String>,
    pub metadata: HashMap<String, String>,
}

/// Parameters for creating a hosted checkout session.
#[derive(Debug, Clone)]
pub struct CreateCheckoutParams {
    pub amount_minor: i64,
    pub currency: String,
    pub product_name: String,
    pub quantity: u32,
    pub customer_email: Option<String>,
    pub success_url: String,
    pub cancel_url: String,
    pub metadata: HashMap<String, String>,
}

/// Order fields carried through provider metadata across the payment
/// round trip. Keys written at intent creation are read back verbatim
/// when the payment settles.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderMetadata {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub customer_email: Option<String>,
    pub customer_name: Option<String>,
    pub image_urls: Vec<String>,
    pub pregnancy_week: Option<i32>,
}

impl OrderMetadata {
    /// Read order fields out of provider metadata. Older checkout flows
    /// wrote package_id/package_name, so those are accepted as fallbacks.
    pub fn from_map(metadata: &HashMap<String, String>) -> Self {
        let get = |key: &str| metadata.get(key).filter(|v| !v.is_empty()).cloned();

        let image_urls = get("image_urls")
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).ok())
            .unwrap_or_default();

        Self {
            product_id: get("product_id").or_else(|| get("package_id")),
            product_name: get("product_name").or_else(|| get("package_name")),
            customer_email: get("customer_email"),
            customer_name: get("customer_name"),
            image_urls,
            pregnancy_week: get("pregnancy_week").and_then(|v| v.parse().ok()),
        }
    }

    /// Whether enough metadata is present to write an order row.
    pub fn has_order_fields(&self) -> bool {
        self.product_id.is_some() && self.customer_email.is_some()
    }

    /// Serialize into the flat string map the provider accepts.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map = HashMap::new();
        if let Some(v) = &self.product_id {
            map.insert("product_id".to_string(), v.clone());
        }
        if let Some(v) = &self.product_name {
            map.insert("product_name".to_string(), v.clone());
        }
        if let Some(v) = &self.customer_email {
            map.insert("customer_email".to_string(), v.clone());
        }
        if let Some(v) = &self.customer_name {
            map.insert("customer_name".to_string(), v.clone());
        }
        if !self.image_urls.is_empty() {
            if let Ok(json) = serde_json::to_string(&self.image_urls) {
                map.insert("image_urls".to_string(), json);
            }
        }
        if let Some(v) = self.pregnancy_week {
            map.insert("pregnancy_week".to_string(), v.to_string());
        }
        map
    }
}

/// Convert a major-unit decimal price to provider minor units,
/// rounding half-up at the cent boundary.
pub fn to_minor_units(price: &BigDecimal) -> PaymentResult<i64> {
    let cents = (price * BigDecimal::from(100)).with_scale_round(0, RoundingMode::HalfUp);
    cents.to_i64().ok_or_else(|| PaymentError::ValidationError {
        message: format!("price {} overflows minor units", price),
        field: Some("price".to_string()),
    })
}

/// Convert provider minor units back to a two-decimal major-unit price.
pub fn from_minor_units(amount_minor: i64) -> BigDecimal {
    BigDecimal::new(BigInt::from(amount_minor), 2)
}
