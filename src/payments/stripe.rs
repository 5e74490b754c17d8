//! Stripe API client
//!
//! Thin client over the Stripe REST API: form-encoded requests with a
//! bounded timeout, plus webhook signature verification.

use crate::config::StripeConfig;
use crate::payments::error::{PaymentError, PaymentResult};
use crate::payments::gateway::PaymentGateway;
use crate::payments::types::{
    CheckoutSession, CreateCheckoutParams, CreateIntentParams, PaymentIntent, StripeEvent,
};
use crate::payments::utils::{hmac_sha256_hex, secure_eq};
use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::warn;

/// How far a webhook timestamp may drift from now before the event is
/// rejected as a possible replay.
const SIGNATURE_TOLERANCE_SECS: i64 = 300;

#[derive(Clone)]
pub struct StripeClient {
    client: Client,
    secret_key: String,
    api_base_url: String,
    api_version: String,
    timeout_secs: u64,
}

impl StripeClient {
    pub fn new(config: &StripeConfig) -> PaymentResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout))
            .build()
            .map_err(|e| PaymentError::NetworkError {
                message: format!("failed to initialize HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            secret_key: config.secret_key.clone(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
            api_version: config.api_version.clone(),
            timeout_secs: config.request_timeout,
        })
    }

    /// POST a form-encoded request to the Stripe API.
    async fn post_form<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> PaymentResult<T> {
        let url = format!("{}{}", self.api_base_url, path);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", &self.api_version)
            .form(form)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::TimeoutError {
                        seconds: self.timeout_secs,
                    }
                } else {
                    PaymentError::NetworkError {
                        message: format!("provider request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            return serde_json::from_str::<T>(&text).map_err(|e| PaymentError::ProviderError {
                message: format!("invalid provider JSON response: {}", e),
                provider_code: None,
                retryable: false,
            });
        }

        warn!(status = %status, path = %path, "Stripe API request failed");
        Err(PaymentError::ProviderError {
            message: extract_stripe_error_message(&text)
                .unwrap_or_else(|| format!("HTTP {}", status)),
            provider_code: Some(status.as_u16().to_string()),
            retryable: status.is_server_error(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> PaymentResult<T> {
        let url = format!("{}{}", self.api_base_url, path);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.secret_key)
            .header("Stripe-Version", &self.api_version)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PaymentError::TimeoutError {
                        seconds: self.timeout_secs,
                    }
                } else {
                    PaymentError::NetworkError {
                        message: format!("provider request failed: {}", e),
                    }
                }
            })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            return serde_json::from_str::<T>(&text).map_err(|e| PaymentError::ProviderError {
                message: format!("invalid provider JSON response: {}", e),
                provider_code: None,
                retryable: false,
            });
        }

        Err(PaymentError::ProviderError {
            message: extract_stripe_error_message(&text)
                .unwrap_or_else(|| format!("HTTP {}", status)),
            provider_code: Some(status.as_u16().to_string()),
            retryable: status.is_server_error(),
        })
    }
}

#[async_trait]
impl PaymentGateway for StripeClient {
    async fn create_payment_intent(
        &self,
        params: CreateIntentParams,
    ) -> PaymentResult<PaymentIntent> {
        let mut form: Vec<(String, String)> = vec![
            ("amount".to_string(), params.amount_minor.to_string()),
            ("currency".to_string(), params.currency.clone()),
            (
                "automatic_payment_methods[enabled]".to_string(),
                "true".to_string(),
            ),
        ];
        if let Some(email) = &params.receipt_email {
            form.push(("receipt_email".to_string(), email.clone()));
        }
        for (key, value) in &params.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        self.post_form("/v1/payment_intents", &form).await
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> PaymentResult<PaymentIntent> {
        self.get(&format!("/v1/payment_intents/{}", intent_id)).await
    }

    async fn create_checkout_session(
        &self,
        params: CreateCheckoutParams,
    ) -> PaymentResult<CheckoutSession> {
        let mut form: Vec<(String, String)> = vec![
            ("mode".to_string(), "payment".to_string()),
            ("success_url".to_string(), params.success_url.clone()),
            ("cancel_url".to_string(), params.cancel_url.clone()),
            (
                "line_items[0][price_data][currency]".to_string(),
                params.currency.clone(),
            ),
            (
                "line_items[0][price_data][product_data][name]".to_string(),
                params.product_name.clone(),
            ),
            (
                "line_items[0][price_data][unit_amount]".to_string(),
                params.amount_minor.to_string(),
            ),
            (
                "line_items[0][quantity]".to_string(),
                params.quantity.to_string(),
            ),
        ];
        if let Some(email) = &params.customer_email {
            form.push(("customer_email".to_string(), email.clone()));
        }
        for (key, value) in &params.metadata {
            form.push((format!("metadata[{}]", key), value.clone()));
        }

        self.post_form("/v1/checkout/sessions", &form).await
    }
}

/// Stripe wraps errors as {"error": {"message": ...}}.
fn extract_stripe_error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("error")?
        .get("message")?
        .as_str()
        .map(|s| s.to_string())
}

/// Parsed stripe-signature header: "t=<unix>,v1=<hex>[,v1=...]".
#[derive(Debug)]
pub struct SignatureHeader {
    pub timestamp: i64,
    pub signatures: Vec<String>,
}

pub fn parse_signature_header(header: &str) -> PaymentResult<SignatureHeader> {
    let mut timestamp = None;
    let mut signatures = Vec::new();

    for part in header.split(',') {
        let mut kv = part.splitn(2, '=');
        match (kv.next().map(str::trim), kv.next()) {
            (Some("t"), Some(value)) => {
                timestamp = value.parse::<i64>().ok();
            }
            (Some("v1"), Some(value)) => signatures.push(value.to_string()),
            _ => {}
        }
    }

    let timestamp = timestamp.ok_or_else(|| PaymentError::SignatureError {
        message: "missing or invalid timestamp in signature header".to_string(),
    })?;
    if signatures.is_empty() {
        return Err(PaymentError::SignatureError {
            message: "no v1 signature in signature header".to_string(),
        });
    }

    Ok(SignatureHeader {
        timestamp,
        signatures,
    })
}

/// Verify a webhook signature against the raw request body.
///
/// The signed payload is "{timestamp}.{raw_body}", so any change to the
/// body after signing invalidates every v1 digest.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now_unix: i64,
) -> PaymentResult<()> {
    let parsed = parse_signature_header(header)?;

    if (now_unix - parsed.timestamp).abs() > SIGNATURE_TOLERANCE_SECS {
        return Err(PaymentError::SignatureError {
            message: "timestamp outside of tolerance".to_string(),
        });
    }

    let mut signed_payload = parsed.timestamp.to_string().into_bytes();
    signed_payload.push(b'.');
    signed_payload.extend_from_slice(payload);

    let expected =
        hmac_sha256_hex(secret, &signed_payload).ok_or_else(|| PaymentError::SignatureError {
            message: "failed to compute digest".to_string(),
        })?;

    let valid = parsed
        .signatures
        .iter()
        .any(|sig| secure_eq(expected.as_bytes(), sig.as_bytes()));

    if valid {
        Ok(())
    } else {
        Err(PaymentError::SignatureError {
            message: "digest mismatch".to_string(),
        })
    }
}

/// Verify the signature and deserialize the event envelope.
pub fn construct_event(
    payload: &[u8],
    signature_header: &str,
    secret: &str,
) -> PaymentResult<StripeEvent> {
    let now = chrono::Utc::now().timestamp();
    verify_signature(payload, signature_header, secret, now)?;

    serde_json::from_slice(payload).map_err(|e| PaymentError::ValidationError {
        message: format!("malformed webhook payload: {}", e),
        field: Some("body".to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test_secret";

    fn sign(payload: &[u8], timestamp: i64) -> String {
        let mut signed = timestamp.to_string().into_bytes();
        signed.push(b'.');
        signed.extend_from_slice(payload);
        let digest = hmac_sha256_hex(SECRET, &signed).unwrap();
        format!("t={},v1={}", timestamp, digest)
    }

    #[test]
    fn valid_signature_passes() {
        let payload = br#"{"id":"evt_1","type":"payment_intent.succeeded","data":{"object":{}}}"#;
        let now = 1_700_000_000;
        let header = sign(payload, now);

        assert!(verify_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn tampered_body_fails_verification() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, now);

        let result = verify_signature(br#"{"id":"evt_2"}"#, &header, SECRET, now);
        assert!(matches!(result, Err(PaymentError::SignatureError { .. })));
    }

    #[test]
    fn wrong_secret_fails_verification() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let header = sign(payload, now);

        let result = verify_signature(payload, &header, "whsec_other", now);
        assert!(matches!(result, Err(PaymentError::SignatureError { .. })));
    }

    #[test]
    fn stale_timestamp_fails_verification() {
        let payload = br#"{"id":"evt_1"}"#;
        let signed_at = 1_700_000_000;
        let header = sign(payload, signed_at);

        let result = verify_signature(payload, &header, SECRET, signed_at + 3600);
        assert!(matches!(result, Err(PaymentError::SignatureError { .. })));
    }

    #[test]
    fn header_without_v1_is_rejected() {
        let result = parse_signature_header("t=1700000000");
        assert!(result.is_err());
    }

    #[test]
    fn header_without_timestamp_is_rejected() {
        let result = parse_signature_header("v1=abcdef");
        assert!(result.is_err());
    }

    #[test]
    fn header_with_multiple_v1_entries_accepts_any_match() {
        let payload = br#"{"id":"evt_1"}"#;
        let now = 1_700_000_000;
        let valid = sign(payload, now);
        let valid_digest = valid.split("v1=").nth(1).unwrap();
        let header = format!("t={},v1=deadbeef,v1={}", now, valid_digest);

        assert!(verify_signature(payload, &header, SECRET, now).is_ok());
    }

    #[test]
    fn construct_event_parses_envelope() {
        let payload =
            br#"{"id":"evt_9","type":"checkout.session.completed","data":{"object":{"id":"cs_1"}}}"#;
        let now = chrono::Utc::now().timestamp();
        let header = sign(payload, now);

        let event = construct_event(payload, &header, SECRET).unwrap();
        assert_eq!(event.id, "evt_9");
        assert_eq!(event.event_type, "checkout.session.completed");
        assert_eq!(event.data.object["id"], "cs_1");
    }

    #[test]
    fn stripe_error_message_extraction() {
        let body = r#"{"error":{"message":"Amount must be at least 50 cents","type":"invalid_request_error"}}"#;
        assert_eq!(
            extract_stripe_error_message(body).as_deref(),
            Some("Amount must be at least 50 cents")
        );
        assert_eq!(extract_stripe_error_message("not json"), None);
    }
}
