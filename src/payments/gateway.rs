//! Payment gateway abstraction
//!
//! Handlers and services talk to the provider through this trait so
//! tests can substitute an in-memory double.

use crate::payments::error::PaymentResult;
use crate::payments::types::{
    CheckoutSession, CreateCheckoutParams, CreateIntentParams, PaymentIntent,
};
use async_trait::async_trait;

#[async_trait]
pub trait PaymentGateway: Send + Sync {
    /// Create a payment intent for client-side confirmation.
    async fn create_payment_intent(&self, params: CreateIntentParams)
        -> PaymentResult<PaymentIntent>;

    /// Fetch a payment intent to check its settlement status.
    async fn retrieve_payment_intent(&self, intent_id: &str) -> PaymentResult<PaymentIntent>;

    /// Create a hosted checkout session.
    async fn create_checkout_session(
        &self,
        params: CreateCheckoutParams,
    ) -> PaymentResult<CheckoutSession>;
}
