//! Shared test doubles: in-memory order store, scripted payment
//! gateway, and a recording mailer, wired into the real router.

use async_trait::async_trait;
use axum::Router;
use bigdecimal::BigDecimal;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use uuid::Uuid;
use vignette_backend::api::{self, AppState};
use vignette_backend::database::error::DatabaseError;
use vignette_backend::database::order_repository::{NewOrder, Order, OrderImage};
use vignette_backend::email::{EmailError, EmailMessage, EmailResult, Mailer};
use vignette_backend::health::HealthChecker;
use vignette_backend::payments::error::{PaymentError, PaymentResult};
use vignette_backend::payments::gateway::PaymentGateway;
use vignette_backend::payments::types::{
    CheckoutSession, CreateCheckoutParams, CreateIntentParams, PaymentIntent,
};
use vignette_backend::services::{OrderStore, OrderWriter};

pub const WEBHOOK_SECRET: &str = "whsec_test_secret";
pub const ADMIN_EMAIL: &str = "orders@vignettelab.com";

#[derive(Default)]
pub struct MemoryStore {
    pub orders: Mutex<Vec<Order>>,
    pub images: Mutex<Vec<OrderImage>>,
    pub fail_image_insert: Mutex<bool>,
}

#[async_trait]
impl OrderStore for MemoryStore {
    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, DatabaseError> {
        Ok(self
            .orders
            .lock()
            .unwrap()
            .iter()
            .find(|o| o.stripe_payment_intent_id == payment_intent_id)
            .cloned())
    }

    async fn insert(&self, new_order: NewOrder) -> Result<Order, DatabaseError> {
        let mut orders = self.orders.lock().unwrap();
        if orders
            .iter()
            .any(|o| o.stripe_payment_intent_id == new_order.stripe_payment_intent_id)
        {
            return Err(DatabaseError::UniqueViolation {
                constraint: "orders_stripe_payment_intent_id_key".to_string(),
            });
        }

        let order = Order {
            id: Uuid::new_v4(),
            customer_email: new_order.customer_email,
            customer_name: new_order.customer_name,
            package_name: new_order.package_name,
            product_id: new_order.product_id,
            price: new_order.price,
            pregnancy_week: new_order.pregnancy_week,
            status: new_order.status,
            stripe_payment_intent_id: new_order.stripe_payment_intent_id,
            stripe_checkout_session_id: new_order.stripe_checkout_session_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        orders.push(order.clone());
        Ok(order)
    }

    async fn attach_uploaded_images(
        &self,
        order_id: Uuid,
        image_urls: &[String],
    ) -> Result<Vec<OrderImage>, DatabaseError> {
        if *self.fail_image_insert.lock().unwrap() {
            return Err(DatabaseError::Query {
                message: "image insert failed".to_string(),
            });
        }

        let mut images = self.images.lock().unwrap();
        let mut inserted = Vec::new();
        for url in image_urls {
            let image = OrderImage {
                id: Uuid::new_v4(),
                order_id,
                image_url: url.clone(),
                image_type: "uploaded".to_string(),
                created_at: Utc::now(),
            };
            images.push(image.clone());
            inserted.push(image);
        }
        Ok(inserted)
    }
}

/// Scripted gateway: remembers metadata written at intent creation and
/// serves it back on retrieval, like the real provider does.
#[derive(Default)]
pub struct MockGateway {
    pub intents: Mutex<HashMap<String, PaymentIntent>>,
    pub intent_status: Mutex<String>,
    pub next_intent_id: Mutex<u32>,
    pub fail_with: Mutex<Option<PaymentError>>,
}

impl MockGateway {
    pub fn succeeding() -> Self {
        Self {
            intent_status: Mutex::new("succeeded".to_string()),
            ..Default::default()
        }
    }

    pub fn with_intent_status(status: &str) -> Self {
        Self {
            intent_status: Mutex::new(status.to_string()),
            ..Default::default()
        }
    }

    pub fn set_failure(&self, err: PaymentError) {
        *self.fail_with.lock().unwrap() = Some(err);
    }
}

#[async_trait]
impl PaymentGateway for MockGateway {
    async fn create_payment_intent(
        &self,
        params: CreateIntentParams,
    ) -> PaymentResult<PaymentIntent> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }

        let mut counter = self.next_intent_id.lock().unwrap();
        *counter += 1;
        let id = format!("pi_test_{}", *counter);

        let intent = PaymentIntent {
            id: id.clone(),
            client_secret: Some(format!("{}_secret", id)),
            status: "requires_payment_method".to_string(),
            amount: params.amount_minor,
            currency: params.currency,
            metadata: params.metadata,
            receipt_email: params.receipt_email,
        };
        self.intents.lock().unwrap().insert(id, intent.clone());
        Ok(intent)
    }

    async fn retrieve_payment_intent(&self, intent_id: &str) -> PaymentResult<PaymentIntent> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }

        let status = self.intent_status.lock().unwrap().clone();
        let stored = self.intents.lock().unwrap().get(intent_id).cloned();
        let mut intent = stored.unwrap_or(PaymentIntent {
            id: intent_id.to_string(),
            client_secret: None,
            status: String::new(),
            amount: 0,
            currency: "usd".to_string(),
            metadata: HashMap::new(),
            receipt_email: None,
        });
        intent.status = status;
        Ok(intent)
    }

    async fn create_checkout_session(
        &self,
        params: CreateCheckoutParams,
    ) -> PaymentResult<CheckoutSession> {
        if let Some(err) = self.fail_with.lock().unwrap().clone() {
            return Err(err);
        }

        Ok(CheckoutSession {
            id: "cs_test_1".to_string(),
            url: Some("https://checkout.stripe.com/pay/cs_test_1".to_string()),
            payment_intent: Some("pi_test_cs_1".to_string()),
            payment_status: Some("unpaid".to_string()),
            customer_email: params.customer_email,
            amount_total: Some(params.amount_minor),
            metadata: params.metadata,
            customer_details: None,
        })
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<EmailMessage>>,
    pub fail: Mutex<bool>,
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, message: EmailMessage) -> EmailResult<Option<String>> {
        if *self.fail.lock().unwrap() {
            return Err(EmailError::ProviderError {
                message: "rate limited".to_string(),
            });
        }
        self.sent.lock().unwrap().push(message);
        Ok(Some("email_test_1".to_string()))
    }
}

pub struct TestApp {
    pub router: Router,
    pub store: Arc<MemoryStore>,
    pub gateway: Arc<MockGateway>,
    pub mailer: Arc<RecordingMailer>,
}

pub fn build_app(gateway: MockGateway) -> TestApp {
    let store = Arc::new(MemoryStore::default());
    let gateway = Arc::new(gateway);
    let mailer = Arc::new(RecordingMailer::default());

    let order_writer = Arc::new(OrderWriter::new(
        store.clone() as Arc<dyn OrderStore>,
        mailer.clone() as Arc<dyn Mailer>,
        ADMIN_EMAIL.to_string(),
    ));

    let state = AppState {
        gateway: gateway.clone(),
        order_writer,
        mailer: mailer.clone(),
        health_checker: HealthChecker::new(None),
        webhook_secret: WEBHOOK_SECRET.to_string(),
        admin_email: ADMIN_EMAIL.to_string(),
        app_url: "http://localhost:8080".to_string(),
    };

    TestApp {
        router: api::router(state),
        store,
        gateway,
        mailer,
    }
}

/// Build a valid stripe-signature header for a payload.
pub fn sign_webhook(payload: &[u8], secret: &str) -> String {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;

    let timestamp = Utc::now().timestamp();
    let mut signed = timestamp.to_string().into_bytes();
    signed.push(b'.');
    signed.extend_from_slice(payload);

    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("hmac accepts any key length");
    mac.update(&signed);
    let digest = hex::encode(mac.finalize().into_bytes());

    format!("t={},v1={}", timestamp, digest)
}

#[allow(dead_code)]
pub fn price(text: &str) -> BigDecimal {
    use std::str::FromStr;
    BigDecimal::from_str(text).unwrap()
}
