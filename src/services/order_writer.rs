//! Order writer
//!
//! Single choke point for turning a settled payment into an order row.
//! Both the client confirmation path and the webhook path funnel through
//! record_paid_order, which is idempotent on the payment intent id: the
//! unique constraint in the database is the ground truth, and losing the
//! insert race means re-reading the winner's row, never failing.

use crate::database::error::DatabaseError;
use crate::database::order_repository::{NewOrder, Order, OrderImage, OrderRepository};
use crate::email::{templates, EmailMessage, Mailer};
use crate::error::{AppError, AppErrorKind, DomainError};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::sync::Arc;
use tracing::{info, warn};
use uuid::Uuid;

/// Persistence seam for orders.
#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, DatabaseError>;

    async fn insert(&self, order: NewOrder) -> Result<Order, DatabaseError>;

    async fn attach_uploaded_images(
        &self,
        order_id: Uuid,
        image_urls: &[String],
    ) -> Result<Vec<OrderImage>, DatabaseError>;
}

#[async_trait]
impl OrderStore for OrderRepository {
    async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, DatabaseError> {
        OrderRepository::find_by_payment_intent(self, payment_intent_id).await
    }

    async fn insert(&self, order: NewOrder) -> Result<Order, DatabaseError> {
        OrderRepository::insert(self, order).await
    }

    async fn attach_uploaded_images(
        &self,
        order_id: Uuid,
        image_urls: &[String],
    ) -> Result<Vec<OrderImage>, DatabaseError> {
        OrderRepository::attach_uploaded_images(self, order_id, image_urls).await
    }
}

/// Everything needed to record an order for a settled payment.
#[derive(Debug, Clone)]
pub struct OrderParams {
    pub payment_intent_id: String,
    pub checkout_session_id: Option<String>,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub product_id: Option<String>,
    pub product_name: String,
    pub price: BigDecimal,
    pub pregnancy_week: Option<i32>,
    pub image_urls: Vec<String>,
}

/// Result of recording a paid order. created is false when the order
/// already existed for this payment intent.
#[derive(Debug, Clone)]
pub struct OrderOutcome {
    pub order: Order,
    pub created: bool,
    pub images_attached: bool,
    pub email_sent: bool,
}

pub struct OrderWriter {
    store: Arc<dyn OrderStore>,
    mailer: Arc<dyn Mailer>,
    from_address: String,
}

impl OrderWriter {
    pub fn new(store: Arc<dyn OrderStore>, mailer: Arc<dyn Mailer>, from_address: String) -> Self {
        Self {
            store,
            mailer,
            from_address,
        }
    }

    /// Record an order for a settled payment.
    ///
    /// Image attachment and the confirmation email are best effort: the
    /// customer has been charged, so once the order row exists this
    /// returns Ok even if those follow-ups fail.
    pub async fn record_paid_order(&self, params: OrderParams) -> Result<OrderOutcome, AppError> {
        if let Some(existing) = self
            .store
            .find_by_payment_intent(&params.payment_intent_id)
            .await
            .map_err(AppError::from)?
        {
            info!(
                order_id = %existing.id,
                payment_intent_id = %params.payment_intent_id,
                "order already exists for payment intent"
            );
            return Ok(OrderOutcome {
                order: existing,
                created: false,
                images_attached: false,
                email_sent: false,
            });
        }

        // The catalog column only holds UUIDs; legacy string identifiers
        // survive in the display name and the provider metadata.
        let product_uuid = params
            .product_id
            .as_deref()
            .and_then(|id| Uuid::parse_str(id).ok());

        let new_order = NewOrder {
            customer_email: params.customer_email.clone(),
            customer_name: params.customer_name.clone(),
            package_name: params.product_name.clone(),
            product_id: product_uuid,
            price: params.price.clone(),
            pregnancy_week: params.pregnancy_week,
            status: "processing".to_string(),
            stripe_payment_intent_id: params.payment_intent_id.clone(),
            stripe_checkout_session_id: params.checkout_session_id.clone(),
        };

        let order = match self.store.insert(new_order).await {
            Ok(order) => order,
            Err(err) if err.is_unique_violation() => {
                // Lost the race to a concurrent confirmation; the winner's
                // row is the order.
                let existing = self
                    .store
                    .find_by_payment_intent(&params.payment_intent_id)
                    .await
                    .map_err(AppError::from)?;
                match existing {
                    Some(order) => {
                        info!(
                            order_id = %order.id,
                            payment_intent_id = %params.payment_intent_id,
                            "concurrent confirmation won the insert race"
                        );
                        return Ok(OrderOutcome {
                            order,
                            created: false,
                            images_attached: false,
                            email_sent: false,
                        });
                    }
                    None => {
                        return Err(AppError::new(AppErrorKind::Domain(
                            DomainError::OrderCreationFailed {
                                payment_intent_id: params.payment_intent_id.clone(),
                                reason: "duplicate key reported but no row found on re-read"
                                    .to_string(),
                            },
                        )));
                    }
                }
            }
            Err(err) => {
                return Err(AppError::new(AppErrorKind::Domain(
                    DomainError::OrderCreationFailed {
                        payment_intent_id: params.payment_intent_id.clone(),
                        reason: err.to_string(),
                    },
                )));
            }
        };

        info!(
            order_id = %order.id,
            payment_intent_id = %params.payment_intent_id,
            package_name = %order.package_name,
            "order created"
        );

        let images_attached = if params.image_urls.is_empty() {
            false
        } else {
            match self
                .store
                .attach_uploaded_images(order.id, &params.image_urls)
                .await
            {
                Ok(_) => true,
                Err(err) => {
                    warn!(
                        order_id = %order.id,
                        error = %err,
                        "failed to attach uploaded images"
                    );
                    false
                }
            }
        };

        let email_sent = self
            .send_confirmation(&order, params.customer_name.as_deref())
            .await;

        Ok(OrderOutcome {
            order,
            created: true,
            images_attached,
            email_sent,
        })
    }

    async fn send_confirmation(&self, order: &Order, customer_name: Option<&str>) -> bool {
        let html = templates::order_confirmation(
            &order.id.to_string(),
            &order.package_name,
            &order.price,
            customer_name,
        );
        let message = EmailMessage {
            from: self.from_address.clone(),
            to: order.customer_email.clone(),
            reply_to: None,
            subject: "Order Confirmed - VignetteLab Studio".to_string(),
            html,
        };

        match self.mailer.send(message).await {
            Ok(_) => true,
            Err(err) => {
                warn!(
                    order_id = %order.id,
                    error = %err,
                    "failed to send confirmation email"
                );
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::{EmailError, EmailResult};
    use chrono::Utc;
    use std::str::FromStr;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryStore {
        orders: Mutex<Vec<Order>>,
        images: Mutex<Vec<(Uuid, String)>>,
        fail_image_insert: bool,
        report_duplicate_once: Mutex<bool>,
    }

    impl MemoryStore {
        fn make_order(new_order: &NewOrder) -> Order {
            Order {
                id: Uuid::new_v4(),
                customer_email: new_order.customer_email.clone(),
                customer_name: new_order.customer_name.clone(),
                package_name: new_order.package_name.clone(),
                product_id: new_order.product_id,
                price: new_order.price.clone(),
                pregnancy_week: new_order.pregnancy_week,
                status: new_order.status.clone(),
                stripe_payment_intent_id: new_order.stripe_payment_intent_id.clone(),
                stripe_checkout_session_id: new_order.stripe_checkout_session_id.clone(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            }
        }
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
            // Simulates the concurrent-confirmation race: report a
            // duplicate while inserting the winner's row.
            let race = {
                let mut flag = self.report_duplicate_once.lock().unwrap();
                std::mem::replace(&mut *flag, false)
            };
            if race {
                let winner = Self::make_order(&new_order);
                self.orders.lock().unwrap().push(winner);
                return Err(DatabaseError::UniqueViolation {
                    constraint: "orders_stripe_payment_intent_id_key".to_string(),
                });
            }

            let exists = self
                .orders
                .lock()
                .unwrap()
                .iter()
                .any(|o| o.stripe_payment_intent_id == new_order.stripe_payment_intent_id);
            if exists {
                return Err(DatabaseError::UniqueViolation {
                    constraint: "orders_stripe_payment_intent_id_key".to_string(),
                });
            }

            let order = Self::make_order(&new_order);
            self.orders.lock().unwrap().push(order.clone());
            Ok(order)
        }

        async fn attach_uploaded_images(
            &self,
            order_id: Uuid,
            image_urls: &[String],
        ) -> Result<Vec<OrderImage>, DatabaseError> {
            if self.fail_image_insert {
                return Err(DatabaseError::Query {
                    message: "image insert failed".to_string(),
                });
            }
            let mut images = self.images.lock().unwrap();
            let mut inserted = Vec::new();
            for url in image_urls {
                images.push((order_id, url.clone()));
                inserted.push(OrderImage {
                    id: Uuid::new_v4(),
                    order_id,
                    image_url: url.clone(),
                    image_type: "uploaded".to_string(),
                    created_at: Utc::now(),
                });
            }
            Ok(inserted)
        }
    }

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: EmailMessage) -> EmailResult<Option<String>> {
            if self.fail {
                return Err(EmailError::ProviderError {
                    message: "rate limited".to_string(),
                });
            }
            self.sent.lock().unwrap().push(message);
            Ok(Some("email_1".to_string()))
        }
    }

    fn params(payment_intent_id: &str) -> OrderParams {
        OrderParams {
            payment_intent_id: payment_intent_id.to_string(),
            checkout_session_id: None,
            customer_email: "jess@example.com".to_string(),
            customer_name: Some("Jess".to_string()),
            product_id: Some("portrait-single".to_string()),
            product_name: "Single Portrait".to_string(),
            price: BigDecimal::from_str("29.99").unwrap(),
            pregnancy_week: Some(24),
            image_urls: vec!["https://cdn.example.com/a.jpg".to_string()],
        }
    }

    fn writer(store: Arc<MemoryStore>, mailer: Arc<RecordingMailer>) -> OrderWriter {
        OrderWriter::new(store, mailer, "noreply@vignettelab.com".to_string())
    }

    #[tokio::test]
    async fn creates_order_with_images_and_email() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let writer = writer(store.clone(), mailer.clone());

        let outcome = writer.record_paid_order(params("pi_1")).await.unwrap();

        assert!(outcome.created);
        assert!(outcome.images_attached);
        assert!(outcome.email_sent);
        assert_eq!(outcome.order.status, "processing");
        assert_eq!(store.images.lock().unwrap().len(), 1);

        let sent = mailer.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "jess@example.com");
        assert!(sent[0].html.contains("Hi Jess,"));
    }

    #[tokio::test]
    async fn non_uuid_product_id_is_stored_as_null() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let writer = writer(store.clone(), mailer.clone());

        let outcome = writer.record_paid_order(params("pi_1b")).await.unwrap();
        assert!(outcome.order.product_id.is_none());
        assert_eq!(outcome.order.package_name, "Single Portrait");

        let uuid = Uuid::new_v4();
        let mut p = params("pi_1c");
        p.product_id = Some(uuid.to_string());
        let outcome = writer.record_paid_order(p).await.unwrap();
        assert_eq!(outcome.order.product_id, Some(uuid));
    }

    #[tokio::test]
    async fn repeat_confirmation_returns_existing_order() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let writer = writer(store.clone(), mailer.clone());

        let first = writer.record_paid_order(params("pi_2")).await.unwrap();
        let second = writer.record_paid_order(params("pi_2")).await.unwrap();

        assert!(first.created);
        assert!(!second.created);
        assert_eq!(first.order.id, second.order.id);
        // No duplicate email or images on the second pass.
        assert_eq!(mailer.sent.lock().unwrap().len(), 1);
        assert_eq!(store.images.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn lost_insert_race_recovers_winner_row() {
        let store = Arc::new(MemoryStore {
            report_duplicate_once: Mutex::new(true),
            ..Default::default()
        });
        let mailer = Arc::new(RecordingMailer::default());
        let writer = writer(store.clone(), mailer.clone());

        let outcome = writer.record_paid_order(params("pi_3")).await.unwrap();

        assert!(!outcome.created);
        assert_eq!(outcome.order.stripe_payment_intent_id, "pi_3");
        assert!(mailer.sent.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn image_failure_does_not_fail_the_order() {
        let store = Arc::new(MemoryStore {
            fail_image_insert: true,
            ..Default::default()
        });
        let mailer = Arc::new(RecordingMailer::default());
        let writer = writer(store.clone(), mailer.clone());

        let outcome = writer.record_paid_order(params("pi_4")).await.unwrap();

        assert!(outcome.created);
        assert!(!outcome.images_attached);
        assert!(outcome.email_sent);
    }

    #[tokio::test]
    async fn email_failure_does_not_fail_the_order() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer {
            fail: true,
            ..Default::default()
        });
        let writer = writer(store.clone(), mailer.clone());

        let outcome = writer.record_paid_order(params("pi_5")).await.unwrap();

        assert!(outcome.created);
        assert!(!outcome.email_sent);
    }

    #[tokio::test]
    async fn order_without_images_skips_attachment() {
        let store = Arc::new(MemoryStore::default());
        let mailer = Arc::new(RecordingMailer::default());
        let writer = writer(store.clone(), mailer.clone());

        let mut p = params("pi_6");
        p.image_urls.clear();
        let outcome = writer.record_paid_order(p).await.unwrap();

        assert!(outcome.created);
        assert!(!outcome.images_attached);
        assert!(store.images.lock().unwrap().is_empty());
    }
}
