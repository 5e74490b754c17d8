use crate::database::error::DatabaseError;
use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{types::BigDecimal, FromRow, PgPool};
use uuid::Uuid;

/// Order entity. package_name is the denormalized display name (legacy
/// column name kept for compatibility with existing rows); product_id
/// only holds catalog UUIDs, non-UUID identifiers are stored as null.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: Uuid,
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub package_name: String,
    pub product_id: Option<Uuid>,
    pub price: BigDecimal,
    pub pregnancy_week: Option<i32>,
    pub status: String,
    pub stripe_payment_intent_id: String,
    pub stripe_checkout_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Image attached to an order: either a customer-submitted source photo
/// (type `uploaded`) or an operator-delivered result (type `final`).
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct OrderImage {
    pub id: Uuid,
    pub order_id: Uuid,
    pub image_url: String,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub image_type: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a new order row.
#[derive(Debug, Clone)]
pub struct NewOrder {
    pub customer_email: String,
    pub customer_name: Option<String>,
    pub package_name: String,
    pub product_id: Option<Uuid>,
    pub price: BigDecimal,
    pub pregnancy_week: Option<i32>,
    pub status: String,
    pub stripe_payment_intent_id: String,
    pub stripe_checkout_session_id: Option<String>,
}

/// Repository for orders and their attached images
#[derive(Clone)]
pub struct OrderRepository {
    pool: PgPool,
}

const ORDER_COLUMNS: &str = "id, customer_email, customer_name, package_name, product_id, \
     price, pregnancy_week, status, stripe_payment_intent_id, stripe_checkout_session_id, \
     created_at, updated_at";

impl OrderRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Look up an order by its Stripe payment intent id.
    pub async fn find_by_payment_intent(
        &self,
        payment_intent_id: &str,
    ) -> Result<Option<Order>, DatabaseError> {
        sqlx::query_as::<_, Order>(&format!(
            "SELECT {} FROM orders WHERE stripe_payment_intent_id = $1",
            ORDER_COLUMNS
        ))
        .bind(payment_intent_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Insert a new order. The unique constraint on stripe_payment_intent_id
    /// makes this safe under concurrent confirmation: the loser of the race
    /// gets DatabaseError::UniqueViolation and should re-read instead.
    pub async fn insert(&self, order: NewOrder) -> Result<Order, DatabaseError> {
        sqlx::query_as::<_, Order>(&format!(
            "INSERT INTO orders \
             (customer_email, customer_name, package_name, product_id, price, \
              pregnancy_week, status, stripe_payment_intent_id, stripe_checkout_session_id) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(&order.customer_email)
        .bind(&order.customer_name)
        .bind(&order.package_name)
        .bind(order.product_id)
        .bind(&order.price)
        .bind(order.pregnancy_week)
        .bind(&order.status)
        .bind(&order.stripe_payment_intent_id)
        .bind(&order.stripe_checkout_session_id)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Batch-insert the customer's uploaded source images for an order.
    pub async fn attach_uploaded_images(
        &self,
        order_id: Uuid,
        image_urls: &[String],
    ) -> Result<Vec<OrderImage>, DatabaseError> {
        if image_urls.is_empty() {
            return Ok(Vec::new());
        }

        sqlx::query_as::<_, OrderImage>(
            "INSERT INTO order_images (order_id, image_url, type) \
             SELECT $1, url, 'uploaded' FROM UNNEST($2::text[]) AS url \
             RETURNING id, order_id, image_url, type, created_at",
        )
        .bind(order_id)
        .bind(image_urls)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// List all images attached to an order, oldest first.
    pub async fn list_images(&self, order_id: Uuid) -> Result<Vec<OrderImage>, DatabaseError> {
        sqlx::query_as::<_, OrderImage>(
            "SELECT id, order_id, image_url, type, created_at \
             FROM order_images WHERE order_id = $1 ORDER BY created_at",
        )
        .bind(order_id)
        .fetch_all(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }

    /// Update order status, bumping updated_at.
    pub async fn update_status(
        &self,
        order_id: Uuid,
        status: &str,
    ) -> Result<Order, DatabaseError> {
        sqlx::query_as::<_, Order>(&format!(
            "UPDATE orders SET status = $2, updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            ORDER_COLUMNS
        ))
        .bind(order_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from_sqlx)
    }
}
