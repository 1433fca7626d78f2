use async_trait::async_trait;
use chrono::{DateTime, Utc};
use common::{CartId, OrderId, ProductId, UserId};
use domain::{
    Cart, CartItem, LineItem, Money, Order, OrderStatus, PaymentMethod, PaymentStatus, Product,
    ShippingAddress, StatusUpdate,
};
use rust_decimal::Decimal;
use sqlx::types::Json;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, Row, Transaction};
use uuid::Uuid;

use crate::{
    Result, StoreError,
    store::{Store, UnitOfWork},
};

const PRODUCT_COLUMNS: &str =
    "id, title, slug, price, stock, is_active, created_at, updated_at";

const ORDER_COLUMNS: &str = "id, user_id, items, shipping_address, payment_method, subtotal, \
     shipping_fee, tax, grand_total, status, payment_status, cancelled, cancelled_at, \
     created_at, updated_at";

/// PostgreSQL-backed store implementation.
///
/// Each unit of work is one database transaction at the default READ
/// COMMITTED level: other sessions never see uncommitted rows, and the
/// conditional stock update re-evaluates its predicate against the latest
/// committed row after waiting on a concurrent writer.
#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Creates a new PostgreSQL store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool against `database_url`.
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "connected to PostgreSQL");
        Ok(Self::new(pool))
    }

    /// Gets a reference to the underlying connection pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Runs the database migrations.
    pub async fn run_migrations(&self) -> Result<()> {
        sqlx::migrate!("../../migrations").run(&self.pool).await?;
        Ok(())
    }

    fn row_to_product(row: PgRow) -> Result<Product> {
        Ok(Product {
            id: ProductId::from_uuid(row.try_get::<Uuid, _>("id")?),
            title: row.try_get("title")?,
            slug: row.try_get("slug")?,
            price: Money::new(row.try_get::<Decimal, _>("price")?),
            stock: to_quantity(row.try_get("stock")?)?,
            active: row.try_get("is_active")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_cart(row: PgRow) -> Result<Cart> {
        let Json(items) = row.try_get::<Json<Vec<CartItem>>, _>("items")?;
        Ok(Cart {
            id: CartId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            items,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn row_to_order(row: PgRow) -> Result<Order> {
        let Json(items) = row.try_get::<Json<Vec<LineItem>>, _>("items")?;
        let shipping_address = row
            .try_get::<Option<Json<ShippingAddress>>, _>("shipping_address")?
            .map(|Json(address)| address);

        Ok(Order {
            id: OrderId::from_uuid(row.try_get::<Uuid, _>("id")?),
            user_id: UserId::from_uuid(row.try_get::<Uuid, _>("user_id")?),
            items,
            shipping_address,
            payment_method: parse_column::<PaymentMethod>(&row, "payment_method")?,
            subtotal: Money::new(row.try_get("subtotal")?),
            shipping_fee: Money::new(row.try_get("shipping_fee")?),
            tax: Money::new(row.try_get("tax")?),
            grand_total: Money::new(row.try_get("grand_total")?),
            status: parse_column::<OrderStatus>(&row, "status")?,
            payment_status: parse_column::<PaymentStatus>(&row, "payment_status")?,
            cancelled: row.try_get("cancelled")?,
            cancelled_at: row.try_get("cancelled_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

fn to_quantity(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| StoreError::InvalidData(format!("stock out of range: {value}")))
}

fn parse_column<T>(row: &PgRow, column: &str) -> Result<T>
where
    T: std::str::FromStr<Err = domain::DomainError>,
{
    let raw: String = row.try_get(column)?;
    raw.parse()
        .map_err(|e: domain::DomainError| StoreError::InvalidData(e.to_string()))
}

#[async_trait]
impl Store for PostgresStore {
    async fn begin(&self) -> Result<Box<dyn UnitOfWork>> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresUnitOfWork { tx }))
    }

    async fn insert_product(&self, product: &Product) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO products (id, title, slug, price, stock, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(product.id.as_uuid())
        .bind(&product.title)
        .bind(&product.slug)
        .bind(product.price.amount())
        .bind(i64::from(product.stock))
        .bind(product.active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(ref db_err) = e
                && db_err.constraint() == Some("unique_product_slug")
            {
                return StoreError::Conflict(format!("slug '{}' is already taken", product.slug));
            }
            StoreError::Database(e)
        })?;

        Ok(())
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let row = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
        ))
        .bind(id.as_uuid())
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_product).transpose()
    }

    async fn get_products(&self, ids: &[ProductId]) -> Result<Vec<Product>> {
        let uuids: Vec<Uuid> = ids.iter().map(ProductId::as_uuid).collect();
        let rows = sqlx::query(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"
        ))
        .bind(uuids)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_product).collect()
    }

    async fn set_product_price(&self, id: ProductId, price: Money) -> Result<bool> {
        let result =
            sqlx::query("UPDATE products SET price = $2, updated_at = NOW() WHERE id = $1")
                .bind(id.as_uuid())
                .bind(price.amount())
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn get_cart(&self, user_id: UserId) -> Result<Option<Cart>> {
        let row = sqlx::query("SELECT id, user_id, items, updated_at FROM carts WHERE user_id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_cart).transpose()
    }

    async fn save_cart(&self, cart: &Cart) -> Result<Cart> {
        let row = sqlx::query(
            r#"
            INSERT INTO carts (id, user_id, items, updated_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE SET
                items = EXCLUDED.items,
                updated_at = EXCLUDED.updated_at
            RETURNING id, user_id, items, updated_at
            "#,
        )
        .bind(cart.id.as_uuid())
        .bind(cart.user_id.as_uuid())
        .bind(Json(&cart.items))
        .bind(cart.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Self::row_to_cart(row)
    }

    async fn get_order(&self, id: OrderId) -> Result<Option<Order>> {
        let row = sqlx::query(&format!("SELECT {ORDER_COLUMNS} FROM orders WHERE id = $1"))
            .bind(id.as_uuid())
            .fetch_optional(&self.pool)
            .await?;

        row.map(Self::row_to_order).transpose()
    }

    async fn list_orders_for_user(&self, user_id: UserId) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders WHERE user_id = $1 ORDER BY created_at DESC"
        ))
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn list_orders(&self) -> Result<Vec<Order>> {
        let rows = sqlx::query(&format!(
            "SELECT {ORDER_COLUMNS} FROM orders ORDER BY created_at DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Self::row_to_order).collect()
    }

    async fn update_order_status(
        &self,
        id: OrderId,
        update: StatusUpdate,
    ) -> Result<Option<Order>> {
        let row = sqlx::query(&format!(
            r#"
            UPDATE orders SET
                status = COALESCE($2, status),
                payment_status = COALESCE($3, payment_status),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {ORDER_COLUMNS}
            "#
        ))
        .bind(id.as_uuid())
        .bind(update.status.map(|s| s.as_str()))
        .bind(update.payment_status.map(|s| s.as_str()))
        .fetch_optional(&self.pool)
        .await?;

        row.map(Self::row_to_order).transpose()
    }
}

struct PostgresUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PostgresUnitOfWork {
    async fn decrement_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET stock = stock - $2, updated_at = NOW()
            WHERE id = $1 AND stock >= $2
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn increment_stock(&mut self, product_id: ProductId, quantity: u32) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE products SET stock = stock + $2, updated_at = NOW()
            WHERE id = $1 AND stock + $2 <= $3
            "#,
        )
        .bind(product_id.as_uuid())
        .bind(i64::from(quantity))
        .bind(i64::from(u32::MAX))
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        // No row matched: either the product is gone or the sum would not fit a u32.
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM products WHERE id = $1)")
                .bind(product_id.as_uuid())
                .fetch_one(&mut *self.tx)
                .await?;

        if exists {
            return Err(StoreError::InvalidData(format!(
                "stock overflow for product {product_id}"
            )));
        }
        Ok(false)
    }

    async fn insert_order(&mut self, order: &Order) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, user_id, items, shipping_address, payment_method, subtotal,
                                shipping_fee, tax, grand_total, status, payment_status, cancelled,
                                cancelled_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(order.id.as_uuid())
        .bind(order.user_id.as_uuid())
        .bind(Json(&order.items))
        .bind(order.shipping_address.as_ref().map(Json))
        .bind(order.payment_method.as_str())
        .bind(order.subtotal.amount())
        .bind(order.shipping_fee.amount())
        .bind(order.tax.amount())
        .bind(order.grand_total.amount())
        .bind(order.status.as_str())
        .bind(order.payment_status.as_str())
        .bind(order.cancelled)
        .bind(order.cancelled_at)
        .bind(order.created_at)
        .bind(order.updated_at)
        .execute(&mut *self.tx)
        .await?;

        Ok(())
    }

    async fn mark_order_cancelled(&mut self, order_id: OrderId, at: DateTime<Utc>) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE orders SET cancelled = TRUE, cancelled_at = $2, updated_at = $2
            WHERE id = $1
              AND cancelled = FALSE
              AND status = 'pending'
              AND payment_status = 'unpaid'
            "#,
        )
        .bind(order_id.as_uuid())
        .bind(at)
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn clear_cart(&mut self, cart_id: CartId) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE carts SET items = '[]'::jsonb, updated_at = NOW()
            WHERE id = $1 AND jsonb_array_length(items) > 0
            "#,
        )
        .bind(cart_id.as_uuid())
        .execute(&mut *self.tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await?;
        Ok(())
    }
}
