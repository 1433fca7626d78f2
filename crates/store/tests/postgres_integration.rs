//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container for efficiency.
//! Run with:
//!
//! ```bash
//! cargo test -p store --test postgres_integration -- --test-threads=1
//! ```

use std::sync::Arc;

use chrono::Utc;
use common::{ProductId, UserId};
use domain::{
    Cart, CartLine, Money, Order, OrderBuilder, OrderStatus, PaymentMethod, PaymentStatus,
    Product, ShippingAddress, StatusUpdate,
};
use sqlx::PgPool;
use store::{PostgresStore, Store, StoreError};
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

/// Global shared container
static CONTAINER: OnceCell<Arc<ContainerInfo>> = OnceCell::const_new();

async fn get_container_info() -> Arc<ContainerInfo> {
    CONTAINER
        .get_or_init(|| async {
            let container = Postgres::default().start().await.unwrap();

            let host = container.get_host().await.unwrap();
            let port = container.get_host_port_ipv4(5432).await.unwrap();

            let connection_string =
                format!("postgres://postgres:postgres@{}:{}/postgres", host, port);

            let temp_pool = PgPool::connect(&connection_string).await.unwrap();
            sqlx::raw_sql(include_str!(
                "../../../migrations/001_create_commerce_tables.sql"
            ))
            .execute(&temp_pool)
            .await
            .unwrap();
            temp_pool.close().await;

            Arc::new(ContainerInfo {
                container,
                connection_string,
            })
        })
        .await
        .clone()
}

/// Get a fresh store with its own pool and cleared tables
async fn get_test_store() -> PostgresStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query("TRUNCATE TABLE products, carts, orders")
        .execute(&pool)
        .await
        .unwrap();

    PostgresStore::new(pool)
}

async fn seed_product(store: &PostgresStore, slug: &str, price: &str, stock: u32) -> Product {
    let product = Product::new("Widget", slug, price.parse().unwrap(), stock);
    store.insert_product(&product).await.unwrap();
    product
}

fn order_for(user_id: UserId, product: &Product, quantity: u32) -> Order {
    OrderBuilder::default()
        .build(
            user_id,
            &[CartLine {
                product: product.clone(),
                quantity,
            }],
            Some(ShippingAddress {
                full_name: Some("Ada Lovelace".to_string()),
                city: Some("London".to_string()),
                ..ShippingAddress::default()
            }),
            PaymentMethod::CashOnDelivery,
        )
        .unwrap()
        .into_order(Utc::now())
}

async fn stock_of(store: &PostgresStore, id: ProductId) -> u32 {
    store.get_product(id).await.unwrap().unwrap().stock
}

#[tokio::test]
async fn product_roundtrip_preserves_decimal_price() {
    let store = get_test_store().await;
    let product = seed_product(&store, "decimal-widget", "19.995", 7).await;

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.price, product.price);
    assert_eq!(loaded.stock, 7);
    assert!(loaded.active);

    let many = store
        .get_products(&[product.id, ProductId::new()])
        .await
        .unwrap();
    assert_eq!(many.len(), 1);
}

#[tokio::test]
async fn duplicate_slug_is_a_conflict() {
    let store = get_test_store().await;
    seed_product(&store, "same-slug", "1.00", 1).await;

    let clash = Product::new("Other", "same-slug", Money::from_cents(100), 1);
    let result = store.insert_product(&clash).await;
    assert!(matches!(result, Err(StoreError::Conflict(_))));
}

#[tokio::test]
async fn conditional_decrement_never_goes_negative() {
    let store = get_test_store().await;
    let product = seed_product(&store, "scarce", "5.00", 3).await;

    let mut uow = store.begin().await.unwrap();
    assert!(uow.decrement_stock(product.id, 2).await.unwrap());
    assert!(!uow.decrement_stock(product.id, 2).await.unwrap());
    uow.commit().await.unwrap();

    assert_eq!(stock_of(&store, product.id).await, 1);
}

#[tokio::test]
async fn increment_past_u32_max_is_invalid_data() {
    let store = get_test_store().await;
    let product = seed_product(&store, "plenty", "5.00", u32::MAX - 1).await;

    let mut uow = store.begin().await.unwrap();
    assert!(uow.increment_stock(product.id, 1).await.unwrap());
    let result = uow.increment_stock(product.id, 1).await;
    assert!(matches!(result, Err(StoreError::InvalidData(_))));
    assert!(!uow.increment_stock(ProductId::new(), 1).await.unwrap());
    uow.rollback().await.unwrap();

    assert_eq!(stock_of(&store, product.id).await, u32::MAX - 1);
}

#[tokio::test]
async fn rollback_restores_stock_and_drops_order() {
    let store = get_test_store().await;
    let product = seed_product(&store, "rollback", "5.00", 5).await;
    let order = order_for(UserId::new(), &product, 2);

    let mut uow = store.begin().await.unwrap();
    assert!(uow.decrement_stock(product.id, 2).await.unwrap());
    uow.insert_order(&order).await.unwrap();
    uow.rollback().await.unwrap();

    assert_eq!(stock_of(&store, product.id).await, 5);
    assert!(store.get_order(order.id).await.unwrap().is_none());
}

#[tokio::test]
async fn uncommitted_decrement_is_invisible_to_readers() {
    let store = get_test_store().await;
    let product = seed_product(&store, "isolated", "5.00", 5).await;

    let mut uow = store.begin().await.unwrap();
    assert!(uow.decrement_stock(product.id, 4).await.unwrap());

    // Read through the pool while the transaction is still open.
    assert_eq!(stock_of(&store, product.id).await, 5);

    uow.commit().await.unwrap();
    assert_eq!(stock_of(&store, product.id).await, 1);
}

#[tokio::test]
async fn concurrent_decrements_do_not_oversell() {
    let store = get_test_store().await;
    let product = seed_product(&store, "contended", "5.00", 3).await;

    let product_id = product.id;
    let mut handles = Vec::new();
    for _ in 0..6 {
        let store = store.clone();
        handles.push(tokio::spawn(async move {
            let mut uow = store.begin().await.unwrap();
            let ok = uow.decrement_stock(product_id, 1).await.unwrap();
            if ok {
                uow.commit().await.unwrap();
            } else {
                uow.rollback().await.unwrap();
            }
            ok
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.unwrap() {
            successes += 1;
        }
    }

    assert_eq!(successes, 3);
    assert_eq!(stock_of(&store, product.id).await, 0);
}

#[tokio::test]
async fn order_roundtrip_and_cancel_mark() {
    let store = get_test_store().await;
    let product = seed_product(&store, "order-roundtrip", "10.00", 5).await;
    let user_id = UserId::new();
    let order = order_for(user_id, &product, 2);

    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&order).await.unwrap();
    uow.commit().await.unwrap();

    let loaded = store.get_order(order.id).await.unwrap().unwrap();
    assert_eq!(loaded.items, order.items);
    assert_eq!(loaded.grand_total, order.grand_total);
    assert_eq!(loaded.shipping_address, order.shipping_address);
    assert_eq!(loaded.status, OrderStatus::Pending);
    assert_eq!(loaded.payment_status, PaymentStatus::Unpaid);

    let mut uow = store.begin().await.unwrap();
    assert!(uow.mark_order_cancelled(order.id, Utc::now()).await.unwrap());
    assert!(!uow.mark_order_cancelled(order.id, Utc::now()).await.unwrap());
    uow.commit().await.unwrap();

    let cancelled = store.get_order(order.id).await.unwrap().unwrap();
    assert!(cancelled.cancelled);
    assert!(cancelled.cancelled_at.is_some());

    let mine = store.list_orders_for_user(user_id).await.unwrap();
    assert_eq!(mine.len(), 1);
}

#[tokio::test]
async fn status_update_is_unconditional() {
    let store = get_test_store().await;
    let product = seed_product(&store, "status", "10.00", 5).await;
    let order = order_for(UserId::new(), &product, 1);

    let mut uow = store.begin().await.unwrap();
    uow.insert_order(&order).await.unwrap();
    uow.commit().await.unwrap();

    let delivered = store
        .update_order_status(
            order.id,
            StatusUpdate {
                status: Some(OrderStatus::Delivered),
                payment_status: Some(PaymentStatus::Paid),
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(delivered.status, OrderStatus::Delivered);

    let back = store
        .update_order_status(
            order.id,
            StatusUpdate {
                status: Some(OrderStatus::Pending),
                payment_status: None,
            },
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(back.status, OrderStatus::Pending);
    assert_eq!(back.payment_status, PaymentStatus::Paid);
}

#[tokio::test]
async fn cart_upsert_and_clear() {
    let store = get_test_store().await;
    let user_id = UserId::new();

    let mut cart = Cart::new(user_id);
    cart.add_item(ProductId::new(), 2);
    let saved = store.save_cart(&cart).await.unwrap();

    // A second save for the same user keeps the original cart id.
    let mut replacement = Cart::new(user_id);
    replacement.add_item(ProductId::new(), 1);
    let resaved = store.save_cart(&replacement).await.unwrap();
    assert_eq!(resaved.id, saved.id);
    assert_eq!(resaved.items.len(), 1);

    let mut uow = store.begin().await.unwrap();
    assert!(uow.clear_cart(saved.id).await.unwrap());
    assert!(!uow.clear_cart(saved.id).await.unwrap());
    uow.commit().await.unwrap();

    let cleared = store.get_cart(user_id).await.unwrap().unwrap();
    assert!(cleared.is_empty());
}
