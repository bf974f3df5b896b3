//! PostgreSQL integration tests
//!
//! These tests use a shared PostgreSQL container and need a Docker daemon.
//! Run with:
//!
//! ```bash
//! cargo test -p entity-store --test postgres_integration -- --ignored --test-threads=1
//! ```

use std::sync::Arc;

use entity_store::{
    AddressUpdate, CategoryId, EntityStore, NewAddress, NewCartItem, NewProduct, NewReview, NewUser,
    PostgresEntityStore, Product, ProductQuery, ProductSortField, Properties, ReviewQuery,
    SortKey, StoreError, User, constraints,
};
use rust_decimal::Decimal;
use sqlx::PgPool;
use testcontainers::{ContainerAsync, runners::AsyncRunner};
use testcontainers_modules::postgres::Postgres;
use tokio::sync::OnceCell;

/// Shared container info - container stays alive for all tests
struct ContainerInfo {
    #[allow(dead_code)] // Container must stay alive for tests
    container: ContainerAsync<Postgres>,
    connection_string: String,
}

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
                "../../../migrations/001_create_shop_tables.sql"
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
async fn get_test_store() -> PostgresEntityStore {
    let info = get_container_info().await;

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(5)
        .connect(&info.connection_string)
        .await
        .unwrap();

    sqlx::query(
        "TRUNCATE TABLE wish_items, cart_items, carts, reviews, products, categories, auth_tokens, users, addresses",
    )
    .execute(&pool)
    .await
    .unwrap();

    PostgresEntityStore::new(pool)
}

async fn create_user(store: &PostgresEntityStore, email: &str) -> User {
    store
        .create_user(NewUser {
            email: email.to_string(),
            name: "Test".to_string(),
            surname: "User".to_string(),
            password_hash: "hash".to_string(),
            is_staff: false,
        })
        .await
        .unwrap()
}

async fn create_product(store: &PostgresEntityStore, category_id: CategoryId, cents: i64) -> Product {
    let mut properties = Properties::new();
    properties.insert("color".to_string(), serde_json::json!("red"));

    store
        .create_product(NewProduct {
            name: "Sneaker".to_string(),
            description: "Running shoe".to_string(),
            brand: "Acme".to_string(),
            price: Decimal::new(cents, 2),
            stock: 10,
            category_id,
            properties,
        })
        .await
        .unwrap()
}

fn review(user: &User, product: &Product, rating: i32) -> NewReview {
    NewReview {
        rating,
        commentary: String::new(),
        user_id: user.id,
        product_id: product.id,
    }
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn user_round_trip_with_cart() {
    let store = get_test_store().await;
    let user = create_user(&store, "alice@example.com").await;

    let loaded = store.get_user(user.id).await.unwrap().unwrap();
    assert_eq!(loaded, user);
    assert!(store.cart_for_user(user.id).await.unwrap().is_some());

    let err = store
        .create_user(NewUser {
            email: "alice@example.com".to_string(),
            name: String::new(),
            surname: String::new(),
            password_hash: "hash".to_string(),
            is_staff: false,
        })
        .await
        .unwrap_err();
    assert!(err.is_unique_violation_of(constraints::USER_EMAIL));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn category_name_unique_ignoring_case() {
    let store = get_test_store().await;
    store.create_category("Shoes").await.unwrap();

    let err = store.create_category("SHOES").await.unwrap_err();
    assert!(err.is_unique_violation_of(constraints::CATEGORY_NAME));

    let found = store.find_category_by_name("shoes").await.unwrap();
    assert_eq!(found.unwrap().name, "Shoes");
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn product_properties_and_price_survive() {
    let store = get_test_store().await;
    let category = store.create_category("Shoes").await.unwrap();
    let product = create_product(&store, category.id, 10099).await;

    let loaded = store.get_product(product.id).await.unwrap().unwrap();
    assert_eq!(loaded.price, Decimal::new(10099, 2));
    assert_eq!(loaded.properties.get("color"), Some(&serde_json::json!("red")));
    assert_eq!(loaded.rating, 0.0);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn product_with_missing_category_rejected() {
    let store = get_test_store().await;

    let err = store
        .create_product(NewProduct {
            name: "Ghost".to_string(),
            description: String::new(),
            brand: String::new(),
            price: Decimal::new(100, 0),
            stock: 1,
            category_id: CategoryId::new(),
            properties: Properties::new(),
        })
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::ForeignKeyViolation { ref constraint } if constraint == constraints::PRODUCT_CATEGORY_FK
    ));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn rating_recomputed_on_review_changes() {
    let store = get_test_store().await;
    let category = store.create_category("Shoes").await.unwrap();
    let product = create_product(&store, category.id, 5000).await;
    let alice = create_user(&store, "alice@example.com").await;
    let bob = create_user(&store, "bob@example.com").await;

    store.create_review(review(&alice, &product, 5)).await.unwrap();
    let mut low = store.create_review(review(&bob, &product, 3)).await.unwrap();
    let rating = store.get_product(product.id).await.unwrap().unwrap().rating;
    assert_eq!(rating, 4.0);

    low.rating = 1;
    store.update_review(&low).await.unwrap();
    let rating = store.get_product(product.id).await.unwrap().unwrap().rating;
    assert_eq!(rating, 3.0);

    store.delete_review(low.id).await.unwrap();
    let rating = store.get_product(product.id).await.unwrap().unwrap().rating;
    assert_eq!(rating, 5.0);

    let err = store
        .create_review(review(&alice, &product, 2))
        .await
        .unwrap_err();
    assert!(err.is_unique_violation_of(constraints::REVIEW_USER_PRODUCT));
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn list_products_filtered_and_ordered() {
    let store = get_test_store().await;
    let shoes = store.create_category("Shoes").await.unwrap();
    let hats = store.create_category("Hats").await.unwrap();
    let bags = store.create_category("Bags").await.unwrap();

    let cheap = create_product(&store, shoes.id, 1000).await;
    let pricey = create_product(&store, hats.id, 9000).await;
    create_product(&store, bags.id, 5000).await;

    let products = store
        .list_products(
            ProductQuery::new()
                .in_categories(vec![shoes.id, hats.id])
                .order_by(SortKey::desc(ProductSortField::Price)),
        )
        .await
        .unwrap();

    let ids: Vec<_> = products.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![pricey.id, cheap.id]);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn cart_upsert_merges_quantity() {
    let store = get_test_store().await;
    let category = store.create_category("Shoes").await.unwrap();
    let product = create_product(&store, category.id, 1000).await;
    let user = create_user(&store, "alice@example.com").await;
    let cart = store.cart_for_user(user.id).await.unwrap().unwrap();

    let item = NewCartItem {
        cart_id: cart.id,
        product_id: product.id,
        quantity: 2,
    };
    let first = store.add_cart_item(item).await.unwrap();
    let merged = store
        .add_cart_item(NewCartItem { quantity: 3, ..item })
        .await
        .unwrap();

    assert_eq!(first.id, merged.id);
    assert_eq!(merged.quantity, 5);
    assert_eq!(store.list_cart_items(cart.id).await.unwrap().len(), 1);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn cart_merge_overflow_keeps_line() {
    let store = get_test_store().await;
    let category = store.create_category("Shoes").await.unwrap();
    let product = create_product(&store, category.id, 1000).await;
    let user = create_user(&store, "alice@example.com").await;
    let cart = store.cart_for_user(user.id).await.unwrap().unwrap();

    let item = NewCartItem {
        cart_id: cart.id,
        product_id: product.id,
        quantity: i32::MAX,
    };
    store.add_cart_item(item).await.unwrap();
    let err = store
        .add_cart_item(NewCartItem { quantity: 1, ..item })
        .await
        .unwrap_err();

    assert!(matches!(err, StoreError::OutOfRange { column: "quantity" }));
    let items = store.list_cart_items(cart.id).await.unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].quantity, i32::MAX);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn delete_user_cascades() {
    let store = get_test_store().await;
    let category = store.create_category("Shoes").await.unwrap();
    let product = create_product(&store, category.id, 1000).await;
    let alice = create_user(&store, "alice@example.com").await;
    let bob = create_user(&store, "bob@example.com").await;

    store
        .update_user(
            &alice,
            AddressUpdate::Replace(NewAddress {
                country: "PL".to_string(),
                city: "Krakow".to_string(),
                street: "Dluga".to_string(),
                house: 3,
                postal_code: "31-147".to_string(),
            }),
        )
        .await
        .unwrap();
    store.create_review(review(&alice, &product, 1)).await.unwrap();
    store.create_review(review(&bob, &product, 5)).await.unwrap();
    store.create_wish_item(alice.id, product.id).await.unwrap();

    assert!(store.delete_user(alice.id).await.unwrap());
    assert!(!store.delete_user(alice.id).await.unwrap());

    let reviews = store
        .list_reviews(ReviewQuery::new().product(product.id))
        .await
        .unwrap();
    assert_eq!(reviews.len(), 1);
    assert!(store.list_wish_items(alice.id).await.unwrap().is_empty());
    assert_eq!(
        store.get_product(product.id).await.unwrap().unwrap().rating,
        5.0
    );

    let addresses: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM addresses")
        .fetch_one(store.pool())
        .await
        .unwrap();
    assert_eq!(addresses, 0);
}

#[tokio::test]
#[ignore = "requires a Docker daemon"]
async fn token_is_created_once() {
    let store = get_test_store().await;
    let user = create_user(&store, "alice@example.com").await;

    let first = store
        .token_for_user(user.id, "a".repeat(40))
        .await
        .unwrap();
    let second = store
        .token_for_user(user.id, "b".repeat(40))
        .await
        .unwrap();

    assert_eq!(first.key, second.key);
    let found = store.find_token(&first.key).await.unwrap().unwrap();
    assert_eq!(found.user_id, user.id);
}
