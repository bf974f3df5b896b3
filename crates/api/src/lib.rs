//! HTTP API server with observability for the storefront backend.
//!
//! Provides REST endpoints for accounts, the catalog, reviews, carts and
//! wishlists, with structured logging (tracing) and Prometheus metrics.

pub mod config;
pub mod db;
pub mod error;
pub mod extract;
pub mod routes;

use std::sync::Arc;

use axum::Router;
use axum::routing::{get, post};
use domain::{AccountService, CartService, CatalogService, ReviewService, WishlistService};
use entity_store::EntityStore;
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Shared application state accessible from all handlers.
pub struct AppState<S: EntityStore> {
    pub catalog: CatalogService<S>,
    pub reviews: ReviewService<S>,
    pub accounts: AccountService<S>,
    pub cart: CartService<S>,
    pub wishlist: WishlistService<S>,
}

/// Creates the application state with every service backed by `store`.
pub fn create_state<S: EntityStore + Clone + 'static>(store: S) -> Arc<AppState<S>> {
    Arc::new(AppState {
        catalog: CatalogService::new(store.clone()),
        reviews: ReviewService::new(store.clone()),
        accounts: AccountService::new(store.clone()),
        cart: CartService::new(store.clone()),
        wishlist: WishlistService::new(store),
    })
}

/// Creates the Axum application router with all routes and shared state.
pub fn create_app<S: EntityStore + Clone + 'static>(
    state: Arc<AppState<S>>,
    metrics_handle: PrometheusHandle,
) -> Router {
    use routes::{auth, cart, categories, products, reviews, users, wishlist};

    let metrics_router = Router::new()
        .route("/metrics", get(routes::metrics::get))
        .with_state(metrics_handle);

    Router::new()
        .route("/health", get(routes::health::check))
        .route("/register", post(auth::register::<S>))
        .route("/token", post(auth::token::<S>))
        .route("/users", get(users::list::<S>))
        .route("/users/{id}", get(users::get::<S>))
        .route(
            "/me",
            get(users::me::<S>)
                .put(users::replace_me::<S>)
                .patch(users::update_me::<S>)
                .delete(users::delete_me::<S>),
        )
        .route(
            "/categories",
            get(categories::list::<S>).post(categories::create::<S>),
        )
        .route(
            "/categories/{id}",
            get(categories::get::<S>)
                .put(categories::replace::<S>)
                .patch(categories::update::<S>)
                .delete(categories::delete::<S>),
        )
        .route(
            "/products",
            get(products::list::<S>).post(products::create::<S>),
        )
        .route(
            "/products/{id}",
            get(products::get::<S>)
                .put(products::replace::<S>)
                .patch(products::update::<S>)
                .delete(products::delete::<S>),
        )
        .route(
            "/reviews",
            get(reviews::list::<S>).post(reviews::create::<S>),
        )
        .route(
            "/reviews/{id}",
            get(reviews::get::<S>)
                .put(reviews::replace::<S>)
                .patch(reviews::update::<S>)
                .delete(reviews::delete::<S>),
        )
        .route("/cart", get(cart::list::<S>).post(cart::create::<S>))
        .route(
            "/cart/{id}",
            get(cart::get::<S>)
                .put(cart::replace::<S>)
                .patch(cart::update::<S>)
                .delete(cart::delete::<S>),
        )
        .route(
            "/wishlist",
            get(wishlist::list::<S>).post(wishlist::create::<S>),
        )
        .route(
            "/wishlist/{id}",
            get(wishlist::get::<S>).delete(wishlist::delete::<S>),
        )
        .with_state(state)
        .merge(metrics_router)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
