//! Integration tests for the API server.

use std::sync::OnceLock;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use entity_store::InMemoryEntityStore;
use metrics_exporter_prometheus::PrometheusHandle;
use serde_json::{Value, json};
use tower::ServiceExt;

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

fn get_metrics_handle() -> PrometheusHandle {
    METRICS_HANDLE
        .get_or_init(|| {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            builder
                .install_recorder()
                .expect("failed to install Prometheus recorder")
        })
        .clone()
}

/// A test server with an administrator already signed in.
struct TestApp {
    router: axum::Router,
    admin_token: String,
}

async fn setup() -> TestApp {
    let state = api::create_state(InMemoryEntityStore::new());
    state
        .accounts
        .ensure_admin("admin@example.com", "admin-secret")
        .await
        .unwrap();
    let admin_token = state
        .accounts
        .issue_token("admin@example.com", "admin-secret")
        .await
        .unwrap()
        .key;

    TestApp {
        router: api::create_app(state, get_metrics_handle()),
        admin_token,
    }
}

impl TestApp {
    async fn send(
        &self,
        method: &str,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header("authorization", format!("Token {token}"));
        }
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_string(&body).unwrap()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, json)
    }

    async fn get(&self, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        self.send("GET", uri, token, None).await
    }

    async fn post(&self, uri: &str, token: Option<&str>, body: Value) -> (StatusCode, Value) {
        self.send("POST", uri, token, Some(body)).await
    }

    /// Registers a customer and returns their token.
    async fn customer(&self, email: &str) -> String {
        let (status, _) = self
            .post(
                "/register",
                None,
                json!({ "email": email, "password": "secret123" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = self
            .post(
                "/token",
                None,
                json!({ "email": email, "password": "secret123" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        body["token"].as_str().unwrap().to_string()
    }

    async fn category(&self, name: &str) -> String {
        let (status, body) = self
            .post(
                "/categories",
                Some(&self.admin_token),
                json!({ "name": name }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }

    async fn product(&self, category: &str, name: &str, price: &str) -> String {
        let (status, body) = self
            .post(
                "/products",
                Some(&self.admin_token),
                json!({
                    "name": name,
                    "brand": "Acme",
                    "price": price,
                    "stock": 100,
                    "category": category,
                    "properties": { "color": "red" }
                }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_str().unwrap().to_string()
    }
}

mod service {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let app = setup().await;
        let (status, body) = app.get("/health", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_metrics_endpoint() {
        let app = setup().await;
        let response = app
            .router
            .clone()
            .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let content_type = response.headers()["content-type"].to_str().unwrap();
        assert!(content_type.starts_with("text/plain"));
    }

    #[tokio::test]
    async fn test_unsupported_method() {
        let app = setup().await;
        let (status, _) = app.send("DELETE", "/categories", None, None).await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED);
    }

    #[tokio::test]
    async fn test_malformed_json_is_bad_request() {
        let app = setup().await;
        let request = Request::builder()
            .method("POST")
            .uri("/register")
            .header("content-type", "application/json")
            .body(Body::from("{not json"))
            .unwrap();
        let response = app.router.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}

mod accounts {
    use super::*;

    #[tokio::test]
    async fn test_register_and_token() {
        let app = setup().await;

        let (status, body) = app
            .post(
                "/register",
                None,
                json!({ "email": "alice@EXAMPLE.com", "password": "secret123", "name": "Alice" }),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body, json!({ "name": "Alice", "email": "alice@example.com" }));

        let (status, body) = app
            .post(
                "/token",
                None,
                json!({ "email": "alice@example.com", "password": "secret123" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["token"].as_str().unwrap().len(), 40);
    }

    #[tokio::test]
    async fn test_duplicate_registration_rejected() {
        let app = setup().await;
        app.customer("alice@example.com").await;

        let (status, body) = app
            .post(
                "/register",
                None,
                json!({ "email": "alice@example.com", "password": "another1" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "User with this email already exists");
    }

    #[tokio::test]
    async fn test_short_password_rejected() {
        let app = setup().await;
        let (status, _) = app
            .post(
                "/register",
                None,
                json!({ "email": "alice@example.com", "password": "123" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wrong_password() {
        let app = setup().await;
        app.customer("alice@example.com").await;

        let (status, body) = app
            .post(
                "/token",
                None,
                json!({ "email": "alice@example.com", "password": "wrong-one" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Incorrect credentials");
    }

    #[tokio::test]
    async fn test_unknown_token_is_unauthorized() {
        let app = setup().await;
        let (status, _) = app.get("/cart", Some("not-a-real-token")).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_me_requires_authentication() {
        let app = setup().await;
        let (status, _) = app.get("/me", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_profile_address_lifecycle() {
        let app = setup().await;
        let token = app.customer("alice@example.com").await;

        let address = json!({
            "country": "PL",
            "city": "Krakow",
            "street": "Dluga",
            "house": 3,
            "postal_code": "31-147"
        });
        let (status, body) = app
            .send(
                "PATCH",
                "/me",
                Some(&token),
                Some(json!({ "surname": "Smith", "address": address })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["surname"], "Smith");
        assert_eq!(body["address"]["city"], "Krakow");
        assert!(body.get("password").is_none());
        assert!(body.get("password_hash").is_none());

        let (status, body) = app
            .send(
                "PATCH",
                "/me",
                Some(&token),
                Some(json!({ "address": { "city": "Gdansk" } })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .starts_with("These fields are required")
        );

        let (status, body) = app
            .send("PATCH", "/me", Some(&token), Some(json!({ "address": {} })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["address"].is_null());
    }

    #[tokio::test]
    async fn test_put_me_requires_email_and_password() {
        let app = setup().await;
        let token = app.customer("alice@example.com").await;

        let (status, _) = app
            .send("PUT", "/me", Some(&token), Some(json!({ "name": "Alice" })))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .send(
                "PUT",
                "/me",
                Some(&token),
                Some(json!({
                    "email": "alice@example.com",
                    "password": "new-secret",
                    "name": "Alice"
                })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["name"], "Alice");

        let (status, _) = app
            .post(
                "/token",
                None,
                json!({ "email": "alice@example.com", "password": "new-secret" }),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_delete_me() {
        let app = setup().await;
        let token = app.customer("alice@example.com").await;

        let (status, _) = app.send("DELETE", "/me", Some(&token), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.get("/me", Some(&token)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_users_are_public() {
        let app = setup().await;
        app.customer("alice@example.com").await;

        let (status, body) = app.get("/users?ordering=-created_at", None).await;
        assert_eq!(status, StatusCode::OK);
        let users = body.as_array().unwrap();
        assert_eq!(users.len(), 2);
        assert_eq!(users[0]["email"], "alice@example.com");

        let id = users[0]["id"].as_str().unwrap();
        let (status, body) = app.get(&format!("/users/{id}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "alice@example.com");
    }
}

mod catalog {
    use super::*;

    #[tokio::test]
    async fn test_category_permissions() {
        let app = setup().await;
        let token = app.customer("alice@example.com").await;

        let (status, _) = app
            .post("/categories", None, json!({ "name": "Shoes" }))
            .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = app
            .post("/categories", Some(&token), json!({ "name": "Shoes" }))
            .await;
        assert_eq!(status, StatusCode::FORBIDDEN);

        app.category("Shoes").await;
        let (status, body) = app.get("/categories", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_category_in_other_case() {
        let app = setup().await;
        app.category("Shoes").await;

        let (status, body) = app
            .post(
                "/categories",
                Some(&app.admin_token),
                json!({ "name": "shoes" }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Category with this name (shoes) already exists");

        let (_, body) = app.get("/categories", None).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_product_detail_and_summary() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;

        let (status, body) = app.get(&format!("/products/{product}"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["price"], "100.99");
        assert_eq!(body["rating"], 0.0);
        assert_eq!(body["category"], category.as_str());
        assert_eq!(body["properties"]["color"], "red");

        let (_, body) = app.get("/products", None).await;
        let summary = &body.as_array().unwrap()[0];
        assert_eq!(summary["name"], "Sneaker");
        assert!(summary.get("stock").is_none());
    }

    #[tokio::test]
    async fn test_product_validation() {
        let app = setup().await;
        let category = app.category("Shoes").await;

        let (status, _) = app
            .post(
                "/products",
                Some(&app.admin_token),
                json!({ "name": "Cheap", "price": "0.50", "stock": 1, "category": category }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = app
            .post(
                "/products",
                Some(&app.admin_token),
                json!({
                    "name": "Dup",
                    "price": "10.00",
                    "stock": 1,
                    "category": category,
                    "properties": { "Color": "red", "color": "blue" }
                }),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(
            body["error"]
                .as_str()
                .unwrap()
                .contains("Property key duplication")
        );

        let (status, _) = app
            .send(
                "PUT",
                "/products/00000000-0000-0000-0000-000000000000",
                Some(&app.admin_token),
                Some(json!({ "name": "Missing fields" })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_product_filter_and_ordering() {
        let app = setup().await;
        let shoes = app.category("Shoes").await;
        let hats = app.category("Hats").await;
        app.product(&shoes, "Boot", "150.00").await;
        app.product(&shoes, "Sneaker", "100.99").await;
        app.product(&hats, "Fedora", "40.00").await;

        let (status, body) = app
            .get(&format!("/products?category__in={shoes}&ordering=price"), None)
            .await;
        assert_eq!(status, StatusCode::OK);
        let names: Vec<&str> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["name"].as_str().unwrap())
            .collect();
        assert_eq!(names, ["Sneaker", "Boot"]);

        let (_, body) = app
            .get(&format!("/products?category__in={shoes},{hats}&ordering=-price,unknown"), None)
            .await;
        assert_eq!(body.as_array().unwrap()[0]["name"], "Boot");
        assert_eq!(body.as_array().unwrap().len(), 3);

        let (status, _) = app.get("/products?category__in=abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_client_cannot_set_rating() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;

        let (status, body) = app
            .send(
                "PATCH",
                &format!("/products/{product}"),
                Some(&app.admin_token),
                Some(json!({ "rating": 5.0, "stock": 7 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["rating"], 0.0);
        assert_eq!(body["stock"], 7);
    }

    #[tokio::test]
    async fn test_deleting_category_removes_products() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;

        let (status, _) = app
            .send(
                "DELETE",
                &format!("/categories/{category}"),
                Some(&app.admin_token),
                None,
            )
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) = app.get(&format!("/products/{product}"), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}

mod reviews {
    use super::*;

    async fn review(app: &TestApp, token: &str, product: &str, rating: i32) -> (StatusCode, Value) {
        app.post(
            "/reviews",
            Some(token),
            json!({ "product": product, "rating": rating, "commentary": "" }),
        )
        .await
    }

    #[tokio::test]
    async fn test_rating_follows_reviews() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;
        let bob = app.customer("bob@example.com").await;

        let (status, _) = review(&app, &alice, &product, 5).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, low) = review(&app, &bob, &product, 3).await;
        assert_eq!(status, StatusCode::CREATED);

        let (_, body) = app.get(&format!("/products/{product}"), None).await;
        assert_eq!(body["rating"], 4.0);

        let low_id = low["id"].as_str().unwrap();
        let (status, _) = app
            .send("DELETE", &format!("/reviews/{low_id}"), Some(&bob), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = app.get(&format!("/products/{product}"), None).await;
        assert_eq!(body["rating"], 5.0);
    }

    #[tokio::test]
    async fn test_second_review_rejected() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;

        review(&app, &alice, &product, 5).await;
        let (status, body) = review(&app, &alice, &product, 1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You already wrote a review for this product");

        let (_, body) = app
            .get(&format!("/reviews?product={product}"), None)
            .await;
        assert_eq!(body.as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_patch_product_is_ignored() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let sneaker = app.product(&category, "Sneaker", "100.99").await;
        let boot = app.product(&category, "Boot", "150.00").await;
        let alice = app.customer("alice@example.com").await;

        let (_, created) = review(&app, &alice, &sneaker, 4).await;
        let id = created["id"].as_str().unwrap();

        let (status, body) = app
            .send(
                "PATCH",
                &format!("/reviews/{id}"),
                Some(&alice),
                Some(json!({ "product": boot, "rating": 2 })),
            )
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["product"], sneaker.as_str());
        assert_eq!(body["rating"], 2);
    }

    #[tokio::test]
    async fn test_only_author_edits_admin_deletes() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;
        let bob = app.customer("bob@example.com").await;

        let (_, created) = review(&app, &alice, &product, 4).await;
        let uri = format!("/reviews/{}", created["id"].as_str().unwrap());

        let (status, _) = app
            .send("PATCH", &uri, Some(&bob), Some(json!({ "rating": 1 })))
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send(
                "PATCH",
                &uri,
                Some(&app.admin_token),
                Some(json!({ "rating": 1 })),
            )
            .await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app.send("DELETE", &uri, Some(&bob), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = app
            .send("DELETE", &uri, Some(&app.admin_token), None)
            .await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_rating_out_of_range() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;

        let (status, _) = review(&app, &alice, &product, 6).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

mod cart_and_wishlist {
    use super::*;

    async fn add_to_cart(app: &TestApp, token: &str, product: &str, quantity: i32) -> (StatusCode, Value) {
        app.post(
            "/cart",
            Some(token),
            json!({ "product": product, "quantity": quantity }),
        )
        .await
    }

    #[tokio::test]
    async fn test_cart_merges_quantities() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;

        let (status, first) = add_to_cart(&app, &alice, &product, 2).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, merged) = add_to_cart(&app, &alice, &product, 3).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(merged["id"], first["id"]);
        assert_eq!(merged["quantity"], 5);

        let (status, body) = app.get("/cart", Some(&alice)).await;
        assert_eq!(status, StatusCode::OK);
        let lines = body.as_array().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0]["quantity"], 5);
        assert_eq!(lines[0]["product"]["name"], "Sneaker");
    }

    #[tokio::test]
    async fn test_cart_merge_overflow_is_bad_request() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;

        let (status, _) = add_to_cart(&app, &alice, &product, i32::MAX).await;
        assert_eq!(status, StatusCode::CREATED);
        let (status, body) = add_to_cart(&app, &alice, &product, 1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().starts_with("quantity:"));

        let (_, body) = app.get("/cart", Some(&alice)).await;
        assert_eq!(body[0]["quantity"], i32::MAX);
    }

    #[tokio::test]
    async fn test_cart_is_private() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;
        let bob = app.customer("bob@example.com").await;

        let (_, item) = add_to_cart(&app, &alice, &product, 1).await;
        let uri = format!("/cart/{}", item["id"].as_str().unwrap());

        let (status, _) = app.get(&uri, Some(&bob)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = app.get("/cart", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, body) = app
            .send("PATCH", &uri, Some(&alice), Some(json!({ "quantity": 4 })))
            .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["quantity"], 4);

        let (status, _) = app.send("DELETE", &uri, Some(&alice), None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
    }

    #[tokio::test]
    async fn test_cart_rejects_zero_quantity_and_unknown_product() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;

        let (status, _) = add_to_cart(&app, &alice, &product, 0).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) =
            add_to_cart(&app, &alice, "00000000-0000-0000-0000-000000000000", 1).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_wishlist_once_per_product() {
        let app = setup().await;
        let category = app.category("Shoes").await;
        let product = app.product(&category, "Sneaker", "100.99").await;
        let alice = app.customer("alice@example.com").await;

        let (status, _) = app
            .post("/wishlist", Some(&alice), json!({ "product": product }))
            .await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) = app
            .post("/wishlist", Some(&alice), json!({ "product": product }))
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You have already wished this product");

        let (_, body) = app.get("/wishlist", Some(&alice)).await;
        let items = body.as_array().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["product"]["name"], "Sneaker");
    }
}
