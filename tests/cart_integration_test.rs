//! Integration tests for the cart endpoints.
//!
//! Tests cover:
//! - Adding products and merging repeated adds
//! - Fetching the projected cart view
//! - Removing and updating lines
//! - Request body validation
//! - The authorization gate

mod common;

use axum::http::{Method, StatusCode};
use common::{response_json, TestApp};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::str::FromStr;
use uuid::Uuid;

fn add_body(user: Uuid, product: Uuid, quantity: i64) -> Value {
    json!({ "userId": user, "productId": product, "quantity": quantity })
}

fn quantity_in(cart: &Value, product: Uuid) -> Option<i64> {
    cart["products"]
        .as_array()?
        .iter()
        .find(|line| line["product"] == json!(product))
        .and_then(|line| line["quantity"].as_i64())
}

async fn add(app: &TestApp, user: Uuid, product: Uuid, quantity: i64) -> Value {
    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cart",
            Some(add_body(user, product, quantity)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    response_json(response).await
}

// ==================== Add ====================

#[tokio::test]
async fn test_add_creates_cart_with_single_line() {
    let app = TestApp::new().await;
    let product = app.seed_product("mug.png", dec!(12.5)).await;
    let user = Uuid::new_v4();

    let body = add(&app, user, product.id, 2).await;

    assert_eq!(body["message"], "Product added to cart successfully");
    let cart = &body["cart"];
    assert_eq!(cart["user"], json!(user));
    assert_eq!(cart["products"].as_array().unwrap().len(), 1);
    assert_eq!(quantity_in(cart, product.id), Some(2));
    assert!(cart["createdAt"].is_string());
    assert!(cart["updatedAt"].is_string());
}

#[tokio::test]
async fn test_add_same_product_increments_quantity() {
    let app = TestApp::new().await;
    let product = app.seed_product("mug.png", dec!(12.5)).await;
    let user = Uuid::new_v4();

    add(&app, user, product.id, 2).await;
    let body = add(&app, user, product.id, 3).await;

    let cart = &body["cart"];
    assert_eq!(cart["products"].as_array().unwrap().len(), 1);
    assert_eq!(quantity_in(cart, product.id), Some(5));
}

#[tokio::test]
async fn test_add_new_product_appends_line_in_order() {
    let app = TestApp::new().await;
    let first = app.seed_product("a.png", dec!(12.5)).await;
    let second = app.seed_product("b.png", dec!(8)).await;
    let user = Uuid::new_v4();

    add(&app, user, first.id, 1).await;
    let body = add(&app, user, second.id, 4).await;

    let lines = body["cart"]["products"].as_array().unwrap().clone();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["product"], json!(first.id));
    assert_eq!(lines[1]["product"], json!(second.id));
    assert_eq!(lines[1]["quantity"], 4);
}

#[tokio::test]
async fn test_add_unknown_product_is_not_found() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();

    let response = app
        .request_authenticated(
            Method::POST,
            "/api/v1/cart",
            Some(add_body(user, Uuid::new_v4(), 1)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Product not found");

    // No cart was created as a side effect
    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/cart/{user}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_add_rejects_malformed_bodies() {
    let app = TestApp::new().await;
    let product = app.seed_product("mug.png", dec!(12.5)).await;
    let user = Uuid::new_v4();

    let bodies = [
        json!({ "userId": user, "productId": product.id }),
        json!({ "userId": user, "quantity": 1 }),
        json!({ "userId": user, "productId": product.id, "quantity": "two" }),
        json!({ "userId": "not-a-uuid", "productId": product.id, "quantity": 1 }),
        json!({ "userId": Uuid::nil(), "productId": product.id, "quantity": 1 }),
    ];

    for payload in bodies {
        let response = app
            .request_authenticated(Method::POST, "/api/v1/cart", Some(payload.clone()))
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{payload}");
        let body = response_json(response).await;
        assert_eq!(
            body["message"],
            "User ID, Product ID, and Quantity are required"
        );
    }
}

// ==================== Get ====================

#[tokio::test]
async fn test_get_cart_projects_id_image_and_price_only() {
    let app = TestApp::new().await;
    let product = app.seed_product("mug.png", dec!(12.5)).await;
    let user = Uuid::new_v4();
    add(&app, user, product.id, 3).await;

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/cart/{user}"), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    let lines = body["products"].as_array().unwrap();
    assert_eq!(lines.len(), 1);
    assert_eq!(lines[0]["quantity"], 3);

    let projected = lines[0]["product"].as_object().unwrap();
    let mut keys: Vec<&str> = projected.keys().map(String::as_str).collect();
    keys.sort_unstable();
    assert_eq!(keys, vec!["id", "image", "price"]);
    assert_eq!(projected["id"], json!(product.id));
    assert_eq!(projected["image"], "mug.png");

    let price = Decimal::from_str(projected["price"].as_str().unwrap()).unwrap();
    assert_eq!(price, dec!(12.5));
}

#[tokio::test]
async fn test_get_cart_for_unknown_user_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::GET,
            &format!("/api/v1/cart/{}", Uuid::new_v4()),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Cart not found for this user");
}

#[tokio::test]
async fn test_get_cart_with_malformed_user_id_is_bad_request() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(Method::GET, "/api/v1/cart/not-a-uuid", None)
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== Remove ====================

#[tokio::test]
async fn test_remove_line() {
    let app = TestApp::new().await;
    let keep = app.seed_product("a.png", dec!(12.5)).await;
    let drop = app.seed_product("b.png", dec!(8)).await;
    let user = Uuid::new_v4();
    add(&app, user, keep.id, 1).await;
    add(&app, user, drop.id, 2).await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            "/api/v1/cart",
            Some(json!({ "userId": user, "productId": drop.id })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = response_json(response).await;
    assert_eq!(body["message"], "Product removed from cart successfully");
    assert_eq!(quantity_in(&body["cart"], drop.id), None);
    assert_eq!(quantity_in(&body["cart"], keep.id), Some(1));
}

#[tokio::test]
async fn test_remove_absent_product_is_a_noop_and_idempotent() {
    let app = TestApp::new().await;
    let product = app.seed_product("mug.png", dec!(12.5)).await;
    let user = Uuid::new_v4();
    let added = add(&app, user, product.id, 2).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let absent = json!({ "userId": user, "productId": Uuid::new_v4() });
    let response = app
        .request_authenticated(Method::DELETE, "/api/v1/cart", Some(absent))
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["cart"], added["cart"]);

    let present = json!({ "userId": user, "productId": product.id });
    let once = app
        .request_authenticated(Method::DELETE, "/api/v1/cart", Some(present.clone()))
        .await;
    assert_eq!(once.status(), StatusCode::OK);
    let once = response_json(once).await;

    let twice = app
        .request_authenticated(Method::DELETE, "/api/v1/cart", Some(present))
        .await;
    assert_eq!(twice.status(), StatusCode::OK);
    let twice = response_json(twice).await;

    assert_eq!(once["cart"], twice["cart"]);
    assert_eq!(twice["cart"]["products"], json!([]));
}

#[tokio::test]
async fn test_remove_from_missing_cart_is_not_found() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            "/api/v1/cart",
            Some(json!({ "userId": Uuid::new_v4(), "productId": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Cart not found for this user");
}

#[tokio::test]
async fn test_remove_requires_both_ids() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::DELETE,
            "/api/v1/cart",
            Some(json!({ "userId": Uuid::new_v4() })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = response_json(response).await;
    assert_eq!(body["message"], "User ID and Product ID are required");
}

// ==================== Update ====================

#[tokio::test]
async fn test_update_overwrites_quantity() {
    let app = TestApp::new().await;
    let product = app.seed_product("mug.png", dec!(12.5)).await;
    let user = Uuid::new_v4();
    add(&app, user, product.id, 2).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            "/api/v1/cart",
            Some(add_body(user, product.id, 10)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Product quantity updated successfully");
    assert_eq!(quantity_in(&body["cart"], product.id), Some(10));

    let response = app
        .request_authenticated(Method::GET, &format!("/api/v1/cart/{user}"), None)
        .await;
    let body = response_json(response).await;
    assert_eq!(body["products"][0]["quantity"], 10);
}

#[tokio::test]
async fn test_update_distinguishes_missing_cart_from_missing_line() {
    let app = TestApp::new().await;
    let in_cart = app.seed_product("a.png", dec!(12.5)).await;
    let not_in_cart = app.seed_product("b.png", dec!(8)).await;
    let user = Uuid::new_v4();

    let response = app
        .request_authenticated(
            Method::PUT,
            "/api/v1/cart",
            Some(add_body(user, in_cart.id, 3)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response_json(response).await["message"],
        "Cart not found for this user"
    );

    add(&app, user, in_cart.id, 1).await;

    let response = app
        .request_authenticated(
            Method::PUT,
            "/api/v1/cart",
            Some(add_body(user, not_in_cart.id, 3)),
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response_json(response).await["message"],
        "Product not found in the cart"
    );
}

#[tokio::test]
async fn test_update_rejects_non_numeric_quantity() {
    let app = TestApp::new().await;

    let response = app
        .request_authenticated(
            Method::PUT,
            "/api/v1/cart",
            Some(json!({
                "userId": Uuid::new_v4(),
                "productId": Uuid::new_v4(),
                "quantity": "ten"
            })),
        )
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

// ==================== Authorization ====================

#[tokio::test]
async fn test_cart_routes_require_authentication() {
    let app = TestApp::new().await;
    let user = Uuid::new_v4();
    let body = add_body(user, Uuid::new_v4(), 1);

    let requests = [
        (Method::POST, "/api/v1/cart".to_string(), Some(body.clone())),
        (Method::GET, format!("/api/v1/cart/{user}"), None),
        (Method::PUT, "/api/v1/cart".to_string(), Some(body.clone())),
        (Method::DELETE, "/api/v1/cart".to_string(), Some(body)),
    ];

    for (method, uri, payload) in requests {
        let response = app.request(method.clone(), &uri, payload.clone(), None).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");

        let response = app
            .request(method.clone(), &uri, payload, Some("not-a-jwt"))
            .await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{method} {uri}");
    }
}

#[tokio::test]
async fn test_gate_runs_before_body_validation() {
    let app = TestApp::new().await;

    let response = app
        .request(Method::POST, "/api/v1/cart", Some(json!({})), None)
        .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = response_json(response).await;
    assert_eq!(body["message"], "Unauthorized");
}

#[tokio::test]
async fn test_admin_and_scoped_tokens_pass_the_gate() {
    let app = TestApp::new().await;
    let product = app.seed_product("mug.png", dec!(12.5)).await;
    let user = Uuid::new_v4();

    for token in [
        app.token_with(&["admin"], &[]),
        app.token_with(&[], &["carts:write"]),
    ] {
        let response = app
            .request(
                Method::POST,
                "/api/v1/cart",
                Some(add_body(user, product.id, 1)),
                Some(&token),
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }
}

// ==================== Ambient endpoints ====================

#[tokio::test]
async fn test_request_id_is_echoed_in_header_and_error_body() {
    let app = TestApp::new().await;

    let response = app
        .request_with_headers(
            Method::GET,
            &format!("/api/v1/cart/{}", Uuid::new_v4()),
            None,
            Some(app.token()),
            &[("x-request-id", "req-cart-42")],
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        response.headers().get("x-request-id").unwrap(),
        "req-cart-42"
    );
    let body = response_json(response).await;
    assert_eq!(body["request_id"], "req-cart-42");
    assert_eq!(body["error"], "Not Found");
}

#[tokio::test]
async fn test_health_status_and_docs_endpoints() {
    let app = TestApp::new().await;

    let response = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "up");

    let response = app.request(Method::GET, "/health/ready", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response_json(response).await["status"], "ready");

    let response = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert_eq!(body["service"], "cart-api");
    assert_eq!(body["environment"], "test");

    let response = app
        .request(Method::GET, "/api-docs/openapi.json", None, None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = response_json(response).await;
    assert!(body["paths"]["/api/v1/cart"].is_object());
}
