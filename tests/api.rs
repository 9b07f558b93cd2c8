use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use chrono::Duration;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use tower::ServiceExt;

use storefront::config::StorageMode;
use storefront::domain::{PricingRules, Product, Role, UserId};
use storefront::http::JwtKeys;
use storefront::publisher::EventPublisher;
use storefront::store::{MemoryStore, StorageHealth};
use storefront::{build_router, AppState};

const SECRET: &[u8] = b"integration-secret";

struct TestApp {
    router: Router,
    keys: JwtKeys,
}

fn app(products: Vec<Product>) -> TestApp {
    app_with_health(products, StorageHealth::new(StorageMode::Memory))
}

fn app_with_health(products: Vec<Product>, health: StorageHealth) -> TestApp {
    let store = Arc::new(MemoryStore::with_products(products));
    let state = AppState::new(store, health, PricingRules::default(), EventPublisher::Log, JwtKeys::new(SECRET));
    TestApp { router: build_router(state), keys: JwtKeys::new(SECRET) }
}

fn product(name: &str, price: i64, stock: u32) -> Product {
    Product::create(name, Decimal::from(price), stock).unwrap().with_seller(UserId::new("seller-1"))
}

fn address() -> Value {
    json!({ "fullName": "Ada Lovelace", "street": "12 Analytical St", "city": "London", "postalCode": "N1 9GU", "country": "UK" })
}

impl TestApp {
    fn token(&self, user: &str, role: Role) -> String {
        self.keys.issue(&UserId::new(user), role, Duration::hours(1)).unwrap()
    }

    async fn call(&self, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
        let mut req = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            req = req.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let body = match body {
            Some(value) => {
                req = req.header(header::CONTENT_TYPE, "application/json");
                Body::from(value.to_string())
            }
            None => Body::empty(),
        };
        let resp = self.router.clone().oneshot(req.body(body).unwrap()).await.unwrap();
        let status = resp.status();
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }
}

#[tokio::test]
async fn health_reports_storage_mode() {
    let app = app(vec![]);
    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["durable"], false);
}

#[tokio::test]
async fn health_reports_degraded_storage() {
    let health = StorageHealth::new(StorageMode::Postgres);
    health.mark_degraded();
    let ring = product("Ring", 100, 5);
    let app = app_with_health(vec![ring.clone()], health);

    let (status, body) = app.call("GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["storage"], "memory");
    assert_eq!(body["durable"], false);

    let token = app.token("buyer-1", Role::Buyer);
    let (status, body) = app.call("POST", "/api/cart/add-item", Some(&token), Some(json!({ "productId": ring.id }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["total"], 620.0);
}

#[tokio::test]
async fn cart_requires_a_valid_token() {
    let app = app(vec![]);
    let (status, body) = app.call("GET", "/api/cart", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body, json!({ "success": false, "message": "Access token required" }));

    let (status, body) = app.call("GET", "/api/cart", Some("garbage"), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["message"], "Invalid token");

    let expired = app.keys.issue(&UserId::new("u1"), Role::Buyer, Duration::hours(-2)).unwrap();
    let (_, body) = app.call("GET", "/api/cart", Some(&expired), None).await;
    assert_eq!(body["message"], "Token expired");
}

#[tokio::test]
async fn add_item_returns_priced_cart() {
    let ring = product("Ring", 100, 5);
    let app = app(vec![ring.clone()]);
    let token = app.token("buyer-1", Role::Buyer);

    let (status, body) = app.call("POST", "/api/cart/add-item", Some(&token), Some(json!({ "productId": ring.id, "quantity": 2 }))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Item added to cart");
    let cart = &body["cart"];
    assert_eq!(cart["items"][0]["name"], "Ring");
    assert_eq!(cart["items"][0]["quantity"], 2);
    assert_eq!(cart["items"][0]["stockQuantity"], 5);
    assert_eq!(cart["subtotal"], 200.0);
    assert_eq!(cart["tax"], 40.0);
    assert_eq!(cart["shipping"], 500.0);
    assert_eq!(cart["total"], 740.0);
}

#[tokio::test]
async fn add_item_failures() {
    let ring = product("Ring", 100, 1);
    let app = app(vec![ring.clone()]);
    let token = app.token("buyer-1", Role::Buyer);

    let (status, body) = app.call("POST", "/api/cart/add-item", Some(&token), Some(json!({ "productId": uuid::Uuid::new_v4() }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Product not found");

    let (status, body) = app.call("POST", "/api/cart/add-item", Some(&token), Some(json!({ "productId": ring.id, "quantity": 3 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Not enough stock for Ring");

    let (status, _) = app.call("POST", "/api/cart/add-item", Some(&token), Some(json!({ "productId": ring.id, "quantity": 0 }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let nested = json!({ "productId": ring.id, "options": { "box": { "wrap": "gold" } } });
    let (status, body) = app.call("POST", "/api/cart/add-item", Some(&token), Some(nested)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn update_and_remove_items() {
    let ring = product("Ring", 100, 10);
    let app = app(vec![ring.clone()]);
    let token = app.token("buyer-1", Role::Buyer);

    let (status, body) = app.call("DELETE", &format!("/api/cart/remove-item/{}", ring.id), Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Cart not found");

    app.call("POST", "/api/cart/add-item", Some(&token), Some(json!({ "productId": ring.id }))).await;
    let (status, body) = app.call("PUT", "/api/cart/update-item", Some(&token), Some(json!({ "itemId": ring.id, "quantity": 4 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"][0]["quantity"], 4);

    let (status, body) = app.call("PUT", "/api/cart/update-item", Some(&token), Some(json!({ "itemId": uuid::Uuid::new_v4(), "quantity": 1 }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Item not found in cart");

    let (status, body) = app.call("DELETE", &format!("/api/cart/remove-item/{}", ring.id), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["cart"]["items"], json!([]));
    assert_eq!(body["cart"]["shipping"], 500.0);
    assert_eq!(body["cart"]["total"], 500.0);

    let (status, body) = app.call("POST", "/api/cart/clear", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Cart cleared");
    assert_eq!(body["cart"]["total"], 0.0);

    let (status, _) = app.call("DELETE", "/api/cart/remove-item/not-a-uuid", Some(&token), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn checkout_converts_cart_into_order() {
    let ring = product("Ring", 100, 5);
    let app = app(vec![ring.clone()]);
    let token = app.token("buyer-1", Role::Buyer);
    app.call("POST", "/api/cart/add-item", Some(&token), Some(json!({ "productId": ring.id, "quantity": 2, "options": { "size": 7 } }))).await;

    let (status, body) = app.call("POST", "/api/orders", Some(&token), Some(json!({ "shippingAddress": address() }))).await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Order created successfully");
    let order = &body["data"];
    assert_eq!(order["totalAmount"], 740.0);
    assert_eq!(order["orderStatus"], "Pending");
    assert_eq!(order["paymentStatus"], "Pending");
    assert_eq!(order["items"][0]["name"], "Ring");
    assert_eq!(order["items"][0]["seller"], "seller-1");
    assert_eq!(order["sellers"], json!([{ "seller": "seller-1", "products": [ring.id], "subtotal": 200.0 }]));
    assert_eq!(order["billingAddress"], order["shippingAddress"]);

    let (_, cart) = app.call("GET", "/api/cart", Some(&token), None).await;
    assert_eq!(cart["cart"]["items"], json!([]));

    let (_, product) = app.call("GET", &format!("/api/products/{}", ring.id), None, None).await;
    assert_eq!(product["data"]["stockQuantity"], 3);

    let (_, mine) = app.call("GET", "/api/orders/my-orders", Some(&token), None).await;
    assert_eq!(mine["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn checkout_rejections() {
    let ring = product("Ring", 100, 1);
    let app = app(vec![ring.clone()]);
    let token = app.token("buyer-1", Role::Buyer);

    let (status, body) = app.call("POST", "/api/orders", Some(&token), Some(json!({ "shippingAddress": address() }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Cart is empty");

    app.call("POST", "/api/cart/add-item", Some(&token), Some(json!({ "productId": ring.id }))).await;
    let mut bad = address();
    bad["fullName"] = json!("");
    let (status, _) = app.call("POST", "/api/orders", Some(&token), Some(json!({ "shippingAddress": bad }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let other = app.token("buyer-2", Role::Buyer);
    app.call("POST", "/api/cart/add-item", Some(&other), Some(json!({ "productId": ring.id }))).await;
    let (status, _) = app.call("POST", "/api/orders", Some(&token), Some(json!({ "shippingAddress": address() }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = app.call("POST", "/api/orders", Some(&other), Some(json!({ "shippingAddress": address() }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Not enough stock for Ring");
}

#[tokio::test]
async fn order_administration_is_admin_only() {
    let ring = product("Ring", 100, 5);
    let app = app(vec![ring.clone()]);
    let buyer = app.token("buyer-1", Role::Buyer);
    let admin = app.token("admin-1", Role::Admin);
    app.call("POST", "/api/cart/add-item", Some(&buyer), Some(json!({ "productId": ring.id }))).await;
    let (_, created) = app.call("POST", "/api/orders", Some(&buyer), Some(json!({ "shippingAddress": address() }))).await;
    let order_id = created["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call("GET", "/api/orders", Some(&buyer), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["message"], "Insufficient permissions");

    let (status, body) = app.call("GET", "/api/orders?page=1&perPage=10", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["page"], 1);

    let stranger = app.token("buyer-2", Role::Buyer);
    let (status, _) = app.call("GET", &format!("/api/orders/{order_id}"), Some(&stranger), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call("GET", &format!("/api/orders/{order_id}"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);

    let uri = format!("/api/orders/{order_id}/status");
    let (status, _) = app.call("PUT", &uri, Some(&buyer), Some(json!({ "status": "Shipped" }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.call("PUT", &uri, Some(&admin), Some(json!({ "status": "Cancelled" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["orderStatus"], "Cancelled");
    let (status, _) = app.call("PUT", &uri, Some(&admin), Some(json!({ "status": "Shipped" }))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn sellers_manage_their_own_products() {
    let app = app(vec![]);
    let seller = app.token("seller-1", Role::Seller);
    let buyer = app.token("buyer-1", Role::Buyer);
    let new_product = json!({ "name": "Opal Brooch", "price": 2500.5, "stockQuantity": 2 });

    let (status, _) = app.call("POST", "/api/products", Some(&buyer), Some(new_product.clone())).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call("POST", "/api/products", Some(&seller), Some(new_product)).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["data"]["price"], 2500.5);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let rival = app.token("seller-2", Role::Seller);
    let (status, _) = app.call("PUT", &format!("/api/products/{id}"), Some(&rival), Some(json!({ "price": 1 }))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = app.call("PUT", &format!("/api/products/{id}"), Some(&seller), Some(json!({ "stockQuantity": 7 }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["stockQuantity"], 7);

    let (status, body) = app.call("GET", "/api/products", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
}

#[tokio::test]
async fn catalog_filters_search_and_delete() {
    let app = app(vec![]);
    let seller = app.token("seller-1", Role::Seller);
    for (name, price, category) in [("Ruby Ring", 300, "rings"), ("Opal Ring", 900, "rings"), ("Ruby Pendant", 500, "pendants")] {
        let body = json!({ "name": name, "price": price, "category": category, "stockQuantity": 1 });
        let (status, _) = app.call("POST", "/api/products", Some(&seller), Some(body)).await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app.call("GET", "/api/products?category=rings&sortBy=price&sortOrder=desc", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 2);
    assert_eq!(body["data"][0]["name"], "Opal Ring");
    assert_eq!(body["data"][0]["category"], "rings");

    let (_, body) = app.call("GET", "/api/products?minPrice=400&maxPrice=900", None, None).await;
    assert_eq!(body["data"].as_array().map(Vec::len), Some(2));

    let (status, body) = app.call("GET", "/api/products?sortBy=rating", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, body) = app.call("GET", "/api/products/search?q=ruby&maxPrice=400", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["searchTerm"], "ruby");
    assert_eq!(body["total"], 1);
    assert_eq!(body["data"][0]["name"], "Ruby Ring");
    let id = body["data"][0]["id"].as_str().unwrap().to_string();

    let (status, body) = app.call("GET", "/api/products/search", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Search term required");

    let rival = app.token("seller-2", Role::Seller);
    let (status, _) = app.call("DELETE", &format!("/api/products/{id}"), Some(&rival), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, body) = app.call("DELETE", &format!("/api/products/{id}"), Some(&seller), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Product deleted successfully");
    let (status, _) = app.call("GET", &format!("/api/products/{id}"), None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
