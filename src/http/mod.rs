//! JSON-over-HTTP surface.

pub mod auth;
pub mod cart;
pub mod error;
pub mod extract;
pub mod health;
pub mod orders;
pub mod products;

use std::sync::Arc;

use axum::{routing::{delete, get, post, put}, Router};
use serde::Deserialize;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use uuid::Uuid;

use crate::domain::PricingRules;
use crate::publisher::EventPublisher;
use crate::services::{CartService, CatalogService, CheckoutService, OrderService};
use crate::store::{Page, StorageHealth, Store};

pub use auth::JwtKeys;
pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub carts: CartService,
    pub checkout: CheckoutService,
    pub orders: OrderService,
    pub catalog: CatalogService,
    pub health: StorageHealth,
    pub jwt: Arc<JwtKeys>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, health: StorageHealth, pricing: PricingRules, publisher: EventPublisher, jwt: JwtKeys) -> Self {
        Self {
            carts: CartService::new(store.clone(), pricing),
            checkout: CheckoutService::new(store.clone(), pricing, publisher.clone()),
            orders: OrderService::new(store.clone(), publisher),
            catalog: CatalogService::new(store),
            health,
            jwt: Arc::new(jwt),
        }
    }
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/api/cart", get(cart::get_cart))
        .route("/api/cart/add-item", post(cart::add_item))
        .route("/api/cart/update-item", put(cart::update_item))
        .route("/api/cart/remove-item/:productId", delete(cart::remove_item))
        .route("/api/cart/clear", post(cart::clear_cart))
        .route("/api/orders", get(orders::list_orders).post(orders::create_order))
        .route("/api/orders/my-orders", get(orders::my_orders))
        .route("/api/orders/:id", get(orders::get_order))
        .route("/api/orders/:id/status", put(orders::update_status))
        .route("/api/products", get(products::list_products).post(products::create_product))
        .route("/api/products/search", get(products::search_products))
        .route("/api/products/:id", get(products::get_product).put(products::update_product).delete(products::delete_product))
        .layer(TraceLayer::new_for_http()).layer(CorsLayer::permissive()).with_state(state)
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
}

impl ListParams {
    pub fn page(&self) -> Page { Page::new(self.page, self.per_page) }
}

fn parse_id(raw: &str) -> ApiResult<Uuid> {
    raw.parse().map_err(|_| ApiError::BadRequest(format!("Invalid id `{raw}`")))
}
