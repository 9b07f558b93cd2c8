use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{auth::Admin, error::ApiResult, extract::ValidatedJson, parse_id, AppState, ListParams};
use crate::domain::{Actor, Address, Order, OrderLine, OrderStatus, PaymentStatus, UserId};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutRequest {
    #[validate]
    pub shipping_address: Address,
    #[validate]
    pub billing_address: Option<Address>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct StatusRequest {
    pub status: OrderStatus,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemResponse {
    pub product: Uuid,
    pub seller: Option<UserId>,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub line_total: Decimal,
}

/// The part of an order one seller fulfils.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SellerGroupResponse {
    pub seller: Option<UserId>,
    pub products: Vec<Uuid>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderResponse {
    pub id: Uuid,
    pub order_number: String,
    pub user: UserId,
    pub items: Vec<OrderItemResponse>,
    pub sellers: Vec<SellerGroupResponse>,
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total_amount: Decimal,
    pub shipping_address: Address,
    pub billing_address: Address,
    pub payment_status: PaymentStatus,
    pub order_status: OrderStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&OrderLine> for OrderItemResponse {
    fn from(l: &OrderLine) -> Self {
        Self {
            product: l.product_id, seller: l.seller_id.clone(), name: l.name.clone(), image: l.image.clone(),
            quantity: l.quantity, price: l.unit_price, line_total: l.line_total,
        }
    }
}

impl From<&Order> for OrderResponse {
    fn from(o: &Order) -> Self {
        Self {
            id: o.id(), order_number: o.order_number().to_string(), user: o.owner().clone(),
            items: o.lines().iter().map(OrderItemResponse::from).collect(),
            sellers: o
                .lines_by_seller()
                .into_iter()
                .map(|(seller, lines)| SellerGroupResponse {
                    seller: seller.cloned(),
                    products: lines.iter().map(|l| l.product_id).collect(),
                    subtotal: lines.iter().map(|l| l.line_total).sum(),
                })
                .collect(),
            subtotal: o.subtotal(), tax: o.tax(), shipping: o.shipping(), total_amount: o.total_amount(),
            shipping_address: o.shipping_address().clone(), billing_address: o.billing_address().clone(),
            payment_status: o.payment_status(), order_status: o.order_status(),
            created_at: o.created_at(), updated_at: o.updated_at(),
        }
    }
}

pub async fn create_order(State(s): State<AppState>, actor: Actor, ValidatedJson(r): ValidatedJson<CheckoutRequest>) -> ApiResult<(StatusCode, Json<Value>)> {
    let order = s.checkout.checkout(&actor.user_id, r.shipping_address, r.billing_address).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "message": "Order created successfully", "data": OrderResponse::from(&order) }))))
}

pub async fn my_orders(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    let orders: Vec<OrderResponse> = s.orders.for_user(&actor.user_id).await?.iter().map(OrderResponse::from).collect();
    Ok(Json(json!({ "success": true, "data": orders })))
}

pub async fn get_order(State(s): State<AppState>, actor: Actor, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let order = s.orders.get(&actor, parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": OrderResponse::from(&order) })))
}

pub async fn list_orders(State(s): State<AppState>, _admin: Admin, Query(p): Query<ListParams>) -> ApiResult<Json<Value>> {
    let page = p.page();
    let listing = s.orders.list_all(page).await?;
    let data: Vec<OrderResponse> = listing.items.iter().map(OrderResponse::from).collect();
    Ok(Json(json!({ "success": true, "data": data, "total": listing.total, "page": page.page })))
}

pub async fn update_status(State(s): State<AppState>, Admin(admin): Admin, Path(id): Path<String>, ValidatedJson(r): ValidatedJson<StatusRequest>) -> ApiResult<Json<Value>> {
    let order = s.orders.update_status(&admin, parse_id(&id)?, r.status).await?;
    Ok(Json(json!({ "success": true, "message": "Order status updated successfully", "data": OrderResponse::from(&order) })))
}
