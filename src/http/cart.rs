use axum::{extract::{Path, State}, Json};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{error::ApiResult, extract::ValidatedJson, parse_id, AppState};
use crate::domain::{Actor, SelectedOptions};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub product_id: Uuid,
    #[serde(default = "one")]
    #[validate(range(min = 1))]
    pub quantity: u32,
    #[serde(default)]
    pub options: SelectedOptions,
}

fn one() -> u32 { 1 }

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    /// Product id of the line to change.
    pub item_id: Uuid,
    pub quantity: i64,
}

pub async fn get_cart(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    let cart = s.carts.get_or_create(&actor.user_id).await?;
    Ok(Json(json!({ "success": true, "cart": cart })))
}

pub async fn add_item(State(s): State<AppState>, actor: Actor, ValidatedJson(r): ValidatedJson<AddItemRequest>) -> ApiResult<Json<Value>> {
    let cart = s.carts.add_item(&actor.user_id, r.product_id, r.quantity, r.options).await?;
    Ok(Json(json!({ "success": true, "cart": cart, "message": "Item added to cart" })))
}

pub async fn update_item(State(s): State<AppState>, actor: Actor, ValidatedJson(r): ValidatedJson<UpdateItemRequest>) -> ApiResult<Json<Value>> {
    let cart = s.carts.update_item_quantity(&actor.user_id, r.item_id, r.quantity).await?;
    Ok(Json(json!({ "success": true, "cart": cart })))
}

pub async fn remove_item(State(s): State<AppState>, actor: Actor, Path(product_id): Path<String>) -> ApiResult<Json<Value>> {
    let cart = s.carts.remove_item(&actor.user_id, parse_id(&product_id)?).await?;
    Ok(Json(json!({ "success": true, "cart": cart, "message": "Item removed from cart" })))
}

pub async fn clear_cart(State(s): State<AppState>, actor: Actor) -> ApiResult<Json<Value>> {
    let cart = s.carts.clear(&actor.user_id).await?;
    Ok(Json(json!({ "success": true, "cart": cart, "message": "Cart cleared" })))
}
