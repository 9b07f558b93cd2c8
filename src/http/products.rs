use axum::{extract::{Path, Query, State}, http::StatusCode, Json};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;
use validator::Validate;

use super::{error::{ApiError, ApiResult}, extract::ValidatedJson, parse_id, AppState};
use crate::domain::{Actor, Product, ProductStatus, UserId};
use crate::services::{NewProduct, ProductChanges};
use crate::store::{Page, ProductQuery, ProductSort, SortField};

/// Query string of the catalog listing and search routes.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogParams {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
    /// Search term of `/api/products/search`.
    pub q: Option<String>,
}

impl CatalogParams {
    fn page(&self) -> Page { Page::new(self.page, self.per_page) }

    fn query(&self) -> ApiResult<ProductQuery> {
        let field = match self.sort_by.as_deref() {
            None => SortField::default(),
            Some(raw) => SortField::parse(raw).ok_or_else(|| ApiError::BadRequest(format!("Cannot sort by `{raw}`")))?,
        };
        let descending = match self.sort_order.as_deref() {
            None | Some("asc") => false,
            Some("desc") => true,
            Some(raw) => return Err(ApiError::BadRequest(format!("Sort order must be `asc` or `desc`, got `{raw}`"))),
        };
        Ok(ProductQuery {
            category: self.category.clone().filter(|c| !c.is_empty()),
            min_price: self.min_price,
            max_price: self.max_price,
            search: self.search.clone().filter(|s| !s.trim().is_empty()),
            sort: ProductSort { field, descending },
        })
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 5000))]
    pub description: String,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub price: Decimal,
    #[serde(default)]
    pub stock_quantity: u32,
    #[serde(default)]
    pub images: Vec<String>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<u32>,
    pub images: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductResponse {
    pub id: Uuid,
    pub seller: Option<UserId>,
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub stock_quantity: u32,
    pub images: Vec<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Product> for ProductResponse {
    fn from(p: Product) -> Self {
        Self {
            id: p.id, seller: p.seller_id, name: p.name, description: p.description, category: p.category, price: p.price,
            stock_quantity: p.stock_quantity, images: p.images, status: p.status, created_at: p.created_at, updated_at: p.updated_at,
        }
    }
}

pub async fn list_products(State(s): State<AppState>, Query(p): Query<CatalogParams>) -> ApiResult<Json<Value>> {
    let page = p.page();
    let listing = s.catalog.list(&p.query()?, page).await?;
    let data: Vec<ProductResponse> = listing.items.into_iter().map(ProductResponse::from).collect();
    Ok(Json(json!({ "success": true, "data": data, "total": listing.total, "page": page.page })))
}

pub async fn search_products(State(s): State<AppState>, Query(p): Query<CatalogParams>) -> ApiResult<Json<Value>> {
    let page = p.page();
    let term = p.q.clone().unwrap_or_default();
    let listing = s.catalog.search(&term, p.query()?, page).await?;
    let data: Vec<ProductResponse> = listing.items.into_iter().map(ProductResponse::from).collect();
    Ok(Json(json!({ "success": true, "data": data, "searchTerm": term.trim(), "total": listing.total, "page": page.page })))
}

pub async fn get_product(State(s): State<AppState>, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let product = s.catalog.get(parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "data": ProductResponse::from(product) })))
}

pub async fn create_product(State(s): State<AppState>, actor: Actor, ValidatedJson(r): ValidatedJson<CreateProductRequest>) -> ApiResult<(StatusCode, Json<Value>)> {
    let input = NewProduct {
        name: r.name, description: r.description, category: r.category, price: r.price, stock_quantity: r.stock_quantity, images: r.images,
    };
    let product = s.catalog.create(&actor, input).await?;
    Ok((StatusCode::CREATED, Json(json!({ "success": true, "data": ProductResponse::from(product) }))))
}

pub async fn update_product(State(s): State<AppState>, actor: Actor, Path(id): Path<String>, ValidatedJson(r): ValidatedJson<UpdateProductRequest>) -> ApiResult<Json<Value>> {
    let changes = ProductChanges {
        name: r.name, description: r.description, category: r.category, price: r.price,
        stock_quantity: r.stock_quantity, images: r.images, status: r.status,
    };
    let product = s.catalog.update(&actor, parse_id(&id)?, changes).await?;
    Ok(Json(json!({ "success": true, "data": ProductResponse::from(product) })))
}

pub async fn delete_product(State(s): State<AppState>, actor: Actor, Path(id): Path<String>) -> ApiResult<Json<Value>> {
    let product = s.catalog.delete(&actor, parse_id(&id)?).await?;
    Ok(Json(json!({ "success": true, "message": "Product deleted successfully", "data": ProductResponse::from(product) })))
}
