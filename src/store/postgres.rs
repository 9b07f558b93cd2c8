//! PostgreSQL store. Products are relational rows so stock can be decremented
//! conditionally; carts and orders are JSONB documents keyed by owner / id.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgPoolOptions, Postgres};
use sqlx::QueryBuilder;
use sqlx::types::Json;
use tracing::debug;
use uuid::Uuid;

use super::{Listing, Page, ProductQuery, StorageError, Store, StoreResult};
use crate::domain::{Cart, Order, Product, ProductStatus, UserId};

// ── Error conversions (infrastructure concern only) ──────────────────────────

impl From<sqlx::Error> for StorageError {
    fn from(e: sqlx::Error) -> Self {
        match &e {
            sqlx::Error::Io(_) | sqlx::Error::Tls(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed => {
                StorageError::Unavailable(e.to_string())
            }
            _ => StorageError::Backend(e.to_string()),
        }
    }
}

// ── Rows ─────────────────────────────────────────────────────────────────────

const PRODUCT_COLUMNS: &str = "id, seller_id, name, description, category, price, stock_quantity, images, status, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: Uuid,
    seller_id: Option<String>,
    name: String,
    description: String,
    category: Option<String>,
    price: Decimal,
    stock_quantity: i32,
    images: Vec<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = StorageError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let stock_quantity = u32::try_from(row.stock_quantity)
            .map_err(|_| StorageError::Backend(format!("product {} has negative stock", row.id)))?;
        let status = ProductStatus::parse(&row.status)
            .ok_or_else(|| StorageError::Backend(format!("product {} has unknown status `{}`", row.id, row.status)))?;
        Ok(Product {
            id: row.id, seller_id: row.seller_id.map(UserId::new), name: row.name, description: row.description,
            category: row.category, price: row.price, stock_quantity, images: row.images, status, created_at: row.created_at, updated_at: row.updated_at,
        })
    }
}

fn stock_param(product_id: Uuid, qty: u32) -> StoreResult<i32> {
    i32::try_from(qty).map_err(|_| StorageError::StockConflict { product_id })
}

fn to_i64(value: u64) -> i64 { i64::try_from(value).unwrap_or(i64::MAX) }

fn like_pattern(term: &str) -> String {
    let escaped = term.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_");
    format!("%{escaped}%")
}

fn push_product_filters(qb: &mut QueryBuilder<'_, Postgres>, query: &ProductQuery) {
    qb.push(" WHERE TRUE");
    if let Some(category) = &query.category {
        qb.push(" AND category = ").push_bind(category.clone());
    }
    if let Some(min) = query.min_price {
        qb.push(" AND price >= ").push_bind(min);
    }
    if let Some(max) = query.max_price {
        qb.push(" AND price <= ").push_bind(max);
    }
    if let Some(term) = &query.search {
        let pattern = like_pattern(term);
        qb.push(" AND (name ILIKE ").push_bind(pattern.clone())
            .push(" OR description ILIKE ").push_bind(pattern.clone())
            .push(" OR category ILIKE ").push_bind(pattern)
            .push(")");
    }
}

// ── Repository ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    /// Connects and runs pending migrations.
    pub async fn connect(url: &str, max_connections: u32, acquire_timeout: Duration) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(acquire_timeout)
            .connect(url)
            .await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| StorageError::Backend(format!("migrations failed: {e}")))?;
        Ok(Self { pool })
    }
}

#[async_trait]
impl Store for PgStore {
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        let row = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.map(Product::try_from).transpose()
    }

    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let rows = sqlx::query_as::<_, ProductRow>(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)"))
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Product::try_from).collect()
    }

    async fn list_products(&self, query: &ProductQuery, page: Page) -> StoreResult<Listing<Product>> {
        let direction = if query.sort.descending { "DESC" } else { "ASC" };
        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {PRODUCT_COLUMNS} FROM products"));
        push_product_filters(&mut select, query);
        select
            .push(format!(" ORDER BY {} {direction}, id {direction} LIMIT ", query.sort.field.column()))
            .push_bind(to_i64(page.limit()))
            .push(" OFFSET ")
            .push_bind(to_i64(page.offset()));
        let rows = select.build_query_as::<ProductRow>().fetch_all(&self.pool).await?;

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM products");
        push_product_filters(&mut count, query);
        let (total,) = count.build_query_as::<(i64,)>().fetch_one(&self.pool).await?;
        let items = rows.into_iter().map(Product::try_from).collect::<StoreResult<Vec<_>>>()?;
        Ok(Listing { items, total: u64::try_from(total).unwrap_or(0) })
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO products (id, seller_id, name, description, category, price, stock_quantity, images, status, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(product.id)
        .bind(product.seller_id.as_ref().map(UserId::as_str))
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(stock_param(product.id, product.stock_quantity)?)
        .bind(&product.images)
        .bind(product.status.as_str())
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let result = sqlx::query(
            "UPDATE products SET seller_id = $2, name = $3, description = $4, category = $5, price = $6, stock_quantity = $7, \
             images = $8, status = $9, updated_at = $10 WHERE id = $1",
        )
        .bind(product.id)
        .bind(product.seller_id.as_ref().map(UserId::as_str))
        .bind(&product.name)
        .bind(&product.description)
        .bind(&product.category)
        .bind(product.price)
        .bind(stock_param(product.id, product.stock_quantity)?)
        .bind(&product.images)
        .bind(product.status.as_str())
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1").bind(id).execute(&self.pool).await?;
        Ok(result.rows_affected() > 0)
    }

    async fn load_cart(&self, owner: &UserId) -> StoreResult<Option<Cart>> {
        let row: Option<(Json<Cart>,)> = sqlx::query_as("SELECT document FROM carts WHERE user_id = $1")
            .bind(owner.as_str())
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(cart),)| cart))
    }

    async fn save_cart(&self, cart: &Cart) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO carts (user_id, document, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET document = EXCLUDED.document, updated_at = EXCLUDED.updated_at",
        )
        .bind(cart.owner().as_str())
        .bind(Json(cart))
        .bind(cart.updated_at())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn commit_checkout(&self, order: &Order, cart: &Cart) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;

        // 1. Conditionally decrement stock; a short product aborts everything
        for (product_id, qty) in order.quantities_by_product() {
            let updated = sqlx::query(
                "UPDATE products SET stock_quantity = stock_quantity - $2, updated_at = NOW() \
                 WHERE id = $1 AND stock_quantity >= $2",
            )
            .bind(product_id)
            .bind(stock_param(product_id, qty)?)
            .execute(&mut *tx)
            .await?
            .rows_affected();

            if updated == 0 {
                tx.rollback().await?;
                debug!(%product_id, qty, "conditional stock decrement failed");
                return Err(StorageError::StockConflict { product_id });
            }
        }

        // 2. Insert the order document
        sqlx::query(
            "INSERT INTO orders (id, order_number, user_id, order_status, total_amount, document, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(order.id())
        .bind(order.order_number())
        .bind(order.owner().as_str())
        .bind(order.order_status().as_str())
        .bind(order.total_amount())
        .bind(Json(order))
        .bind(order.created_at())
        .bind(order.updated_at())
        .execute(&mut *tx)
        .await?;

        // 3. Save the emptied cart
        sqlx::query(
            "INSERT INTO carts (user_id, document, updated_at) VALUES ($1, $2, $3) \
             ON CONFLICT (user_id) DO UPDATE SET document = EXCLUDED.document, updated_at = EXCLUDED.updated_at",
        )
        .bind(cart.owner().as_str())
        .bind(Json(cart))
        .bind(cart.updated_at())
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        let row: Option<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(order),)| order))
    }

    async fn orders_for(&self, owner: &UserId) -> StoreResult<Vec<Order>> {
        let rows: Vec<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders WHERE user_id = $1 ORDER BY created_at DESC")
            .bind(owner.as_str())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(|(Json(order),)| order).collect())
    }

    async fn list_orders(&self, page: Page) -> StoreResult<Listing<Order>> {
        let rows: Vec<(Json<Order>,)> = sqlx::query_as("SELECT document FROM orders ORDER BY created_at DESC LIMIT $1 OFFSET $2")
            .bind(to_i64(page.limit()))
            .bind(to_i64(page.offset()))
            .fetch_all(&self.pool)
            .await?;
        let (total,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM orders").fetch_one(&self.pool).await?;
        Ok(Listing { items: rows.into_iter().map(|(Json(order),)| order).collect(), total: u64::try_from(total).unwrap_or(0) })
    }

    async fn update_order(&self, order: &Order) -> StoreResult<bool> {
        let result = sqlx::query("UPDATE orders SET order_status = $2, document = $3, updated_at = $4 WHERE id = $1")
            .bind(order.id())
            .bind(order.order_status().as_str())
            .bind(Json(order))
            .bind(order.updated_at())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
