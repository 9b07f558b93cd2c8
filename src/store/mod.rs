//! Persistence ports and their adapters.
//!
//! Services only see [`Store`]. Two adapters implement it, PostgreSQL for
//! durable storage and an in-memory one that lives as long as the process.
//! [`FailoverStore`] is the single place that decides what happens when the
//! durable store becomes unreachable.

mod failover;
mod memory;
mod postgres;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::{FailurePolicy, StorageConfig, StorageMode};
use crate::domain::{Cart, Order, Product, UserId};

pub use failover::FailoverStore;
pub use memory::{load_catalog_seed, MemoryStore};
pub use postgres::PgStore;

#[derive(Debug, Error)]
pub enum StorageError {
    /// The backing store could not be reached at all.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// A conditional stock decrement found less stock than the order needs.
    #[error("not enough stock left for product {product_id}")]
    StockConflict { product_id: Uuid },

    #[error("storage error: {0}")]
    Backend(String),
}

pub type StoreResult<T> = Result<T, StorageError>;

/// One-based page request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Page {
    pub page: u32,
    pub per_page: u32,
}

impl Page {
    pub fn new(page: Option<u32>, per_page: Option<u32>) -> Self {
        Self { page: page.unwrap_or(1).max(1), per_page: per_page.unwrap_or(20).clamp(1, 100) }
    }

    pub fn offset(&self) -> u64 { u64::from(self.page - 1) * u64::from(self.per_page) }
    pub fn limit(&self) -> u64 { u64::from(self.per_page) }
}

impl Default for Page {
    fn default() -> Self { Self::new(None, None) }
}

/// Catalog filters. Every `Some` field narrows the result; `search` matches
/// name, description or category case-insensitively.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ProductQuery {
    pub category: Option<String>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub search: Option<String>,
    pub sort: ProductSort,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProductSort {
    pub field: SortField,
    pub descending: bool,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SortField { #[default] Name, Price, StockQuantity, CreatedAt }

impl SortField {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "price" => Some(Self::Price),
            "stockQuantity" => Some(Self::StockQuantity),
            "createdAt" => Some(Self::CreatedAt),
            _ => None,
        }
    }

    fn column(&self) -> &'static str {
        match self { Self::Name => "name", Self::Price => "price", Self::StockQuantity => "stock_quantity", Self::CreatedAt => "created_at" }
    }
}

impl ProductQuery {
    pub fn matches(&self, product: &Product) -> bool {
        if let Some(category) = &self.category {
            if product.category.as_deref() != Some(category.as_str()) { return false; }
        }
        if self.min_price.is_some_and(|min| product.price < min) { return false; }
        if self.max_price.is_some_and(|max| product.price > max) { return false; }
        match &self.search {
            Some(term) => {
                let term = term.to_lowercase();
                product.name.to_lowercase().contains(&term)
                    || product.description.to_lowercase().contains(&term)
                    || product.category.as_deref().is_some_and(|c| c.to_lowercase().contains(&term))
            }
            None => true,
        }
    }

    /// Orders by the sort field, then by id so pages are stable.
    pub fn compare(&self, a: &Product, b: &Product) -> std::cmp::Ordering {
        let ord = match self.sort.field {
            SortField::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
            SortField::Price => a.price.cmp(&b.price),
            SortField::StockQuantity => a.stock_quantity.cmp(&b.stock_quantity),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        }
        .then_with(|| a.id.cmp(&b.id));
        if self.sort.descending { ord.reverse() } else { ord }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Listing<T> {
    pub items: Vec<T>,
    pub total: u64,
}

#[async_trait]
pub trait Store: Send + Sync + 'static {
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>>;
    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>>;
    async fn list_products(&self, query: &ProductQuery, page: Page) -> StoreResult<Listing<Product>>;
    async fn insert_product(&self, product: &Product) -> StoreResult<()>;
    async fn update_product(&self, product: &Product) -> StoreResult<bool>;
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool>;

    async fn load_cart(&self, owner: &UserId) -> StoreResult<Option<Cart>>;
    /// Upserts the cart keyed by its owner.
    async fn save_cart(&self, cart: &Cart) -> StoreResult<()>;

    /// Atomically decrements stock for every order line (only where enough
    /// stock remains), inserts the order and saves the emptied cart. If any
    /// decrement cannot be applied nothing is written and
    /// [`StorageError::StockConflict`] is returned.
    async fn commit_checkout(&self, order: &Order, cart: &Cart) -> StoreResult<()>;

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>>;
    async fn orders_for(&self, owner: &UserId) -> StoreResult<Vec<Order>>;
    async fn list_orders(&self, page: Page) -> StoreResult<Listing<Order>>;
    async fn update_order(&self, order: &Order) -> StoreResult<bool>;
}

/// Shared view of which store is serving requests.
#[derive(Clone, Debug)]
pub struct StorageHealth {
    mode: StorageMode,
    degraded: Arc<AtomicBool>,
}

impl StorageHealth {
    pub fn new(mode: StorageMode) -> Self {
        Self { mode, degraded: Arc::new(AtomicBool::new(false)) }
    }

    pub fn mode(&self) -> StorageMode { self.mode }
    pub fn is_degraded(&self) -> bool { self.degraded.load(Ordering::Acquire) }

    /// Data survives a restart only when PostgreSQL is serving.
    pub fn is_durable(&self) -> bool { self.mode == StorageMode::Postgres && !self.is_degraded() }

    /// Returns `true` for the call that actually flipped the flag.
    pub fn mark_degraded(&self) -> bool { !self.degraded.swap(true, Ordering::AcqRel) }
}

/// Opens the store selected by `config`, applying the failure policy if the
/// database cannot be reached at startup.
pub async fn open(config: &StorageConfig) -> anyhow::Result<(Arc<dyn Store>, StorageHealth)> {
    let seed = match &config.catalog_seed_path {
        Some(path) => load_catalog_seed(path)?,
        None => Vec::new(),
    };
    let memory = MemoryStore::with_products(seed);

    match config.mode {
        StorageMode::Memory => {
            info!("using in-memory storage; data is lost on restart");
            Ok((Arc::new(memory), StorageHealth::new(StorageMode::Memory)))
        }
        StorageMode::Postgres => {
            let url = config.database_url.as_deref().ok_or_else(|| anyhow::anyhow!("DATABASE_URL must be set"))?;
            let health = StorageHealth::new(StorageMode::Postgres);
            match PgStore::connect(url, config.max_connections, config.acquire_timeout).await {
                Ok(primary) => {
                    info!("connected to PostgreSQL");
                    let store = FailoverStore::new(Arc::new(primary), memory, config.failure_policy, health.clone());
                    Ok((Arc::new(store), health))
                }
                Err(StorageError::Unavailable(reason)) if config.failure_policy == FailurePolicy::Degrade => {
                    warn!(%reason, "database unreachable at startup; serving from non-durable memory store");
                    health.mark_degraded();
                    Ok((Arc::new(memory), health))
                }
                Err(e) => Err(e.into()),
            }
        }
    }
}
