//! Process-local store. Used as the configured backend for demos and tests
//! and as the fallback when PostgreSQL is unreachable.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Deserialize;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{Listing, Page, ProductQuery, StorageError, Store, StoreResult};
use crate::domain::{Cart, Order, Product, UserId};

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<RwLock<MemoryState>>,
}

#[derive(Debug, Default)]
struct MemoryState {
    products: HashMap<Uuid, Product>,
    carts: HashMap<UserId, Cart>,
    orders: Vec<Order>,
}

impl MemoryStore {
    pub fn new() -> Self { Self::default() }

    pub fn with_products(products: impl IntoIterator<Item = Product>) -> Self {
        let products = products.into_iter().map(|p| (p.id, p)).collect();
        Self { state: Arc::new(RwLock::new(MemoryState { products, ..MemoryState::default() })) }
    }
}

fn paginate<T: Clone>(items: &[T], page: Page) -> Listing<T> {
    let offset = usize::try_from(page.offset()).unwrap_or(usize::MAX);
    let limit = usize::try_from(page.limit()).unwrap_or(usize::MAX);
    Listing { items: items.iter().skip(offset).take(limit).cloned().collect(), total: items.len() as u64 }
}

#[async_trait]
impl Store for MemoryStore {
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> {
        Ok(self.state.read().await.products.get(&id).cloned())
    }

    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> {
        let state = self.state.read().await;
        Ok(ids.iter().filter_map(|id| state.products.get(id).cloned()).collect())
    }

    async fn list_products(&self, query: &ProductQuery, page: Page) -> StoreResult<Listing<Product>> {
        let state = self.state.read().await;
        let mut products: Vec<Product> = state.products.values().filter(|p| query.matches(p)).cloned().collect();
        products.sort_by(|a, b| query.compare(a, b));
        Ok(paginate(&products, page))
    }

    async fn insert_product(&self, product: &Product) -> StoreResult<()> {
        self.state.write().await.products.insert(product.id, product.clone());
        Ok(())
    }

    async fn update_product(&self, product: &Product) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.products.get_mut(&product.id) {
            Some(existing) => { *existing = product.clone(); Ok(true) }
            None => Ok(false),
        }
    }

    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> {
        Ok(self.state.write().await.products.remove(&id).is_some())
    }

    async fn load_cart(&self, owner: &UserId) -> StoreResult<Option<Cart>> {
        Ok(self.state.read().await.carts.get(owner).cloned())
    }

    async fn save_cart(&self, cart: &Cart) -> StoreResult<()> {
        self.state.write().await.carts.insert(cart.owner().clone(), cart.clone());
        Ok(())
    }

    async fn commit_checkout(&self, order: &Order, cart: &Cart) -> StoreResult<()> {
        let mut state = self.state.write().await;
        let demand = order.quantities_by_product();

        for (product_id, qty) in &demand {
            let available = state.products.get(product_id).is_some_and(|p| p.has_stock(*qty));
            if !available {
                return Err(StorageError::StockConflict { product_id: *product_id });
            }
        }
        for (product_id, qty) in demand {
            if let Some(product) = state.products.get_mut(&product_id) {
                product.remove_inventory(qty).map_err(|_| StorageError::StockConflict { product_id })?;
            }
        }

        state.orders.push(order.clone());
        state.carts.insert(cart.owner().clone(), cart.clone());
        Ok(())
    }

    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> {
        Ok(self.state.read().await.orders.iter().find(|o| o.id() == id).cloned())
    }

    async fn orders_for(&self, owner: &UserId) -> StoreResult<Vec<Order>> {
        let state = self.state.read().await;
        Ok(state.orders.iter().rev().filter(|o| o.owner() == owner).cloned().collect())
    }

    async fn list_orders(&self, page: Page) -> StoreResult<Listing<Order>> {
        let state = self.state.read().await;
        let newest_first: Vec<Order> = state.orders.iter().rev().cloned().collect();
        Ok(paginate(&newest_first, page))
    }

    async fn update_order(&self, order: &Order) -> StoreResult<bool> {
        let mut state = self.state.write().await;
        match state.orders.iter_mut().find(|o| o.id() == order.id()) {
            Some(existing) => { *existing = order.clone(); Ok(true) }
            None => Ok(false),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductSeed {
    id: Option<Uuid>,
    seller_id: Option<UserId>,
    name: String,
    #[serde(default)]
    description: String,
    category: Option<String>,
    price: Decimal,
    stock_quantity: u32,
    #[serde(default)]
    images: Vec<String>,
}

/// Reads a JSON array of products used to populate the in-memory catalog.
pub fn load_catalog_seed(path: &Path) -> StoreResult<Vec<Product>> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| StorageError::Backend(format!("cannot read catalog seed {}: {e}", path.display())))?;
    let seeds: Vec<ProductSeed> = serde_json::from_str(&raw)
        .map_err(|e| StorageError::Backend(format!("invalid catalog seed {}: {e}", path.display())))?;

    seeds
        .into_iter()
        .map(|seed| {
            let mut product = Product::create(seed.name, seed.price, seed.stock_quantity)
                .map_err(|e| StorageError::Backend(format!("invalid catalog seed {}: {e}", path.display())))?;
            if let Some(id) = seed.id { product.id = id; }
            product.seller_id = seed.seller_id;
            product.description = seed.description;
            product.category = seed.category;
            product.images = seed.images;
            Ok(product)
        })
        .collect()
}
