//! Seller-managed product catalog.

use std::sync::Arc;

use rust_decimal::Decimal;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Actor, Product, ProductStatus};
use crate::store::{Listing, Page, ProductQuery, Store};
use crate::{CommerceError, Result};

#[derive(Clone, Debug, Default)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub price: Decimal,
    pub stock_quantity: u32,
    pub images: Vec<String>,
}

/// Partial update; `None` leaves the field untouched.
#[derive(Clone, Debug, Default)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub price: Option<Decimal>,
    pub stock_quantity: Option<u32>,
    pub images: Option<Vec<String>>,
    pub status: Option<ProductStatus>,
}

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn Store>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn Store>) -> Self { Self { store } }

    #[instrument(skip(self))]
    pub async fn list(&self, query: &ProductQuery, page: Page) -> Result<Listing<Product>> {
        Ok(self.store.list_products(query, page).await?)
    }

    /// Free-text search over name, description and category, narrowed by the
    /// other filters in `query`.
    #[instrument(skip(self, query))]
    pub async fn search(&self, term: &str, mut query: ProductQuery, page: Page) -> Result<Listing<Product>> {
        let term = term.trim();
        if term.is_empty() {
            return Err(CommerceError::Validation("Search term required".into()));
        }
        query.search = Some(term.to_string());
        self.list(&query, page).await
    }

    #[instrument(skip(self))]
    pub async fn get(&self, id: Uuid) -> Result<Product> {
        self.store.find_product(id).await?.ok_or(CommerceError::ProductNotFound)
    }

    /// Lists a new product owned by the calling seller.
    #[instrument(skip(self, actor, input), fields(user = %actor.user_id))]
    pub async fn create(&self, actor: &Actor, input: NewProduct) -> Result<Product> {
        if !actor.can_sell() {
            return Err(CommerceError::Forbidden);
        }
        let mut product = Product::create(input.name, input.price, input.stock_quantity)?.with_seller(actor.user_id.clone());
        product.description = input.description;
        product.category = input.category;
        product.images = input.images;
        self.store.insert_product(&product).await?;
        info!(product_id = %product.id, "product created");
        Ok(product)
    }

    #[instrument(skip(self, actor, changes), fields(user = %actor.user_id))]
    pub async fn update(&self, actor: &Actor, id: Uuid, changes: ProductChanges) -> Result<Product> {
        let mut product = self.get(id).await?;
        authorize_edit(actor, &product)?;

        if let Some(name) = changes.name { product.rename(name)?; }
        if let Some(price) = changes.price { product.reprice(price)?; }
        if let Some(stock) = changes.stock_quantity { product.restock(stock); }
        if let Some(description) = changes.description { product.description = description; }
        if let Some(category) = changes.category { product.category = Some(category); }
        if let Some(images) = changes.images { product.images = images; }
        if let Some(status) = changes.status { product.status = status; }
        product.touch();

        if !self.store.update_product(&product).await? {
            return Err(CommerceError::ProductNotFound);
        }
        info!(product_id = %id, "product updated");
        Ok(product)
    }

    /// Removes the product from the catalog. Carts still holding it show a
    /// placeholder line and fail at checkout.
    #[instrument(skip(self, actor), fields(user = %actor.user_id))]
    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<Product> {
        let product = self.get(id).await?;
        authorize_edit(actor, &product)?;
        if !self.store.delete_product(id).await? {
            return Err(CommerceError::ProductNotFound);
        }
        info!(product_id = %id, "product deleted");
        Ok(product)
    }
}

/// Only the owning seller or an admin may change a product.
fn authorize_edit(actor: &Actor, product: &Product) -> Result<()> {
    if actor.is_admin() || (actor.can_sell() && product.is_owned_by(&actor.user_id)) {
        Ok(())
    } else {
        Err(CommerceError::Forbidden)
    }
}
