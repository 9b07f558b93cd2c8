//! Cart mutations and the priced cart view.

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Cart, PricingRules, Product, SelectedOptions, Totals, UserId, PLACEHOLDER_IMAGE};
use crate::store::Store;
use crate::{CommerceError, Result};

/// A cart as shown to its owner: lines joined with the live catalog plus
/// totals computed at read time.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    #[serde(flatten)]
    pub totals: Totals,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemView {
    /// Product id; the cart line has no identity of its own.
    pub id: Uuid,
    pub name: String,
    #[serde(with = "rust_decimal::serde::float")]
    pub price: Decimal,
    pub image: String,
    pub quantity: u32,
    pub options: SelectedOptions,
    pub stock_quantity: u32,
}

#[derive(Clone)]
pub struct CartService {
    store: Arc<dyn Store>,
    pricing: PricingRules,
}

impl CartService {
    pub fn new(store: Arc<dyn Store>, pricing: PricingRules) -> Self { Self { store, pricing } }

    #[instrument(skip(self), fields(user = %user))]
    pub async fn get_or_create(&self, user: &UserId) -> Result<CartView> {
        let cart = self.load_or_create(user).await?;
        self.view(&cart).await
    }

    /// Adds `quantity` of a product at its current price, merging into an
    /// existing line with the same options.
    #[instrument(skip(self, options), fields(user = %user))]
    pub async fn add_item(&self, user: &UserId, product_id: Uuid, quantity: u32, options: SelectedOptions) -> Result<CartView> {
        let product = self.store.find_product(product_id).await?.ok_or(CommerceError::ProductNotFound)?;
        if !product.has_stock(quantity) {
            return Err(CommerceError::InsufficientStock { product: product.name });
        }

        let mut cart = self.load_or_create(user).await?;
        cart.add_item(product.id, quantity, product.price, options)?;
        self.store.save_cart(&cart).await?;
        info!(%product_id, quantity, lines = cart.line_count(), "item added to cart");
        self.view(&cart).await
    }

    /// Sets the quantity of the first line for the product; zero or less removes that line.
    #[instrument(skip(self), fields(user = %user))]
    pub async fn update_item_quantity(&self, user: &UserId, product_id: Uuid, quantity: i64) -> Result<CartView> {
        let mut cart = self.store.load_cart(user).await?.ok_or(CommerceError::CartNotFound)?;
        cart.update_quantity(product_id, quantity)?;
        self.store.save_cart(&cart).await?;
        self.view(&cart).await
    }

    #[instrument(skip(self), fields(user = %user))]
    pub async fn remove_item(&self, user: &UserId, product_id: Uuid) -> Result<CartView> {
        let mut cart = self.store.load_cart(user).await?.ok_or(CommerceError::CartNotFound)?;
        if cart.remove_item(product_id) > 0 {
            self.store.save_cart(&cart).await?;
        }
        self.view(&cart).await
    }

    /// Empties the cart. The response is an all-zero view rather than the
    /// priced empty cart a later read returns.
    #[instrument(skip(self), fields(user = %user))]
    pub async fn clear(&self, user: &UserId) -> Result<CartView> {
        if let Some(mut cart) = self.store.load_cart(user).await? {
            cart.clear();
            self.store.save_cart(&cart).await?;
        }
        Ok(CartView::default())
    }

    async fn load_or_create(&self, user: &UserId) -> Result<Cart> {
        if let Some(cart) = self.store.load_cart(user).await? {
            return Ok(cart);
        }
        let cart = Cart::new(user.clone());
        self.store.save_cart(&cart).await?;
        Ok(cart)
    }

    async fn view(&self, cart: &Cart) -> Result<CartView> {
        let ids: Vec<Uuid> = cart.quantities_by_product().into_iter().map(|(id, _)| id).collect();
        let products: HashMap<Uuid, Product> = self.store.find_products(&ids).await?.into_iter().map(|p| (p.id, p)).collect();

        let items = cart
            .lines()
            .iter()
            .map(|line| {
                let product = products.get(&line.product_id);
                CartItemView {
                    id: line.product_id,
                    name: product.map_or_else(|| "Product".to_string(), |p| p.name.clone()),
                    price: line.unit_price,
                    image: product.map_or(PLACEHOLDER_IMAGE, Product::primary_image).to_string(),
                    quantity: line.quantity,
                    options: line.options.clone(),
                    stock_quantity: product.map_or(0, |p| p.stock_quantity),
                }
            })
            .collect();

        Ok(CartView { items, totals: cart.totals(&self.pricing) })
    }
}
