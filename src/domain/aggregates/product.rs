//! Product Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::value_objects::UserId;

pub const PLACEHOLDER_IMAGE: &str = "/images/placeholder.jpg";

/// A sellable catalog entry. Checkout reads it and decrements its stock.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: Uuid,
    pub seller_id: Option<UserId>,
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub category: Option<String>,
    pub price: Decimal,
    pub stock_quantity: u32,
    pub images: Vec<String>,
    pub status: ProductStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProductStatus { #[default] Active, Inactive }

impl ProductStatus {
    pub fn as_str(&self) -> &'static str { match self { Self::Active => "Active", Self::Inactive => "Inactive" } }
    pub fn parse(value: &str) -> Option<Self> {
        match value { "Active" => Some(Self::Active), "Inactive" => Some(Self::Inactive), _ => None }
    }
}

impl Product {
    pub fn create(name: impl Into<String>, price: Decimal, stock_quantity: u32) -> Result<Self, ProductError> {
        let name = name.into();
        if name.trim().is_empty() { return Err(ProductError::MissingName); }
        if price.is_sign_negative() { return Err(ProductError::NegativePrice); }
        let now = Utc::now();
        Ok(Self {
            id: Uuid::now_v7(), seller_id: None, name, description: String::new(), category: None, price, stock_quantity,
            images: vec![], status: ProductStatus::Active, created_at: now, updated_at: now,
        })
    }

    pub fn with_seller(mut self, seller: UserId) -> Self { self.seller_id = Some(seller); self }

    /// First image, or the storefront placeholder.
    pub fn primary_image(&self) -> &str { self.images.first().map(String::as_str).unwrap_or(PLACEHOLDER_IMAGE) }
    pub fn has_stock(&self, qty: u32) -> bool { self.stock_quantity >= qty }
    pub fn is_owned_by(&self, user: &UserId) -> bool { self.seller_id.as_ref() == Some(user) }

    pub fn rename(&mut self, name: impl Into<String>) -> Result<(), ProductError> {
        let name = name.into();
        if name.trim().is_empty() { return Err(ProductError::MissingName); }
        self.name = name;
        self.touch();
        Ok(())
    }

    pub fn reprice(&mut self, price: Decimal) -> Result<(), ProductError> {
        if price.is_sign_negative() { return Err(ProductError::NegativePrice); }
        self.price = price;
        self.touch();
        Ok(())
    }

    pub fn restock(&mut self, stock_quantity: u32) { self.stock_quantity = stock_quantity; self.touch(); }

    pub fn remove_inventory(&mut self, qty: u32) -> Result<(), ProductError> {
        self.stock_quantity = self.stock_quantity.checked_sub(qty).ok_or(ProductError::InsufficientInventory)?;
        self.touch();
        Ok(())
    }

    pub fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProductError {
    #[error("Product name is required")]
    MissingName,
    #[error("Product price cannot be negative")]
    NegativePrice,
    #[error("Insufficient inventory")]
    InsufficientInventory,
}
