//! Cart Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use crate::domain::pricing::{PricingRules, Totals};
use crate::domain::value_objects::{SelectedOptions, UserId};

/// One cart per user. Totals are never stored; they are derived on read.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    owner: UserId,
    lines: Vec<CartLine>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub product_id: Uuid,
    pub quantity: u32,
    /// Price captured when the line was first added.
    pub unit_price: Decimal,
    #[serde(default)]
    pub options: SelectedOptions,
}

impl CartLine {
    pub fn line_total(&self) -> Decimal { self.unit_price * Decimal::from(self.quantity) }
    fn matches(&self, product_id: Uuid, options: &SelectedOptions) -> bool { self.product_id == product_id && &self.options == options }
}

impl Cart {
    pub fn new(owner: UserId) -> Self {
        let now = Utc::now();
        Self { owner, lines: vec![], created_at: now, updated_at: now }
    }

    pub fn owner(&self) -> &UserId { &self.owner }
    pub fn lines(&self) -> &[CartLine] { &self.lines }
    pub fn line_count(&self) -> usize { self.lines.len() }
    pub fn is_empty(&self) -> bool { self.lines.is_empty() }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    /// Requested quantity per product across all option variants.
    pub fn quantities_by_product(&self) -> Vec<(Uuid, u32)> {
        super::sum_by_product(self.lines.iter().map(|l| (l.product_id, l.quantity)))
    }

    pub fn totals(&self, rules: &PricingRules) -> Totals {
        rules.compute_totals(self.lines.iter().map(|l| (l.unit_price, l.quantity)))
    }

    /// Merges into the line with the same product and options, otherwise appends.
    pub fn add_item(&mut self, product_id: Uuid, quantity: u32, unit_price: Decimal, options: SelectedOptions) -> Result<(), CartError> {
        if quantity == 0 { return Err(CartError::InvalidQuantity); }
        if let Some(existing) = self.lines.iter_mut().find(|l| l.matches(product_id, &options)) {
            existing.quantity = existing.quantity.checked_add(quantity).ok_or(CartError::InvalidQuantity)?;
        } else {
            self.lines.push(CartLine { product_id, quantity, unit_price, options });
        }
        self.touch();
        Ok(())
    }

    /// Sets the quantity of the first line for `product_id`; zero or less removes it.
    pub fn update_quantity(&mut self, product_id: Uuid, quantity: i64) -> Result<(), CartError> {
        let idx = self.lines.iter().position(|l| l.product_id == product_id).ok_or(CartError::ItemNotFound)?;
        if quantity <= 0 {
            self.lines.remove(idx);
        } else {
            let quantity = u32::try_from(quantity).map_err(|_| CartError::InvalidQuantity)?;
            if let Some(line) = self.lines.get_mut(idx) { line.quantity = quantity; }
        }
        self.touch();
        Ok(())
    }

    /// Drops every line for `product_id`, returning how many were removed.
    pub fn remove_item(&mut self, product_id: Uuid) -> usize {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        let removed = before - self.lines.len();
        if removed > 0 { self.touch(); }
        removed
    }

    pub fn clear(&mut self) { self.lines.clear(); self.touch(); }

    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    #[error("Item not found in cart")]
    ItemNotFound,
    #[error("Invalid quantity")]
    InvalidQuantity,
}
