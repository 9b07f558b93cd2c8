//! Aggregates module
pub mod product;
pub mod order;
pub mod cart;

pub use product::{Product, ProductError, ProductStatus, PLACEHOLDER_IMAGE};
pub use order::{Address, Order, OrderError, OrderLine, OrderStatus, PaymentStatus};
pub use cart::{Cart, CartError, CartLine};

use uuid::Uuid;

/// Sums quantities per product, keeping the order products first appear in.
pub(crate) fn sum_by_product(lines: impl IntoIterator<Item = (Uuid, u32)>) -> Vec<(Uuid, u32)> {
    let mut totals: Vec<(Uuid, u32)> = Vec::new();
    for (product_id, qty) in lines {
        match totals.iter_mut().find(|(id, _)| *id == product_id) {
            Some((_, total)) => *total = total.saturating_add(qty),
            None => totals.push((product_id, qty)),
        }
    }
    totals
}
