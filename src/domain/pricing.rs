//! Pricing rules shared by carts and orders.

use rust_decimal::Decimal;
use serde::Serialize;

/// Fixed business rules used to derive totals from priced lines.
///
/// Amounts are in minor currency units; the defaults charge 20% tax and a
/// flat shipping fee of 500 unless the subtotal is above 50000.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PricingRules {
    pub tax_rate: Decimal,
    pub free_shipping_threshold: Decimal,
    pub flat_shipping_fee: Decimal,
}

impl Default for PricingRules {
    fn default() -> Self {
        Self { tax_rate: Decimal::new(20, 2), free_shipping_threshold: Decimal::from(50_000), flat_shipping_fee: Decimal::from(500) }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Totals {
    #[serde(with = "rust_decimal::serde::float")]
    pub subtotal: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub tax: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub shipping: Decimal,
    #[serde(with = "rust_decimal::serde::float")]
    pub total: Decimal,
}

impl PricingRules {
    /// Derive totals from `(unit_price, quantity)` pairs.
    pub fn compute_totals<I>(&self, lines: I) -> Totals
    where
        I: IntoIterator<Item = (Decimal, u32)>,
    {
        let subtotal: Decimal = lines.into_iter().map(|(price, qty)| price * Decimal::from(qty)).sum();
        let tax = subtotal * self.tax_rate;
        let shipping = self.shipping_for(subtotal);
        Totals { subtotal, tax, shipping, total: subtotal + tax + shipping }
    }

    /// Shipping is free only when the subtotal strictly exceeds the threshold.
    pub fn shipping_for(&self, subtotal: Decimal) -> Decimal {
        if subtotal > self.free_shipping_threshold { Decimal::ZERO } else { self.flat_shipping_fee }
    }
}
