//! Order Aggregate

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;
use validator::Validate;
use crate::domain::events::{DomainEvent, OrderEvent};
use crate::domain::pricing::Totals;
use crate::domain::value_objects::UserId;

/// A placed order. Lines are snapshots taken at checkout and never follow
/// later catalog edits.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    id: Uuid,
    order_number: String,
    owner: UserId,
    lines: Vec<OrderLine>,
    subtotal: Decimal,
    tax: Decimal,
    shipping: Decimal,
    total_amount: Decimal,
    shipping_address: Address,
    billing_address: Address,
    payment_status: PaymentStatus,
    order_status: OrderStatus,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(skip)]
    events: Vec<DomainEvent>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderLine {
    pub product_id: Uuid,
    pub seller_id: Option<UserId>,
    pub name: String,
    pub image: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    #[validate(length(min = 1, max = 120))]
    pub full_name: String,
    #[validate(length(min = 1, max = 200))]
    pub street: String,
    #[validate(length(min = 1, max = 100))]
    pub city: String,
    #[validate(length(min = 1, max = 20))]
    pub postal_code: String,
    #[validate(length(min = 2, max = 60))]
    pub country: String,
    #[validate(length(max = 30))]
    pub phone: Option<String>,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus { #[default] Pending, Confirmed, Processing, Shipped, Delivered, Cancelled, Refunded }
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PaymentStatus { #[default] Pending, Authorized, Paid, Refunded, Voided }

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "Pending", Self::Confirmed => "Confirmed", Self::Processing => "Processing",
            Self::Shipped => "Shipped", Self::Delivered => "Delivered", Self::Cancelled => "Cancelled", Self::Refunded => "Refunded",
        }
    }

    /// Cancelled and refunded orders are final; a delivered order can only be refunded.
    pub fn can_transition_to(self, next: OrderStatus) -> bool {
        match self {
            Self::Cancelled | Self::Refunded => false,
            Self::Delivered => next == Self::Refunded,
            _ => true,
        }
    }
}

impl Order {
    pub fn place(owner: UserId, lines: Vec<OrderLine>, totals: Totals, shipping_address: Address, billing_address: Address) -> Result<Self, OrderError> {
        if lines.is_empty() { return Err(OrderError::NoItems); }
        let id = Uuid::now_v7();
        let now = Utc::now();
        let mut order = Self {
            id, order_number: format!("ORD-{:08}", rand::random::<u32>()), owner, lines,
            subtotal: totals.subtotal, tax: totals.tax, shipping: totals.shipping, total_amount: totals.total,
            shipping_address, billing_address, payment_status: PaymentStatus::Pending, order_status: OrderStatus::Pending,
            created_at: now, updated_at: now, events: vec![],
        };
        order.raise_event(DomainEvent::Order(OrderEvent::Placed {
            order_id: id, order_number: order.order_number.clone(), owner: order.owner.clone(), total: order.total_amount,
        }));
        Ok(order)
    }

    pub fn id(&self) -> Uuid { self.id }
    pub fn order_number(&self) -> &str { &self.order_number }
    pub fn owner(&self) -> &UserId { &self.owner }
    pub fn lines(&self) -> &[OrderLine] { &self.lines }
    pub fn subtotal(&self) -> Decimal { self.subtotal }
    pub fn tax(&self) -> Decimal { self.tax }
    pub fn shipping(&self) -> Decimal { self.shipping }
    pub fn total_amount(&self) -> Decimal { self.total_amount }
    pub fn shipping_address(&self) -> &Address { &self.shipping_address }
    pub fn billing_address(&self) -> &Address { &self.billing_address }
    pub fn payment_status(&self) -> PaymentStatus { self.payment_status }
    pub fn order_status(&self) -> OrderStatus { self.order_status }
    pub fn created_at(&self) -> DateTime<Utc> { self.created_at }
    pub fn updated_at(&self) -> DateTime<Utc> { self.updated_at }

    pub fn quantities_by_product(&self) -> Vec<(Uuid, u32)> {
        super::sum_by_product(self.lines.iter().map(|l| (l.product_id, l.quantity)))
    }

    /// Lines grouped by the seller that fulfils them.
    pub fn lines_by_seller(&self) -> BTreeMap<Option<&UserId>, Vec<&OrderLine>> {
        let mut groups: BTreeMap<Option<&UserId>, Vec<&OrderLine>> = BTreeMap::new();
        for line in &self.lines { groups.entry(line.seller_id.as_ref()).or_default().push(line); }
        groups
    }

    pub fn update_status(&mut self, next: OrderStatus) -> Result<(), OrderError> {
        let current = self.order_status;
        if current == next { return Ok(()); }
        if !current.can_transition_to(next) { return Err(OrderError::InvalidTransition { from: current, to: next }); }
        self.order_status = next;
        self.touch();
        self.raise_event(DomainEvent::Order(OrderEvent::StatusChanged { order_id: self.id, from: current, to: next }));
        Ok(())
    }

    pub fn take_events(&mut self) -> Vec<DomainEvent> { std::mem::take(&mut self.events) }
    fn raise_event(&mut self, e: DomainEvent) { self.events.push(e); }
    fn touch(&mut self) { self.updated_at = Utc::now(); }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum OrderError {
    #[error("Order has no items")]
    NoItems,
    #[error("Cannot change order status from {} to {}", from.as_str(), to.as_str())]
    InvalidTransition { from: OrderStatus, to: OrderStatus },
}
