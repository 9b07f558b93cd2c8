//! Domain events
use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;
use crate::domain::aggregates::OrderStatus;
use crate::domain::value_objects::UserId;

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "aggregate", content = "event")]
pub enum DomainEvent {
    Product(ProductEvent),
    Order(OrderEvent),
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum ProductEvent {
    InventoryRemoved { product_id: Uuid, quantity: u32 },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum OrderEvent {
    Placed { order_id: Uuid, order_number: String, owner: UserId, total: Decimal },
    StatusChanged { order_id: Uuid, from: OrderStatus, to: OrderStatus },
}

impl DomainEvent {
    /// Message subject the event is published on.
    pub fn subject(&self) -> &'static str {
        match self {
            Self::Product(ProductEvent::InventoryRemoved { .. }) => "storefront.product.inventory_removed",
            Self::Order(OrderEvent::Placed { .. }) => "storefront.order.placed",
            Self::Order(OrderEvent::StatusChanged { .. }) => "storefront.order.status_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_payload_shape() {
        let event = DomainEvent::Order(OrderEvent::StatusChanged { order_id: Uuid::nil(), from: OrderStatus::Pending, to: OrderStatus::Shipped });
        assert_eq!(event.subject(), "storefront.order.status_changed");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["aggregate"], "Order");
        assert_eq!(json["event"]["type"], "StatusChanged");
        assert_eq!(json["event"]["orderId"], Uuid::nil().to_string());
        assert_eq!(json["event"]["to"], "Shipped");
    }
}
