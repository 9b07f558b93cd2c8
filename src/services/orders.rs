//! Order queries and administration.

use std::sync::Arc;

use tracing::{info, instrument};
use uuid::Uuid;

use crate::domain::{Actor, Order, OrderStatus, UserId};
use crate::publisher::EventPublisher;
use crate::store::{Listing, Page, Store};
use crate::{CommerceError, Result};

#[derive(Clone)]
pub struct OrderService {
    store: Arc<dyn Store>,
    publisher: EventPublisher,
}

impl OrderService {
    pub fn new(store: Arc<dyn Store>, publisher: EventPublisher) -> Self { Self { store, publisher } }

    /// The user's orders, newest first.
    #[instrument(skip(self), fields(user = %user))]
    pub async fn for_user(&self, user: &UserId) -> Result<Vec<Order>> {
        Ok(self.store.orders_for(user).await?)
    }

    /// An order is visible to its owner and to admins.
    #[instrument(skip(self, actor), fields(user = %actor.user_id))]
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<Order> {
        let order = self.store.find_order(id).await?.ok_or(CommerceError::OrderNotFound)?;
        if order.owner() != &actor.user_id && !actor.is_admin() {
            return Err(CommerceError::Forbidden);
        }
        Ok(order)
    }

    #[instrument(skip(self))]
    pub async fn list_all(&self, page: Page) -> Result<Listing<Order>> {
        Ok(self.store.list_orders(page).await?)
    }

    #[instrument(skip(self, actor), fields(user = %actor.user_id))]
    pub async fn update_status(&self, actor: &Actor, id: Uuid, status: OrderStatus) -> Result<Order> {
        if !actor.is_admin() {
            return Err(CommerceError::Forbidden);
        }
        let mut order = self.store.find_order(id).await?.ok_or(CommerceError::OrderNotFound)?;
        let previous = order.order_status();
        order.update_status(status)?;

        let events = order.take_events();
        if events.is_empty() {
            return Ok(order);
        }
        if !self.store.update_order(&order).await? {
            return Err(CommerceError::OrderNotFound);
        }
        info!(order_id = %id, from = previous.as_str(), to = status.as_str(), "order status updated");
        self.publisher.publish(events).await;
        Ok(order)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Address, OrderLine, PricingRules, Product, Role};
    use crate::store::MemoryStore;
    use rust_decimal::Decimal;

    async fn seeded(owner: &UserId) -> (OrderService, Order) {
        let brooch = Product::create("Brooch", Decimal::from(30), 5).unwrap();
        let store = Arc::new(MemoryStore::with_products([brooch.clone()]));
        let line = OrderLine {
            product_id: brooch.id, seller_id: None, name: brooch.name.clone(), image: brooch.primary_image().to_string(),
            quantity: 1, unit_price: brooch.price, line_total: brooch.price,
        };
        let totals = PricingRules::default().compute_totals([(line.unit_price, line.quantity)]);
        let order = Order::place(owner.clone(), vec![line], totals, Address::default(), Address::default()).unwrap();
        store.commit_checkout(&order, &crate::domain::Cart::new(owner.clone())).await.unwrap();
        assert_eq!(store.find_product(brooch.id).await.unwrap().unwrap().stock_quantity, 4);
        (OrderService::new(store, EventPublisher::Log), order)
    }

    fn admin() -> Actor { Actor::new(UserId::new("admin"), Role::Admin) }

    #[tokio::test]
    async fn test_owner_and_admin_can_read() {
        let owner = UserId::new("buyer-1");
        let (service, order) = seeded(&owner).await;

        let as_owner = Actor::new(owner.clone(), Role::Buyer);
        assert_eq!(service.get(&as_owner, order.id()).await.unwrap().id(), order.id());
        assert_eq!(service.get(&admin(), order.id()).await.unwrap().id(), order.id());

        let stranger = Actor::new(UserId::new("buyer-2"), Role::Buyer);
        assert!(matches!(service.get(&stranger, order.id()).await, Err(CommerceError::Forbidden)));
        assert!(matches!(service.get(&admin(), Uuid::new_v4()).await, Err(CommerceError::OrderNotFound)));
    }

    #[tokio::test]
    async fn test_for_user_and_list_all() {
        let owner = UserId::new("buyer-1");
        let (service, _) = seeded(&owner).await;
        assert_eq!(service.for_user(&owner).await.unwrap().len(), 1);
        assert!(service.for_user(&UserId::new("buyer-2")).await.unwrap().is_empty());
        assert_eq!(service.list_all(Page::default()).await.unwrap().total, 1);
    }

    #[tokio::test]
    async fn test_update_status_persists_and_guards_terminal_states() {
        let owner = UserId::new("buyer-1");
        let (service, order) = seeded(&owner).await;

        let updated = service.update_status(&admin(), order.id(), OrderStatus::Cancelled).await.unwrap();
        assert_eq!(updated.order_status(), OrderStatus::Cancelled);
        assert_eq!(service.get(&admin(), order.id()).await.unwrap().order_status(), OrderStatus::Cancelled);

        let err = service.update_status(&admin(), order.id(), OrderStatus::Shipped).await.unwrap_err();
        assert!(matches!(err, CommerceError::InvalidStatusTransition(_)));
    }

    #[tokio::test]
    async fn test_update_status_requires_admin() {
        let owner = UserId::new("buyer-1");
        let (service, order) = seeded(&owner).await;
        let seller = Actor::new(UserId::new("seller-1"), Role::Seller);
        assert!(matches!(service.update_status(&seller, order.id(), OrderStatus::Shipped).await, Err(CommerceError::Forbidden)));
    }
}
