//! Converts a cart into an order.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::domain::{Address, Cart, DomainEvent, Order, OrderLine, PricingRules, Product, ProductEvent, UserId};
use crate::publisher::EventPublisher;
use crate::store::{StorageError, Store};
use crate::{CommerceError, Result};

#[derive(Clone)]
pub struct CheckoutService {
    store: Arc<dyn Store>,
    pricing: PricingRules,
    publisher: EventPublisher,
}

impl CheckoutService {
    pub fn new(store: Arc<dyn Store>, pricing: PricingRules, publisher: EventPublisher) -> Self {
        Self { store, pricing, publisher }
    }

    /// Places an order for everything in the user's cart.
    ///
    /// Stock is checked against the current catalog with quantities summed per
    /// product. The stock decrement, the order insert and the cart reset are
    /// committed together; nothing is written if any product is short.
    #[instrument(skip(self, shipping_address, billing_address), fields(user = %user))]
    pub async fn checkout(&self, user: &UserId, shipping_address: Address, billing_address: Option<Address>) -> Result<Order> {
        let mut cart = match self.store.load_cart(user).await? {
            Some(cart) if !cart.is_empty() => cart,
            _ => return Err(CommerceError::EmptyCart),
        };

        let demand = cart.quantities_by_product();
        let ids: Vec<Uuid> = demand.iter().map(|(id, _)| *id).collect();
        let products: HashMap<Uuid, Product> = self.store.find_products(&ids).await?.into_iter().map(|p| (p.id, p)).collect();

        for (product_id, qty) in &demand {
            match products.get(product_id) {
                Some(product) if product.has_stock(*qty) => {}
                Some(product) => return Err(CommerceError::InsufficientStock { product: product.name.clone() }),
                None => return Err(CommerceError::InsufficientStock { product: product_id.to_string() }),
            }
        }

        let lines = snapshot_lines(&cart, &products);
        let totals = cart.totals(&self.pricing);
        let billing_address = billing_address.unwrap_or_else(|| shipping_address.clone());
        let mut order = Order::place(user.clone(), lines, totals, shipping_address, billing_address)?;

        cart.clear();
        match self.store.commit_checkout(&order, &cart).await {
            Ok(()) => {}
            Err(StorageError::StockConflict { product_id }) => {
                warn!(%product_id, "stock changed during checkout");
                let product = products.get(&product_id).map_or_else(|| product_id.to_string(), |p| p.name.clone());
                return Err(CommerceError::InsufficientStock { product });
            }
            Err(e) => return Err(e.into()),
        }
        info!(order_id = %order.id(), order_number = order.order_number(), total = %order.total_amount(), "order placed");

        let mut events = order.take_events();
        events.extend(demand.into_iter().map(|(product_id, quantity)| DomainEvent::Product(ProductEvent::InventoryRemoved { product_id, quantity })));
        self.publisher.publish(events).await;
        Ok(order)
    }
}

/// Freezes each cart line with the catalog data it was sold under.
fn snapshot_lines(cart: &Cart, products: &HashMap<Uuid, Product>) -> Vec<OrderLine> {
    cart.lines()
        .iter()
        .filter_map(|line| {
            let product = products.get(&line.product_id)?;
            Some(OrderLine {
                product_id: line.product_id,
                seller_id: product.seller_id.clone(),
                name: product.name.clone(),
                image: product.primary_image().to_string(),
                quantity: line.quantity,
                unit_price: line.unit_price,
                line_total: line.line_total(),
            })
        })
        .collect()
}
