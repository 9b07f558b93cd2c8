use std::sync::Arc;

use async_trait::async_trait;
use tracing::{error, warn};
use uuid::Uuid;

use super::{Listing, MemoryStore, Page, ProductQuery, StorageError, StorageHealth, Store, StoreResult};
use crate::config::FailurePolicy;
use crate::domain::{Cart, Order, Product, UserId};

/// Routes calls to the durable store and decides, in one place, what an
/// unreachable database means: switch to memory (and say so through
/// [`StorageHealth`]) or hand the error back to the caller.
///
/// Once degraded, every call goes to memory until the process restarts, so
/// reads keep seeing the writes made while degraded.
pub struct FailoverStore {
    primary: Arc<dyn Store>,
    fallback: MemoryStore,
    policy: FailurePolicy,
    health: StorageHealth,
}

impl FailoverStore {
    pub fn new(primary: Arc<dyn Store>, fallback: MemoryStore, policy: FailurePolicy, health: StorageHealth) -> Self {
        Self { primary, fallback, policy, health }
    }

    fn on_unavailable(&self, op: &'static str, reason: String) -> StoreResult<()> {
        match self.policy {
            FailurePolicy::Fail => {
                error!(op, %reason, "storage unavailable");
                Err(StorageError::Unavailable(reason))
            }
            FailurePolicy::Degrade => {
                if self.health.mark_degraded() {
                    warn!(op, %reason, "storage unavailable; switching to non-durable memory store");
                }
                Ok(())
            }
        }
    }
}

macro_rules! failover {
    ($self:ident . $op:ident ( $($arg:expr),* )) => {{
        if $self.health.is_degraded() {
            return $self.fallback.$op($($arg),*).await;
        }
        match $self.primary.$op($($arg),*).await {
            Err(StorageError::Unavailable(reason)) => {
                $self.on_unavailable(stringify!($op), reason)?;
                $self.fallback.$op($($arg),*).await
            }
            other => other,
        }
    }};
}

#[async_trait]
impl Store for FailoverStore {
    async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> { failover!(self.find_product(id)) }
    async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> { failover!(self.find_products(ids)) }
    async fn list_products(&self, query: &ProductQuery, page: Page) -> StoreResult<Listing<Product>> { failover!(self.list_products(query, page)) }
    async fn insert_product(&self, product: &Product) -> StoreResult<()> { failover!(self.insert_product(product)) }
    async fn update_product(&self, product: &Product) -> StoreResult<bool> { failover!(self.update_product(product)) }
    async fn delete_product(&self, id: Uuid) -> StoreResult<bool> { failover!(self.delete_product(id)) }
    async fn load_cart(&self, owner: &UserId) -> StoreResult<Option<Cart>> { failover!(self.load_cart(owner)) }
    async fn save_cart(&self, cart: &Cart) -> StoreResult<()> { failover!(self.save_cart(cart)) }

    /// A checkout priced against the database is never replayed against the
    /// memory store: the outage is reported even when the store degrades.
    async fn commit_checkout(&self, order: &Order, cart: &Cart) -> StoreResult<()> {
        if self.health.is_degraded() {
            return self.fallback.commit_checkout(order, cart).await;
        }
        match self.primary.commit_checkout(order, cart).await {
            Err(StorageError::Unavailable(reason)) => {
                self.on_unavailable("commit_checkout", reason.clone())?;
                warn!(order_id = %order.id(), %reason, "checkout interrupted by storage outage; order not placed");
                Err(StorageError::Unavailable(reason))
            }
            other => other,
        }
    }
    async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> { failover!(self.find_order(id)) }
    async fn orders_for(&self, owner: &UserId) -> StoreResult<Vec<Order>> { failover!(self.orders_for(owner)) }
    async fn list_orders(&self, page: Page) -> StoreResult<Listing<Order>> { failover!(self.list_orders(page)) }
    async fn update_order(&self, order: &Order) -> StoreResult<bool> { failover!(self.update_order(order)) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StorageMode;
    use crate::domain::{Address, OrderLine, PricingRules};
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// A primary that is reachable until `fail_after` calls have been made.
    #[derive(Default)]
    struct FlakyStore {
        inner: MemoryStore,
        calls: AtomicUsize,
        fail_after: usize,
        backend_error: bool,
    }

    impl FlakyStore {
        fn check(&self) -> StoreResult<()> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.fail_after { return Ok(()); }
            if self.backend_error { Err(StorageError::Backend("syntax error".into())) } else { Err(StorageError::Unavailable("connection refused".into())) }
        }
    }

    #[async_trait]
    impl Store for FlakyStore {
        async fn find_product(&self, id: Uuid) -> StoreResult<Option<Product>> { self.check()?; self.inner.find_product(id).await }
        async fn find_products(&self, ids: &[Uuid]) -> StoreResult<Vec<Product>> { self.check()?; self.inner.find_products(ids).await }
        async fn list_products(&self, query: &ProductQuery, page: Page) -> StoreResult<Listing<Product>> { self.check()?; self.inner.list_products(query, page).await }
        async fn insert_product(&self, product: &Product) -> StoreResult<()> { self.check()?; self.inner.insert_product(product).await }
        async fn update_product(&self, product: &Product) -> StoreResult<bool> { self.check()?; self.inner.update_product(product).await }
        async fn delete_product(&self, id: Uuid) -> StoreResult<bool> { self.check()?; self.inner.delete_product(id).await }
        async fn load_cart(&self, owner: &UserId) -> StoreResult<Option<Cart>> { self.check()?; self.inner.load_cart(owner).await }
        async fn save_cart(&self, cart: &Cart) -> StoreResult<()> { self.check()?; self.inner.save_cart(cart).await }
        async fn commit_checkout(&self, order: &Order, cart: &Cart) -> StoreResult<()> { self.check()?; self.inner.commit_checkout(order, cart).await }
        async fn find_order(&self, id: Uuid) -> StoreResult<Option<Order>> { self.check()?; self.inner.find_order(id).await }
        async fn orders_for(&self, owner: &UserId) -> StoreResult<Vec<Order>> { self.check()?; self.inner.orders_for(owner).await }
        async fn list_orders(&self, page: Page) -> StoreResult<Listing<Order>> { self.check()?; self.inner.list_orders(page).await }
        async fn update_order(&self, order: &Order) -> StoreResult<bool> { self.check()?; self.inner.update_order(order).await }
    }

    fn failover(primary: FlakyStore, fallback: MemoryStore, policy: FailurePolicy) -> (FailoverStore, StorageHealth) {
        let health = StorageHealth::new(StorageMode::Postgres);
        (FailoverStore::new(Arc::new(primary), fallback, policy, health.clone()), health)
    }

    #[tokio::test]
    async fn test_healthy_primary_serves_reads() {
        let product = Product::create("Jade", Decimal::ONE, 1).unwrap();
        let primary = FlakyStore { inner: MemoryStore::with_products([product.clone()]), fail_after: usize::MAX, ..Default::default() };
        let (store, health) = failover(primary, MemoryStore::new(), FailurePolicy::Degrade);
        assert_eq!(store.find_product(product.id).await.unwrap(), Some(product));
        assert!(!health.is_degraded());
    }

    #[tokio::test]
    async fn test_degrade_switches_to_memory_and_flags_health() {
        let seeded = Product::create("Seeded", Decimal::ONE, 1).unwrap();
        let (store, health) = failover(FlakyStore::default(), MemoryStore::with_products([seeded.clone()]), FailurePolicy::Degrade);

        assert_eq!(store.find_product(seeded.id).await.unwrap(), Some(seeded));
        assert!(health.is_degraded());

        let owner = UserId::new("u1");
        store.save_cart(&Cart::new(owner.clone())).await.unwrap();
        assert!(store.load_cart(&owner).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_fail_policy_surfaces_unavailable() {
        let (store, health) = failover(FlakyStore::default(), MemoryStore::new(), FailurePolicy::Fail);
        let err = store.load_cart(&UserId::new("u1")).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert!(!health.is_degraded());
    }

    #[tokio::test]
    async fn test_backend_errors_do_not_degrade() {
        let primary = FlakyStore { backend_error: true, ..Default::default() };
        let (store, health) = failover(primary, MemoryStore::new(), FailurePolicy::Degrade);
        assert!(matches!(store.list_orders(Page::default()).await, Err(StorageError::Backend(_))));
        assert!(!health.is_degraded());
    }

    #[tokio::test]
    async fn test_checkout_cut_off_by_outage_is_not_replayed_in_memory() {
        let ring = Product::create("Ring", Decimal::from(100), 5).unwrap();
        let fallback = MemoryStore::with_products([ring.clone()]);
        let (store, health) = failover(FlakyStore::default(), fallback.clone(), FailurePolicy::Degrade);
        let owner = UserId::new("u1");
        let line = OrderLine {
            product_id: ring.id, seller_id: None, name: ring.name.clone(), image: ring.primary_image().to_string(),
            quantity: 1, unit_price: ring.price, line_total: ring.price,
        };
        let totals = PricingRules::default().compute_totals([(ring.price, 1)]);
        let order = Order::place(owner.clone(), vec![line], totals, Address::default(), Address::default()).unwrap();

        let err = store.commit_checkout(&order, &Cart::new(owner.clone())).await.unwrap_err();
        assert!(matches!(err, StorageError::Unavailable(_)));
        assert!(health.is_degraded());
        assert!(fallback.find_order(order.id()).await.unwrap().is_none());
        assert_eq!(fallback.find_product(ring.id).await.unwrap().unwrap().stock_quantity, 5);

        store.commit_checkout(&order, &Cart::new(owner)).await.unwrap();
        assert_eq!(fallback.find_product(ring.id).await.unwrap().unwrap().stock_quantity, 4);
    }

    #[tokio::test]
    async fn test_writes_made_while_degraded_stay_visible() {
        let primary = FlakyStore { fail_after: 1, ..Default::default() };
        let (store, health) = failover(primary, MemoryStore::new(), FailurePolicy::Degrade);
        let owner = UserId::new("u1");
        assert!(store.load_cart(&owner).await.unwrap().is_none());
        store.save_cart(&Cart::new(owner.clone())).await.unwrap();
        assert!(health.is_degraded());
        assert!(store.load_cart(&owner).await.unwrap().is_some());
    }
}
