//! Application services. Each one owns a handle to the [`Store`](crate::store::Store)
//! and speaks in domain types; the HTTP layer only translates.

pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod orders;

pub use cart::{CartItemView, CartService, CartView};
pub use catalog::{CatalogService, NewProduct, ProductChanges};
pub use checkout::CheckoutService;
pub use orders::OrderService;
