//! Storefront domain: catalog products, carts, orders and the pricing rules
//! that tie them together.
pub mod aggregates;
pub mod events;
pub mod pricing;
pub mod value_objects;

pub use aggregates::*;
pub use events::{DomainEvent, OrderEvent, ProductEvent};
pub use pricing::{PricingRules, Totals};
pub use value_objects::{Actor, Role, SelectedOptions, UserId};
