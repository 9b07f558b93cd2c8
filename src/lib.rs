//! Storefront cart & checkout service
//!
//! Cart pricing and checkout conversion for a small storefront.
//!
//! ## Features
//! - Per-user carts with option-aware line merging
//! - Subtotal, tax and shipping derived on every read
//! - Checkout into immutable order snapshots with guarded stock decrement
//! - Order administration and a seller-managed catalog
//! - PostgreSQL storage with an in-memory fallback

pub mod config;
pub mod domain;
pub mod http;
pub mod publisher;
pub mod services;
pub mod store;

use thiserror::Error;

use crate::domain::{CartError, OrderError, ProductError};
use crate::store::StorageError;

pub use http::{build_router, AppState};

// =============================================================================
// Error Types
// =============================================================================

#[derive(Error, Debug)]
pub enum CommerceError {
    #[error("Product not found")]
    ProductNotFound,

    #[error("Cart not found")]
    CartNotFound,

    #[error("Item not found in cart")]
    CartItemNotFound,

    #[error("Order not found")]
    OrderNotFound,

    #[error("Not enough stock for {product}")]
    InsufficientStock { product: String },

    #[error("Cart is empty")]
    EmptyCart,

    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    InvalidStatusTransition(String),

    #[error("Insufficient permissions")]
    Forbidden,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl From<CartError> for CommerceError {
    fn from(e: CartError) -> Self {
        match e {
            CartError::ItemNotFound => Self::CartItemNotFound,
            CartError::InvalidQuantity => Self::Validation(e.to_string()),
        }
    }
}

impl From<OrderError> for CommerceError {
    fn from(e: OrderError) -> Self {
        match e {
            OrderError::NoItems => Self::EmptyCart,
            OrderError::InvalidTransition { .. } => Self::InvalidStatusTransition(e.to_string()),
        }
    }
}

impl From<ProductError> for CommerceError {
    fn from(e: ProductError) -> Self { Self::Validation(e.to_string()) }
}

pub type Result<T> = std::result::Result<T, CommerceError>;
