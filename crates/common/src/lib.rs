//! Shared types used across the storefront crates.

mod types;

pub use types::{
    AddressId, CartId, CartItemId, CategoryId, ProductId, ReviewId, UserId, WishItemId,
};
