//! Domain layer for the storefront backend.
//!
//! This crate provides:
//! - Services for the catalog, reviews, accounts, carts and wishlists
//! - Input validation and normalization for every client-supplied value
//! - Authorization rules expressed over an [`Actor`]
//! - Password hashing and API token generation

pub mod account;
pub mod actor;
pub mod cart;
pub mod catalog;
pub mod credentials;
pub mod error;
pub mod policy;
pub mod review;
pub mod validation;
pub mod wishlist;

pub use account::AccountService;
pub use actor::Actor;
pub use cart::{CartLine, CartService};
pub use catalog::CatalogService;
pub use error::{AccessError, DomainError, ValidationError};
pub use review::ReviewService;
pub use validation::{
    AddressPatch, CartItemChanges, CartItemInput, CategoryChanges, CategoryInput, ProductChanges,
    ProductInput, ProfileChanges, Registration, ReviewChanges, ReviewInput,
};
pub use wishlist::{WishLine, WishlistService};
