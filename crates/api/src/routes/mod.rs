//! HTTP handlers, one module per resource.
//!
//! Request and response types live next to the handlers that use them.

pub mod auth;
pub mod cart;
pub mod categories;
pub mod health;
pub mod metrics;
pub mod products;
pub mod reviews;
pub mod users;
pub mod wishlist;
