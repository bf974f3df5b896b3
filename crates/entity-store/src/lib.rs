//! Persistence for the storefront: users, catalog, reviews, carts and
//! wishlists behind a single [`EntityStore`] trait.

pub mod error;
pub mod memory;
pub mod models;
pub mod postgres;
pub mod query;
pub mod rating;
pub mod store;

pub use common::{
    AddressId, CartId, CartItemId, CategoryId, ProductId, ReviewId, UserId, WishItemId,
};
pub use error::{Result, StoreError, constraints};
pub use memory::InMemoryEntityStore;
pub use models::{
    Address, AddressUpdate, AuthToken, Cart, CartItem, Category, NewAddress, NewCartItem, NewProduct, NewReview,
    NewUser, Product, Properties, Review, User, WishItem,
};
pub use postgres::PostgresEntityStore;
pub use query::{
    ProductQuery, ProductSortField, ReviewQuery, ReviewSortField, SortField, SortKey, UserQuery,
    UserSortField, parse_ordering,
};
pub use rating::average_rating;
pub use store::EntityStore;
