//! Persistent records.
//!
//! `New*` types carry the client-supplied part of a record; the store assigns
//! ids, timestamps and derived fields.

use chrono::{DateTime, Utc};
use common::{
    AddressId, CartId, CartItemId, CategoryId, ProductId, ReviewId, UserId, WishItemId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Free-form product properties (e.g. `{"color": "red"}`).
pub type Properties = serde_json::Map<String, serde_json::Value>;

/// A postal address, owned by exactly one user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub id: AddressId,
    pub country: String,
    pub city: String,
    pub street: String,
    pub house: i32,
    pub postal_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewAddress {
    pub country: String,
    pub city: String,
    pub street: String,
    pub house: i32,
    pub postal_code: String,
}

impl NewAddress {
    pub(crate) fn into_address(self, id: AddressId) -> Address {
        Address {
            id,
            country: self.country,
            city: self.city,
            street: self.street,
            house: self.house,
            postal_code: self.postal_code,
        }
    }
}

/// What an account update does to the user's address.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AddressUpdate {
    #[default]
    Keep,
    Clear,
    /// Stores a new address and deletes the previous one.
    Replace(NewAddress),
}

impl From<Option<NewAddress>> for AddressUpdate {
    fn from(address: Option<NewAddress>) -> Self {
        match address {
            Some(address) => AddressUpdate::Replace(address),
            None => AddressUpdate::Clear,
        }
    }
}

/// A customer or administrator account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub email: String,
    pub name: String,
    pub surname: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub is_staff: bool,
    pub address: Option<Address>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub email: String,
    pub name: String,
    pub surname: String,
    pub password_hash: String,
    pub is_staff: bool,
}

/// An API token. Each user has at most one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub key: String,
    pub user_id: UserId,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
}

/// A catalog product.
///
/// `rating` is derived from the product's reviews and is only ever written by
/// the store itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: Decimal,
    pub stock: i32,
    pub rating: f64,
    pub category_id: CategoryId,
    pub properties: Properties,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewProduct {
    pub name: String,
    pub description: String,
    pub brand: String,
    pub price: Decimal,
    pub stock: i32,
    pub category_id: CategoryId,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
    pub id: ReviewId,
    pub rating: i32,
    pub commentary: String,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewReview {
    pub rating: i32,
    pub commentary: String,
    pub user_id: UserId,
    pub product_id: ProductId,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cart {
    pub id: CartId,
    pub user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewCartItem {
    pub cart_id: CartId,
    pub product_id: ProductId,
    pub quantity: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WishItem {
    pub id: WishItemId,
    pub user_id: UserId,
    pub product_id: ProductId,
    pub created_at: DateTime<Utc>,
}
