//! Input types and the field rules they must satisfy.
//!
//! Full inputs derive [`Validate`]; `*Changes` types carry partial updates
//! and are merged onto the stored record before validating, so a partial
//! update is held to the same rules as a full one.

use std::borrow::Cow;
use std::collections::{BTreeSet, HashSet};

use common::{CategoryId, ProductId};
use entity_store::{NewAddress, Product, Properties, Review};
use rust_decimal::Decimal;
use validator::Validate;

use crate::error::ValidationError;

const MIN_PASSWORD_LENGTH: usize = 6;

/// Prices have at most 15 digits, 2 of them after the point.
const MAX_PRICE_INTEGER_DIGITS: u32 = 13;

fn field_error(code: &'static str, message: impl Into<Cow<'static, str>>) -> validator::ValidationError {
    validator::ValidationError::new(code).with_message(message.into())
}

/// Price must be at least 1 with at most 2 decimal places.
pub fn validate_price(price: &Decimal) -> Result<(), validator::ValidationError> {
    if *price < Decimal::ONE {
        return Err(field_error(
            "min_value",
            "Ensure this value is greater than or equal to 1",
        ));
    }
    if price.normalize().scale() > 2 {
        return Err(field_error(
            "decimal_places",
            "Ensure that there are no more than 2 decimal places",
        ));
    }
    if price.trunc() >= Decimal::from(10i64.pow(MAX_PRICE_INTEGER_DIGITS)) {
        return Err(field_error(
            "max_digits",
            "Ensure that there are no more than 15 digits in total",
        ));
    }
    Ok(())
}

/// Property keys must be unique ignoring case.
pub fn validate_property_keys(properties: &Properties) -> Result<(), validator::ValidationError> {
    let mut seen = HashSet::new();
    let mut duplicates = BTreeSet::new();
    for key in properties.keys() {
        let key = key.to_lowercase();
        if !seen.insert(key.clone()) {
            duplicates.insert(key);
        }
    }

    if duplicates.is_empty() {
        return Ok(());
    }
    let keys: Vec<String> = duplicates.into_iter().collect();
    Err(field_error(
        "property_key_duplication",
        format!("Property key duplication: {}", keys.join(", ")),
    ))
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::field(
            "password",
            format!("Ensure this field has at least {MIN_PASSWORD_LENGTH} characters"),
        ));
    }
    Ok(())
}

/// Trims the address and lowercases the domain part of an email.
pub fn normalize_email(email: &str) -> String {
    let email = email.trim();
    match email.rsplit_once('@') {
        Some((local, domain)) => format!("{local}@{}", domain.to_lowercase()),
        None => email.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct CategoryInput {
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters"))]
    pub name: String,
}

impl CategoryInput {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into().trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryChanges {
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Validate)]
pub struct ProductInput {
    #[validate(length(min = 1, max = 255, message = "Ensure this field has 1 to 255 characters"))]
    pub name: String,
    pub description: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters"))]
    pub brand: String,
    #[validate(custom(function = "validate_price"))]
    pub price: Decimal,
    #[validate(range(min = 0, message = "Ensure this value is greater than or equal to 0"))]
    pub stock: i32,
    pub category_id: CategoryId,
    #[validate(custom(function = "validate_property_keys"))]
    pub properties: Properties,
}

/// A partial product update. `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProductChanges {
    pub name: Option<String>,
    pub description: Option<String>,
    pub brand: Option<String>,
    pub price: Option<Decimal>,
    pub stock: Option<i32>,
    pub category_id: Option<CategoryId>,
    pub properties: Option<Properties>,
}

impl ProductChanges {
    pub fn apply_to(self, product: &Product) -> ProductInput {
        ProductInput {
            name: self.name.unwrap_or_else(|| product.name.clone()),
            description: self
                .description
                .unwrap_or_else(|| product.description.clone()),
            brand: self.brand.unwrap_or_else(|| product.brand.clone()),
            price: self.price.unwrap_or(product.price),
            stock: self.stock.unwrap_or(product.stock),
            category_id: self.category_id.unwrap_or(product.category_id),
            properties: self
                .properties
                .unwrap_or_else(|| product.properties.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ReviewInput {
    pub product_id: ProductId,
    #[validate(range(min = 1, max = 5, message = "Ensure this value is between 1 and 5"))]
    pub rating: i32,
    pub commentary: String,
}

/// A review update. The product and author of a review never change, so
/// they are not part of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReviewChanges {
    pub rating: Option<i32>,
    pub commentary: Option<String>,
}

impl ReviewChanges {
    pub fn apply_to(self, review: &Review) -> ReviewInput {
        ReviewInput {
            product_id: review.product_id,
            rating: self.rating.unwrap_or(review.rating),
            commentary: self
                .commentary
                .unwrap_or_else(|| review.commentary.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct Registration {
    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 255, message = "Ensure this field has no more than 255 characters")
    )]
    pub email: String,
    pub password: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters"))]
    pub name: String,
}

impl Registration {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            name: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Normalizes and validates the registration.
    pub(crate) fn clean(mut self) -> Result<Self, ValidationError> {
        self.email = normalize_email(&self.email);
        self.name = self.name.trim().to_string();
        self.validate()?;
        validate_password(&self.password)?;
        Ok(self)
    }
}

/// The account fields a profile update may touch, after merging.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub(crate) struct AccountFields {
    #[validate(
        email(message = "Enter a valid email address"),
        length(max = 255, message = "Ensure this field has no more than 255 characters")
    )]
    pub email: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters"))]
    pub name: String,
    #[validate(length(max = 100, message = "Ensure this field has no more than 100 characters"))]
    pub surname: String,
}

/// A profile update. `None` keeps the stored value; a present `address`
/// replaces the stored one (see [`AddressPatch`]).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileChanges {
    pub email: Option<String>,
    pub name: Option<String>,
    pub surname: Option<String>,
    pub password: Option<String>,
    pub address: Option<AddressPatch>,
}

/// Address as submitted with a profile update.
///
/// An empty patch clears the address. Otherwise every field must be present,
/// even on a partial update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AddressPatch {
    pub country: Option<String>,
    pub city: Option<String>,
    pub street: Option<String>,
    pub house: Option<i32>,
    pub postal_code: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Validate)]
struct AddressInput {
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters"))]
    country: String,
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters"))]
    city: String,
    #[validate(length(min = 1, max = 100, message = "Ensure this field has 1 to 100 characters"))]
    street: String,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1"))]
    house: i32,
    #[validate(length(min = 1, max = 12, message = "Ensure this field has 1 to 12 characters"))]
    postal_code: String,
}

impl AddressPatch {
    pub fn is_empty(&self) -> bool {
        *self == AddressPatch::default()
    }

    /// Resolves the patch to the address to store, or `None` to clear it.
    pub fn resolve(self) -> Result<Option<NewAddress>, ValidationError> {
        if self.is_empty() {
            return Ok(None);
        }

        let missing: Vec<&str> = [
            ("country", self.country.is_none()),
            ("city", self.city.is_none()),
            ("street", self.street.is_none()),
            ("house", self.house.is_none()),
            ("postal_code", self.postal_code.is_none()),
        ]
        .into_iter()
        .filter_map(|(field, absent)| absent.then_some(field))
        .collect();

        let (Some(country), Some(city), Some(street), Some(house), Some(postal_code)) = (
            self.country,
            self.city,
            self.street,
            self.house,
            self.postal_code,
        ) else {
            return Err(ValidationError::rule(format!(
                "These fields are required: {}",
                missing.join(", ")
            )));
        };

        let input = AddressInput {
            country: country.trim().to_string(),
            city: city.trim().to_string(),
            street: street.trim().to_string(),
            house,
            postal_code: postal_code.trim().to_string(),
        };
        input.validate()?;

        Ok(Some(NewAddress {
            country: input.country,
            city: input.city,
            street: input.street,
            house: input.house,
            postal_code: input.postal_code,
        }))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Validate)]
pub struct CartItemInput {
    pub product_id: ProductId,
    #[validate(range(min = 1, message = "Ensure this value is greater than or equal to 1"))]
    pub quantity: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartItemChanges {
    pub product_id: Option<ProductId>,
    pub quantity: Option<i32>,
}
