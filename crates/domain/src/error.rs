//! Domain error types.

use entity_store::{StoreError, constraints};
use thiserror::Error;

/// A rule the caller's input breaks. Always answered with 400.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A single field failed validation.
    #[error("{field}: {message}")]
    Field {
        field: &'static str,
        message: String,
    },

    /// A rule spanning the whole input (uniqueness, address completeness, ...).
    #[error("{0}")]
    Rule(String),
}

impl ValidationError {
    pub fn field(field: &'static str, message: impl Into<String>) -> Self {
        ValidationError::Field {
            field,
            message: message.into(),
        }
    }

    pub fn rule(message: impl Into<String>) -> Self {
        ValidationError::Rule(message.into())
    }
}

impl From<validator::ValidationErrors> for ValidationError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut fields: Vec<_> = errors.field_errors().into_iter().collect();
        fields.sort_by(|a, b| a.0.cmp(&b.0));

        let message = fields
            .iter()
            .map(|(field, errors)| {
                let reasons: Vec<String> = errors
                    .iter()
                    .map(|e| match &e.message {
                        Some(message) => message.to_string(),
                        None => e.code.to_string(),
                    })
                    .collect();
                format!("{field}: {}", reasons.join(", "))
            })
            .collect::<Vec<_>>()
            .join("; ");

        ValidationError::Rule(message)
    }
}

/// The actor may not perform the operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("Authentication credentials were not provided")]
    Unauthenticated,

    #[error("You do not have permission to perform this action")]
    Forbidden,
}

/// Errors that can occur during domain operations.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Access(#[from] AccessError),

    /// The entity does not exist, or is not visible to the actor.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Email and password do not match an account.
    #[error("Incorrect credentials")]
    InvalidCredentials,

    /// The token does not belong to any user.
    #[error("Invalid token")]
    InvalidToken,

    /// Hashing a password failed.
    #[error("Password hashing failed")]
    PasswordHash,

    /// An error occurred in the entity store.
    #[error("Entity store error: {0}")]
    Store(StoreError),
}

impl DomainError {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        DomainError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

/// Message for a unique constraint, shared by the fast-path checks and the
/// store backstop.
pub(crate) fn unique_violation_message(constraint: &str) -> String {
    match constraint {
        constraints::USER_EMAIL => "User with this email already exists".to_string(),
        constraints::REVIEW_USER_PRODUCT => {
            "You already wrote a review for this product".to_string()
        }
        constraints::WISH_ITEM_USER_PRODUCT => "You have already wished this product".to_string(),
        constraints::CART_ITEM_CART_PRODUCT => "This product is already in your cart".to_string(),
        other => format!("Unique constraint violated: {other}"),
    }
}

fn foreign_key_violation(constraint: &str) -> ValidationError {
    match constraint {
        constraints::PRODUCT_CATEGORY_FK => {
            ValidationError::field("category", "Category does not exist")
        }
        constraints::REVIEW_PRODUCT_FK
        | constraints::CART_ITEM_PRODUCT_FK
        | constraints::WISH_ITEM_PRODUCT_FK => {
            ValidationError::field("product", "Product does not exist")
        }
        other => ValidationError::rule(format!("Referenced record does not exist: {other}")),
    }
}

impl From<validator::ValidationErrors> for DomainError {
    fn from(errors: validator::ValidationErrors) -> Self {
        DomainError::Validation(errors.into())
    }
}

impl From<StoreError> for DomainError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::UniqueViolation { constraint } => {
                ValidationError::rule(unique_violation_message(&constraint)).into()
            }
            StoreError::ForeignKeyViolation { constraint } => {
                foreign_key_violation(&constraint).into()
            }
            StoreError::NotFound { entity, id } => DomainError::NotFound { entity, id },
            StoreError::OutOfRange { column } => ValidationError::field(
                column,
                format!("Ensure this value is less than or equal to {}", i32::MAX),
            )
            .into(),
            other => DomainError::Store(other),
        }
    }
}
