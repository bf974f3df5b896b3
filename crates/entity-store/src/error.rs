use thiserror::Error;

/// Names of the store-level constraints.
///
/// Both store implementations report violations under these names so the
/// domain layer can translate them without knowing which backend is in use.
pub mod constraints {
    pub const USER_EMAIL: &str = "users_email_key";
    pub const TOKEN_USER: &str = "auth_tokens_user_id_key";
    pub const CATEGORY_NAME: &str = "categories_name_lower_key";
    pub const REVIEW_USER_PRODUCT: &str = "reviews_user_product_key";
    pub const CART_ITEM_CART_PRODUCT: &str = "cart_items_cart_product_key";
    pub const WISH_ITEM_USER_PRODUCT: &str = "wish_items_user_product_key";

    pub const PRODUCT_CATEGORY_FK: &str = "products_category_id_fkey";
    pub const REVIEW_USER_FK: &str = "reviews_user_id_fkey";
    pub const REVIEW_PRODUCT_FK: &str = "reviews_product_id_fkey";
    pub const CART_ITEM_CART_FK: &str = "cart_items_cart_id_fkey";
    pub const CART_ITEM_PRODUCT_FK: &str = "cart_items_product_id_fkey";
    pub const WISH_ITEM_USER_FK: &str = "wish_items_user_id_fkey";
    pub const WISH_ITEM_PRODUCT_FK: &str = "wish_items_product_id_fkey";
}

/// Errors that can occur when interacting with the entity store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A write would have violated a uniqueness constraint.
    #[error("Unique constraint violated: {constraint}")]
    UniqueViolation { constraint: String },

    /// A write referenced a row that does not exist.
    #[error("Foreign key constraint violated: {constraint}")]
    ForeignKeyViolation { constraint: String },

    /// An update would push a column past the range of its type.
    #[error("Value out of range: {column}")]
    OutOfRange { column: &'static str },

    /// The row to update does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A database error occurred.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A database migration error occurred.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StoreError {
    pub(crate) fn unique(constraint: &str) -> Self {
        StoreError::UniqueViolation {
            constraint: constraint.to_string(),
        }
    }

    pub(crate) fn foreign_key(constraint: &str) -> Self {
        StoreError::ForeignKeyViolation {
            constraint: constraint.to_string(),
        }
    }

    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StoreError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Returns true if this error is a violation of the named unique constraint.
    pub fn is_unique_violation_of(&self, name: &str) -> bool {
        matches!(self, StoreError::UniqueViolation { constraint } if constraint == name)
    }
}

/// Result type for entity store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
