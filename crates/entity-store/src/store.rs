use async_trait::async_trait;
use common::{CartId, CartItemId, CategoryId, ProductId, ReviewId, UserId, WishItemId};

use crate::models::{
    AddressUpdate, AuthToken, Cart, CartItem, Category, NewCartItem, NewProduct, NewReview, NewUser,
    Product, Review, User, WishItem,
};
use crate::query::{ProductQuery, ReviewQuery, UserQuery};
use crate::Result;

/// Core trait for entity store implementations.
///
/// Every method is a single atomic operation: writes that must keep a derived
/// value or a uniqueness rule intact (rating recomputation, cart-item merging,
/// cart creation) happen inside the same transaction as the triggering write.
/// Uniqueness is enforced by the store and reported as
/// [`StoreError::UniqueViolation`](crate::StoreError::UniqueViolation) with
/// one of the names in [`constraints`](crate::constraints).
///
/// All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait EntityStore: Send + Sync {
    // -- Users --

    /// Creates a user together with their (empty) cart.
    async fn create_user(&self, user: NewUser) -> Result<User>;

    async fn get_user(&self, id: UserId) -> Result<Option<User>>;

    /// Looks a user up by exact email.
    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn list_users(&self, query: UserQuery) -> Result<Vec<User>>;

    /// Persists the mutable account fields (email, name, surname, password
    /// hash) and applies the address update, all in one transaction. The
    /// staff flag is not touched.
    async fn update_user(&self, user: &User, address: AddressUpdate) -> Result<User>;

    /// Deletes a user and everything they own.
    ///
    /// Ratings of products that lose a review are recomputed in the same
    /// transaction. Returns false if the user did not exist.
    async fn delete_user(&self, id: UserId) -> Result<bool>;

    // -- Tokens --

    /// Returns the user's token, storing `candidate_key` as the token if the
    /// user has none yet.
    async fn token_for_user(&self, user_id: UserId, candidate_key: String) -> Result<AuthToken>;

    async fn find_token(&self, key: &str) -> Result<Option<AuthToken>>;

    // -- Categories --

    async fn create_category(&self, name: &str) -> Result<Category>;

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>>;

    /// Looks a category up by name, ignoring case.
    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>>;

    /// Lists all categories in creation order.
    async fn list_categories(&self) -> Result<Vec<Category>>;

    async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category>;

    /// Deletes a category and its products.
    async fn delete_category(&self, id: CategoryId) -> Result<bool>;

    // -- Products --

    async fn create_product(&self, product: NewProduct) -> Result<Product>;

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>>;

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>>;

    /// Persists the client-editable product fields.
    ///
    /// `rating` is never written from the argument; the returned product
    /// carries the stored rating.
    async fn update_product(&self, product: &Product) -> Result<Product>;

    /// Deletes a product with its reviews, cart items and wish items.
    async fn delete_product(&self, id: ProductId) -> Result<bool>;

    // -- Reviews --

    /// Creates a review and recomputes the product's rating.
    async fn create_review(&self, review: NewReview) -> Result<Review>;

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>>;

    async fn list_reviews(&self, query: ReviewQuery) -> Result<Vec<Review>>;

    /// Persists a review's rating and commentary and recomputes the product's
    /// rating. The user and product references are never changed.
    async fn update_review(&self, review: &Review) -> Result<Review>;

    /// Deletes a review and recomputes the product's rating.
    async fn delete_review(&self, id: ReviewId) -> Result<bool>;

    // -- Carts --

    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>>;

    /// Adds a product to a cart.
    ///
    /// If the cart already holds the product, the existing line absorbs the
    /// quantity and is returned; no second line is ever created. A sum that
    /// does not fit the quantity column fails with
    /// [`StoreError::OutOfRange`](crate::StoreError::OutOfRange) and leaves
    /// the line unchanged.
    async fn add_cart_item(&self, item: NewCartItem) -> Result<CartItem>;

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>>;

    /// Lists a cart's lines in creation order.
    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>>;

    /// Persists a line's product and quantity.
    async fn update_cart_item(&self, item: &CartItem) -> Result<CartItem>;

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool>;

    // -- Wishlist --

    async fn create_wish_item(&self, user_id: UserId, product_id: ProductId) -> Result<WishItem>;

    async fn get_wish_item(&self, id: WishItemId) -> Result<Option<WishItem>>;

    /// Lists a user's wish items in creation order.
    async fn list_wish_items(&self, user_id: UserId) -> Result<Vec<WishItem>>;

    async fn delete_wish_item(&self, id: WishItemId) -> Result<bool>;
}
