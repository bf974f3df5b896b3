use std::cmp::Ordering;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use common::{
    AddressId, CartId, CartItemId, CategoryId, ProductId, ReviewId, UserId, WishItemId,
};
use tokio::sync::RwLock;

use crate::{
    AddressUpdate, AuthToken, Cart, CartItem, Category, NewCartItem, NewProduct, NewReview, NewUser,
    Product, ProductQuery, ProductSortField, Result, Review, ReviewQuery, ReviewSortField,
    StoreError, User, UserQuery, UserSortField, WishItem, constraints, query::SortKey,
    rating::average_rating, store::EntityStore,
};

/// In-memory entity store implementation for testing and local runs.
///
/// All tables live behind a single lock, so every trait method is atomic in
/// the same way a database transaction would be.
#[derive(Clone, Default)]
pub struct InMemoryEntityStore {
    tables: Arc<RwLock<Tables>>,
}

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tokens: Vec<AuthToken>,
    categories: Vec<Category>,
    products: Vec<Product>,
    reviews: Vec<Review>,
    carts: Vec<Cart>,
    cart_items: Vec<CartItem>,
    wish_items: Vec<WishItem>,
}

impl InMemoryEntityStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of cart lines across all carts.
    pub async fn cart_item_count(&self) -> usize {
        self.tables.read().await.cart_items.len()
    }

    /// Returns the total number of reviews.
    pub async fn review_count(&self) -> usize {
        self.tables.read().await.reviews.len()
    }

    /// Clears all tables.
    pub async fn clear(&self) {
        *self.tables.write().await = Tables::default();
    }
}

impl Tables {
    fn user_exists(&self, id: UserId) -> bool {
        self.users.iter().any(|u| u.id == id)
    }

    fn product_exists(&self, id: ProductId) -> bool {
        self.products.iter().any(|p| p.id == id)
    }

    fn category_name_taken(&self, name: &str, except: Option<CategoryId>) -> bool {
        let name = name.to_lowercase();
        self.categories
            .iter()
            .any(|c| Some(c.id) != except && c.name.to_lowercase() == name)
    }

    fn recompute_rating(&mut self, product_id: ProductId) {
        let rating = average_rating(
            self.reviews
                .iter()
                .filter(|r| r.product_id == product_id)
                .map(|r| r.rating),
        );
        if let Some(product) = self.products.iter_mut().find(|p| p.id == product_id) {
            product.rating = rating;
            product.updated_at = Utc::now();
        }
    }

    fn remove_product(&mut self, id: ProductId) -> bool {
        let before = self.products.len();
        self.products.retain(|p| p.id != id);
        if self.products.len() == before {
            return false;
        }
        self.reviews.retain(|r| r.product_id != id);
        self.cart_items.retain(|i| i.product_id != id);
        self.wish_items.retain(|w| w.product_id != id);
        true
    }
}

fn sort_by_keys<T, F: Copy>(
    items: &mut [T],
    ordering: &[SortKey<F>],
    compare: impl Fn(&T, &T, F) -> Ordering,
) {
    if ordering.is_empty() {
        return;
    }
    // Stable sort keeps creation order for ties.
    items.sort_by(|a, b| {
        ordering
            .iter()
            .map(|key| {
                let ord = compare(a, b, key.field);
                if key.descending { ord.reverse() } else { ord }
            })
            .find(|ord| *ord != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

#[async_trait]
impl EntityStore for InMemoryEntityStore {
    async fn create_user(&self, new: NewUser) -> Result<User> {
        let mut tables = self.tables.write().await;

        if tables.users.iter().any(|u| u.email == new.email) {
            return Err(StoreError::unique(constraints::USER_EMAIL));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            email: new.email,
            name: new.name,
            surname: new.surname,
            password_hash: new.password_hash,
            is_staff: new.is_staff,
            address: None,
            created_at: now,
            updated_at: now,
        };
        tables.carts.push(Cart {
            id: CartId::new(),
            user_id: user.id,
        });
        tables.users.push(user.clone());

        Ok(user)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let tables = self.tables.read().await;
        Ok(tables.users.iter().find(|u| u.email == email).cloned())
    }

    async fn list_users(&self, query: UserQuery) -> Result<Vec<User>> {
        let tables = self.tables.read().await;
        let mut users = tables.users.clone();
        sort_by_keys(&mut users, &query.ordering, |a, b, field| match field {
            UserSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        });
        Ok(users)
    }

    async fn update_user(&self, user: &User, address: AddressUpdate) -> Result<User> {
        let mut tables = self.tables.write().await;

        if tables
            .users
            .iter()
            .any(|u| u.id != user.id && u.email == user.email)
        {
            return Err(StoreError::unique(constraints::USER_EMAIL));
        }

        let stored = tables
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or_else(|| StoreError::not_found("User", user.id))?;
        stored.email = user.email.clone();
        stored.name = user.name.clone();
        stored.surname = user.surname.clone();
        stored.password_hash = user.password_hash.clone();
        match address {
            AddressUpdate::Keep => {}
            AddressUpdate::Clear => stored.address = None,
            AddressUpdate::Replace(address) => {
                stored.address = Some(address.into_address(AddressId::new()));
            }
        }
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn delete_user(&self, id: UserId) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let before = tables.users.len();
        tables.users.retain(|u| u.id != id);
        if tables.users.len() == before {
            return Ok(false);
        }

        tables.tokens.retain(|t| t.user_id != id);
        tables.wish_items.retain(|w| w.user_id != id);

        let cart_ids: Vec<CartId> = tables
            .carts
            .iter()
            .filter(|c| c.user_id == id)
            .map(|c| c.id)
            .collect();
        tables.cart_items.retain(|i| !cart_ids.contains(&i.cart_id));
        tables.carts.retain(|c| c.user_id != id);

        let mut reviewed: Vec<ProductId> = tables
            .reviews
            .iter()
            .filter(|r| r.user_id == id)
            .map(|r| r.product_id)
            .collect();
        reviewed.dedup();
        tables.reviews.retain(|r| r.user_id != id);
        for product_id in reviewed {
            tables.recompute_rating(product_id);
        }

        Ok(true)
    }

    async fn token_for_user(&self, user_id: UserId, candidate_key: String) -> Result<AuthToken> {
        let mut tables = self.tables.write().await;

        if let Some(token) = tables.tokens.iter().find(|t| t.user_id == user_id) {
            return Ok(token.clone());
        }
        if !tables.user_exists(user_id) {
            return Err(StoreError::not_found("User", user_id));
        }

        let token = AuthToken {
            key: candidate_key,
            user_id,
            created_at: Utc::now(),
        };
        tables.tokens.push(token.clone());
        Ok(token)
    }

    async fn find_token(&self, key: &str) -> Result<Option<AuthToken>> {
        let tables = self.tables.read().await;
        Ok(tables.tokens.iter().find(|t| t.key == key).cloned())
    }

    async fn create_category(&self, name: &str) -> Result<Category> {
        let mut tables = self.tables.write().await;

        if tables.category_name_taken(name, None) {
            return Err(StoreError::unique(constraints::CATEGORY_NAME));
        }

        let category = Category {
            id: CategoryId::new(),
            name: name.to_string(),
        };
        tables.categories.push(category.clone());
        Ok(category)
    }

    async fn get_category(&self, id: CategoryId) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        Ok(tables.categories.iter().find(|c| c.id == id).cloned())
    }

    async fn find_category_by_name(&self, name: &str) -> Result<Option<Category>> {
        let tables = self.tables.read().await;
        let name = name.to_lowercase();
        Ok(tables
            .categories
            .iter()
            .find(|c| c.name.to_lowercase() == name)
            .cloned())
    }

    async fn list_categories(&self) -> Result<Vec<Category>> {
        Ok(self.tables.read().await.categories.clone())
    }

    async fn rename_category(&self, id: CategoryId, name: &str) -> Result<Category> {
        let mut tables = self.tables.write().await;

        if tables.category_name_taken(name, Some(id)) {
            return Err(StoreError::unique(constraints::CATEGORY_NAME));
        }

        let category = tables
            .categories
            .iter_mut()
            .find(|c| c.id == id)
            .ok_or_else(|| StoreError::not_found("Category", id))?;
        category.name = name.to_string();
        Ok(category.clone())
    }

    async fn delete_category(&self, id: CategoryId) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let before = tables.categories.len();
        tables.categories.retain(|c| c.id != id);
        if tables.categories.len() == before {
            return Ok(false);
        }

        let products: Vec<ProductId> = tables
            .products
            .iter()
            .filter(|p| p.category_id == id)
            .map(|p| p.id)
            .collect();
        for product_id in products {
            tables.remove_product(product_id);
        }
        Ok(true)
    }

    async fn create_product(&self, new: NewProduct) -> Result<Product> {
        let mut tables = self.tables.write().await;

        if !tables.categories.iter().any(|c| c.id == new.category_id) {
            return Err(StoreError::foreign_key(constraints::PRODUCT_CATEGORY_FK));
        }

        let now = Utc::now();
        let product = Product {
            id: ProductId::new(),
            name: new.name,
            description: new.description,
            brand: new.brand,
            price: new.price,
            stock: new.stock,
            rating: 0.0,
            category_id: new.category_id,
            properties: new.properties,
            created_at: now,
            updated_at: now,
        };
        tables.products.push(product.clone());
        Ok(product)
    }

    async fn get_product(&self, id: ProductId) -> Result<Option<Product>> {
        let tables = self.tables.read().await;
        Ok(tables.products.iter().find(|p| p.id == id).cloned())
    }

    async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>> {
        let tables = self.tables.read().await;
        let mut products: Vec<Product> = tables
            .products
            .iter()
            .filter(|p| match &query.category_ids {
                Some(ids) => ids.contains(&p.category_id),
                None => true,
            })
            .cloned()
            .collect();

        sort_by_keys(&mut products, &query.ordering, |a, b, field| match field {
            ProductSortField::Price => a.price.cmp(&b.price),
            ProductSortField::Rating => a.rating.total_cmp(&b.rating),
        });
        Ok(products)
    }

    async fn update_product(&self, product: &Product) -> Result<Product> {
        let mut tables = self.tables.write().await;

        if !tables.categories.iter().any(|c| c.id == product.category_id) {
            return Err(StoreError::foreign_key(constraints::PRODUCT_CATEGORY_FK));
        }

        let stored = tables
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or_else(|| StoreError::not_found("Product", product.id))?;
        stored.name = product.name.clone();
        stored.description = product.description.clone();
        stored.brand = product.brand.clone();
        stored.price = product.price;
        stored.stock = product.stock;
        stored.category_id = product.category_id;
        stored.properties = product.properties.clone();
        stored.updated_at = Utc::now();

        Ok(stored.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<bool> {
        Ok(self.tables.write().await.remove_product(id))
    }

    async fn create_review(&self, new: NewReview) -> Result<Review> {
        let mut tables = self.tables.write().await;

        if !tables.user_exists(new.user_id) {
            return Err(StoreError::foreign_key(constraints::REVIEW_USER_FK));
        }
        if !tables.product_exists(new.product_id) {
            return Err(StoreError::foreign_key(constraints::REVIEW_PRODUCT_FK));
        }
        if tables
            .reviews
            .iter()
            .any(|r| r.user_id == new.user_id && r.product_id == new.product_id)
        {
            return Err(StoreError::unique(constraints::REVIEW_USER_PRODUCT));
        }

        let now = Utc::now();
        let review = Review {
            id: ReviewId::new(),
            rating: new.rating,
            commentary: new.commentary,
            user_id: new.user_id,
            product_id: new.product_id,
            created_at: now,
            updated_at: now,
        };
        tables.reviews.push(review.clone());
        tables.recompute_rating(review.product_id);

        Ok(review)
    }

    async fn get_review(&self, id: ReviewId) -> Result<Option<Review>> {
        let tables = self.tables.read().await;
        Ok(tables.reviews.iter().find(|r| r.id == id).cloned())
    }

    async fn list_reviews(&self, query: ReviewQuery) -> Result<Vec<Review>> {
        let tables = self.tables.read().await;
        let mut reviews: Vec<Review> = tables
            .reviews
            .iter()
            .filter(|r| query.product_id.is_none_or(|id| r.product_id == id))
            .filter(|r| query.user_id.is_none_or(|id| r.user_id == id))
            .cloned()
            .collect();

        sort_by_keys(&mut reviews, &query.ordering, |a, b, field| match field {
            ReviewSortField::Rating => a.rating.cmp(&b.rating),
            ReviewSortField::CreatedAt => a.created_at.cmp(&b.created_at),
        });
        Ok(reviews)
    }

    async fn update_review(&self, review: &Review) -> Result<Review> {
        let mut tables = self.tables.write().await;

        let stored = tables
            .reviews
            .iter_mut()
            .find(|r| r.id == review.id)
            .ok_or_else(|| StoreError::not_found("Review", review.id))?;
        stored.rating = review.rating;
        stored.commentary = review.commentary.clone();
        stored.updated_at = Utc::now();
        let updated = stored.clone();

        tables.recompute_rating(updated.product_id);
        Ok(updated)
    }

    async fn delete_review(&self, id: ReviewId) -> Result<bool> {
        let mut tables = self.tables.write().await;

        let Some(position) = tables.reviews.iter().position(|r| r.id == id) else {
            return Ok(false);
        };
        let review = tables.reviews.remove(position);
        tables.recompute_rating(review.product_id);
        Ok(true)
    }

    async fn cart_for_user(&self, user_id: UserId) -> Result<Option<Cart>> {
        let tables = self.tables.read().await;
        Ok(tables.carts.iter().find(|c| c.user_id == user_id).copied())
    }

    async fn add_cart_item(&self, new: NewCartItem) -> Result<CartItem> {
        let mut tables = self.tables.write().await;

        if !tables.carts.iter().any(|c| c.id == new.cart_id) {
            return Err(StoreError::foreign_key(constraints::CART_ITEM_CART_FK));
        }
        if !tables.product_exists(new.product_id) {
            return Err(StoreError::foreign_key(constraints::CART_ITEM_PRODUCT_FK));
        }

        if let Some(existing) = tables
            .cart_items
            .iter_mut()
            .find(|i| i.cart_id == new.cart_id && i.product_id == new.product_id)
        {
            existing.quantity = existing
                .quantity
                .checked_add(new.quantity)
                .ok_or(StoreError::OutOfRange { column: "quantity" })?;
            return Ok(existing.clone());
        }

        let item = CartItem {
            id: CartItemId::new(),
            cart_id: new.cart_id,
            product_id: new.product_id,
            quantity: new.quantity,
            created_at: Utc::now(),
        };
        tables.cart_items.push(item.clone());
        Ok(item)
    }

    async fn get_cart_item(&self, id: CartItemId) -> Result<Option<CartItem>> {
        let tables = self.tables.read().await;
        Ok(tables.cart_items.iter().find(|i| i.id == id).cloned())
    }

    async fn list_cart_items(&self, cart_id: CartId) -> Result<Vec<CartItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .cart_items
            .iter()
            .filter(|i| i.cart_id == cart_id)
            .cloned()
            .collect())
    }

    async fn update_cart_item(&self, item: &CartItem) -> Result<CartItem> {
        let mut tables = self.tables.write().await;

        if !tables.product_exists(item.product_id) {
            return Err(StoreError::foreign_key(constraints::CART_ITEM_PRODUCT_FK));
        }

        let cart_id = tables
            .cart_items
            .iter()
            .find(|i| i.id == item.id)
            .map(|i| i.cart_id)
            .ok_or_else(|| StoreError::not_found("CartItem", item.id))?;
        if tables
            .cart_items
            .iter()
            .any(|i| i.id != item.id && i.cart_id == cart_id && i.product_id == item.product_id)
        {
            return Err(StoreError::unique(constraints::CART_ITEM_CART_PRODUCT));
        }

        let stored = tables
            .cart_items
            .iter_mut()
            .find(|i| i.id == item.id)
            .ok_or_else(|| StoreError::not_found("CartItem", item.id))?;
        stored.product_id = item.product_id;
        stored.quantity = item.quantity;
        Ok(stored.clone())
    }

    async fn delete_cart_item(&self, id: CartItemId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.cart_items.len();
        tables.cart_items.retain(|i| i.id != id);
        Ok(tables.cart_items.len() != before)
    }

    async fn create_wish_item(&self, user_id: UserId, product_id: ProductId) -> Result<WishItem> {
        let mut tables = self.tables.write().await;

        if !tables.user_exists(user_id) {
            return Err(StoreError::foreign_key(constraints::WISH_ITEM_USER_FK));
        }
        if !tables.product_exists(product_id) {
            return Err(StoreError::foreign_key(constraints::WISH_ITEM_PRODUCT_FK));
        }
        if tables
            .wish_items
            .iter()
            .any(|w| w.user_id == user_id && w.product_id == product_id)
        {
            return Err(StoreError::unique(constraints::WISH_ITEM_USER_PRODUCT));
        }

        let item = WishItem {
            id: WishItemId::new(),
            user_id,
            product_id,
            created_at: Utc::now(),
        };
        tables.wish_items.push(item.clone());
        Ok(item)
    }

    async fn get_wish_item(&self, id: WishItemId) -> Result<Option<WishItem>> {
        let tables = self.tables.read().await;
        Ok(tables.wish_items.iter().find(|w| w.id == id).cloned())
    }

    async fn list_wish_items(&self, user_id: UserId) -> Result<Vec<WishItem>> {
        let tables = self.tables.read().await;
        Ok(tables
            .wish_items
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn delete_wish_item(&self, id: WishItemId) -> Result<bool> {
        let mut tables = self.tables.write().await;
        let before = tables.wish_items.len();
        tables.wish_items.retain(|w| w.id != id);
        Ok(tables.wish_items.len() != before)
    }
}
