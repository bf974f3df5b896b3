//! Shopping carts.

use common::{CartItemId, UserId};
use entity_store::{Cart, CartItem, EntityStore, NewCartItem, Product, constraints};
use validator::Validate;

use crate::error::{DomainError, ValidationError, unique_violation_message};
use crate::validation::{CartItemChanges, CartItemInput};
use crate::{Actor, policy};

/// A cart line with its product expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct CartLine {
    pub item: CartItem,
    pub product: Product,
}

/// Service for the actor's own cart.
///
/// Lines of other users' carts are never visible and answer
/// [`DomainError::NotFound`].
pub struct CartService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> CartService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_items(&self, actor: &Actor) -> Result<Vec<CartLine>, DomainError> {
        let cart = self.cart_of(actor).await?;
        let items = self.store.list_cart_items(cart.id).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            lines.push(self.expand(item).await?);
        }
        Ok(lines)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_item(&self, actor: &Actor, id: CartItemId) -> Result<CartLine, DomainError> {
        let cart = self.cart_of(actor).await?;
        let item = self.visible_item(&cart, id).await?;
        self.expand(item).await
    }

    /// Adds a product to the actor's cart.
    ///
    /// If the product is already there, the existing line's quantity grows
    /// by `input.quantity` and that line is returned.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, actor: &Actor, input: CartItemInput) -> Result<CartItem, DomainError> {
        let cart = self.cart_of(actor).await?;
        input.validate()?;

        let item = self
            .store
            .add_cart_item(NewCartItem {
                cart_id: cart.id,
                product_id: input.product_id,
                quantity: input.quantity,
            })
            .await?;

        metrics::counter!("cart_items_added_total").increment(1);
        tracing::debug!(cart_item_id = %item.id, quantity = item.quantity, "cart item stored");
        Ok(item)
    }

    /// Changes a line's product or quantity.
    ///
    /// Moving a line onto a product the cart already holds is rejected.
    #[tracing::instrument(skip(self))]
    pub async fn update_item(
        &self,
        actor: &Actor,
        id: CartItemId,
        changes: CartItemChanges,
    ) -> Result<CartItem, DomainError> {
        let cart = self.cart_of(actor).await?;
        let current = self.visible_item(&cart, id).await?;

        let input = CartItemInput {
            product_id: changes.product_id.unwrap_or(current.product_id),
            quantity: changes.quantity.unwrap_or(current.quantity),
        };
        input.validate()?;

        if input.product_id != current.product_id {
            let taken = self
                .store
                .list_cart_items(cart.id)
                .await?
                .iter()
                .any(|other| other.id != id && other.product_id == input.product_id);
            if taken {
                return Err(ValidationError::rule(unique_violation_message(
                    constraints::CART_ITEM_CART_PRODUCT,
                ))
                .into());
            }
        }

        let item = CartItem {
            product_id: input.product_id,
            quantity: input.quantity,
            ..current
        };
        Ok(self.store.update_cart_item(&item).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, actor: &Actor, id: CartItemId) -> Result<(), DomainError> {
        let cart = self.cart_of(actor).await?;
        self.visible_item(&cart, id).await?;

        if !self.store.delete_cart_item(id).await? {
            return Err(DomainError::not_found("CartItem", id));
        }
        Ok(())
    }

    async fn cart_of(&self, actor: &Actor) -> Result<Cart, DomainError> {
        let user_id: UserId = policy::require_user(actor)?;
        self.store
            .cart_for_user(user_id)
            .await?
            .filter(|cart| policy::owns(actor, cart.user_id))
            .ok_or_else(|| DomainError::not_found("Cart", user_id))
    }

    async fn visible_item(&self, cart: &Cart, id: CartItemId) -> Result<CartItem, DomainError> {
        self.store
            .get_cart_item(id)
            .await?
            .filter(|item| item.cart_id == cart.id)
            .ok_or_else(|| DomainError::not_found("CartItem", id))
    }

    async fn expand(&self, item: CartItem) -> Result<CartLine, DomainError> {
        let product = self
            .store
            .get_product(item.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", item.product_id))?;
        Ok(CartLine { item, product })
    }
}
