//! Wishlists.

use common::{ProductId, WishItemId};
use entity_store::{EntityStore, Product, WishItem, constraints};

use crate::error::{DomainError, ValidationError, unique_violation_message};
use crate::{Actor, policy};

/// A wish item with its product expanded.
#[derive(Debug, Clone, PartialEq)]
pub struct WishLine {
    pub item: WishItem,
    pub product: Product,
}

pub struct WishlistService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> WishlistService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_items(&self, actor: &Actor) -> Result<Vec<WishLine>, DomainError> {
        let user_id = policy::require_user(actor)?;
        let items = self.store.list_wish_items(user_id).await?;

        let mut lines = Vec::with_capacity(items.len());
        for item in items {
            lines.push(self.expand(item).await?);
        }
        Ok(lines)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_item(&self, actor: &Actor, id: WishItemId) -> Result<WishLine, DomainError> {
        policy::require_user(actor)?;
        let item = self.visible_item(actor, id).await?;
        self.expand(item).await
    }

    /// Wishes a product. Each product can be wished once per user.
    #[tracing::instrument(skip(self))]
    pub async fn add_item(&self, actor: &Actor, product_id: ProductId) -> Result<WishItem, DomainError> {
        let user_id = policy::require_user(actor)?;

        let already = self
            .store
            .list_wish_items(user_id)
            .await?
            .iter()
            .any(|item| item.product_id == product_id);
        if already {
            return Err(ValidationError::rule(unique_violation_message(
                constraints::WISH_ITEM_USER_PRODUCT,
            ))
            .into());
        }

        Ok(self.store.create_wish_item(user_id, product_id).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn remove_item(&self, actor: &Actor, id: WishItemId) -> Result<(), DomainError> {
        policy::require_user(actor)?;
        self.visible_item(actor, id).await?;

        if !self.store.delete_wish_item(id).await? {
            return Err(DomainError::not_found("WishItem", id));
        }
        Ok(())
    }

    async fn visible_item(&self, actor: &Actor, id: WishItemId) -> Result<WishItem, DomainError> {
        self.store
            .get_wish_item(id)
            .await?
            .filter(|item| policy::owns(actor, item.user_id))
            .ok_or_else(|| DomainError::not_found("WishItem", id))
    }

    async fn expand(&self, item: WishItem) -> Result<WishLine, DomainError> {
        let product = self
            .store
            .get_product(item.product_id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", item.product_id))?;
        Ok(WishLine { item, product })
    }
}
