//! Categories and products.

use common::{CategoryId, ProductId};
use entity_store::{
    Category, EntityStore, NewProduct, Product, ProductQuery, StoreError, constraints,
};
use validator::Validate;

use crate::error::{DomainError, ValidationError};
use crate::validation::{CategoryChanges, CategoryInput, ProductChanges, ProductInput};
use crate::{Actor, policy};

/// Service for the public catalog.
///
/// Anyone may read; only administrators may write.
pub struct CatalogService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> CatalogService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_categories(&self) -> Result<Vec<Category>, DomainError> {
        Ok(self.store.list_categories().await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_category(&self, id: CategoryId) -> Result<Category, DomainError> {
        self.store
            .get_category(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Category", id))
    }

    /// Creates a category. Names are unique ignoring case.
    #[tracing::instrument(skip(self))]
    pub async fn create_category(
        &self,
        actor: &Actor,
        input: CategoryInput,
    ) -> Result<Category, DomainError> {
        policy::require_staff(actor)?;
        input.validate()?;
        self.ensure_category_name_free(&input.name, None).await?;

        let category = self
            .store
            .create_category(&input.name)
            .await
            .map_err(|e| category_write_error(e, &input.name))?;
        tracing::info!(category_id = %category.id, "category created");
        Ok(category)
    }

    #[tracing::instrument(skip(self))]
    pub async fn update_category(
        &self,
        actor: &Actor,
        id: CategoryId,
        changes: CategoryChanges,
    ) -> Result<Category, DomainError> {
        policy::require_staff(actor)?;
        let current = self.get_category(id).await?;

        let Some(name) = changes.name else {
            return Ok(current);
        };
        let input = CategoryInput::new(name);
        input.validate()?;
        self.ensure_category_name_free(&input.name, Some(id)).await?;

        self.store
            .rename_category(id, &input.name)
            .await
            .map_err(|e| category_write_error(e, &input.name))
    }

    /// Deletes a category together with its products.
    #[tracing::instrument(skip(self))]
    pub async fn delete_category(&self, actor: &Actor, id: CategoryId) -> Result<(), DomainError> {
        policy::require_staff(actor)?;
        if !self.store.delete_category(id).await? {
            return Err(DomainError::not_found("Category", id));
        }
        tracing::info!(category_id = %id, "category deleted");
        Ok(())
    }

    async fn ensure_category_name_free(
        &self,
        name: &str,
        except: Option<CategoryId>,
    ) -> Result<(), DomainError> {
        match self.store.find_category_by_name(name).await? {
            Some(existing) if Some(existing.id) != except => Err(category_name_taken(name)),
            _ => Ok(()),
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_products(&self, query: ProductQuery) -> Result<Vec<Product>, DomainError> {
        Ok(self.store.list_products(query).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_product(&self, id: ProductId) -> Result<Product, DomainError> {
        self.store
            .get_product(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Product", id))
    }

    /// Creates a product. Its rating starts at 0.
    #[tracing::instrument(skip(self, input), fields(name = %input.name))]
    pub async fn create_product(
        &self,
        actor: &Actor,
        input: ProductInput,
    ) -> Result<Product, DomainError> {
        policy::require_staff(actor)?;
        let input = trim_product(input);
        input.validate()?;

        let product = self
            .store
            .create_product(NewProduct {
                name: input.name,
                description: input.description,
                brand: input.brand,
                price: input.price,
                stock: input.stock,
                category_id: input.category_id,
                properties: input.properties,
            })
            .await?;

        metrics::counter!("products_created_total").increment(1);
        tracing::info!(product_id = %product.id, "product created");
        Ok(product)
    }

    /// Applies `changes` to a product. The rating cannot be changed here.
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_product(
        &self,
        actor: &Actor,
        id: ProductId,
        changes: ProductChanges,
    ) -> Result<Product, DomainError> {
        policy::require_staff(actor)?;
        let current = self.get_product(id).await?;

        let input = trim_product(changes.apply_to(&current));
        input.validate()?;

        let product = Product {
            name: input.name,
            description: input.description,
            brand: input.brand,
            price: input.price,
            stock: input.stock,
            category_id: input.category_id,
            properties: input.properties,
            ..current
        };
        Ok(self.store.update_product(&product).await?)
    }

    /// Deletes a product with its reviews, cart items and wish items.
    #[tracing::instrument(skip(self))]
    pub async fn delete_product(&self, actor: &Actor, id: ProductId) -> Result<(), DomainError> {
        policy::require_staff(actor)?;
        if !self.store.delete_product(id).await? {
            return Err(DomainError::not_found("Product", id));
        }
        tracing::info!(product_id = %id, "product deleted");
        Ok(())
    }
}

fn trim_product(input: ProductInput) -> ProductInput {
    ProductInput {
        name: input.name.trim().to_string(),
        brand: input.brand.trim().to_string(),
        ..input
    }
}

fn category_name_taken(name: &str) -> DomainError {
    ValidationError::rule(format!("Category with this name ({name}) already exists")).into()
}

/// Store errors from category writes. A lost race on the name reads the same
/// as the pre-check.
fn category_write_error(err: StoreError, name: &str) -> DomainError {
    if err.is_unique_violation_of(constraints::CATEGORY_NAME) {
        category_name_taken(name)
    } else {
        err.into()
    }
}
