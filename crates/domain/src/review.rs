//! Product reviews.
//!
//! Every write goes through the store's review operations, which recompute
//! the reviewed product's rating in the same transaction.

use common::ReviewId;
use entity_store::{EntityStore, NewReview, Review, ReviewQuery, constraints};
use validator::Validate;

use crate::error::{DomainError, ValidationError, unique_violation_message};
use crate::validation::{ReviewChanges, ReviewInput};
use crate::{Actor, policy};

pub struct ReviewService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> ReviewService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_reviews(&self, query: ReviewQuery) -> Result<Vec<Review>, DomainError> {
        Ok(self.store.list_reviews(query).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_review(&self, id: ReviewId) -> Result<Review, DomainError> {
        self.store
            .get_review(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Review", id))
    }

    /// Writes a review as the actor. One review per user and product.
    #[tracing::instrument(skip(self))]
    pub async fn create_review(
        &self,
        actor: &Actor,
        input: ReviewInput,
    ) -> Result<Review, DomainError> {
        let user_id = policy::require_user(actor)?;
        input.validate()?;

        let existing = self
            .store
            .list_reviews(ReviewQuery::new().product(input.product_id).user(user_id))
            .await?;
        if !existing.is_empty() {
            return Err(ValidationError::rule(unique_violation_message(
                constraints::REVIEW_USER_PRODUCT,
            ))
            .into());
        }

        let review = self
            .store
            .create_review(NewReview {
                rating: input.rating,
                commentary: input.commentary,
                user_id,
                product_id: input.product_id,
            })
            .await?;

        metrics::counter!("reviews_created_total").increment(1);
        tracing::info!(review_id = %review.id, product_id = %review.product_id, "review created");
        Ok(review)
    }

    /// Changes the rating or commentary of the actor's own review.
    ///
    /// Reviews by other users answer [`DomainError::NotFound`].
    #[tracing::instrument(skip(self))]
    pub async fn update_review(
        &self,
        actor: &Actor,
        id: ReviewId,
        changes: ReviewChanges,
    ) -> Result<Review, DomainError> {
        policy::require_user(actor)?;
        let current = self
            .visible_review(id, |review| policy::can_edit_review(actor, review))
            .await?;

        let input = changes.apply_to(&current);
        input.validate()?;

        let review = Review {
            rating: input.rating,
            commentary: input.commentary,
            ..current
        };
        Ok(self.store.update_review(&review).await?)
    }

    /// Deletes a review. Its author or an administrator may do this.
    #[tracing::instrument(skip(self))]
    pub async fn delete_review(&self, actor: &Actor, id: ReviewId) -> Result<(), DomainError> {
        policy::require_user(actor)?;
        self.visible_review(id, |review| policy::can_delete_review(actor, review))
            .await?;

        if !self.store.delete_review(id).await? {
            return Err(DomainError::not_found("Review", id));
        }
        Ok(())
    }

    async fn visible_review(
        &self,
        id: ReviewId,
        allowed: impl Fn(&Review) -> bool,
    ) -> Result<Review, DomainError> {
        match self.store.get_review(id).await? {
            Some(review) if allowed(&review) => Ok(review),
            _ => Err(DomainError::not_found("Review", id)),
        }
    }
}
