//! Authorization rules as pure functions of (actor, resource).

use common::UserId;
use entity_store::Review;

use crate::Actor;
use crate::error::AccessError;

/// Requires an authenticated actor and returns their id.
pub fn require_user(actor: &Actor) -> Result<UserId, AccessError> {
    actor.user_id().ok_or(AccessError::Unauthenticated)
}

/// Requires an administrator.
pub fn require_staff(actor: &Actor) -> Result<UserId, AccessError> {
    let id = require_user(actor)?;
    if actor.is_staff() {
        Ok(id)
    } else {
        Err(AccessError::Forbidden)
    }
}

/// Only the author may change a review.
pub fn can_edit_review(actor: &Actor, review: &Review) -> bool {
    actor.user_id() == Some(review.user_id)
}

/// The author or an administrator may delete a review.
pub fn can_delete_review(actor: &Actor, review: &Review) -> bool {
    actor.is_staff() || can_edit_review(actor, review)
}

/// Carts, cart items and wish items are visible to their owner only.
pub fn owns(actor: &Actor, owner: UserId) -> bool {
    actor.user_id() == Some(owner)
}
