use common::UserId;
use entity_store::User;

/// Who is making a request. Passed explicitly into every service call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Actor {
    #[default]
    Anonymous,
    User { id: UserId, is_staff: bool },
}

impl Actor {
    pub fn user(id: UserId) -> Self {
        Actor::User {
            id,
            is_staff: false,
        }
    }

    pub fn staff(id: UserId) -> Self {
        Actor::User { id, is_staff: true }
    }

    pub fn user_id(&self) -> Option<UserId> {
        match self {
            Actor::Anonymous => None,
            Actor::User { id, .. } => Some(*id),
        }
    }

    pub fn is_staff(&self) -> bool {
        matches!(self, Actor::User { is_staff: true, .. })
    }
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Actor::User {
            id: user.id,
            is_staff: user.is_staff,
        }
    }
}
