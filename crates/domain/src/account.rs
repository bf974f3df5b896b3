//! Accounts, API tokens and profiles.

use common::UserId;
use entity_store::{AddressUpdate, AuthToken, EntityStore, NewUser, User, UserQuery, constraints};
use validator::Validate;

use crate::credentials::{generate_token_key, hash_password, verify_password};
use crate::error::{DomainError, ValidationError, unique_violation_message};
use crate::validation::{
    AccountFields, ProfileChanges, Registration, normalize_email, validate_password,
};
use crate::{Actor, policy};

pub struct AccountService<S: EntityStore> {
    store: S,
}

impl<S: EntityStore> AccountService<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    /// Registers a customer. The user's cart is created with it.
    #[tracing::instrument(skip(self, registration), fields(email = %registration.email))]
    pub async fn register(&self, registration: Registration) -> Result<User, DomainError> {
        let user = self.create_account(registration, false).await?;
        metrics::counter!("users_registered_total").increment(1);
        tracing::info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Makes sure an administrator with the given email exists, creating one
    /// if needed. An existing staff account is kept as it is; a customer
    /// account under that email is an error.
    #[tracing::instrument(skip(self, password))]
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<User, DomainError> {
        if let Some(existing) = self.store.find_user_by_email(&normalize_email(email)).await? {
            if !existing.is_staff {
                return Err(ValidationError::rule(
                    "Administrator email belongs to an account without staff rights",
                )
                .into());
            }
            return Ok(existing);
        }

        let user = self
            .create_account(Registration::new(email, password), true)
            .await?;
        tracing::info!(user_id = %user.id, "administrator created");
        Ok(user)
    }

    async fn create_account(
        &self,
        registration: Registration,
        is_staff: bool,
    ) -> Result<User, DomainError> {
        let registration = registration.clean()?;
        self.ensure_email_free(&registration.email, None).await?;

        let password_hash = hash_password(&registration.password)?;
        Ok(self
            .store
            .create_user(NewUser {
                email: registration.email,
                name: registration.name,
                surname: String::new(),
                password_hash,
                is_staff,
            })
            .await?)
    }

    /// Exchanges credentials for the user's API token, creating the token on
    /// first use.
    #[tracing::instrument(skip(self, password))]
    pub async fn issue_token(&self, email: &str, password: &str) -> Result<AuthToken, DomainError> {
        let user = self
            .store
            .find_user_by_email(&normalize_email(email))
            .await?
            .ok_or(DomainError::InvalidCredentials)?;
        verify_password(password, &user.password_hash)?;

        Ok(self
            .store
            .token_for_user(user.id, generate_token_key())
            .await?)
    }

    /// Resolves a token key to the actor it authenticates.
    #[tracing::instrument(skip_all)]
    pub async fn authenticate(&self, key: &str) -> Result<Actor, DomainError> {
        let token = self
            .store
            .find_token(key)
            .await?
            .ok_or(DomainError::InvalidToken)?;
        let user = self
            .store
            .get_user(token.user_id)
            .await?
            .ok_or(DomainError::InvalidToken)?;

        Ok(Actor::from(&user))
    }

    #[tracing::instrument(skip(self))]
    pub async fn list_users(&self, query: UserQuery) -> Result<Vec<User>, DomainError> {
        Ok(self.store.list_users(query).await?)
    }

    #[tracing::instrument(skip(self))]
    pub async fn get_user(&self, id: UserId) -> Result<User, DomainError> {
        self.store
            .get_user(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    #[tracing::instrument(skip(self))]
    pub async fn profile(&self, actor: &Actor) -> Result<User, DomainError> {
        let id = policy::require_user(actor)?;
        self.get_user(id).await
    }

    /// Applies `changes` to the actor's own account.
    ///
    /// A new password is hashed; an address in the changes replaces the
    /// stored one (an empty address clears it).
    #[tracing::instrument(skip(self, changes))]
    pub async fn update_profile(
        &self,
        actor: &Actor,
        changes: ProfileChanges,
    ) -> Result<User, DomainError> {
        let id = policy::require_user(actor)?;
        let current = self.get_user(id).await?;

        let fields = AccountFields {
            email: changes
                .email
                .as_deref()
                .map(normalize_email)
                .unwrap_or_else(|| current.email.clone()),
            name: changes
                .name
                .map(|n| n.trim().to_string())
                .unwrap_or_else(|| current.name.clone()),
            surname: changes
                .surname
                .map(|s| s.trim().to_string())
                .unwrap_or_else(|| current.surname.clone()),
        };
        fields.validate()?;
        if let Some(password) = &changes.password {
            validate_password(password)?;
        }
        let address = changes.address.map(|patch| patch.resolve()).transpose()?;

        if fields.email != current.email {
            self.ensure_email_free(&fields.email, Some(id)).await?;
        }
        let password_hash = match &changes.password {
            Some(password) => hash_password(password)?,
            None => current.password_hash.clone(),
        };

        let address = address.map(AddressUpdate::from).unwrap_or_default();

        Ok(self
            .store
            .update_user(
                &User {
                    email: fields.email,
                    name: fields.name,
                    surname: fields.surname,
                    password_hash,
                    ..current
                },
                address,
            )
            .await?)
    }

    /// Deletes the actor's account and everything it owns.
    #[tracing::instrument(skip(self))]
    pub async fn delete_profile(&self, actor: &Actor) -> Result<(), DomainError> {
        let id = policy::require_user(actor)?;
        if !self.store.delete_user(id).await? {
            return Err(DomainError::not_found("User", id));
        }
        tracing::info!(user_id = %id, "user deleted");
        Ok(())
    }

    async fn ensure_email_free(&self, email: &str, except: Option<UserId>) -> Result<(), DomainError> {
        match self.store.find_user_by_email(email).await? {
            Some(existing) if Some(existing.id) != except => Err(ValidationError::rule(
                unique_violation_message(constraints::USER_EMAIL),
            )
            .into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use entity_store::InMemoryEntityStore;

    use super::*;
    use crate::error::AccessError;
    use crate::validation::AddressPatch;

    fn service() -> AccountService<InMemoryEntityStore> {
        AccountService::new(InMemoryEntityStore::new())
    }

    fn full_address() -> AddressPatch {
        AddressPatch {
            country: Some("PL".to_string()),
            city: Some("Krakow".to_string()),
            street: Some("Dluga".to_string()),
            house: Some(3),
            postal_code: Some("31-147".to_string()),
        }
    }

    #[tokio::test]
    async fn register_then_token_then_authenticate() {
        let service = service();
        let user = service
            .register(Registration::new("alice@EXAMPLE.com", "secret123").with_name("Alice"))
            .await
            .unwrap();
        assert_eq!(user.email, "alice@example.com");
        assert_ne!(user.password_hash, "secret123");

        let token = service
            .issue_token("alice@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(token.key.len(), 40);

        let again = service
            .issue_token("alice@example.com", "secret123")
            .await
            .unwrap();
        assert_eq!(again.key, token.key);

        let actor = service.authenticate(&token.key).await.unwrap();
        assert_eq!(actor, Actor::user(user.id));
    }

    #[tokio::test]
    async fn duplicate_email_rejected() {
        let service = service();
        service
            .register(Registration::new("alice@example.com", "secret123"))
            .await
            .unwrap();

        let err = service
            .register(Registration::new("alice@example.com", "other-secret"))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "User with this email already exists");
    }

    #[tokio::test]
    async fn wrong_password_is_invalid_credentials() {
        let service = service();
        service
            .register(Registration::new("alice@example.com", "secret123"))
            .await
            .unwrap();

        let err = service
            .issue_token("alice@example.com", "nope")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredentials));

        let err = service
            .issue_token("nobody@example.com", "secret123")
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidCredentials));
    }

    #[tokio::test]
    async fn unknown_token_rejected() {
        let err = service().authenticate("deadbeef").await.unwrap_err();
        assert!(matches!(err, DomainError::InvalidToken));
    }

    #[tokio::test]
    async fn profile_requires_authentication() {
        let err = service().profile(&Actor::Anonymous).await.unwrap_err();
        assert!(matches!(
            err,
            DomainError::Access(AccessError::Unauthenticated)
        ));
    }

    #[tokio::test]
    async fn update_profile_rehashes_password() {
        let service = service();
        let user = service
            .register(Registration::new("alice@example.com", "secret123"))
            .await
            .unwrap();
        let actor = Actor::from(&user);

        service
            .update_profile(
                &actor,
                ProfileChanges {
                    surname: Some("Smith".to_string()),
                    password: Some("new-secret".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(service.issue_token("alice@example.com", "secret123").await.is_err());
        assert!(service.issue_token("alice@example.com", "new-secret").await.is_ok());
        assert_eq!(service.profile(&actor).await.unwrap().surname, "Smith");
    }

    #[tokio::test]
    async fn address_set_replaced_and_cleared() {
        let service = service();
        let user = service
            .register(Registration::new("alice@example.com", "secret123"))
            .await
            .unwrap();
        let actor = Actor::from(&user);

        let updated = service
            .update_profile(
                &actor,
                ProfileChanges {
                    address: Some(full_address()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.address.as_ref().unwrap().city, "Krakow");

        let err = service
            .update_profile(
                &actor,
                ProfileChanges {
                    address: Some(AddressPatch {
                        city: Some("Gdansk".to_string()),
                        ..Default::default()
                    }),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(err.to_string().starts_with("These fields are required"));

        let cleared = service
            .update_profile(
                &actor,
                ProfileChanges {
                    address: Some(AddressPatch::default()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(cleared.address.is_none());
    }

    #[tokio::test]
    async fn cannot_take_another_users_email() {
        let service = service();
        service
            .register(Registration::new("alice@example.com", "secret123"))
            .await
            .unwrap();
        let bob = service
            .register(Registration::new("bob@example.com", "secret123"))
            .await
            .unwrap();

        let err = service
            .update_profile(
                &Actor::from(&bob),
                ProfileChanges {
                    email: Some("alice@example.com".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let service = service();
        let first = service
            .ensure_admin("admin@example.com", "admin-secret")
            .await
            .unwrap();
        let second = service
            .ensure_admin("admin@example.com", "admin-secret")
            .await
            .unwrap();

        assert!(first.is_staff);
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn ensure_admin_rejects_customer_email() {
        let service = service();
        let customer = service
            .register(Registration::new("boss@example.com", "secret123"))
            .await
            .unwrap();

        let err = service
            .ensure_admin("boss@EXAMPLE.com", "admin-secret")
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::Validation(_)));
        assert!(!service.get_user(customer.id).await.unwrap().is_staff);
    }

    #[tokio::test]
    async fn delete_profile_removes_account() {
        let service = service();
        let user = service
            .register(Registration::new("alice@example.com", "secret123"))
            .await
            .unwrap();
        let actor = Actor::from(&user);

        service.delete_profile(&actor).await.unwrap();
        assert!(matches!(
            service.get_user(user.id).await.unwrap_err(),
            DomainError::NotFound { .. }
        ));
    }
}
