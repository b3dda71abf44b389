use std::sync::Arc;

use crate::domain::User;
use crate::error::{DomainError, RepoError};
use crate::forms::{BAD_CREDENTIALS, FormErrors, LoginForm, SignupForm, USERNAME_TAKEN};
use crate::ports::{PasswordService, UserRepository};

/// Registration and credential checks.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepository>,
    passwords: Arc<dyn PasswordService>,
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepository>, passwords: Arc<dyn PasswordService>) -> Self {
        Self { users, passwords }
    }

    /// Register a new account.
    pub async fn signup(&self, form: &SignupForm) -> Result<Result<User, FormErrors>, DomainError> {
        if let Err(errors) = form.clean() {
            return Ok(Err(errors));
        }

        let username = form.username.trim();
        if self.users.find_by_username(username).await?.is_some() {
            return Ok(Err(FormErrors::single("username", USERNAME_TAKEN)));
        }

        let password_hash = self
            .passwords
            .hash(&form.password)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        let user = User::new(
            username.to_string(),
            form.email.trim().to_string(),
            password_hash,
        );

        match self.users.save(user).await {
            Ok(user) => {
                tracing::info!(user_id = %user.id, "User registered");
                Ok(Ok(user))
            }
            // Lost a race with a concurrent signup for the same name.
            Err(RepoError::Constraint(_)) => Ok(Err(FormErrors::single("username", USERNAME_TAKEN))),
            Err(e) => Err(e.into()),
        }
    }

    /// Check a username/password pair.
    pub async fn authenticate(&self, form: &LoginForm) -> Result<Result<User, FormErrors>, DomainError> {
        if let Err(errors) = form.clean() {
            return Ok(Err(errors));
        }

        let Some(user) = self.users.find_by_username(form.username.trim()).await? else {
            return Ok(Err(FormErrors::single(FormErrors::NON_FIELD, BAD_CREDENTIALS)));
        };

        let valid = self
            .passwords
            .verify(&form.password, &user.password_hash)
            .map_err(|e| DomainError::Internal(e.to_string()))?;

        if !valid {
            tracing::debug!(user_id = %user.id, "Password mismatch");
            return Ok(Err(FormErrors::single(FormErrors::NON_FIELD, BAD_CREDENTIALS)));
        }

        Ok(Ok(user))
    }
}
