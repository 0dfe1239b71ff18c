//! # Account service
//!
//! Operator provisioning of the admin account and credential sign-in.
//! Session storage is the caller's business; this service only answers
//! "who is this" with a [`Session`].

use std::sync::Arc;

use rr_core::{AppError, CredentialHasher, RequestContext, Result, Role, Session, User, UserRepo};
use tracing::{info, instrument, warn};
use uuid::Uuid;

const MIN_PASSWORD_LEN: usize = 6;

pub struct AccountService {
    users: Arc<dyn UserRepo>,
    hasher: Arc<dyn CredentialHasher>,
}

fn normalise_email(email: &str) -> String {
    email.trim().to_lowercase()
}

impl AccountService {
    pub fn new(users: Arc<dyn UserRepo>, hasher: Arc<dyn CredentialHasher>) -> Self {
        Self { users, hasher }
    }

    /// Creates the site's admin. Refused once any admin exists.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn provision_admin(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let name = name.trim();
        if name.is_empty() {
            return Err(AppError::validation("name", "name must not be empty"));
        }
        let email = normalise_email(email);
        if !email.contains('@') {
            return Err(AppError::validation("email", "enter a valid email address"));
        }
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AppError::validation(
                "password",
                format!("password must be at least {MIN_PASSWORD_LEN} characters"),
            ));
        }

        if let Some(admin) = self.users.find_any_admin().await? {
            return Err(AppError::Conflict(format!(
                "an administrator already exists ({})",
                admin.email
            )));
        }
        if self.users.find_user_by_email(&email).await?.is_some() {
            return Err(AppError::email_taken());
        }

        let user = User {
            id: Uuid::now_v7(),
            email,
            password_hash: self.hasher.hash_password(password)?,
            name: name.to_string(),
            role: Role::Admin,
        };
        self.users.insert_user(&user).await?;
        info!(user_id = %user.id, "administrator provisioned");
        Ok(user)
    }

    /// Verifies credentials. Every failure reads the same to the caller.
    #[instrument(skip_all, fields(email = %email))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Session> {
        let invalid = || AppError::Unauthenticated("invalid email or password".into());

        let Some(user) = self.users.find_user_by_email(&normalise_email(email)).await? else {
            warn!("sign-in for unknown email");
            return Err(invalid());
        };
        if !self.hasher.verify_password(password, &user.password_hash) {
            warn!("sign-in with wrong password");
            return Err(invalid());
        }

        Ok(Session {
            user_id: Some(user.id),
            email: user.email,
            name: Some(user.name),
            role: user.role,
        })
    }

    /// Signs in and wraps the session into a request context.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<RequestContext> {
        self.authenticate(email, password)
            .await
            .map(RequestContext::with_session)
    }
}
