//! # Request context
//!
//! The caller's identity travels explicitly into every service call. It is
//! resolved once at the request boundary; nothing here caches it.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::Role;

/// Identity carried by a signed-in session.
///
/// `user_id` comes from the session store and may disagree with the user
/// table; services that need the author row look it up by `email`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub user_id: Option<Uuid>,
    pub email: String,
    pub name: Option<String>,
    pub role: Role,
}

/// Outcome of the authorization gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    /// No session (401)
    Unauthenticated,
    /// Session present but not an admin (403)
    Forbidden,
    Allow,
}

/// Per-request caller state handed to every service operation.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    session: Option<Session>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self { session: None }
    }

    pub fn with_session(session: Session) -> Self {
        Self {
            session: Some(session),
        }
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Classifies the caller. The role on the session is the only elevation path.
    pub fn access(&self) -> Access {
        match &self.session {
            None => Access::Unauthenticated,
            Some(session) if session.role == Role::Admin => Access::Allow,
            Some(_) => Access::Forbidden,
        }
    }

    /// Gate for every mutation: returns the admin session or the matching error.
    pub fn require_admin(&self) -> Result<&Session> {
        match (self.access(), &self.session) {
            (Access::Allow, Some(session)) => Ok(session),
            (Access::Forbidden, Some(session)) => {
                tracing::warn!(email = %session.email, role = %session.role, "non-admin attempted an admin operation");
                Err(AppError::Forbidden(format!(
                    "role `{}` may not modify content",
                    session.role
                )))
            }
            _ => {
                tracing::warn!("anonymous caller attempted an admin operation");
                Err(AppError::Unauthenticated("sign-in required".into()))
            }
        }
    }
}
