use std::sync::Arc;

use chrono::{Duration, Utc};
use tracing::info;
use uuid::Uuid;

use super::domain::{
    Principal, Role, Session, SignInRequest, SignInResponse, SignUpRequest, UserAccount,
};
use super::password::{hash_password, verify_password};
use crate::config::AuthConfig;
use crate::ids::UserId;
use crate::store::{RepositoryError, UserRepository};

const MIN_PASSWORD_LEN: usize = 8;

/// Accounts and bearer sessions.
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    session_ttl: Duration,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, config: AuthConfig) -> Self {
        Self {
            users,
            session_ttl: Duration::hours(config.session_ttl_hours),
        }
    }

    pub fn sign_up(&self, request: SignUpRequest) -> Result<UserAccount, AuthError> {
        if request.role == Role::Admin {
            return Err(AuthError::AdminSignUp);
        }
        self.create_account(request.email, &request.password, request.role)
    }

    /// Create an admin account outside the public sign-up path.
    pub fn bootstrap_admin(&self, email: &str, password: &str) -> Result<UserAccount, AuthError> {
        self.create_account(email.to_string(), password, Role::Admin)
    }

    fn create_account(
        &self,
        email: String,
        password: &str,
        role: Role,
    ) -> Result<UserAccount, AuthError> {
        let email = normalize_email(&email).ok_or(AuthError::InvalidEmail)?;
        if password.chars().count() < MIN_PASSWORD_LEN {
            return Err(AuthError::WeakPassword {
                min: MIN_PASSWORD_LEN,
            });
        }

        let account = UserAccount {
            id: UserId::new(),
            email,
            password_hash: hash_password(password)
                .map_err(|err| AuthError::Hashing(err.to_string()))?,
            role,
            created_at: Utc::now(),
        };

        let stored = self.users.insert_user(account).map_err(|err| match err {
            RepositoryError::Conflict => AuthError::EmailTaken,
            other => AuthError::Repository(other),
        })?;
        info!(user_id = %stored.id, role = stored.role.label(), "account created");
        Ok(stored)
    }

    pub fn sign_in(&self, request: SignInRequest) -> Result<SignInResponse, AuthError> {
        let email = normalize_email(&request.email).ok_or(AuthError::InvalidCredentials)?;
        let account = self
            .users
            .user_by_email(&email)?
            .ok_or(AuthError::InvalidCredentials)?;
        if !verify_password(&request.password, &account.password_hash) {
            return Err(AuthError::InvalidCredentials);
        }

        let now = Utc::now();
        let session = Session {
            token: new_token(),
            user_id: account.id,
            role: account.role,
            created_at: now,
            expires_at: now + self.session_ttl,
        };
        self.users.insert_session(session.clone())?;

        Ok(SignInResponse {
            token: session.token,
            user_id: account.id,
            role: account.role,
            expires_at: session.expires_at,
        })
    }

    pub fn sign_out(&self, token: &str) -> Result<(), AuthError> {
        self.users.remove_session(token)?;
        Ok(())
    }

    /// Resolve a bearer token into the caller, dropping expired sessions.
    pub fn authenticate(&self, token: &str) -> Result<Principal, AuthError> {
        let session = self
            .users
            .session(token)?
            .ok_or(AuthError::InvalidSession)?;
        if session.is_expired(Utc::now()) {
            self.users.remove_session(token)?;
            return Err(AuthError::InvalidSession);
        }
        Ok(session.principal())
    }

    pub fn account(&self, id: &UserId) -> Result<UserAccount, AuthError> {
        self.users.user(id)?.ok_or(AuthError::InvalidSession)
    }
}

fn normalize_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(email)
}

fn new_token() -> String {
    format!("{}{}", Uuid::new_v4().simple(), Uuid::new_v4().simple())
}

/// Fail with `Forbidden` unless the caller holds one of `allowed`.
pub fn require_role(principal: &Principal, allowed: &[Role]) -> Result<(), AuthError> {
    if principal.is_admin() || allowed.contains(&principal.role) {
        Ok(())
    } else {
        Err(AuthError::Forbidden {
            role: principal.role.label(),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("a valid e-mail address is required")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("admin accounts cannot be self-registered")]
    AdminSignUp,
    #[error("e-mail address is already registered")]
    EmailTaken,
    #[error("invalid e-mail or password")]
    InvalidCredentials,
    #[error("missing bearer token")]
    MissingToken,
    #[error("session is invalid or expired")]
    InvalidSession,
    #[error("role '{role}' may not perform this action")]
    Forbidden { role: &'static str },
    #[error("password hashing failed: {0}")]
    Hashing(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
