//! Sign-up, login and session resolution.

use std::sync::Arc;

use argon2::{
    Argon2, PasswordHash, PasswordVerifier,
    password_hash::{PasswordHasher, SaltString},
};
use sha2::{Digest, Sha256};
use thiserror::Error;
use time::{Duration, OffsetDateTime};
use tracing::{debug, info};
use uuid::Uuid;

use crate::application::forms::FormErrors;
use crate::application::repos::{
    CreateSessionParams, CreateUserParams, RepoError, SessionsRepo, UsersRepo,
};
use crate::domain::accounts::{validate_email, validate_password, validate_username};
use crate::domain::entities::UserRecord;

const INVALID_LOGIN: &str =
    "Please enter a correct username and password. Note that both fields may be case-sensitive.";
const USERNAME_TAKEN: &str = "A user with that username already exists.";

#[derive(Debug, Error)]
pub enum AccountError {
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

#[derive(Debug, Clone, Default)]
pub struct SignupSubmission {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub password1: String,
    pub password2: String,
}

/// Sign-up form state for re-rendering. Passwords are never echoed back.
#[derive(Debug, Clone, Default)]
pub struct SignupForm {
    pub first_name: String,
    pub last_name: String,
    pub username: String,
    pub email: String,
    pub errors: FormErrors,
}

#[derive(Debug)]
pub enum SignupOutcome {
    Created(UserRecord),
    Invalid(SignupForm),
}

#[derive(Debug, Clone, Default)]
pub struct LoginForm {
    pub username: String,
    pub errors: FormErrors,
}

/// Raw session secret handed to the browser.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: OffsetDateTime,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Authenticated {
        user: UserRecord,
        session: IssuedSession,
    },
    Rejected(LoginForm),
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UsersRepo>,
    sessions: Arc<dyn SessionsRepo>,
    session_ttl: Duration,
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UsersRepo>,
        sessions: Arc<dyn SessionsRepo>,
        session_ttl: std::time::Duration,
    ) -> Self {
        Self {
            users,
            sessions,
            session_ttl: Duration::try_from(session_ttl).unwrap_or(Duration::days(14)),
        }
    }

    pub async fn signup(&self, submission: SignupSubmission) -> Result<SignupOutcome, AccountError> {
        let SignupSubmission {
            first_name,
            last_name,
            username,
            email,
            password1,
            password2,
        } = submission;
        let mut errors = FormErrors::new();

        let valid_username = errors.check("username", validate_username(&username));
        let valid_email = errors.check("email", validate_email(&email));
        errors.check("password2", validate_password(&password1, &password2));

        if let Some(name) = &valid_username
            && self.users.find_user_by_username(name).await?.is_some()
        {
            errors.add("username", USERNAME_TAKEN);
        }

        let invalid = |errors: FormErrors| {
            Ok(SignupOutcome::Invalid(SignupForm {
                first_name: first_name.clone(),
                last_name: last_name.clone(),
                username: username.clone(),
                email: email.clone(),
                errors,
            }))
        };

        let (Some(valid_username), Some(valid_email)) = (valid_username, valid_email) else {
            return invalid(errors);
        };
        if !errors.is_empty() {
            return invalid(errors);
        }

        let created = self
            .users
            .create_user(CreateUserParams {
                username: valid_username,
                first_name: first_name.trim().to_string(),
                last_name: last_name.trim().to_string(),
                email: valid_email,
                password_hash: hash_password(&password1)?,
            })
            .await;

        match created {
            Ok(user) => {
                info!(
                    target = "quire::application::accounts",
                    user_id = user.id,
                    username = %user.username,
                    "user signed up"
                );
                Ok(SignupOutcome::Created(user))
            }
            // Lost a race with a concurrent sign-up for the same name.
            Err(RepoError::Duplicate { .. }) => {
                errors.add("username", USERNAME_TAKEN);
                invalid(errors)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginOutcome, AccountError> {
        let rejected = || {
            let mut errors = FormErrors::new();
            errors.add_non_field(INVALID_LOGIN);
            Ok(LoginOutcome::Rejected(LoginForm {
                username: username.to_string(),
                errors,
            }))
        };

        let Some(user) = self.users.find_user_by_username(username.trim()).await? else {
            return rejected();
        };
        if !verify_password(password, &user.password_hash) {
            debug!(
                target = "quire::application::accounts",
                user_id = user.id,
                "password mismatch"
            );
            return rejected();
        }

        let now = OffsetDateTime::now_utc();
        let purged = self.sessions.purge_expired_sessions(now).await?;
        if purged > 0 {
            debug!(
                target = "quire::application::accounts",
                purged, "removed expired sessions"
            );
        }

        let token = generate_token();
        let expires_at = now + self.session_ttl;
        self.sessions
            .create_session(CreateSessionParams {
                token_hash: hash_token(&token),
                user_id: user.id,
                expires_at,
            })
            .await?;

        info!(
            target = "quire::application::accounts",
            user_id = user.id,
            "user logged in"
        );
        Ok(LoginOutcome::Authenticated {
            user,
            session: IssuedSession { token, expires_at },
        })
    }

    pub async fn logout(&self, token: &str) -> Result<(), AccountError> {
        self.sessions.delete_session(&hash_token(token)).await?;
        Ok(())
    }

    /// Resolve a session cookie to its user. Unknown and expired sessions
    /// resolve to `None`; expired ones are removed on the way.
    pub async fn authenticate(&self, token: &str) -> Result<Option<UserRecord>, AccountError> {
        let token_hash = hash_token(token);
        let Some(session) = self.sessions.find_session(&token_hash).await? else {
            return Ok(None);
        };

        if session.is_expired(OffsetDateTime::now_utc()) {
            self.sessions.delete_session(&token_hash).await?;
            return Ok(None);
        }

        Ok(self.users.find_user(session.user_id).await?)
    }
}

/// Argon2 PHC string for the password.
pub fn hash_password(password: &str) -> Result<String, AccountError> {
    let salt = SaltString::encode_b64(Uuid::new_v4().as_bytes())
        .map_err(|err| AccountError::Hash(err.to_string()))?;
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|err| AccountError::Hash(err.to_string()))
}

pub fn verify_password(password: &str, stored: &str) -> bool {
    PasswordHash::new(stored)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

fn generate_token() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}

/// Sessions are stored by the SHA-256 of their secret.
pub fn hash_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}
