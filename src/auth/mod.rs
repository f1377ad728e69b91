//! Identity gateway: sign-up, sign-in, sign-out, current-identity
//!
//! Sessions are explicit values handed back to the caller and threaded
//! through subsequent calls; there is no ambient "current user" state
//! anywhere in this crate.

use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, SaltString};
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};
use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, Set, SqlErr};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::infrastructure::database::entities::{identity, session, Identity as IdentityEntity, Session as SessionEntity};

/// Identity gateway errors
#[derive(Error, Debug)]
pub enum AuthError {
    /// An identity with this email already exists
    #[error("An account with this email already exists")]
    EmailTaken,

    /// Credentials were rejected
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// Password hashing failed
    #[error("Password hashing error: {0}")]
    Hash(String),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Signup metadata attached to an identity at registration time.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IdentityMetadata {
    pub username: Option<String>,
    pub full_name: Option<String>,
}

/// An authenticated principal, independent of any application profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: String,
    pub email_confirmed_at: Option<DateTime<Utc>>,
    pub metadata: IdentityMetadata,
}

impl From<identity::Model> for Identity {
    fn from(model: identity::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            email_confirmed_at: model.email_confirmed_at,
            metadata: IdentityMetadata {
                username: model.username,
                full_name: model.full_name,
            },
        }
    }
}

/// An issued session, passed explicitly by callers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub token: Uuid,
    pub identity_id: Uuid,
}

/// Result of a sign-up attempt. When email confirmation is required the
/// session is withheld until the confirmation event arrives.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    pub identity_id: Uuid,
    pub session: Option<Session>,
    pub email_confirmed_at: Option<DateTime<Utc>>,
}

pub struct AuthService {
    db: Arc<DatabaseConnection>,
    require_email_confirmation: bool,
}

impl AuthService {
    pub fn new(db: Arc<DatabaseConnection>, require_email_confirmation: bool) -> Self {
        Self {
            db,
            require_email_confirmation,
        }
    }

    /// Register a new identity. The signup metadata is stored alongside the
    /// identity so the profile synchronizer can pick it up later.
    pub async fn sign_up(
        &self,
        email: &str,
        password: &str,
        metadata: IdentityMetadata,
    ) -> Result<SignUpOutcome, AuthError> {
        let password_hash = hash_password(password)?;

        let confirmed_at = if self.require_email_confirmation {
            None
        } else {
            Some(Utc::now())
        };

        let id = Uuid::new_v4();
        let model = identity::ActiveModel {
            id: Set(id),
            email: Set(email.to_string()),
            password_hash: Set(password_hash),
            username: Set(metadata.username),
            full_name: Set(metadata.full_name),
            email_confirmed_at: Set(confirmed_at),
            created_at: Set(Utc::now()),
        };

        let inserted = match model.insert(&*self.db).await {
            Ok(inserted) => inserted,
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                return Err(AuthError::EmailTaken);
            }
            Err(e) => return Err(e.into()),
        };

        info!(identity_id = %inserted.id, "Identity created");

        // No session until the email is confirmed
        let session = if inserted.email_confirmed_at.is_some() {
            Some(self.create_session(inserted.id).await?)
        } else {
            None
        };

        Ok(SignUpOutcome {
            identity_id: inserted.id,
            session,
            email_confirmed_at: inserted.email_confirmed_at,
        })
    }

    /// Exchange credentials for a session.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let Some(record) = IdentityEntity::find()
            .filter(identity::Column::Email.eq(email))
            .one(&*self.db)
            .await?
        else {
            return Err(AuthError::InvalidCredentials);
        };

        if !verify_password(password, &record.password_hash)? {
            return Err(AuthError::InvalidCredentials);
        }

        debug!(identity_id = %record.id, "Signed in");
        self.create_session(record.id).await
    }

    /// Invalidate a session. Signing out twice is a no-op, not an error.
    pub async fn sign_out(&self, session: &Session) -> Result<(), AuthError> {
        SessionEntity::delete_by_id(session.token)
            .exec(&*self.db)
            .await?;
        Ok(())
    }

    /// Resolve a session to its identity. A dead session yields `None`.
    pub async fn current_identity(&self, session: &Session) -> Result<Option<Identity>, AuthError> {
        let Some(row) = SessionEntity::find_by_id(session.token)
            .one(&*self.db)
            .await?
        else {
            return Ok(None);
        };

        let identity = IdentityEntity::find_by_id(row.identity_id)
            .one(&*self.db)
            .await?;

        Ok(identity.map(Identity::from))
    }

    /// Deferred email-confirmation event. Idempotent: confirming an already
    /// confirmed identity keeps the original timestamp.
    pub async fn confirm_email(&self, identity_id: Uuid) -> Result<Identity, AuthError> {
        let Some(record) = IdentityEntity::find_by_id(identity_id).one(&*self.db).await? else {
            return Err(AuthError::InvalidCredentials);
        };

        if record.email_confirmed_at.is_some() {
            return Ok(record.into());
        }

        let mut active: identity::ActiveModel = record.into();
        active.email_confirmed_at = Set(Some(Utc::now()));
        let updated = active.update(&*self.db).await?;

        info!(identity_id = %updated.id, "Email confirmed");
        Ok(updated.into())
    }

    async fn create_session(&self, identity_id: Uuid) -> Result<Session, AuthError> {
        let row = session::ActiveModel {
            token: Set(Uuid::new_v4()),
            identity_id: Set(identity_id),
            created_at: Set(Utc::now()),
        }
        .insert(&*self.db)
        .await?;

        Ok(Session {
            token: row.token,
            identity_id: row.identity_id,
        })
    }
}

fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

fn verify_password(password: &str, stored_hash: &str) -> Result<bool, AuthError> {
    let parsed = PasswordHash::new(stored_hash).map_err(|e| AuthError::Hash(e.to_string()))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}
