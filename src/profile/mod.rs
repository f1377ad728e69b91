//! Profile synchronization
//!
//! Guarantees exactly one fully-populated profile row per confirmed
//! identity, even though creation can be triggered from three independent
//! call sites (right after signup, on the deferred email-confirmation
//! event, and opportunistically on next app load) racing each other.
//! There is no client-side lock: correctness comes from the
//! check-then-insert-then-recheck sequence plus the primary-key constraint
//! on `profiles.id` as the storage-level backstop.

use std::sync::Arc;

use chrono::Utc;
use sea_orm::{ActiveModelTrait, DatabaseConnection, EntityTrait, Set, SqlErr};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::Identity;
use crate::infrastructure::database::entities::{profile, Profile as ProfileEntity};

/// Profile synchronization errors
#[derive(Error, Debug)]
pub enum ProfileSyncError {
    /// No profile row for this id (explicit edits only; the synchronizer
    /// itself treats a missing row as the signal to create one)
    #[error("Profile not found: {0}")]
    NotFound(Uuid),

    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Fields applied by an explicit profile edit.
#[derive(Debug, Clone, Default)]
pub struct ProfileUpdate {
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
}

pub struct ProfileSynchronizer {
    db: Arc<DatabaseConnection>,
    avatar_url_template: String,
}

impl ProfileSynchronizer {
    pub fn new(db: Arc<DatabaseConnection>, avatar_url_template: String) -> Self {
        Self {
            db,
            avatar_url_template,
        }
    }

    /// Ensure the identity has exactly one fully-populated profile row.
    ///
    /// Returns `None` (not an error) when there is no identity or its email
    /// is unconfirmed: no profile may exist before confirmation. Idempotent
    /// and safe to call concurrently from every entry point; at most one
    /// row mutation happens per call.
    pub async fn ensure_profile(
        &self,
        identity: Option<&Identity>,
    ) -> Result<Option<profile::Model>, ProfileSyncError> {
        let Some(identity) = identity else {
            return Ok(None);
        };
        if identity.email_confirmed_at.is_none() {
            debug!(identity_id = %identity.id, "Email not confirmed yet, skipping profile sync");
            return Ok(None);
        }

        if let Some(existing) = self.find(identity.id).await? {
            if !existing.is_partial() {
                return Ok(Some(existing));
            }
            warn!(identity_id = %identity.id, "Partial profile row found, repairing");
            return Ok(Some(self.repair(existing, identity).await?));
        }

        let (username, full_name) = derive_names(identity);
        let created = self.create(identity.id, username, full_name).await?;
        Ok(Some(created))
    }

    /// Fetch a profile by identity id.
    pub async fn get_profile(&self, user_id: Uuid) -> Result<Option<profile::Model>, ProfileSyncError> {
        self.find(user_id).await
    }

    /// Explicit profile edit; bumps `updated_at`.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        updates: ProfileUpdate,
    ) -> Result<profile::Model, ProfileSyncError> {
        let Some(existing) = self.find(user_id).await? else {
            return Err(ProfileSyncError::NotFound(user_id));
        };

        let mut active: profile::ActiveModel = existing.into();
        if let Some(username) = updates.username {
            active.username = Set(Some(username));
        }
        if let Some(full_name) = updates.full_name {
            active.full_name = Set(Some(full_name));
        }
        if let Some(avatar_url) = updates.avatar_url {
            active.avatar_url = Set(Some(avatar_url));
        }
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    async fn find(&self, id: Uuid) -> Result<Option<profile::Model>, ProfileSyncError> {
        Ok(ProfileEntity::find_by_id(id).one(&*self.db).await?)
    }

    /// Repair path for a partial row: a full overwrite of both name fields
    /// plus avatar and `updated_at`, not a merge. The username falls back to
    /// the email local-part, the full name to the username.
    async fn repair(
        &self,
        existing: profile::Model,
        identity: &Identity,
    ) -> Result<profile::Model, ProfileSyncError> {
        let username = existing
            .username
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| email_local_part(&identity.email))
            .unwrap_or_else(|| "user".to_string());
        let full_name = existing
            .full_name
            .clone()
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| username.clone());

        let mut active: profile::ActiveModel = existing.into();
        active.avatar_url = Set(Some(self.avatar_url(&username)));
        active.username = Set(Some(username));
        active.full_name = Set(Some(full_name));
        active.updated_at = Set(Utc::now());

        Ok(active.update(&*self.db).await?)
    }

    /// Creation path. Re-checks existence immediately before inserting so a
    /// normal concurrent creation collapses to returning the winner's row;
    /// the primary-key constraint catches the remaining window, and that
    /// violation is likewise resolved by re-reading rather than surfaced.
    pub(crate) async fn create(
        &self,
        id: Uuid,
        username: String,
        full_name: String,
    ) -> Result<profile::Model, ProfileSyncError> {
        if let Some(existing) = self.find(id).await? {
            debug!(identity_id = %id, "Profile appeared concurrently before insert");
            return Ok(existing);
        }

        let now = Utc::now();
        let model = profile::ActiveModel {
            id: Set(id),
            avatar_url: Set(Some(self.avatar_url(&username))),
            username: Set(Some(username)),
            full_name: Set(Some(full_name)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        match model.insert(&*self.db).await {
            Ok(created) => {
                info!(identity_id = %id, "Profile created");
                Ok(created)
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                debug!(identity_id = %id, "Lost profile creation race, returning existing row");
                self.find(id)
                    .await?
                    .ok_or(ProfileSyncError::NotFound(id))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn avatar_url(&self, username: &str) -> String {
        self.avatar_url_template.replace("{username}", username)
    }
}

/// Username from signup metadata, falling back to the email local-part,
/// then to a fixed placeholder; full name falls back to the username.
fn derive_names(identity: &Identity) -> (String, String) {
    let username = identity
        .metadata
        .username
        .clone()
        .filter(|s| !s.is_empty())
        .or_else(|| email_local_part(&identity.email))
        .unwrap_or_else(|| "user".to_string());
    let full_name = identity
        .metadata
        .full_name
        .clone()
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| username.clone());
    (username, full_name)
}

fn email_local_part(email: &str) -> Option<String> {
    email
        .split('@')
        .next()
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
