//! Shared fixtures: a migrated throwaway database plus wired services

// Not every test binary uses every fixture
#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tempfile::TempDir;
use uuid::Uuid;

use reel_core::auth::{AuthService, Identity, IdentityMetadata};
use reel_core::content::ContentRepository;
use reel_core::engagement::EngagementLedger;
use reel_core::infrastructure::blobs::FsBlobStore;
use reel_core::infrastructure::database::entities::{like, profile, video};
use reel_core::infrastructure::database::Database;
use reel_core::profile::ProfileSynchronizer;

pub const AVATAR_TEMPLATE: &str = "https://ui-avatars.com/api/?name={username}&background=random";

pub struct TestApp {
    pub conn: Arc<DatabaseConnection>,
    pub auth: AuthService,
    pub profiles: ProfileSynchronizer,
    pub content: ContentRepository,
    pub engagement: EngagementLedger,
    // Held so the database and blob files outlive the test body
    _dir: TempDir,
}

pub async fn test_app() -> TestApp {
    test_app_with(true).await
}

pub async fn test_app_with(require_email_confirmation: bool) -> TestApp {
    let dir = TempDir::new().unwrap();
    let db = Database::create(&dir.path().join("test.db")).await.unwrap();
    db.migrate().await.unwrap();

    let conn = Arc::new(db.conn().clone());
    let blobs = Arc::new(FsBlobStore::new(
        dir.path().join("blobs"),
        "http://cdn.test".to_string(),
    ));

    TestApp {
        auth: AuthService::new(conn.clone(), require_email_confirmation),
        profiles: ProfileSynchronizer::new(conn.clone(), AVATAR_TEMPLATE.to_string()),
        content: ContentRepository::new(conn.clone(), blobs),
        engagement: EngagementLedger::new(conn.clone()),
        conn,
        _dir: dir,
    }
}

/// A confirmed identity that never went through the auth service.
pub fn confirmed_identity(email: &str, username: Option<&str>, full_name: Option<&str>) -> Identity {
    Identity {
        id: Uuid::new_v4(),
        email: email.to_string(),
        email_confirmed_at: Some(Utc::now()),
        metadata: IdentityMetadata {
            username: username.map(str::to_string),
            full_name: full_name.map(str::to_string),
        },
    }
}

pub async fn seed_profile(conn: &DatabaseConnection, id: Uuid, username: &str) -> profile::Model {
    let now = Utc::now();
    profile::ActiveModel {
        id: Set(id),
        username: Set(Some(username.to_string())),
        full_name: Set(Some(username.to_string())),
        avatar_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn seed_partial_profile(conn: &DatabaseConnection, id: Uuid) -> profile::Model {
    let now = Utc::now();
    profile::ActiveModel {
        id: Set(id),
        username: Set(None),
        full_name: Set(None),
        avatar_url: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn seed_video(
    conn: &DatabaseConnection,
    title: &str,
    creator: Uuid,
    created_at: DateTime<Utc>,
) -> video::Model {
    video::ActiveModel {
        title: Set(title.to_string()),
        thumbnail_url: Set(format!("http://cdn.test/storage/thumbnails/{}.jpg", title)),
        video_url: Set(format!("http://cdn.test/storage/videos/{}.mp4", title)),
        prompt: Set(format!("prompt for {}", title)),
        creator: Set(creator),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}

pub async fn seed_like(
    conn: &DatabaseConnection,
    user_id: Uuid,
    video_id: i32,
    created_at: DateTime<Utc>,
) -> like::Model {
    like::ActiveModel {
        user_id: Set(user_id),
        video_id: Set(video_id),
        created_at: Set(created_at),
        ..Default::default()
    }
    .insert(conn)
    .await
    .unwrap()
}
