//! Reel Core
//!
//! Engine for a short-video sharing client: identity and profile
//! synchronization, feed queries, and the engagement (likes) ledger.
//! Screens and playback live in the app shells; they consume this crate
//! through `Core` and the domain services it wires together.

pub mod auth;
pub mod config;
pub mod content;
pub mod engagement;
pub mod infrastructure;
pub mod profile;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use tracing::info;

use crate::auth::AuthService;
use crate::config::AppConfig;
use crate::content::ContentRepository;
use crate::engagement::EngagementLedger;
use crate::infrastructure::blobs::{BlobStore, FsBlobStore};
use crate::infrastructure::database::Database;
use crate::profile::ProfileSynchronizer;

/// Top-level handle owning the database, blob store, and domain services.
pub struct Core {
    pub config: AppConfig,
    pub database: Arc<Database>,
    pub auth: AuthService,
    pub profiles: ProfileSynchronizer,
    pub content: ContentRepository,
    pub engagement: EngagementLedger,
}

impl Core {
    /// Initialize the core in the given data directory, creating the
    /// database and config file on first run.
    pub async fn new(data_dir: PathBuf) -> Result<Self> {
        let config = AppConfig::load_or_create(&data_dir)?;

        let db_path = data_dir.join("reel.db");
        let database = Arc::new(Database::create(&db_path).await?);
        database.migrate().await?;

        let conn = Arc::new(database.conn().clone());

        let blobs: Arc<dyn BlobStore> = Arc::new(FsBlobStore::new(
            data_dir.join("blobs"),
            config.public_base_url.clone(),
        ));

        let auth = AuthService::new(conn.clone(), config.require_email_confirmation);
        let profiles = ProfileSynchronizer::new(conn.clone(), config.avatar_url_template.clone());
        let content = ContentRepository::new(conn.clone(), blobs);
        let engagement = EngagementLedger::new(conn);

        info!("Core initialized with data dir {:?}", data_dir);

        Ok(Self {
            config,
            database,
            auth,
            profiles,
            content,
            engagement,
        })
    }
}

/// Install a global tracing subscriber honoring `RUST_LOG`.
///
/// Embedders call this once at startup; safe to call again (subsequent
/// calls are ignored).
pub fn init_logging(default_filter: &str) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.to_string()));

    let _ = tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .try_init();
}
