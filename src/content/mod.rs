//! Content repository: feed queries and post creation
//!
//! Every list-producing query converges on the same [`FeedItem`]
//! projection, so the four list views consume identical shapes no matter
//! which query path produced them. A video whose creator no longer
//! resolves is a join-miss and is silently excluded, never an error.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Select, Set,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::infrastructure::blobs::{blob_name, BlobStore};
use crate::infrastructure::database::entities::{
    profile, video, Profile as ProfileEntity, Video as VideoEntity,
};

/// Default row cap for the trending rail.
pub const DEFAULT_LATEST_LIMIT: u64 = 7;

const THUMBNAIL_BUCKET: &str = "thumbnails";
const VIDEO_BUCKET: &str = "videos";

/// Content repository errors
#[derive(Error, Debug)]
pub enum RepositoryError {
    /// One or both media uploads failed; the post was not created
    #[error("Upload failed: {0}")]
    Upload(String),

    /// A freshly inserted video could not be re-read with its creator
    #[error("Video {0} has no resolvable creator")]
    CreatorMissing(i32),

    /// Database error, backend message preserved
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Creator slice embedded in every feed item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedCreator {
    pub id: Uuid,
    pub username: Option<String>,
    pub avatar: Option<String>,
}

/// The canonical joined shape consumed by every list view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: i32,
    pub title: String,
    pub thumbnail: String,
    pub video: String,
    pub prompt: String,
    pub created_at: DateTime<Utc>,
    pub creator: FeedCreator,
}

impl FeedItem {
    pub(crate) fn project(video: video::Model, creator: profile::Model) -> Self {
        Self {
            id: video.id,
            title: video.title,
            thumbnail: video.thumbnail_url,
            video: video.video_url,
            prompt: video.prompt,
            created_at: video.created_at,
            creator: FeedCreator {
                id: creator.id,
                username: creator.username,
                avatar: creator.avatar_url,
            },
        }
    }
}

/// A media payload handed in by the create screen.
#[derive(Debug, Clone)]
pub struct MediaPayload {
    pub bytes: Vec<u8>,
    pub content_type: String,
}

/// Input for [`ContentRepository::create_post`].
#[derive(Debug, Clone)]
pub struct NewPost {
    pub title: String,
    pub prompt: String,
    pub thumbnail: MediaPayload,
    pub video: MediaPayload,
    pub creator_id: Uuid,
}

pub struct ContentRepository {
    db: Arc<DatabaseConnection>,
    blobs: Arc<dyn BlobStore>,
}

impl ContentRepository {
    pub fn new(db: Arc<DatabaseConnection>, blobs: Arc<dyn BlobStore>) -> Self {
        Self { db, blobs }
    }

    /// All videos, newest first.
    pub async fn list_all(&self) -> Result<Vec<FeedItem>, RepositoryError> {
        self.feed_query(VideoEntity::find()).await
    }

    /// Videos by a single creator, newest first.
    pub async fn list_by_creator(&self, creator_id: Uuid) -> Result<Vec<FeedItem>, RepositoryError> {
        self.feed_query(VideoEntity::find().filter(video::Column::Creator.eq(creator_id)))
            .await
    }

    /// The `n` newest videos (defaults to [`DEFAULT_LATEST_LIMIT`]).
    pub async fn list_latest(&self, limit: Option<u64>) -> Result<Vec<FeedItem>, RepositoryError> {
        let limit = limit.unwrap_or(DEFAULT_LATEST_LIMIT);
        let rows = VideoEntity::find()
            .find_also_related(ProfileEntity)
            .order_by_desc(video::Column::CreatedAt)
            .limit(limit)
            .all(&*self.db)
            .await?;
        Ok(Self::project_rows(rows))
    }

    /// Case-insensitive substring match on the title, newest first.
    pub async fn search(&self, title_substring: &str) -> Result<Vec<FeedItem>, RepositoryError> {
        self.feed_query(
            VideoEntity::find().filter(video::Column::Title.contains(title_substring)),
        )
        .await
    }

    /// Single video with its creator; `None` for a missing video or a
    /// join-miss, consistent with the list queries.
    pub async fn get_by_id(&self, video_id: i32) -> Result<Option<FeedItem>, RepositoryError> {
        let row = VideoEntity::find_by_id(video_id)
            .find_also_related(ProfileEntity)
            .one(&*self.db)
            .await?;

        Ok(row.and_then(|(video, creator)| creator.map(|c| FeedItem::project(video, c))))
    }

    /// Upload both media payloads concurrently, insert the video row, and
    /// re-fetch the joined shape so the caller immediately holds a full
    /// [`FeedItem`]. If either upload fails no row is created, and both
    /// failures are reported rather than one masking the other.
    pub async fn create_post(&self, post: NewPost) -> Result<FeedItem, RepositoryError> {
        let NewPost {
            title,
            prompt,
            thumbnail,
            video: video_payload,
            creator_id,
        } = post;

        let thumb_name = blob_name(&thumbnail.bytes, &thumbnail.content_type);
        let video_name = blob_name(&video_payload.bytes, &video_payload.content_type);

        let (thumb_result, video_result) = tokio::join!(
            self.blobs.upload(
                THUMBNAIL_BUCKET,
                &thumb_name,
                thumbnail.bytes,
                &thumbnail.content_type,
            ),
            self.blobs.upload(
                VIDEO_BUCKET,
                &video_name,
                video_payload.bytes,
                &video_payload.content_type,
            ),
        );

        let (thumb_path, video_path) = match (thumb_result, video_result) {
            (Ok(thumb_path), Ok(video_path)) => (thumb_path, video_path),
            (thumb_result, video_result) => {
                let mut failures = Vec::new();
                if let Err(e) = thumb_result {
                    failures.push(format!("thumbnail: {}", e));
                }
                if let Err(e) = video_result {
                    failures.push(format!("video: {}", e));
                }
                return Err(RepositoryError::Upload(failures.join("; ")));
            }
        };

        let inserted = video::ActiveModel {
            title: Set(title),
            thumbnail_url: Set(self.blobs.public_url(THUMBNAIL_BUCKET, &thumb_path)),
            video_url: Set(self.blobs.public_url(VIDEO_BUCKET, &video_path)),
            prompt: Set(prompt),
            creator: Set(creator_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        }
        .insert(&*self.db)
        .await?;

        info!(video_id = inserted.id, creator = %creator_id, "Video post created");

        let id = inserted.id;
        self.get_by_id(id)
            .await?
            .ok_or(RepositoryError::CreatorMissing(id))
    }

    async fn feed_query(
        &self,
        query: Select<VideoEntity>,
    ) -> Result<Vec<FeedItem>, RepositoryError> {
        let rows = query
            .find_also_related(ProfileEntity)
            .order_by_desc(video::Column::CreatedAt)
            .all(&*self.db)
            .await?;
        Ok(Self::project_rows(rows))
    }

    fn project_rows(rows: Vec<(video::Model, Option<profile::Model>)>) -> Vec<FeedItem> {
        let total = rows.len();
        let items: Vec<FeedItem> = rows
            .into_iter()
            .filter_map(|(video, creator)| creator.map(|c| FeedItem::project(video, c)))
            .collect();

        if items.len() < total {
            debug!(dropped = total - items.len(), "Dropped join-miss rows from feed");
        }
        items
    }
}
