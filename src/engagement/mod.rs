//! Engagement ledger: the likes relation
//!
//! Toggle semantics are check-then-act with a known race: two concurrent
//! toggles can both observe "absent" and both insert. The unique index on
//! `(user_id, video_id)` is the authoritative guard; a violation on insert
//! means someone else already liked it and is re-resolved to
//! `liked: true`, never surfaced as an error.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, ModelTrait, PaginatorTrait,
    QueryFilter, QueryOrder, QuerySelect, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::content::FeedItem;
use crate::infrastructure::database::entities::{
    like, video, Like as LikeEntity, Profile as ProfileEntity, Video as VideoEntity,
};

/// Engagement ledger errors
#[derive(Error, Debug)]
pub enum LedgerError {
    /// Database error, backend message preserved
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Outcome of a like toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LikeToggle {
    pub liked: bool,
}

pub struct EngagementLedger {
    db: Arc<DatabaseConnection>,
}

impl EngagementLedger {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    /// Flip the like state for `(user_id, video_id)`.
    ///
    /// Sequential calls always alternate; a lost insert race reports
    /// `liked: true` instead of erroring.
    pub async fn toggle_like(
        &self,
        user_id: Uuid,
        video_id: i32,
    ) -> Result<LikeToggle, LedgerError> {
        let existing = LikeEntity::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::VideoId.eq(video_id))
            .one(&*self.db)
            .await?;

        if let Some(row) = existing {
            row.delete(&*self.db).await?;
            debug!(%user_id, video_id, "Like removed");
            return Ok(LikeToggle { liked: false });
        }

        self.insert_like(user_id, video_id).await
    }

    /// Existence check. An unauthenticated caller is simply "not liked",
    /// never an error.
    pub async fn is_liked(
        &self,
        user_id: Option<Uuid>,
        video_id: i32,
    ) -> Result<bool, LedgerError> {
        let Some(user_id) = user_id else {
            return Ok(false);
        };

        let count = LikeEntity::find()
            .filter(like::Column::UserId.eq(user_id))
            .filter(like::Column::VideoId.eq(video_id))
            .count(&*self.db)
            .await?;
        Ok(count > 0)
    }

    /// Likes for a single video; zero for an unknown video.
    pub async fn like_count(&self, video_id: i32) -> Result<u64, LedgerError> {
        Ok(LikeEntity::find()
            .filter(like::Column::VideoId.eq(video_id))
            .count(&*self.db)
            .await?)
    }

    /// Like counts for a whole id set in one grouped query, so list views
    /// do not fan out one round trip per item. Videos with no likes are
    /// absent from the map.
    pub async fn like_counts(&self, video_ids: &[i32]) -> Result<HashMap<i32, u64>, LedgerError> {
        if video_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows: Vec<(i32, i64)> = LikeEntity::find()
            .select_only()
            .column(like::Column::VideoId)
            .column_as(like::Column::Id.count(), "count")
            .filter(like::Column::VideoId.is_in(video_ids.iter().copied()))
            .group_by(like::Column::VideoId)
            .into_tuple()
            .all(&*self.db)
            .await?;

        Ok(rows.into_iter().map(|(id, n)| (id, n as u64)).collect())
    }

    /// Videos the user has liked, most recently liked first.
    ///
    /// Two-step fetch: the like rows fix the order, the batch video fetch
    /// supplies the joined shape. The join does not preserve like order, so
    /// the items are re-sorted against the like list before returning;
    /// join-misses are dropped.
    pub async fn liked_videos(&self, user_id: Uuid) -> Result<Vec<FeedItem>, LedgerError> {
        let likes = LikeEntity::find()
            .filter(like::Column::UserId.eq(user_id))
            .order_by_desc(like::Column::CreatedAt)
            .all(&*self.db)
            .await?;

        if likes.is_empty() {
            return Ok(Vec::new());
        }

        let ordered_ids: Vec<i32> = likes.into_iter().map(|l| l.video_id).collect();

        let rows = VideoEntity::find()
            .filter(video::Column::Id.is_in(ordered_ids.iter().copied()))
            .find_also_related(ProfileEntity)
            .all(&*self.db)
            .await?;

        let mut by_id: HashMap<i32, FeedItem> = rows
            .into_iter()
            .filter_map(|(video, creator)| {
                creator.map(|c| (video.id, FeedItem::project(video, c)))
            })
            .collect();

        Ok(ordered_ids
            .into_iter()
            .filter_map(|id| by_id.remove(&id))
            .collect())
    }

    /// Insert path of the toggle, isolated so the constraint
    /// reinterpretation is testable on its own.
    pub(crate) async fn insert_like(
        &self,
        user_id: Uuid,
        video_id: i32,
    ) -> Result<LikeToggle, LedgerError> {
        let model = like::ActiveModel {
            user_id: Set(user_id),
            video_id: Set(video_id),
            created_at: Set(Utc::now()),
            ..Default::default()
        };

        match model.insert(&*self.db).await {
            Ok(_) => {
                debug!(%user_id, video_id, "Like recorded");
                Ok(LikeToggle { liked: true })
            }
            Err(e) if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) => {
                // Someone else already liked it; resolve, don't error
                debug!(%user_id, video_id, "Lost like insert race");
                Ok(LikeToggle { liked: true })
            }
            Err(e) => Err(e.into()),
        }
    }
}
