//! Profile entity: application-level user record keyed by identity id

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "profiles")]
pub struct Model {
    /// Equal to the identity id that owns this profile
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    // Nullable: rows created before signup metadata propagated can be
    // partial; the synchronizer repairs them.
    pub username: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::video::Entity")]
    Video,
}

impl Related<super::video::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Video.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// A profile is partial when either name field is missing or empty.
    pub fn is_partial(&self) -> bool {
        fn blank(field: &Option<String>) -> bool {
            field.as_deref().map_or(true, |s| s.is_empty())
        }
        blank(&self.username) || blank(&self.full_name)
    }
}
