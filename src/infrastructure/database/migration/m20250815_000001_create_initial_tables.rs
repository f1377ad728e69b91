//! Initial migration to create all tables

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Identities: the auth provider's principals plus signup metadata
        manager
            .create_table(
                Table::create()
                    .table(Identities::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Identities::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Identities::Email).string().not_null().unique_key())
                    .col(ColumnDef::new(Identities::PasswordHash).string().not_null())
                    .col(ColumnDef::new(Identities::Username).string())
                    .col(ColumnDef::new(Identities::FullName).string())
                    .col(ColumnDef::new(Identities::EmailConfirmedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(Identities::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Sessions::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sessions::Token).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Sessions::IdentityId).uuid().not_null())
                    .col(ColumnDef::new(Sessions::CreatedAt).timestamp_with_time_zone().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .from(Sessions::Table, Sessions::IdentityId)
                            .to(Identities::Table, Identities::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        // Profiles: primary key doubles as the uniqueness backstop for the
        // synchronizer's check-then-insert path
        manager
            .create_table(
                Table::create()
                    .table(Profiles::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Profiles::Id).uuid().not_null().primary_key())
                    .col(ColumnDef::new(Profiles::Username).string())
                    .col(ColumnDef::new(Profiles::FullName).string())
                    .col(ColumnDef::new(Profiles::AvatarUrl).string())
                    .col(ColumnDef::new(Profiles::CreatedAt).timestamp_with_time_zone().not_null())
                    .col(ColumnDef::new(Profiles::UpdatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // Videos: creator intentionally carries no foreign key so that a
        // join-miss remains representable (excluded from feeds, not an error)
        manager
            .create_table(
                Table::create()
                    .table(Videos::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Videos::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Videos::Title).string().not_null())
                    .col(ColumnDef::new(Videos::ThumbnailUrl).string().not_null())
                    .col(ColumnDef::new(Videos::VideoUrl).string().not_null())
                    .col(ColumnDef::new(Videos::Prompt).string().not_null())
                    .col(ColumnDef::new(Videos::Creator).uuid().not_null())
                    .col(ColumnDef::new(Videos::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_videos_creator")
                    .table(Videos::Table)
                    .col(Videos::Creator)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_videos_created_at")
                    .table(Videos::Table)
                    .col(Videos::CreatedAt)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Likes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Likes::Id).integer().not_null().auto_increment().primary_key())
                    .col(ColumnDef::new(Likes::UserId).uuid().not_null())
                    .col(ColumnDef::new(Likes::VideoId).integer().not_null())
                    .col(ColumnDef::new(Likes::CreatedAt).timestamp_with_time_zone().not_null())
                    .to_owned(),
            )
            .await?;

        // The authoritative guard behind concurrent like toggles
        manager
            .create_index(
                Index::create()
                    .name("idx_likes_user_video")
                    .table(Likes::Table)
                    .col(Likes::UserId)
                    .col(Likes::VideoId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_likes_video")
                    .table(Likes::Table)
                    .col(Likes::VideoId)
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Likes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Videos::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Profiles::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sessions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Identities::Table).to_owned())
            .await?;
        Ok(())
    }
}

#[derive(DeriveIden)]
enum Identities {
    Table,
    Id,
    Email,
    PasswordHash,
    Username,
    FullName,
    EmailConfirmedAt,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Sessions {
    Table,
    Token,
    IdentityId,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Profiles {
    Table,
    Id,
    Username,
    FullName,
    AvatarUrl,
    CreatedAt,
    UpdatedAt,
}

#[derive(DeriveIden)]
enum Videos {
    Table,
    Id,
    Title,
    ThumbnailUrl,
    VideoUrl,
    Prompt,
    Creator,
    CreatedAt,
}

#[derive(DeriveIden)]
enum Likes {
    Table,
    Id,
    UserId,
    VideoId,
    CreatedAt,
}
