//! Content repository: feed projection, ordering, search, post creation.

mod helpers;

use chrono::{Duration, Utc};
use uuid::Uuid;

use helpers::{seed_profile, seed_video, test_app};
use reel_core::content::{MediaPayload, NewPost, RepositoryError};

fn payload(bytes: &[u8], content_type: &str) -> MediaPayload {
    MediaPayload {
        bytes: bytes.to_vec(),
        content_type: content_type.to_string(),
    }
}

#[tokio::test]
async fn every_list_query_produces_the_same_projection() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;
    let cats = seed_video(&app.conn, "Cats", amy, Utc::now()).await;

    let from_all = app.content.list_all().await.unwrap();
    let from_creator = app.content.list_by_creator(amy).await.unwrap();
    let from_latest = app.content.list_latest(None).await.unwrap();
    let from_search = app.content.search("Cats").await.unwrap();
    let from_get = app.content.get_by_id(cats.id).await.unwrap().unwrap();

    assert_eq!(from_all.len(), 1);
    assert_eq!(from_all[0], from_creator[0]);
    assert_eq!(from_all[0], from_latest[0]);
    assert_eq!(from_all[0], from_search[0]);
    assert_eq!(from_all[0], from_get);

    let item = &from_all[0];
    assert_eq!(item.id, cats.id);
    assert_eq!(item.title, "Cats");
    assert_eq!(item.creator.id, amy);
    assert_eq!(item.creator.username.as_deref(), Some("amy"));
}

#[tokio::test]
async fn feeds_are_newest_first() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;

    let t0 = Utc::now() - Duration::hours(1);
    seed_video(&app.conn, "Oldest", amy, t0).await;
    seed_video(&app.conn, "Middle", amy, t0 + Duration::minutes(10)).await;
    seed_video(&app.conn, "Newest", amy, t0 + Duration::minutes(20)).await;

    let feed = app.content.list_all().await.unwrap();
    let titles: Vec<&str> = feed.iter().map(|item| item.title.as_str()).collect();
    assert_eq!(titles, vec!["Newest", "Middle", "Oldest"]);
}

#[tokio::test]
async fn latest_caps_at_the_requested_limit() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;

    let t0 = Utc::now() - Duration::hours(1);
    seed_video(&app.conn, "Cats", amy, t0).await;
    let dogs = seed_video(&app.conn, "Dogs", amy, t0 + Duration::minutes(5)).await;

    let latest = app.content.list_latest(Some(1)).await.unwrap();
    assert_eq!(latest.len(), 1);
    assert_eq!(latest[0].id, dogs.id);
    assert_eq!(latest[0].title, "Dogs");
}

#[tokio::test]
async fn default_latest_limit_is_seven() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;

    let t0 = Utc::now() - Duration::hours(1);
    for i in 0..10 {
        seed_video(&app.conn, &format!("Clip {}", i), amy, t0 + Duration::minutes(i)).await;
    }

    let latest = app.content.list_latest(None).await.unwrap();
    assert_eq!(latest.len(), 7);
    assert_eq!(latest[0].title, "Clip 9");
}

#[tokio::test]
async fn search_is_a_case_insensitive_substring_match() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;

    let t0 = Utc::now() - Duration::minutes(10);
    seed_video(&app.conn, "Cats", amy, t0).await;
    seed_video(&app.conn, "Dogs", amy, t0 + Duration::minutes(1)).await;

    for query in ["at", "AT", "cats"] {
        let hits = app.content.search(query).await.unwrap();
        assert_eq!(hits.len(), 1, "query {:?}", query);
        assert_eq!(hits[0].title, "Cats");
    }

    assert!(app.content.search("zebra").await.unwrap().is_empty());
}

#[tokio::test]
async fn join_misses_are_excluded_everywhere() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    let ghost = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;

    let t0 = Utc::now() - Duration::minutes(10);
    seed_video(&app.conn, "Visible", amy, t0).await;
    let orphan = seed_video(&app.conn, "Orphan clip", ghost, t0 + Duration::minutes(1)).await;

    let all = app.content.list_all().await.unwrap();
    assert_eq!(all.len(), 1);
    assert_eq!(all[0].title, "Visible");

    assert!(app.content.list_by_creator(ghost).await.unwrap().is_empty());
    assert_eq!(app.content.list_latest(None).await.unwrap().len(), 1);
    assert!(app.content.search("Orphan").await.unwrap().is_empty());
    assert!(app.content.get_by_id(orphan.id).await.unwrap().is_none());
}

#[tokio::test]
async fn get_by_id_for_missing_video_is_none() {
    let app = test_app().await;
    assert!(app.content.get_by_id(404).await.unwrap().is_none());
}

#[tokio::test]
async fn create_post_returns_a_fully_shaped_item() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;

    let item = app
        .content
        .create_post(NewPost {
            title: "My first clip".to_string(),
            prompt: "a cat surfing".to_string(),
            thumbnail: payload(b"jpeg bytes", "image/jpeg"),
            video: payload(b"mp4 bytes", "video/mp4"),
            creator_id: amy,
        })
        .await
        .unwrap();

    assert_eq!(item.title, "My first clip");
    assert_eq!(item.prompt, "a cat surfing");
    assert!(item.thumbnail.starts_with("http://cdn.test/storage/thumbnails/"));
    assert!(item.thumbnail.ends_with(".jpg"));
    assert!(item.video.starts_with("http://cdn.test/storage/videos/"));
    assert!(item.video.ends_with(".mp4"));
    assert_eq!(item.creator.username.as_deref(), Some("amy"));

    // The row is immediately visible through the normal read path
    let fetched = app.content.get_by_id(item.id).await.unwrap().unwrap();
    assert_eq!(fetched, item);
}

#[tokio::test]
async fn failed_uploads_prevent_the_post_and_report_both_failures() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;

    // Empty payloads make both uploads fail
    let err = app
        .content
        .create_post(NewPost {
            title: "Broken".to_string(),
            prompt: "nothing".to_string(),
            thumbnail: payload(b"", "image/jpeg"),
            video: payload(b"", "video/mp4"),
            creator_id: amy,
        })
        .await
        .unwrap_err();

    match err {
        RepositoryError::Upload(message) => {
            assert!(message.contains("thumbnail:"), "got: {}", message);
            assert!(message.contains("video:"), "got: {}", message);
        }
        other => panic!("expected upload error, got {:?}", other),
    }

    assert!(app.content.list_all().await.unwrap().is_empty());
}

#[tokio::test]
async fn one_failed_upload_is_enough_to_abort() {
    let app = test_app().await;
    let amy = Uuid::new_v4();
    seed_profile(&app.conn, amy, "amy").await;

    let err = app
        .content
        .create_post(NewPost {
            title: "Half broken".to_string(),
            prompt: "thumbnail only".to_string(),
            thumbnail: payload(b"jpeg bytes", "image/jpeg"),
            video: payload(b"", "video/mp4"),
            creator_id: amy,
        })
        .await
        .unwrap_err();

    match err {
        RepositoryError::Upload(message) => {
            assert!(message.contains("video:"), "got: {}", message);
            assert!(!message.contains("thumbnail:"), "got: {}", message);
        }
        other => panic!("expected upload error, got {:?}", other),
    }

    assert!(app.content.list_all().await.unwrap().is_empty());
}
