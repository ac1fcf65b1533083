//! Integration tests for database operations.

use serde_json::json;
use tempfile::TempDir;
use weibo_archiver::db::{
    count_posts, count_replies, get_post, get_reply, list_posts, list_replies_for_post,
    upsert_post, upsert_reply, Database, Post, Reply,
};

async fn setup_db() -> (Database, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.sqlite");
    let db = Database::new(&db_path)
        .await
        .expect("Failed to create database");
    (db, temp_dir)
}

fn sample_post(id: &str, epoch: f64) -> Post {
    Post {
        id: id.to_string(),
        text: format!("text of {id}"),
        created_at_raw: "Sun Nov 30 12:46:08 +0800 2025".to_string(),
        created_at_epoch: epoch,
        reposts_count: 1,
        comments_count: 2,
        attitudes_count: 3,
        image_urls: vec!["https://wx1.sinaimg.cn/large/a.jpg".to_string()],
        raw_payload: json!({"id": id, "text": format!("text of {id}")}),
    }
}

fn sample_reply(id: &str, post_id: &str) -> Reply {
    Reply {
        id: id.to_string(),
        post_id: post_id.to_string(),
        commenter_name: "fan".to_string(),
        commenter_text: "great".to_string(),
        commenter_created_at: "10 mins ago".to_string(),
        reply_text: Some("thanks".to_string()),
        reply_created_at: Some("5 mins ago".to_string()),
    }
}

async fn read_json_columns(db: &Database, id: &str) -> (String, String) {
    sqlx::query_as("SELECT image_urls, raw_payload FROM posts WHERE id = ?")
        .bind(id)
        .fetch_one(db.pool())
        .await
        .unwrap()
}

#[tokio::test]
async fn test_upsert_and_get_post() {
    let (db, _temp_dir) = setup_db().await;

    let post = sample_post("5001", 1_764_477_968.0);
    upsert_post(db.pool(), &post)
        .await
        .expect("Failed to insert post");

    let retrieved = get_post(db.pool(), "5001")
        .await
        .expect("Failed to get post")
        .expect("Post not found");

    assert_eq!(retrieved, post);
    assert!(get_post(db.pool(), "missing").await.unwrap().is_none());
}

#[tokio::test]
async fn test_upsert_post_replaces_all_fields() {
    let (db, _temp_dir) = setup_db().await;

    upsert_post(db.pool(), &sample_post("5001", 100.0))
        .await
        .unwrap();

    let updated = Post {
        text: "edited".to_string(),
        reposts_count: 50,
        comments_count: 60,
        attitudes_count: 70,
        image_urls: Vec::new(),
        raw_payload: json!({"id": "5001", "text": "edited"}),
        ..sample_post("5001", 200.0)
    };
    upsert_post(db.pool(), &updated).await.unwrap();

    let retrieved = get_post(db.pool(), "5001").await.unwrap().unwrap();
    assert_eq!(retrieved, updated);
    assert_eq!(count_posts(db.pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_repeated_upsert_is_byte_identical() {
    let (db, _temp_dir) = setup_db().await;
    let post = sample_post("5001", 1_764_477_968.0);

    upsert_post(db.pool(), &post).await.unwrap();
    let first = read_json_columns(&db, "5001").await;
    upsert_post(db.pool(), &post).await.unwrap();
    let second = read_json_columns(&db, "5001").await;

    assert_eq!(first, second);
    assert_eq!(first.0, r#"["https://wx1.sinaimg.cn/large/a.jpg"]"#);
}

#[tokio::test]
async fn test_list_posts_newest_first() {
    let (db, _temp_dir) = setup_db().await;

    upsert_post(db.pool(), &sample_post("older", 100.0))
        .await
        .unwrap();
    upsert_post(db.pool(), &sample_post("undated", 0.0))
        .await
        .unwrap();
    upsert_post(db.pool(), &sample_post("newer", 300.0))
        .await
        .unwrap();

    let ids: Vec<String> = list_posts(db.pool())
        .await
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();

    assert_eq!(ids, vec!["newer", "older", "undated"]);
}

#[tokio::test]
async fn test_upsert_and_list_replies() {
    let (db, _temp_dir) = setup_db().await;
    upsert_post(db.pool(), &sample_post("5001", 100.0))
        .await
        .unwrap();

    upsert_reply(db.pool(), &sample_reply("c2", "5001"))
        .await
        .unwrap();
    upsert_reply(db.pool(), &sample_reply("c1", "5001"))
        .await
        .unwrap();

    let updated = Reply {
        reply_text: Some("thanks again".to_string()),
        ..sample_reply("c1", "5001")
    };
    upsert_reply(db.pool(), &updated).await.unwrap();

    let replies = list_replies_for_post(db.pool(), "5001").await.unwrap();
    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0], updated);
    assert_eq!(replies[1].id, "c2");
    assert_eq!(count_replies(db.pool()).await.unwrap(), 2);
    assert_eq!(get_reply(db.pool(), "c1").await.unwrap(), Some(updated));
}

#[tokio::test]
async fn test_reply_without_tracked_reply_text() {
    let (db, _temp_dir) = setup_db().await;
    upsert_post(db.pool(), &sample_post("5001", 100.0))
        .await
        .unwrap();

    let reply = Reply {
        reply_text: None,
        reply_created_at: None,
        ..sample_reply("c1", "5001")
    };
    upsert_reply(db.pool(), &reply).await.unwrap();

    let stored = get_reply(db.pool(), "c1").await.unwrap().unwrap();
    assert!(stored.reply_text.is_none());
    assert!(stored.reply_created_at.is_none());
}

#[tokio::test]
async fn test_reply_requires_existing_post() {
    let (db, _temp_dir) = setup_db().await;

    let result = upsert_reply(db.pool(), &sample_reply("c1", "no-such-post")).await;

    assert!(result.is_err());
    assert_eq!(count_replies(db.pool()).await.unwrap(), 0);
}

#[tokio::test]
async fn test_post_upsert_keeps_replies() {
    let (db, _temp_dir) = setup_db().await;
    upsert_post(db.pool(), &sample_post("5001", 100.0))
        .await
        .unwrap();
    upsert_reply(db.pool(), &sample_reply("c1", "5001"))
        .await
        .unwrap();

    upsert_post(db.pool(), &sample_post("5001", 100.0))
        .await
        .unwrap();

    assert_eq!(count_replies(db.pool()).await.unwrap(), 1);
}

#[tokio::test]
async fn test_reopen_database_keeps_data() {
    let temp_dir = TempDir::new().unwrap();
    let db_path = temp_dir.path().join("test.sqlite");

    {
        let db = Database::new(&db_path).await.unwrap();
        upsert_post(db.pool(), &sample_post("5001", 100.0))
            .await
            .unwrap();
        db.pool().close().await;
    }

    let db = Database::new(&db_path).await.unwrap();
    assert_eq!(count_posts(db.pool()).await.unwrap(), 1);
}
