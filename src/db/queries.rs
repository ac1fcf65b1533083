use anyhow::{Context, Result};
use sqlx::SqlitePool;

use super::models::{Post, PostRow, Reply};

// ========== Posts ==========

/// Insert a post, or overwrite every column of the stored post with the same id.
pub async fn upsert_post(pool: &SqlitePool, post: &Post) -> Result<()> {
    let image_urls =
        serde_json::to_string(&post.image_urls).context("Failed to serialize image urls")?;
    let raw_payload =
        serde_json::to_string(&post.raw_payload).context("Failed to serialize raw payload")?;

    // ON CONFLICT updates in place; REPLACE would delete the row that replies reference.
    sqlx::query(
        r"
        INSERT INTO posts (id, text, created_at_raw, created_at_epoch, reposts_count,
                           comments_count, attitudes_count, image_urls, raw_payload)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            text = excluded.text,
            created_at_raw = excluded.created_at_raw,
            created_at_epoch = excluded.created_at_epoch,
            reposts_count = excluded.reposts_count,
            comments_count = excluded.comments_count,
            attitudes_count = excluded.attitudes_count,
            image_urls = excluded.image_urls,
            raw_payload = excluded.raw_payload
        ",
    )
    .bind(&post.id)
    .bind(&post.text)
    .bind(&post.created_at_raw)
    .bind(post.created_at_epoch)
    .bind(post.reposts_count)
    .bind(post.comments_count)
    .bind(post.attitudes_count)
    .bind(image_urls)
    .bind(raw_payload)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to upsert post {}", post.id))?;

    Ok(())
}

/// Get a post by its upstream id.
pub async fn get_post(pool: &SqlitePool, id: &str) -> Result<Option<Post>> {
    let row: Option<PostRow> = sqlx::query_as("SELECT * FROM posts WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch post")?;

    row.map(Post::try_from)
        .transpose()
        .context("Stored post has malformed JSON columns")
}

/// All posts, newest first. Posts with an unknown time (epoch 0) sort last.
pub async fn list_posts(pool: &SqlitePool) -> Result<Vec<Post>> {
    let rows: Vec<PostRow> =
        sqlx::query_as("SELECT * FROM posts ORDER BY created_at_epoch DESC, id DESC")
            .fetch_all(pool)
            .await
            .context("Failed to list posts")?;

    rows.into_iter()
        .map(|row| {
            let id = row.id.clone();
            Post::try_from(row).with_context(|| format!("Stored post {id} has malformed JSON"))
        })
        .collect()
}

/// Count archived posts.
pub async fn count_posts(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM posts")
        .fetch_one(pool)
        .await
        .context("Failed to count posts")?;
    Ok(count)
}

// ========== Replies ==========

/// Insert a reply, or overwrite every column of the stored reply with the same id.
pub async fn upsert_reply(pool: &SqlitePool, reply: &Reply) -> Result<()> {
    sqlx::query(
        r"
        INSERT INTO replies (id, post_id, commenter_name, commenter_text,
                             commenter_created_at, reply_text, reply_created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            post_id = excluded.post_id,
            commenter_name = excluded.commenter_name,
            commenter_text = excluded.commenter_text,
            commenter_created_at = excluded.commenter_created_at,
            reply_text = excluded.reply_text,
            reply_created_at = excluded.reply_created_at
        ",
    )
    .bind(&reply.id)
    .bind(&reply.post_id)
    .bind(&reply.commenter_name)
    .bind(&reply.commenter_text)
    .bind(&reply.commenter_created_at)
    .bind(&reply.reply_text)
    .bind(&reply.reply_created_at)
    .execute(pool)
    .await
    .with_context(|| format!("Failed to upsert reply {}", reply.id))?;

    Ok(())
}

/// Get a reply by the commenter's comment id.
pub async fn get_reply(pool: &SqlitePool, id: &str) -> Result<Option<Reply>> {
    sqlx::query_as("SELECT * FROM replies WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await
        .context("Failed to fetch reply")
}

/// Replies stored for a post, ordered by comment id.
pub async fn list_replies_for_post(pool: &SqlitePool, post_id: &str) -> Result<Vec<Reply>> {
    sqlx::query_as("SELECT * FROM replies WHERE post_id = ? ORDER BY id ASC")
        .bind(post_id)
        .fetch_all(pool)
        .await
        .context("Failed to list replies")
}

/// Count archived replies.
pub async fn count_replies(pool: &SqlitePool) -> Result<i64> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM replies")
        .fetch_one(pool)
        .await
        .context("Failed to count replies")?;
    Ok(count)
}
