//! Static JSON site export.
//!
//! Writes `stats.json` and `posts.json` (posts newest first, each with its
//! replies and locally downloaded images) into the export directory. The
//! field names match what the bundled front end reads.

mod images;

pub use images::{image_file_name, ImageFetcher, IMAGES_SUBDIR, PARTIAL_SUFFIX};

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use tracing::info;

use crate::db::{count_posts, count_replies, list_posts, list_replies_for_post, Database, Reply};

#[derive(Debug, Serialize)]
struct Stats {
    posts: i64,
    comments: i64,
    last_updated: String,
}

#[derive(Debug, Serialize)]
struct ExportedPost {
    id: String,
    text: String,
    created_at: String,
    created_at_ts: f64,
    reposts_count: i64,
    comments_count: i64,
    attitudes_count: i64,
    images: Vec<String>,
    comments: Vec<ExportedReply>,
}

#[derive(Debug, Serialize)]
struct ExportedReply {
    id: String,
    post_id: String,
    user_name: String,
    text: String,
    created_at: String,
    reply_text: Option<String>,
    reply_created_at: Option<String>,
}

impl From<Reply> for ExportedReply {
    fn from(reply: Reply) -> Self {
        Self {
            id: reply.id,
            post_id: reply.post_id,
            user_name: reply.commenter_name,
            text: reply.commenter_text,
            created_at: reply.commenter_created_at,
            reply_text: reply.reply_text,
            reply_created_at: reply.reply_created_at,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportReport {
    pub posts: usize,
    pub replies: usize,
    pub images_local: usize,
    pub images_remote: usize,
}

/// Export the archive into `export_dir`, downloading images with `workers`
/// concurrent requests.
///
/// # Errors
///
/// Returns an error if the database cannot be read or the output files
/// cannot be written. Individual image failures are not errors.
pub async fn export_static(db: &Database, export_dir: &Path, workers: usize) -> Result<ExportReport> {
    tokio::fs::create_dir_all(export_dir)
        .await
        .with_context(|| format!("Failed to create export directory: {}", export_dir.display()))?;

    export_stats(db, export_dir).await?;

    let posts = list_posts(db.pool()).await?;
    let all_urls = posts.iter().flat_map(|p| p.image_urls.iter().cloned());
    let fetcher = ImageFetcher::new(export_dir, workers)?;
    let local_paths = fetcher.materialize(all_urls).await?;

    let mut report = ExportReport::default();
    let mut exported = Vec::with_capacity(posts.len());
    for post in posts {
        let images: Vec<String> = post
            .image_urls
            .iter()
            .map(|url| match local_paths.get(url) {
                Some(local) => {
                    report.images_local += 1;
                    local.clone()
                }
                None => {
                    report.images_remote += 1;
                    url.clone()
                }
            })
            .collect();

        let comments: Vec<ExportedReply> = list_replies_for_post(db.pool(), &post.id)
            .await?
            .into_iter()
            .map(ExportedReply::from)
            .collect();
        report.replies += comments.len();

        exported.push(ExportedPost {
            id: post.id,
            text: post.text,
            created_at: post.created_at_raw,
            created_at_ts: post.created_at_epoch,
            reposts_count: post.reposts_count,
            comments_count: post.comments_count,
            attitudes_count: post.attitudes_count,
            images,
            comments,
        });
    }
    report.posts = exported.len();

    write_json(&export_dir.join("posts.json"), &exported).await?;

    info!(
        posts = report.posts,
        replies = report.replies,
        images_local = report.images_local,
        images_remote = report.images_remote,
        dir = %export_dir.display(),
        "Static export complete"
    );
    Ok(report)
}

async fn export_stats(db: &Database, export_dir: &Path) -> Result<()> {
    let stats = Stats {
        posts: count_posts(db.pool()).await?,
        comments: count_replies(db.pool()).await?,
        last_updated: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    };
    write_json(&export_dir.join("stats.json"), &stats).await
}

async fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let json = serde_json::to_vec_pretty(value).context("Failed to serialize export")?;
    tokio::fs::write(path, json)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))
}
