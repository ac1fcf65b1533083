//! Re-processing of already archived posts.
//!
//! Runs every stored payload through the mapper again, picking up long text
//! that was not expanded at fetch time and re-extracting images. The stored
//! epoch is kept: relative timestamps like "5 mins ago" were resolved against
//! the original fetch time and would drift if normalized again.

use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, FixedOffset};
use tracing::{info, warn};

use crate::api::FeedSource;
use crate::db::{list_posts, upsert_post, Database};
use crate::mapper::{map_post, parse_mblog};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub refreshed: u32,
    pub failed: u32,
}

/// Re-map and re-save every archived post. Pauses `long_text_delay` after
/// each post that needed a long-text request.
///
/// # Errors
///
/// Returns an error if the stored posts cannot be listed.
pub async fn refresh_all<S>(
    db: &Database,
    source: &S,
    reference_now: DateTime<FixedOffset>,
    long_text_delay: Duration,
) -> Result<RefreshReport>
where
    S: FeedSource + ?Sized,
{
    let posts = list_posts(db.pool()).await?;
    info!(count = posts.len(), "Refreshing archived posts");

    let mut report = RefreshReport::default();
    for stored in posts {
        let needed_long_text =
            parse_mblog(&stored.raw_payload).is_ok_and(|mblog| mblog.is_long_text);

        let mut post = match map_post(&stored.raw_payload, source, &reference_now).await {
            Ok(post) => post,
            Err(e) => {
                warn!(post_id = %stored.id, "Failed to re-map post: {e}");
                report.failed += 1;
                continue;
            }
        };
        post.id = stored.id;
        post.created_at_epoch = stored.created_at_epoch;

        if let Err(e) = upsert_post(db.pool(), &post).await {
            warn!(post_id = %post.id, "Failed to save refreshed post: {e:#}");
            report.failed += 1;
            continue;
        }
        report.refreshed += 1;

        if report.refreshed % 100 == 0 {
            info!(refreshed = report.refreshed, "Refresh progress");
        }
        if needed_long_text && !long_text_delay.is_zero() {
            tokio::time::sleep(long_text_delay).await;
        }
    }

    info!(
        refreshed = report.refreshed,
        failed = report.failed,
        "Refresh complete"
    );
    Ok(report)
}
