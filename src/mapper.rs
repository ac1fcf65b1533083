//! Turning raw feed objects into archive records.

use chrono::{DateTime, FixedOffset};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use crate::api::types::{Mblog, Picture, RawComment};
use crate::api::FeedSource;
use crate::date::{normalize, to_epoch};
use crate::db::{Post, Reply};

#[derive(Debug, Error)]
pub enum MapError {
    #[error("post payload is not a valid post object: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("post payload has no id")]
    MissingId,
}

/// Decode a raw post object. Kept separate from [`map_post`] so callers can
/// inspect `isTop` and `created_at` before deciding to persist.
///
/// # Errors
///
/// Returns an error if the payload is not an object or has no id.
pub fn parse_mblog(payload: &Value) -> Result<Mblog, MapError> {
    let mblog: Mblog = serde_json::from_value(payload.clone())?;
    if mblog.id.is_none() {
        return Err(MapError::MissingId);
    }
    Ok(mblog)
}

/// Map a raw post object to a [`Post`], expanding truncated text through
/// `source`. A failed expansion keeps the truncated text.
///
/// # Errors
///
/// Returns an error if the payload is not an object or has no id.
pub async fn map_post<S>(
    payload: &Value,
    source: &S,
    reference_now: &DateTime<FixedOffset>,
) -> Result<Post, MapError>
where
    S: FeedSource + ?Sized,
{
    let mblog = parse_mblog(payload)?;
    let id = mblog.id.clone().ok_or(MapError::MissingId)?;

    let mut text = mblog.text.clone().unwrap_or_default();
    if mblog.is_long_text {
        match source.long_text(&id).await {
            Ok(Some(full)) if !full.is_empty() => {
                debug!(post_id = %id, "Expanded long text");
                text = full;
            }
            Ok(_) => debug!(post_id = %id, "No long text available, keeping truncated text"),
            Err(e) => warn!(post_id = %id, "Failed to fetch long text: {e}"),
        }
    }

    let created_at_raw = mblog.created_at.clone().unwrap_or_default();
    let created_at_epoch = mblog
        .created_at
        .as_deref()
        .map_or(0.0, |raw| to_epoch(&normalize(raw, reference_now)));

    Ok(Post {
        id,
        text,
        created_at_raw,
        created_at_epoch,
        reposts_count: mblog.reposts_count,
        comments_count: mblog.comments_count,
        attitudes_count: mblog.attitudes_count,
        image_urls: extract_image_urls(&mblog.pics),
        raw_payload: payload.clone(),
    })
}

/// URLs of all pictures, in order, skipping descriptors without one.
#[must_use]
pub fn extract_image_urls(pics: &[Picture]) -> Vec<String> {
    pics.iter().filter_map(pick_image_url).collect()
}

/// The large variant's URL if present, else the base URL.
#[must_use]
pub fn pick_image_url(pic: &Picture) -> Option<String> {
    pic.large
        .as_ref()
        .and_then(|large| large.url.as_deref())
        .or(pic.url.as_deref())
        .filter(|url| !url.is_empty())
        .map(ToString::to_string)
}

/// The first nested reply authored by `account_id`, in thread order.
#[must_use]
pub fn find_tracked_reply<'a>(
    replies: &'a [RawComment],
    account_id: &str,
) -> Option<&'a RawComment> {
    replies.iter().find(|reply| {
        reply
            .user
            .as_ref()
            .and_then(|user| user.id.as_deref())
            .is_some_and(|id| id == account_id)
    })
}

/// Build a [`Reply`] if the comment thread holds a reply by the tracked
/// account. Comments without such a reply, or without an id, map to `None`.
#[must_use]
pub fn map_reply(post_id: &str, comment: &Value, account_id: &str) -> Option<Reply> {
    let comment: RawComment = match serde_json::from_value(comment.clone()) {
        Ok(comment) => comment,
        Err(e) => {
            debug!(post_id, "Skipping malformed comment: {e}");
            return None;
        }
    };

    let reply = find_tracked_reply(&comment.comments, account_id)?;
    let Some(id) = comment.id.clone() else {
        debug!(post_id, "Skipping answered comment without id");
        return None;
    };

    Some(Reply {
        id,
        post_id: post_id.to_string(),
        commenter_name: comment
            .user
            .as_ref()
            .and_then(|user| user.screen_name.clone())
            .unwrap_or_default(),
        commenter_text: comment.text.clone().unwrap_or_default(),
        commenter_created_at: comment.created_at.clone().unwrap_or_default(),
        reply_text: reply.text.clone(),
        reply_created_at: reply.created_at.clone(),
    })
}
