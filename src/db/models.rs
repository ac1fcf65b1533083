use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An archived post of the tracked account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: String,
    pub text: String,
    /// Upstream timestamp string, verbatim.
    pub created_at_raw: String,
    /// Seconds since the Unix epoch; `0.0` when the upstream gave no time.
    pub created_at_epoch: f64,
    pub reposts_count: i64,
    pub comments_count: i64,
    pub attitudes_count: i64,
    pub image_urls: Vec<String>,
    /// The upstream post object as received.
    pub raw_payload: Value,
}

/// A comment on an archived post together with the tracked account's reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Reply {
    /// The commenter's comment id.
    pub id: String,
    pub post_id: String,
    pub commenter_name: String,
    pub commenter_text: String,
    pub commenter_created_at: String,
    pub reply_text: Option<String>,
    pub reply_created_at: Option<String>,
}

/// Row shape of `posts`; list and payload columns are JSON text.
#[derive(Debug, Clone, sqlx::FromRow)]
pub(crate) struct PostRow {
    pub id: String,
    pub text: String,
    pub created_at_raw: String,
    pub created_at_epoch: f64,
    pub reposts_count: i64,
    pub comments_count: i64,
    pub attitudes_count: i64,
    pub image_urls: String,
    pub raw_payload: String,
}

impl TryFrom<PostRow> for Post {
    type Error = serde_json::Error;

    fn try_from(row: PostRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            text: row.text,
            created_at_raw: row.created_at_raw,
            created_at_epoch: row.created_at_epoch,
            reposts_count: row.reposts_count,
            comments_count: row.comments_count,
            attitudes_count: row.attitudes_count,
            image_urls: serde_json::from_str(&row.image_urls)?,
            raw_payload: serde_json::from_str(&row.raw_payload)?,
        })
    }
}
