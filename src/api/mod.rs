//! Access to the upstream feed.
//!
//! [`FeedSource`] is the seam between the scan engine and the network; the
//! production implementation is [`WeiboClient`].

mod client;
pub mod types;

pub use client::WeiboClient;
pub use types::{FeedCard, Mblog, RawComment};

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("request to {endpoint} failed: {source}")]
    Http {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{endpoint} returned status {status}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
    },
    #[error("failed to decode {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: serde_json::Error,
    },
    #[error("{endpoint} answered ok={ok:?}")]
    NotOk {
        endpoint: &'static str,
        ok: Option<i64>,
    },
}

/// One page of the tracked account's timeline, long-text expansion, and
/// comment threads. Implementations make a single attempt per call.
#[async_trait]
pub trait FeedSource: Send + Sync {
    /// Cards on timeline page `page` (1-based). An empty list means the
    /// timeline is exhausted.
    async fn timeline_page(&self, page: u32) -> Result<Vec<FeedCard>, FetchError>;

    /// Full text of a truncated post, if the upstream provides one.
    async fn long_text(&self, post_id: &str) -> Result<Option<String>, FetchError>;

    /// Top-level comments of a post, as raw JSON objects.
    async fn comments(&self, post_id: &str) -> Result<Vec<Value>, FetchError>;
}
