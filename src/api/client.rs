use async_trait::async_trait;
use reqwest::header::{ACCEPT, COOKIE, REFERER};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, trace};

use super::types::{ApiEnvelope, CommentsData, FeedCard, LongTextData, TimelineData};
use super::{FeedSource, FetchError};
use crate::config::Config;
use crate::constants::{API_REFERER, MOBILE_USER_AGENT, TIMELINE_CONTAINER_PREFIX};

const TIMELINE_PATH: &str = "/api/container/getIndex";
const LONG_TEXT_PATH: &str = "/statuses/extend";
const COMMENTS_PATH: &str = "/comments/hotflow";

/// Client for the mobile web API, bound to one tracked account and session.
#[derive(Debug, Clone)]
pub struct WeiboClient {
    http: reqwest::Client,
    base_url: String,
    account_id: String,
    session_cookie: String,
}

impl WeiboClient {
    /// Build a client from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(MOBILE_USER_AGENT)
            .timeout(config.request_timeout)
            .build()
            .map_err(|source| FetchError::Http {
                endpoint: "client",
                source,
            })?;

        Ok(Self {
            http,
            base_url: config.api_base_url.trim_end_matches('/').to_string(),
            account_id: config.account_id.clone(),
            session_cookie: config.session_cookie.clone(),
        })
    }

    /// Timeline container id: a fixed prefix followed by the account id.
    #[must_use]
    pub fn container_id(&self) -> String {
        format!("{TIMELINE_CONTAINER_PREFIX}{}", self.account_id)
    }

    async fn get_envelope<T: DeserializeOwned>(
        &self,
        endpoint: &'static str,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<ApiEnvelope<T>, FetchError> {
        let url = format!("{}{path}", self.base_url);
        trace!(%url, ?query, "Requesting");

        let response = self
            .http
            .get(&url)
            .query(query)
            .header(ACCEPT, "application/json, text/plain, */*")
            .header("MWeibo-Pwa", "1")
            .header(REFERER, API_REFERER)
            .header(COOKIE, &self.session_cookie)
            .send()
            .await
            .map_err(|source| FetchError::Http { endpoint, source })?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status { endpoint, status });
        }

        let body = response
            .bytes()
            .await
            .map_err(|source| FetchError::Http { endpoint, source })?;

        serde_json::from_slice(&body).map_err(|source| FetchError::Decode { endpoint, source })
    }
}

#[async_trait]
impl FeedSource for WeiboClient {
    async fn timeline_page(&self, page: u32) -> Result<Vec<FeedCard>, FetchError> {
        let envelope: ApiEnvelope<TimelineData> = self
            .get_envelope(
                "timeline",
                TIMELINE_PATH,
                &[
                    ("type", "uid".to_string()),
                    ("value", self.account_id.clone()),
                    ("containerid", self.container_id()),
                    ("page", page.to_string()),
                ],
            )
            .await?;

        if !envelope.is_ok() {
            return Err(FetchError::NotOk {
                endpoint: "timeline",
                ok: envelope.ok,
            });
        }

        let cards = envelope.data.unwrap_or_default().cards;
        debug!(page, cards = cards.len(), "Fetched timeline page");
        Ok(cards)
    }

    async fn long_text(&self, post_id: &str) -> Result<Option<String>, FetchError> {
        let envelope: ApiEnvelope<LongTextData> = self
            .get_envelope("long_text", LONG_TEXT_PATH, &[("id", post_id.to_string())])
            .await?;

        if !envelope.is_ok() {
            debug!(post_id, ok = ?envelope.ok, "Long text unavailable");
            return Ok(None);
        }

        Ok(envelope
            .data
            .and_then(|d| d.long_text_content)
            .filter(|text| !text.is_empty()))
    }

    async fn comments(&self, post_id: &str) -> Result<Vec<Value>, FetchError> {
        let envelope: ApiEnvelope<CommentsData> = self
            .get_envelope(
                "comments",
                COMMENTS_PATH,
                &[
                    ("id", post_id.to_string()),
                    ("mid", post_id.to_string()),
                    ("max_id_type", "0".to_string()),
                ],
            )
            .await?;

        // Posts without (hot) comments answer ok=0.
        if !envelope.is_ok() {
            debug!(post_id, ok = ?envelope.ok, "No comments returned");
            return Ok(Vec::new());
        }

        Ok(envelope.data.unwrap_or_default().data)
    }
}
