//! Incremental timeline scan.
//!
//! Pages through the tracked account's timeline, newest first, persisting
//! posts inside the lookback window and the replies the account made to
//! commenters. Pinned posts show up at the top of every page regardless of
//! age, so a stale post only ends the scan after `stale_limit` consecutive
//! non-pinned stale posts.

use std::time::Duration;

use anyhow::{ensure, Result};
use chrono::{DateTime, FixedOffset, TimeDelta, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::api::types::Mblog;
use crate::api::FeedSource;
use crate::config::Config;
use crate::constants::{DEFAULT_STALE_LIMIT, MANUAL_DAYS_BACK, SCHEDULED_DAYS_BACK};
use crate::date::normalize;
use crate::db::{upsert_post, upsert_reply, Database};
use crate::mapper::{map_post, map_reply};

/// What triggered a scan; decides the default lookback window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanKind {
    Scheduled,
    Manual,
}

impl ScanKind {
    #[must_use]
    pub const fn default_days_back(self) -> u32 {
        match self {
            Self::Scheduled => SCHEDULED_DAYS_BACK,
            Self::Manual => MANUAL_DAYS_BACK,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    pub account_id: String,
    pub days_back: u32,
    pub stale_limit: u32,
    /// Pause after each timeline page.
    pub page_delay: Duration,
    /// Pause after each archived post and its comments.
    pub post_delay: Duration,
}

impl ScanOptions {
    /// Options for `kind`, honoring a configured lookback override.
    #[must_use]
    pub fn from_config(config: &Config, kind: ScanKind) -> Self {
        Self {
            account_id: config.account_id.clone(),
            days_back: config.days_back.unwrap_or_else(|| kind.default_days_back()),
            stale_limit: DEFAULT_STALE_LIMIT,
            page_delay: config.page_delay,
            post_delay: config.post_delay,
        }
    }
}

/// Why a scan ended. Both are normal completions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// A page came back empty.
    Exhausted,
    /// `stale_limit` consecutive stale posts were seen.
    Stale,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    pub pages_fetched: u32,
    pub posts_saved: u32,
    pub replies_saved: u32,
    pub stale_skipped: u32,
    pub pinned_skipped: u32,
    pub failures: u32,
    pub stop_reason: StopReason,
}

impl ScanReport {
    const fn new() -> Self {
        Self {
            pages_fetched: 0,
            posts_saved: 0,
            replies_saved: 0,
            stale_skipped: 0,
            pinned_skipped: 0,
            failures: 0,
            stop_reason: StopReason::Exhausted,
        }
    }
}

/// How one timeline entry is treated relative to the cutoff.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryVerdict {
    /// Inside the window: archive it and reset the stale counter.
    Fresh,
    /// Before the cutoff: skip it and count it.
    Stale,
    /// Before the cutoff but pinned: skip it without touching the counter.
    PinnedStale,
}

#[must_use]
pub fn classify_entry(
    timestamp: &DateTime<FixedOffset>,
    cutoff: &DateTime<FixedOffset>,
    pinned: bool,
) -> EntryVerdict {
    if timestamp >= cutoff {
        EntryVerdict::Fresh
    } else if pinned {
        EntryVerdict::PinnedStale
    } else {
        EntryVerdict::Stale
    }
}

/// Start of the lookback window. A window reaching past the representable
/// range covers everything.
#[must_use]
pub fn cutoff_for(
    reference_now: &DateTime<FixedOffset>,
    days_back: u32,
) -> DateTime<FixedOffset> {
    TimeDelta::try_days(i64::from(days_back))
        .and_then(|span| reference_now.checked_sub_signed(span))
        .unwrap_or_else(|| DateTime::<Utc>::MIN_UTC.with_timezone(reference_now.offset()))
}

#[derive(Debug)]
struct ScanState {
    page: u32,
    consecutive_stale: u32,
    cutoff: DateTime<FixedOffset>,
    scanning: bool,
}

/// Drives one scan over a [`FeedSource`] into the [`Database`].
pub struct Scanner<'a, S: FeedSource + ?Sized> {
    source: &'a S,
    db: &'a Database,
    options: ScanOptions,
}

impl<'a, S: FeedSource + ?Sized> Scanner<'a, S> {
    pub fn new(source: &'a S, db: &'a Database, options: ScanOptions) -> Self {
        Self {
            source,
            db,
            options,
        }
    }

    /// Run the scan with `reference_now` fixed as "now" for every timestamp.
    ///
    /// Per-item fetch, mapping and write failures are logged and skipped.
    ///
    /// # Errors
    ///
    /// Returns an error only if the options name no account.
    pub async fn run(&self, reference_now: DateTime<FixedOffset>) -> Result<ScanReport> {
        ensure!(
            !self.options.account_id.trim().is_empty(),
            "No tracked account configured"
        );

        let mut state = ScanState {
            page: 1,
            consecutive_stale: 0,
            cutoff: cutoff_for(&reference_now, self.options.days_back),
            scanning: true,
        };
        let mut report = ScanReport::new();

        info!(
            account_id = %self.options.account_id,
            days_back = self.options.days_back,
            cutoff_epoch = state.cutoff.timestamp(),
            "Starting scan"
        );

        while state.scanning {
            let cards = match self.source.timeline_page(state.page).await {
                Ok(cards) => cards,
                Err(e) => {
                    warn!(page = state.page, "Failed to fetch timeline page: {e}");
                    report.failures += 1;
                    Vec::new()
                }
            };

            if cards.is_empty() {
                info!(page = state.page, "Timeline exhausted");
                report.stop_reason = StopReason::Exhausted;
                break;
            }
            report.pages_fetched += 1;

            for payload in cards.iter().filter_map(|card| card.post_payload()) {
                let mblog: Mblog = match serde_json::from_value(payload.clone()) {
                    Ok(mblog) => mblog,
                    Err(e) => {
                        warn!(page = state.page, "Skipping undecodable post: {e}");
                        report.failures += 1;
                        continue;
                    }
                };
                let created_at = mblog.created_at.as_deref().unwrap_or_default();
                let timestamp = normalize(created_at, &reference_now);

                match classify_entry(&timestamp, &state.cutoff, mblog.is_top) {
                    EntryVerdict::Stale => {
                        state.consecutive_stale += 1;
                        report.stale_skipped += 1;
                        debug!(
                            post_id = mblog.id.as_deref().unwrap_or_default(),
                            created_at,
                            consecutive_stale = state.consecutive_stale,
                            "Post older than cutoff"
                        );
                        if state.consecutive_stale >= self.options.stale_limit {
                            info!(
                                consecutive_stale = state.consecutive_stale,
                                "Reached stale limit, stopping"
                            );
                            state.scanning = false;
                            report.stop_reason = StopReason::Stale;
                            break;
                        }
                    }
                    EntryVerdict::PinnedStale => {
                        report.pinned_skipped += 1;
                        debug!(
                            post_id = mblog.id.as_deref().unwrap_or_default(),
                            created_at, "Ignoring old pinned post"
                        );
                    }
                    EntryVerdict::Fresh => {
                        state.consecutive_stale = 0;
                        self.archive_post(payload, &reference_now, &mut report)
                            .await;
                        pace(self.options.post_delay).await;
                    }
                }
            }

            if state.scanning {
                state.page += 1;
                pace(self.options.page_delay).await;
            }
        }

        info!(
            pages = report.pages_fetched,
            posts = report.posts_saved,
            replies = report.replies_saved,
            stale = report.stale_skipped,
            failures = report.failures,
            stop_reason = ?report.stop_reason,
            "Scan complete"
        );

        Ok(report)
    }

    /// Persist one fresh post, then the replies found in its comment thread.
    async fn archive_post(
        &self,
        payload: &Value,
        reference_now: &DateTime<FixedOffset>,
        report: &mut ScanReport,
    ) {
        let post = match map_post(payload, self.source, reference_now).await {
            Ok(post) => post,
            Err(e) => {
                warn!("Skipping unmappable post: {e}");
                report.failures += 1;
                return;
            }
        };

        if let Err(e) = upsert_post(self.db.pool(), &post).await {
            warn!(post_id = %post.id, "Failed to save post: {e:#}");
            report.failures += 1;
            return;
        }
        report.posts_saved += 1;
        debug!(post_id = %post.id, created_at = %post.created_at_raw, "Saved post");

        let comments = match self.source.comments(&post.id).await {
            Ok(comments) => comments,
            Err(e) => {
                warn!(post_id = %post.id, "Failed to fetch comments: {e}");
                report.failures += 1;
                return;
            }
        };

        for comment in &comments {
            let Some(reply) = map_reply(&post.id, comment, &self.options.account_id) else {
                continue;
            };
            match upsert_reply(self.db.pool(), &reply).await {
                Ok(()) => {
                    report.replies_saved += 1;
                    debug!(post_id = %post.id, comment_id = %reply.id, "Saved reply");
                }
                Err(e) => {
                    warn!(post_id = %post.id, comment_id = %reply.id, "Failed to save reply: {e:#}");
                    report.failures += 1;
                }
            }
        }
    }
}

async fn pace(delay: Duration) {
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(rfc3339: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(rfc3339).unwrap()
    }

    #[test]
    fn test_classify_entry() {
        let cutoff = at("2025-11-30T10:00:00+08:00");
        let fresh = at("2025-12-01T09:00:00+08:00");
        let old = at("2025-11-01T09:00:00+08:00");

        assert_eq!(classify_entry(&fresh, &cutoff, false), EntryVerdict::Fresh);
        assert_eq!(classify_entry(&fresh, &cutoff, true), EntryVerdict::Fresh);
        assert_eq!(classify_entry(&old, &cutoff, false), EntryVerdict::Stale);
        assert_eq!(classify_entry(&old, &cutoff, true), EntryVerdict::PinnedStale);
        assert_eq!(classify_entry(&cutoff, &cutoff, false), EntryVerdict::Fresh);
    }

    #[test]
    fn test_cutoff_for() {
        let now = at("2025-12-01T10:00:00+08:00");
        assert_eq!(cutoff_for(&now, 3), at("2025-11-28T10:00:00+08:00"));

        let everything = cutoff_for(&now, u32::MAX);
        assert_eq!(everything, DateTime::<Utc>::MIN_UTC);
        assert_eq!(everything.offset(), now.offset());
        assert_eq!(
            classify_entry(&at("2009-08-14T00:00:00+08:00"), &everything, false),
            EntryVerdict::Fresh
        );
    }

    #[test]
    fn test_days_back_policy() {
        let config = Config::for_testing();
        assert_eq!(ScanOptions::from_config(&config, ScanKind::Scheduled).days_back, 3);
        assert_eq!(ScanOptions::from_config(&config, ScanKind::Manual).days_back, 1);

        let config = Config {
            days_back: Some(7),
            ..Config::for_testing()
        };
        assert_eq!(ScanOptions::from_config(&config, ScanKind::Manual).days_back, 7);
    }
}
