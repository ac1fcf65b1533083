//! Shared constants used across the application.

/// Mobile Safari user agent sent to the mobile web API.
///
/// The mobile endpoints serve JSON only to clients that look like the
/// progressive web app.
pub const MOBILE_USER_AGENT: &str = "Mozilla/5.0 (iPhone; CPU iPhone OS 13_2_3 like Mac OS X) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/13.0.3 Mobile/15E148 Safari/604.1";

/// Desktop user agent used when downloading images for export.
pub const IMAGE_USER_AGENT: &str =
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Referer expected by the mobile web API.
pub const API_REFERER: &str = "https://m.weibo.cn/";

/// Referer expected by the image CDN.
pub const IMAGE_REFERER: &str = "https://weibo.com/";

/// Prefix joined with the account id to form the timeline container id.
pub const TIMELINE_CONTAINER_PREFIX: &str = "107603";

/// `card_type` of timeline cards that carry an actual post.
pub const POST_CARD_TYPE: i64 = 9;

/// Consecutive stale posts after which a scan concludes nothing newer remains.
pub const DEFAULT_STALE_LIMIT: u32 = 10;

/// Lookback window for scheduled scans.
pub const SCHEDULED_DAYS_BACK: u32 = 3;

/// Lookback window for one-off scans.
pub const MANUAL_DAYS_BACK: u32 = 1;

/// Largest accepted lookback window, in days.
pub const MAX_DAYS_BACK: u32 = 36_500;
