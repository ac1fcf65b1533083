//! Wire types for the mobile web API.
//!
//! The API is loose about types: ids arrive as numbers or strings, counters
//! as numbers or display strings ("100万+"), flags as bools or 0/1, and empty
//! lists as `false`. Every field that may be absent is an explicit `Option`
//! (or defaults), and the `lenient_*` deserializers absorb the type drift so
//! one odd field never discards a whole record.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::constants::POST_CARD_TYPE;

/// Common `{ "ok": 1, "data": ... }` envelope.
#[derive(Debug, Deserialize)]
pub struct ApiEnvelope<T> {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub ok: Option<i64>,
    pub data: Option<T>,
}

impl<T> ApiEnvelope<T> {
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.ok == Some(1)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineData {
    #[serde(default, deserialize_with = "lenient_list")]
    pub cards: Vec<FeedCard>,
}

/// One entry of a timeline page. Only cards of [`POST_CARD_TYPE`] carry a post;
/// the rest are ads, recommendations and headers.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedCard {
    #[serde(default, deserialize_with = "lenient_i64")]
    pub card_type: Option<i64>,
    #[serde(default)]
    pub mblog: Option<Value>,
}

impl FeedCard {
    /// The raw post object, if this card is a post.
    #[must_use]
    pub fn post_payload(&self) -> Option<&Value> {
        if self.card_type != Some(POST_CARD_TYPE) {
            return None;
        }
        self.mblog.as_ref().filter(|m| m.is_object())
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LongTextData {
    #[serde(rename = "longTextContent", default)]
    pub long_text_content: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CommentsData {
    #[serde(default, deserialize_with = "lenient_list")]
    pub data: Vec<Value>,
}

/// A post object ("mblog").
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Mblog {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub reposts_count: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub comments_count: i64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub attitudes_count: i64,
    #[serde(rename = "isLongText", default, deserialize_with = "lenient_flag")]
    pub is_long_text: bool,
    #[serde(rename = "isTop", default, deserialize_with = "lenient_flag")]
    pub is_top: bool,
    #[serde(default, deserialize_with = "lenient_list")]
    pub pics: Vec<Picture>,
}

/// A picture descriptor attached to a post.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Picture {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub large: Option<PictureVariant>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PictureVariant {
    #[serde(default)]
    pub url: Option<String>,
}

/// A comment, possibly carrying nested replies in `comments`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawComment {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub user: Option<RawUser>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub comments: Vec<RawComment>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUser {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: Option<String>,
    #[serde(default)]
    pub screen_name: Option<String>,
}

/// Number or non-empty string, as a string.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Integer given as a number or a numeric string.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

/// Counter given as a number or a display string; unknown shapes count as 0.
pub fn lenient_count<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .unwrap_or(0),
        Some(Value::String(s)) => parse_display_count(&s),
        _ => 0,
    })
}

/// Flag given as a bool, a number, or a string.
pub fn lenient_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Bool(b)) => b,
        Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
        Some(Value::String(s)) => matches!(s.trim(), "1" | "true"),
        _ => false,
    })
}

/// A list whose elements are kept when they decode; anything that is not an
/// array (`null`, `false`, an object) is an empty list.
pub fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Parse counters such as `"1234"`, `"100万+"` or `"1.2亿"`.
#[must_use]
pub fn parse_display_count(raw: &str) -> i64 {
    let raw = raw.trim();
    let numeric_len = raw
        .char_indices()
        .find(|(_, c)| !(c.is_ascii_digit() || *c == '.'))
        .map_or(raw.len(), |(i, _)| i);
    let Ok(value) = raw[..numeric_len].parse::<f64>() else {
        return 0;
    };
    let multiplier = match raw[numeric_len..].chars().next() {
        Some('万') => 10_000.0,
        Some('亿') => 100_000_000.0,
        _ => 1.0,
    };
    (value * multiplier) as i64
}
