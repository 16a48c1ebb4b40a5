use std::collections::HashMap;

use serde::de::{DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

// --- Lenient field decoding ---
//
// Upstream payloads drift constantly. A malformed sub-field decodes to its
// default instead of failing the whole page.

fn lenient<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).unwrap_or_default())
}

/// Like [`lenient`] but per element: one bad entry is dropped, not the list.
fn lenient_seq<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

/// Ids arrive as strings or bare numbers depending on the endpoint.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = string_or_number(deserializer)?;
    Ok(if s.is_empty() { None } else { Some(s) })
}

// --- Users ---

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RawUser {
    #[serde(default, deserialize_with = "string_or_number", alias = "rest_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub screen_name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub profile_image_url: Option<String>,
}

// --- Tweets ---

/// `t.co` short link with its expansions.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawUrlEntity {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub expanded_url: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub display_url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVariant {
    #[serde(default, deserialize_with = "lenient")]
    pub content_type: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub bitrate: Option<u64>,
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawVideoInfo {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub variants: Vec<RawVariant>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawMedia {
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub id_str: Option<String>,
    /// `photo`, `video`, or `animated_gif`.
    #[serde(rename = "type", default, deserialize_with = "lenient")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub media_url_https: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub video_info: Option<RawVideoInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawEntities {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub urls: Vec<RawUrlEntity>,
    #[serde(default, deserialize_with = "lenient_seq")]
    pub media: Vec<RawMedia>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawLegacy {
    #[serde(default, deserialize_with = "lenient")]
    pub entities: RawEntities,
    #[serde(default, deserialize_with = "lenient")]
    pub extended_entities: Option<RawEntities>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawImageValue {
    #[serde(default, deserialize_with = "lenient")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawBindingValue {
    #[serde(default, deserialize_with = "lenient")]
    pub string_value: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub image_value: Option<RawImageValue>,
}

/// Rich link preview. `binding_values` is a map on some endpoints and a
/// `[{key, value}]` list on others; both decode to the same map.
#[derive(Debug, Clone, Default)]
pub struct RawCard {
    pub binding_values: HashMap<String, RawBindingValue>,
}

impl<'de> Deserialize<'de> for RawCard {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        let bindings = value
            .get("binding_values")
            .or_else(|| value.get("legacy").and_then(|l| l.get("binding_values")))
            .cloned()
            .unwrap_or(Value::Null);

        let binding_values = match bindings {
            Value::Object(map) => map
                .into_iter()
                .filter_map(|(k, v)| serde_json::from_value(v).ok().map(|v| (k, v)))
                .collect(),
            Value::Array(entries) => entries
                .into_iter()
                .filter_map(|entry| {
                    let key = entry.get("key")?.as_str()?.to_string();
                    let value = serde_json::from_value(entry.get("value")?.clone()).ok()?;
                    Some((key, value))
                })
                .collect(),
            _ => HashMap::new(),
        };
        Ok(RawCard { binding_values })
    }
}

impl RawCard {
    pub fn string_value(&self, key: &str) -> Option<&str> {
        self.binding_values
            .get(key)
            .and_then(|b| b.string_value.as_deref())
    }

    pub fn image_url(&self, key: &str) -> Option<&str> {
        self.binding_values
            .get(key)
            .and_then(|b| b.image_value.as_ref())
            .and_then(|i| i.url.as_deref())
    }
}

/// One post exactly as the list timeline returns it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawTweet {
    #[serde(default, deserialize_with = "string_or_number", alias = "rest_id")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient", alias = "full_text")]
    pub text: String,
    #[serde(default, deserialize_with = "lenient")]
    pub user: Option<RawUser>,
    #[serde(default, deserialize_with = "lenient", alias = "_legacy")]
    pub legacy: RawLegacy,
    #[serde(default, deserialize_with = "lenient")]
    pub card: Option<RawCard>,
    #[serde(default, deserialize_with = "lenient", alias = "retweeted_status")]
    pub retweeted_tweet: Option<Box<RawTweet>>,
    #[serde(
        default,
        deserialize_with = "lenient",
        alias = "quoted_tweet",
        alias = "quoted_status"
    )]
    pub quote: Option<Box<RawTweet>>,
    #[serde(default, deserialize_with = "lenient")]
    pub favorite_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub retweet_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub reply_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub quote_count: u64,
    #[serde(default, deserialize_with = "lenient")]
    pub bookmark_count: u64,
}

impl RawTweet {
    pub fn author_handle(&self) -> Option<&str> {
        self.user
            .as_ref()
            .map(|u| u.screen_name.as_str())
            .filter(|s| !s.is_empty())
    }

    /// Media entities, preferring `extended_entities` which lists every
    /// attachment rather than only the first.
    pub fn media_entities(&self) -> &[RawMedia] {
        match &self.legacy.extended_entities {
            Some(ext) if !ext.media.is_empty() => &ext.media,
            _ => &self.legacy.entities.media,
        }
    }

    pub fn url_entities(&self) -> &[RawUrlEntity] {
        &self.legacy.entities.urls
    }
}

// --- Pages returned by the gateway ---

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PostPage {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub tweets: Vec<RawTweet>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListInfo {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient")]
    pub member_count: u64,
    #[serde(default, deserialize_with = "lenient", alias = "creator")]
    pub user: Option<RawUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipList {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id_str: String,
    #[serde(default, deserialize_with = "lenient")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient")]
    pub user: Option<RawUser>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MembershipPage {
    #[serde(default, deserialize_with = "lenient_seq")]
    pub lists: Vec<MembershipList>,
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub next_cursor_str: Option<String>,
}
