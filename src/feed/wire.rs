//! Typed schema for the feed-aggregation API.
//!
//! Everything the remote side sends is decoded here into explicit structs so
//! that the normalizer and extractor never touch untyped JSON. Fields are
//! optional on the wire and absent arrays decode as empty, but a response
//! without the top-level `data` envelope is rejected.

use serde::{Deserialize, Deserializer, Serialize};

/// `GET /feeds` response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct FeedsResponse {
    pub data: Vec<RemoteSource>,
}

/// One subscribed source (a Farcaster fid) and its feed-content blocks.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSource {
    #[serde(deserialize_with = "de_fid")]
    pub fid: u64,
    #[serde(default)]
    pub feed_contents: Vec<FeedContent>,
}

/// One RSS/Atom channel belonging to a source.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct FeedContent {
    pub title: Option<String>,
    pub description: Option<String>,
    pub link: Option<String>,
    #[serde(default)]
    pub items: Vec<RawItem>,
}

/// One channel entry as produced by the upstream RSS parser.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawItem {
    pub author: Option<String>,
    pub title: Option<String>,
    pub link: Option<String>,
    pub pub_date: Option<String>,
    pub iso_date: Option<String>,
    pub content_snippet: Option<String>,
    pub content: Option<String>,
    pub guid: Option<String>,
    #[serde(default, deserialize_with = "de_categories")]
    pub categories: Vec<String>,
}

/// `POST /feeds/validate` request body.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRequest<'a> {
    pub feed_url: &'a str,
}

/// `POST /feeds/validate` response envelope.
#[derive(Debug, Clone, Deserialize)]
pub struct ValidateEnvelope {
    pub data: ValidateResponse,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateResponse {
    pub is_valid: bool,
    pub error: Option<String>,
}

/// `fid` is a uint256 on chain; the API sends it as a number or a numeric string.
fn de_fid<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Fid {
        Number(u64),
        Text(String),
    }

    match Fid::deserialize(deserializer)? {
        Fid::Number(n) => Ok(n),
        Fid::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid fid: {:?}", s))),
    }
}

/// Categories arrive either as strings or as `{"_": "name", "$": {...}}`
/// objects; anything else (and a JSON `null`) is dropped.
fn de_categories<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<Vec<serde_json::Value>> = Option::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .filter_map(|value| match value {
            serde_json::Value::String(s) => Some(s),
            serde_json::Value::Object(mut map) => match map.remove("_") {
                Some(serde_json::Value::String(s)) => Some(s),
                _ => None,
            },
            _ => None,
        })
        .collect())
}
