use std::fmt;

use chrono::{DateTime, Utc};
use percent_encoding::percent_decode_str;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::WebmentionError;

/// One page of the jf2 feed returned by the mentions endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MentionPage {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub children: Vec<Mention>,
}

/// A single webmention as delivered by the endpoint and stored on disk.
///
/// `id` (`wm-id`) is the identity used for deduplication and ordering. Any
/// field the endpoint sends that is not modelled here lands in `extra` so a
/// stored collection survives a load/save cycle intact.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mention {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<Author>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
    #[serde(rename = "wm-received", default, skip_serializing_if = "Option::is_none")]
    pub received: Option<DateTime<Utc>>,
    #[serde(rename = "wm-id")]
    pub id: u64,
    #[serde(rename = "wm-source", default)]
    pub source: String,
    #[serde(rename = "wm-target", default)]
    pub target: String,
    #[serde(rename = "wm-protocol", default)]
    pub protocol: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<Content>,
    #[serde(rename = "in-reply-to", default, skip_serializing_if = "Option::is_none")]
    pub in_reply_to: Option<String>,
    #[serde(rename = "wm-property", default)]
    pub property: String,
    #[serde(rename = "wm-private", default)]
    pub private: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Author {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub photo: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Mention {
    pub fn slug(&self) -> Result<Slug, WebmentionError> {
        Slug::from_target(&self.target)
    }
}

/// Filename stem for the collection a mention belongs to, derived from the
/// path of its target URL: `https://example.com/a/b/` becomes `a--b`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Slug(String);

impl Slug {
    const SEPARATOR: &'static str = "--";
    const ROOT: &'static str = "index";

    pub fn from_target(target: &str) -> Result<Self, WebmentionError> {
        let slug_err = |reason: String| WebmentionError::Slug {
            target: target.to_string(),
            reason,
        };
        let url = Url::parse(target).map_err(|err| slug_err(err.to_string()))?;
        let raw = url
            .path_segments()
            .ok_or_else(|| slug_err("target has no path".to_string()))?;

        let mut segments = Vec::new();
        for segment in raw {
            let decoded = percent_decode_str(segment)
                .decode_utf8()
                .map_err(|err| slug_err(err.to_string()))?;
            if decoded.contains(['/', '\\']) || decoded == "." || decoded == ".." {
                return Err(slug_err(format!("unsafe path segment {decoded:?}")));
            }
            segments.push(decoded.into_owned());
        }

        let start = segments.iter().position(|s| !s.is_empty());
        let end = segments.iter().rposition(|s| !s.is_empty());
        match (start, end) {
            (Some(start), Some(end)) => Ok(Self(segments[start..=end].join(Self::SEPARATOR))),
            _ => Ok(Self(Self::ROOT.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Slug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
