//! Raw documents and responses as returned by the content service

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A document as stored in the CMS
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    pub id: String,

    #[serde(default)]
    pub uid: Option<String>,

    #[serde(rename = "type", default)]
    pub doc_type: String,

    #[serde(default)]
    pub first_publication_date: Option<String>,

    #[serde(default)]
    pub last_publication_date: Option<String>,

    /// Custom-type fields (rich text, images, groups, ...)
    #[serde(default)]
    pub data: Value,
}

impl Document {
    /// Look up a field in `data`, yielding `Null` when missing
    pub fn field(&self, name: &str) -> &Value {
        self.data.get(name).unwrap_or(&Value::Null)
    }

    pub fn first_published(&self) -> Option<DateTime<FixedOffset>> {
        self.first_publication_date.as_deref().and_then(parse_date)
    }

    pub fn last_published(&self) -> Option<DateTime<FixedOffset>> {
        self.last_publication_date.as_deref().and_then(parse_date)
    }
}

/// Parse a publication timestamp. The service emits `+0000` offsets, which
/// RFC 3339 does not allow, so both spellings are accepted.
pub fn parse_date(s: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(s)
        .or_else(|_| DateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%z"))
        .ok()
}

/// One page of query results
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QueryResponse {
    pub page: u32,
    pub results_per_page: u32,
    pub results_size: u32,
    pub total_results_size: u32,
    pub total_pages: u32,
    /// Cursor URL for the following page; `None` on the last page
    pub next_page: Option<String>,
    pub prev_page: Option<String>,
    pub results: Vec<Document>,
}

/// The API root document, used to discover the master ref
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ApiInfo {
    pub refs: Vec<ApiRef>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiRef {
    pub id: String,
    #[serde(rename = "ref")]
    pub r#ref: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "isMasterRef", default)]
    pub is_master_ref: bool,
}

impl ApiInfo {
    pub fn master_ref(&self) -> Option<&str> {
        self.refs
            .iter()
            .find(|r| r.is_master_ref)
            .map(|r| r.r#ref.as_str())
    }
}
