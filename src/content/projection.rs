//! Projection of raw service documents into view models

use serde_json::Value;

use super::{reading_time, Banner, ContentBlock, DetailData, NavPost, PostDetail, PostSummary, SummaryData};
use crate::config::{DateFormatConfig, SiteConfig};
use crate::helpers::DateFormatter;
use crate::prismic::rich_text::{as_text, blocks};
use crate::prismic::Document;

/// Turns documents into summaries, details and navigation stubs
#[derive(Debug, Clone)]
pub struct Projector {
    dates: DateFormatter,
    formats: DateFormatConfig,
}

impl Projector {
    pub fn new(config: &SiteConfig) -> Self {
        Self {
            dates: DateFormatter::new(config),
            formats: config.date_formats.clone(),
        }
    }

    /// Listing entry: plain-text fields and the summary date pattern
    pub fn summary(&self, doc: &Document) -> PostSummary {
        PostSummary {
            uid: doc.uid.clone(),
            first_publication_date: self
                .dates
                .format(doc.first_publication_date.as_deref(), &self.formats.summary),
            data: SummaryData {
                title: as_text(doc.field("title")),
                subtitle: as_text(doc.field("subtitle")),
                author: as_text(doc.field("author")),
            },
        }
    }

    /// Full article with reading time
    pub fn detail(&self, doc: &Document) -> PostDetail {
        let content = content_blocks(doc.field("content"));
        let edited = match (doc.first_published(), doc.last_published()) {
            (Some(first), Some(last)) => last > first,
            _ => false,
        };

        PostDetail {
            uid: doc.uid.clone().unwrap_or_default(),
            first_publication_date: self
                .dates
                .format(doc.first_publication_date.as_deref(), &self.formats.published),
            reading_time: reading_time(&content),
            edited,
            data: DetailData {
                title: as_text(doc.field("title")),
                subtitle: as_text(doc.field("subtitle")),
                author: as_text(doc.field("author")),
                banner: Banner {
                    url: doc
                        .field("banner")
                        .get("url")
                        .and_then(Value::as_str)
                        .unwrap_or_default()
                        .to_string(),
                },
                last_publication_date: self
                    .dates
                    .format(doc.last_publication_date.as_deref(), &self.formats.updated),
                content,
            },
        }
    }

    /// Navigation stub; `None` for documents without a uid
    pub fn nav(&self, doc: &Document) -> Option<NavPost> {
        Some(NavPost {
            uid: doc.uid.clone()?,
            title: as_text(doc.field("title")),
        })
    }
}

/// Copy the `content` group verbatim: heading as text, body as blocks
pub fn content_blocks(field: &Value) -> Vec<ContentBlock> {
    let Some(items) = field.as_array() else {
        return Vec::new();
    };

    items
        .iter()
        .map(|item| ContentBlock {
            heading: as_text(item.get("heading").unwrap_or(&Value::Null)),
            body: blocks(item.get("body").unwrap_or(&Value::Null)),
        })
        .collect()
}
