//! Content service (headless CMS) access
//!
//! [`ContentClient`] talks to the remote API; the generators only see the
//! [`ContentSource`] trait so they can run against any implementation.

mod client;
mod document;
mod error;
mod predicate;
pub mod rich_text;

use async_trait::async_trait;

pub use client::{ContentClient, RequestContext};
pub use document::{parse_date, ApiInfo, ApiRef, Document, QueryResponse};
pub use error::{ContentError, ContentResult};
pub use predicate::{to_query, Direction, Ordering, Predicate, QueryOptions};
pub use rich_text::{RichTextBlock, Span, TrustedHtml};

/// Read access to published (or previewed) documents
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Query documents matching every predicate
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> ContentResult<QueryResponse>;

    /// Fetch a single document by custom type and uid
    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        options: &QueryOptions,
    ) -> ContentResult<Document>;

    /// Fetch a single document by id
    async fn get_by_id(&self, id: &str, options: &QueryOptions) -> ContentResult<Document>;

    /// Follow a `next_page` cursor exactly as the service returned it
    async fn fetch_page(&self, url: &str) -> ContentResult<QueryResponse>;
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory [`ContentSource`] for generator tests

    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
    use std::sync::Mutex;

    #[derive(Default)]
    pub struct MemorySource {
        /// Documents in service order
        pub documents: Vec<Document>,
        /// Responses served by `fetch_page`, keyed by cursor URL
        pub pages: HashMap<String, QueryResponse>,
        /// `next_page` reported by `query`
        pub next_page: Option<String>,
        /// Every `query` call, for assertions
        pub queries: Mutex<Vec<(Vec<Predicate>, QueryOptions)>>,
        pub page_fetches: AtomicUsize,
        /// Delay applied in `fetch_page`, to widen race windows
        pub fetch_delay_ms: u64,
    }

    impl MemorySource {
        pub fn new(documents: Vec<Document>) -> Self {
            Self {
                documents,
                ..Default::default()
            }
        }

        pub fn fetches(&self) -> usize {
            self.page_fetches.load(AtomicOrdering::SeqCst)
        }
    }

    #[async_trait]
    impl ContentSource for MemorySource {
        async fn query(
            &self,
            predicates: &[Predicate],
            options: &QueryOptions,
        ) -> ContentResult<QueryResponse> {
            self.queries
                .lock()
                .unwrap()
                .push((predicates.to_vec(), options.clone()));

            let mut results: Vec<Document> = match &options.after {
                Some(id) => self
                    .documents
                    .iter()
                    .skip_while(|d| &d.id != id)
                    .skip(1)
                    .cloned()
                    .collect(),
                None => self.documents.clone(),
            };
            if options.orderings.is_some() {
                results.sort_by(|a, b| b.last_publication_date.cmp(&a.last_publication_date));
            }
            if let Some(size) = options.page_size {
                results.truncate(size as usize);
            }

            Ok(QueryResponse {
                page: 1,
                results_size: results.len() as u32,
                next_page: self.next_page.clone(),
                results,
                ..Default::default()
            })
        }

        async fn get_by_uid(
            &self,
            doc_type: &str,
            uid: &str,
            _options: &QueryOptions,
        ) -> ContentResult<Document> {
            self.documents
                .iter()
                .find(|d| d.uid.as_deref() == Some(uid))
                .cloned()
                .ok_or_else(|| ContentError::NotFound {
                    doc_type: doc_type.to_string(),
                    field: "uid",
                    value: uid.to_string(),
                })
        }

        async fn get_by_id(&self, id: &str, _options: &QueryOptions) -> ContentResult<Document> {
            self.documents
                .iter()
                .find(|d| d.id == id)
                .cloned()
                .ok_or_else(|| ContentError::NotFound {
                    doc_type: "document".to_string(),
                    field: "id",
                    value: id.to_string(),
                })
        }

        async fn fetch_page(&self, url: &str) -> ContentResult<QueryResponse> {
            self.page_fetches.fetch_add(1, AtomicOrdering::SeqCst);
            if self.fetch_delay_ms > 0 {
                tokio::time::sleep(std::time::Duration::from_millis(self.fetch_delay_ms)).await;
            }
            self.pages
                .get(url)
                .cloned()
                .ok_or_else(|| ContentError::NotFound {
                    doc_type: "page".to_string(),
                    field: "url",
                    value: url.to_string(),
                })
        }
    }

    /// A post document with rich-text title/subtitle/author
    pub fn post(id: &str, uid: &str, title: &str) -> Document {
        Document {
            id: id.to_string(),
            uid: Some(uid.to_string()),
            doc_type: "post".to_string(),
            first_publication_date: Some("2021-03-15T19:25:28+0000".to_string()),
            last_publication_date: Some("2021-03-25T19:25:28+0000".to_string()),
            data: serde_json::json!({
                "title": [{"type": "heading1", "text": title, "spans": []}],
                "subtitle": [{"type": "paragraph", "text": format!("About {}", title), "spans": []}],
                "author": [{"type": "paragraph", "text": "Joseph Oliveira", "spans": []}],
            }),
        }
    }
}
