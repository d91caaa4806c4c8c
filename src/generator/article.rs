//! Article pages: path enumeration, detail fetch and navigation

use serde::Serialize;

use crate::config::SiteConfig;
use crate::content::adjacency::{adjacent, merge};
use crate::content::{Adjacency, NavPost, PostDetail, Projector};
use crate::prismic::{ContentResult, ContentSource, Document, Ordering, Predicate, QueryOptions};

/// An article page may be regenerated at most once a day
pub const REVALIDATE_SECS: u64 = 60 * 60 * 24;

/// Data handed to the article template
#[derive(Debug, Clone, Serialize)]
pub struct ArticlePage {
    pub post: PostDetail,
    pub pagination: Adjacency,
    pub preview: bool,
}

/// What the rendering layer shows for an article path
#[derive(Debug, Clone)]
pub enum ArticleState {
    /// Not pre-rendered and not requested yet
    PathUnknown,
    /// Requested; the document is being fetched
    Loading,
    /// Fetched and projected
    Ready(Box<ArticlePage>),
}

impl ArticleState {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Uids to pre-render, in service order. Documents without a uid are
/// skipped; anything beyond the first result page is left to the fallback.
pub async fn enumerate_paths<S: ContentSource + ?Sized>(
    source: &S,
    config: &SiteConfig,
) -> ContentResult<Vec<String>> {
    let predicates = [Predicate::document_type(&config.content_service.document_type)];
    let response = source.query(&predicates, &QueryOptions::new()).await?;

    if response.next_page.is_some() {
        tracing::debug!("More posts than one page; the rest resolve on first request");
    }

    Ok(response.results.into_iter().filter_map(|doc| doc.uid).collect())
}

/// Fetch and project one article
pub async fn build_article<S: ContentSource + ?Sized>(
    source: &S,
    config: &SiteConfig,
    projector: &Projector,
    uid: &str,
    preview_ref: Option<String>,
) -> ContentResult<ArticlePage> {
    let preview = preview_ref.is_some();
    let options = QueryOptions::new().with_ref(preview_ref);
    let doc = source
        .get_by_uid(&config.content_service.document_type, uid, &options)
        .await?;

    let pagination = resolve_adjacency(source, config, projector, &doc, &options).await?;
    let post = projector.detail(&doc);
    tracing::debug!("Projected {} ({} min read)", uid, post.reading_time);

    Ok(ArticlePage {
        post,
        pagination,
        preview,
    })
}

/// Find the neighbours of `current`. The list walked is `current` itself,
/// then the posts after it in service order, then the most recently
/// republished post after it, so the first following post is `next`.
pub async fn resolve_adjacency<S: ContentSource + ?Sized>(
    source: &S,
    config: &SiteConfig,
    projector: &Projector,
    current: &Document,
    base: &QueryOptions,
) -> ContentResult<Adjacency> {
    let doc_type = &config.content_service.document_type;
    let predicates = [Predicate::document_type(doc_type)];

    let following = source
        .query(
            &predicates,
            &base
                .clone()
                .after(&current.id)
                .fetch([format!("{}.title", doc_type)]),
        )
        .await?;

    let latest = source
        .query(
            &predicates,
            &base
                .clone()
                .after(&current.id)
                .page_size(1)
                .order_by(Ordering::desc("document.last_publication_date")),
        )
        .await?;

    let stubs = |docs: &[Document]| -> Vec<NavPost> {
        docs.iter().filter_map(|doc| projector.nav(doc)).collect()
    };
    let head: Vec<NavPost> = projector.nav(current).into_iter().collect();
    let combined = merge(merge(head, stubs(&following.results)), stubs(&latest.results));

    let uid = current.uid.as_deref().unwrap_or_default();
    Ok(adjacent(uid, &combined))
}
