//! Listing page: the first page of post summaries

use serde::Serialize;

use crate::config::SiteConfig;
use crate::content::{PostsPagination, Projector};
use crate::prismic::{ContentResult, ContentSource, Predicate, QueryOptions, QueryResponse};

/// Data handed to the listing template
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingPage {
    pub posts_pagination: PostsPagination,
    pub preview: bool,
}

/// Query for every post, projected to the fields a summary needs.
/// No ordering or page size: the service defaults apply.
pub fn listing_query(config: &SiteConfig, preview_ref: Option<String>) -> (Vec<Predicate>, QueryOptions) {
    let doc_type = &config.content_service.document_type;
    let options = QueryOptions::new()
        .fetch([
            format!("{}.title", doc_type),
            format!("{}.subtitle", doc_type),
            format!("{}.author", doc_type),
        ])
        .with_ref(preview_ref);

    (vec![Predicate::document_type(doc_type)], options)
}

/// Project a query response into a page of summaries, keeping its cursor
pub fn paginate(response: &QueryResponse, projector: &Projector) -> PostsPagination {
    PostsPagination {
        next_page: response.next_page.clone(),
        results: response.results.iter().map(|doc| projector.summary(doc)).collect(),
    }
}

/// Build the first listing page
pub async fn build_listing<S: ContentSource + ?Sized>(
    source: &S,
    config: &SiteConfig,
    projector: &Projector,
    preview_ref: Option<String>,
) -> ContentResult<ListingPage> {
    let preview = preview_ref.is_some();
    let (predicates, options) = listing_query(config, preview_ref);

    let response = source.query(&predicates, &options).await?;
    tracing::debug!(
        "Listing query returned {} posts (more: {})",
        response.results.len(),
        response.next_page.is_some()
    );

    Ok(ListingPage {
        posts_pagination: paginate(&response, projector),
        preview,
    })
}
