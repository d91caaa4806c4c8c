//! Post view models
//!
//! These are the shapes handed to the templates (and, for summaries, to the
//! browser through the load-more endpoint). They are built fresh for every
//! render and never persisted.

use serde::{Deserialize, Serialize};

use crate::prismic::RichTextBlock;

/// A post as shown on the listing page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostSummary {
    pub uid: Option<String>,

    /// Already formatted with the summary date pattern
    pub first_publication_date: Option<String>,

    pub data: SummaryData,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A listing page of summaries plus the cursor for the next one
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PostsPagination {
    /// Present iff the service has more results
    pub next_page: Option<String>,
    pub results: Vec<PostSummary>,
}

impl PostsPagination {
    /// Whether a "load more" affordance should be offered
    pub fn has_more(&self) -> bool {
        self.next_page.is_some()
    }
}

/// A fully projected article
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostDetail {
    pub uid: String,

    pub first_publication_date: Option<String>,

    pub data: DetailData,

    /// Estimated minutes to read
    pub reading_time: u32,

    /// Republished after its first publication
    pub edited: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DetailData {
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub banner: Banner,
    pub last_publication_date: Option<String>,
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Banner {
    pub url: String,
}

/// A section of an article: a heading and its rich-text body
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<RichTextBlock>,
}

/// Link stub for previous/next navigation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavPost {
    pub uid: String,
    pub title: String,
}

/// Neighbours of an article; either side may be absent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Adjacency {
    pub prev_post: Option<NavPost>,
    pub next_post: Option<NavPost>,
}
