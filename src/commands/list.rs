//! List posts from the content service

use anyhow::Result;

use crate::content::{PostSummary, Projector};
use crate::generator::listing::build_listing;
use crate::pagination::{LoadMore, PostFeed};
use crate::prismic::ContentSource;
use crate::Spacetraveling;

/// Print the first listing page, or every page with `all`
pub async fn run(app: &Spacetraveling, all: bool) -> Result<()> {
    let client = app.client()?;
    let posts = collect(app, &client, all).await?;

    println!("Posts ({}):", posts.len());
    for post in &posts.results {
        println!("  {}", format_line(post));
    }
    if posts.has_more {
        println!("  ... more posts available (use --all)");
    }

    Ok(())
}

/// Posts gathered for listing
#[derive(Debug)]
pub struct Listed {
    pub results: Vec<PostSummary>,
    pub has_more: bool,
}

impl Listed {
    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }
}

/// Fetch the first page and, with `all`, follow cursors until exhausted
pub async fn collect<S: ContentSource + ?Sized>(
    app: &Spacetraveling,
    source: &S,
    all: bool,
) -> Result<Listed> {
    let projector = Projector::new(&app.config);
    let first = build_listing(source, &app.config, &projector, None).await?;
    let feed = PostFeed::new(first.posts_pagination);

    if all {
        while let LoadMore::Appended(count) = feed.load_more(source, &projector).await? {
            tracing::debug!("Loaded {} more posts", count);
        }
    }

    let snapshot = feed.snapshot();
    Ok(Listed {
        has_more: snapshot.has_more(),
        results: snapshot.results,
    })
}

fn format_line(post: &PostSummary) -> String {
    format!(
        "{} - {} [{}]",
        post.first_publication_date.as_deref().unwrap_or("-"),
        post.data.title,
        post.uid.as_deref().unwrap_or("<no uid>")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use crate::prismic::testing::{post, MemorySource};
    use crate::prismic::QueryResponse;
    use tempfile::TempDir;

    const PAGE_2: &str = "https://blog.cdn.prismic.io/api/v2/documents/search?page=2";

    fn app(dir: &TempDir) -> Spacetraveling {
        let mut config = SiteConfig::default();
        config.language = "en".to_string();
        Spacetraveling::with_config(dir.path().to_path_buf(), config)
    }

    fn source() -> MemorySource {
        let mut source = MemorySource::new(vec![post("1", "a", "Alpha")]);
        source.next_page = Some(PAGE_2.to_string());
        source.pages.insert(
            PAGE_2.to_string(),
            QueryResponse {
                page: 2,
                results: vec![post("2", "b", "Beta")],
                ..Default::default()
            },
        );
        source
    }

    #[tokio::test]
    async fn test_first_page_only() {
        let dir = TempDir::new().unwrap();
        let source = source();
        let listed = collect(&app(&dir), &source, false).await.unwrap();

        assert_eq!(listed.len(), 1);
        assert!(listed.has_more);
        assert_eq!(source.fetches(), 0);
        assert_eq!(format_line(&listed.results[0]), "15 Mar 2021 - Alpha [a]");
    }

    #[tokio::test]
    async fn test_all_pages() {
        let dir = TempDir::new().unwrap();
        let source = source();
        let listed = collect(&app(&dir), &source, true).await.unwrap();

        assert_eq!(listed.len(), 2);
        assert!(!listed.has_more);
        assert_eq!(listed.results[1].data.title, "Beta");
        assert_eq!(source.fetches(), 1);
    }
}
