//! Built-in templates using the Tera template engine
//!
//! Templates are embedded in the binary. Autoescaping is on for every
//! template; the only values rendered with `| safe` are [`TrustedHtml`]
//! fragments produced from content-service rich text.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{Adjacency, NavPost, PostDetail, PostSummary};
use crate::generator::article::{ArticlePage, ArticleState};
use crate::generator::listing::ListingPage;
use crate::helpers::{full_url_for, post_path, url_for};
use crate::i18n::I18n;
use crate::prismic::rich_text::as_html;
use crate::prismic::TrustedHtml;

/// Seconds before a loading placeholder reloads itself
pub const LOADING_REFRESH_SECS: u32 = 2;

/// Turns page data into HTML
pub trait PageRenderer: Send + Sync {
    fn render_listing(&self, page: &ListingPage) -> Result<String>;

    /// `PathUnknown` and `Loading` both render the loading placeholder
    fn render_article(&self, state: &ArticleState) -> Result<String>;
}

/// Template renderer with the embedded site templates
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteView,
    translations: HashMap<String, String>,
    i18n: I18n,
    config: SiteConfig,
    root: String,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig, i18n: I18n) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("spacetraveling/layout.html")),
            ("index.html", include_str!("spacetraveling/index.html")),
            ("post.html", include_str!("spacetraveling/post.html")),
            ("loading.html", include_str!("spacetraveling/loading.html")),
            // Partials
            (
                "partials/header.html",
                include_str!("spacetraveling/partials/header.html"),
            ),
            (
                "partials/preview.html",
                include_str!("spacetraveling/partials/preview.html"),
            ),
        ])?;

        Ok(Self {
            tera,
            site: SiteView {
                title: config.title.clone(),
                description: config.description.clone(),
                language: i18n.language().to_string(),
            },
            translations: i18n.get_all_translations(),
            i18n,
            config: config.clone(),
            root: url_for(config, ""),
        })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    /// Context shared by every page
    fn base_context(&self, preview: bool, path: &str) -> Context {
        let mut context = Context::new();
        context.insert("canonical_url", &full_url_for(&self.config, path));
        context.insert("config", &self.site);
        context.insert("t", &self.translations);
        context.insert("preview", &preview);
        context.insert("home_url", &self.root);
        context.insert("exit_preview_url", &format!("{}api/exit-preview", self.root));
        context
    }

    fn post_url(&self, uid: &str) -> String {
        format!("{}{}", self.root, post_path(uid))
    }

    fn summary_view(&self, post: &PostSummary) -> SummaryView {
        SummaryView {
            url: post.uid.as_deref().map(|uid| self.post_url(uid)),
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            date: post.first_publication_date.clone(),
        }
    }

    fn article_view(&self, post: &PostDetail) -> ArticleView {
        ArticleView {
            title: post.data.title.clone(),
            subtitle: post.data.subtitle.clone(),
            author: post.data.author.clone(),
            banner: post.data.banner.url.clone(),
            date: post.first_publication_date.clone(),
            updated: post.data.last_publication_date.clone(),
            edited: post.edited,
            reading_time: self.i18n.get_count("minutes", post.reading_time),
            content: post
                .data
                .content
                .iter()
                .map(|block| SectionView {
                    heading: block.heading.clone(),
                    html: as_html(&block.body),
                })
                .collect(),
        }
    }

    fn navigation_view(&self, adjacency: &Adjacency) -> Option<NavigationView> {
        let empty = adjacency.prev_post.is_none() && adjacency.next_post.is_none();
        if !self.config.post_navigation || empty {
            return None;
        }

        let link = |nav: &NavPost| NavLink {
            url: self.post_url(&nav.uid),
            title: nav.title.clone(),
        };
        Some(NavigationView {
            prev: adjacency.prev_post.as_ref().map(link),
            next: adjacency.next_post.as_ref().map(link),
        })
    }

    fn render_ready(&self, page: &ArticlePage) -> Result<String> {
        let mut context = self.base_context(page.preview, &post_path(&page.post.uid));
        context.insert("post", &self.article_view(&page.post));
        context.insert("navigation", &self.navigation_view(&page.pagination));
        self.render("post.html", &context)
    }

    fn render_loading(&self) -> Result<String> {
        let mut context = self.base_context(false, "");
        context.insert("refresh_secs", &LOADING_REFRESH_SECS);
        self.render("loading.html", &context)
    }
}

impl PageRenderer for TemplateRenderer {
    fn render_listing(&self, page: &ListingPage) -> Result<String> {
        let pagination = &page.posts_pagination;
        let posts: Vec<SummaryView> = pagination
            .results
            .iter()
            .map(|post| self.summary_view(post))
            .collect();

        let mut context = self.base_context(page.preview, "");
        context.insert("posts", &posts);
        context.insert("next_page", &pagination.next_page);
        context.insert("load_more_url", &format!("{}api/posts", self.root));
        context.insert("post_root", &format!("{}post/", self.root));
        self.render("index.html", &context)
    }

    fn render_article(&self, state: &ArticleState) -> Result<String> {
        match state {
            ArticleState::PathUnknown | ArticleState::Loading => self.render_loading(),
            ArticleState::Ready(page) => self.render_ready(page),
        }
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
struct SiteView {
    title: String,
    description: String,
    language: String,
}

#[derive(Debug, Clone, Serialize)]
struct SummaryView {
    url: Option<String>,
    title: String,
    subtitle: String,
    author: String,
    date: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
struct ArticleView {
    title: String,
    subtitle: String,
    author: String,
    banner: String,
    date: Option<String>,
    updated: Option<String>,
    edited: bool,
    reading_time: String,
    content: Vec<SectionView>,
}

#[derive(Debug, Clone, Serialize)]
struct SectionView {
    heading: String,
    html: TrustedHtml,
}

#[derive(Debug, Clone, Serialize)]
struct NavigationView {
    prev: Option<NavLink>,
    next: Option<NavLink>,
}

#[derive(Debug, Clone, Serialize)]
struct NavLink {
    url: String,
    title: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::{
        Banner, ContentBlock, DetailData, PostsPagination, SummaryData,
    };
    use crate::prismic::RichTextBlock;

    fn renderer(post_navigation: bool) -> TemplateRenderer {
        let mut config = SiteConfig::default();
        config.title = "spacetraveling".to_string();
        config.post_navigation = post_navigation;
        TemplateRenderer::new(&config, I18n::new("pt-BR")).unwrap()
    }

    fn summary(uid: &str, title: &str) -> PostSummary {
        PostSummary {
            uid: Some(uid.to_string()),
            first_publication_date: Some("15 mar 2021".to_string()),
            data: SummaryData {
                title: title.to_string(),
                subtitle: "Subtitle".to_string(),
                author: "Joseph Oliveira".to_string(),
            },
        }
    }

    fn article(edited: bool, pagination: Adjacency) -> ArticleState {
        ArticleState::Ready(Box::new(ArticlePage {
            post: PostDetail {
                uid: "hooks".to_string(),
                first_publication_date: Some("15 mar 2021".to_string()),
                data: DetailData {
                    title: "Como utilizar <Hooks>".to_string(),
                    subtitle: String::new(),
                    author: "Joseph Oliveira".to_string(),
                    banner: Banner {
                        url: "https://images.prismic.io/banner.png".to_string(),
                    },
                    last_publication_date: Some("25 mar 2021, às 19:25".to_string()),
                    content: vec![ContentBlock {
                        heading: "Proin et varius".to_string(),
                        body: vec![RichTextBlock::paragraph("a < b")],
                    }],
                },
                reading_time: 4,
                edited,
            },
            pagination,
            preview: false,
        }))
    }

    #[test]
    fn test_listing_escapes_text() {
        let page = ListingPage {
            posts_pagination: PostsPagination {
                next_page: None,
                results: vec![summary("a", "<script>alert(1)</script>")],
            },
            preview: false,
        };
        let html = renderer(false).render_listing(&page).unwrap();

        assert!(html.contains("&lt;script&gt;alert(1)&lt;&#x2F;script&gt;"));
        assert!(!html.contains("<script>alert(1)"));
        assert!(html.contains("15 mar 2021"));
        assert!(!html.contains("id=\"load-more\""));
        assert!(!html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_load_more_iff_next_page() {
        let page = ListingPage {
            posts_pagination: PostsPagination {
                next_page: Some("https://blog.cdn.prismic.io/api/v2/documents/search?page=2".to_string()),
                results: vec![summary("a", "Alpha")],
            },
            preview: true,
        };
        let html = renderer(false).render_listing(&page).unwrap();

        assert!(html.contains("id=\"load-more\""));
        assert!(html.contains("Carregar mais posts"));
        assert!(html.contains("data-loading=\"Carregando...\""));
        assert!(html.contains("Sair do modo Preview"));
    }

    #[test]
    fn test_article_trusted_html_only() {
        let html = renderer(false)
            .render_article(&article(true, Adjacency::default()))
            .unwrap();

        // Text fields are escaped, rich text is rendered as markup
        assert!(html.contains("Como utilizar &lt;Hooks&gt;"));
        assert!(html.contains("<p>a &lt; b</p>"));
        assert!(html.contains("<h2>Proin et varius</h2>"));
        assert!(html.contains("4 min"));
        assert!(html.contains("editado no dia 25 mar 2021, às 19:25"));
        assert!(!html.contains("class=\"post-navigation\""));
    }

    #[test]
    fn test_article_not_edited() {
        let html = renderer(false)
            .render_article(&article(false, Adjacency::default()))
            .unwrap();
        assert!(!html.contains("editado no dia"));
    }

    #[test]
    fn test_navigation_when_enabled() {
        let adjacency = Adjacency {
            prev_post: Some(NavPost {
                uid: "a".to_string(),
                title: "Alpha".to_string(),
            }),
            next_post: None,
        };

        let hidden = renderer(false)
            .render_article(&article(false, adjacency.clone()))
            .unwrap();
        assert!(!hidden.contains("class=\"post-navigation\""));

        let shown = renderer(true).render_article(&article(false, adjacency)).unwrap();
        assert!(shown.contains("class=\"post-navigation\""));
        assert!(shown.contains("Alpha"));
        assert!(shown.contains("Post anterior"));
        assert!(!shown.contains("Próximo post"));
    }

    #[test]
    fn test_loading_states() {
        let renderer = renderer(false);
        for state in [ArticleState::PathUnknown, ArticleState::Loading] {
            let html = renderer.render_article(&state).unwrap();
            assert!(html.contains("Carregando..."));
            assert!(html.contains("http-equiv=\"refresh\""));
        }
    }
}
