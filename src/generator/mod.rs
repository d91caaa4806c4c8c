//! Generator module - writes the listing and article pages to the public dir

pub mod article;
pub mod listing;

use anyhow::{bail, Result};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Instant;

use crate::cache::RenderManifest;
use crate::config::SiteConfig;
use crate::content::Projector;
use crate::helpers::unix_now;
use crate::i18n::I18n;
use crate::prismic::{ContentResult, ContentSource};
use crate::templates::{PageRenderer, TemplateRenderer};
use crate::Spacetraveling;

use article::{build_article, enumerate_paths, ArticlePage, ArticleState};
use listing::{build_listing, ListingPage};

/// Counts reported by a generation run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GenerateSummary {
    /// Article pages written
    pub written: usize,
    /// Article pages still within their revalidation budget
    pub fresh: usize,
}

/// Static page generator
pub struct Generator {
    config: SiteConfig,
    base_dir: PathBuf,
    public_dir: PathBuf,
    source: Arc<dyn ContentSource>,
    projector: Projector,
    renderer: Box<dyn PageRenderer>,
    manifest: Mutex<RenderManifest>,
}

impl Generator {
    /// Create a new generator reading from `source`
    pub fn new(app: &Spacetraveling, source: Arc<dyn ContentSource>) -> Result<Self> {
        let mut i18n = I18n::new(&app.config.language);
        i18n.load_languages(&app.i18n_dir)?;
        let renderer = TemplateRenderer::new(&app.config, i18n)?;

        Ok(Self {
            config: app.config.clone(),
            base_dir: app.base_dir.clone(),
            public_dir: app.public_dir.clone(),
            source,
            projector: Projector::new(&app.config),
            renderer: Box::new(renderer),
            manifest: Mutex::new(RenderManifest::load(&app.base_dir)),
        })
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn source(&self) -> &dyn ContentSource {
        self.source.as_ref()
    }

    pub fn projector(&self) -> &Projector {
        &self.projector
    }

    pub fn renderer(&self) -> &dyn PageRenderer {
        self.renderer.as_ref()
    }

    /// Write the listing page and every article that is missing or stale
    /// (all of them with `force`), then save the manifest.
    pub async fn generate(&self, force: bool) -> Result<GenerateSummary> {
        let start = Instant::now();
        fs::create_dir_all(&self.public_dir)?;

        self.write_listing().await?;

        let uids = enumerate_paths(self.source(), &self.config).await?;
        let mut summary = GenerateSummary::default();
        for uid in &uids {
            if !force && !self.is_stale(uid) {
                summary.fresh += 1;
                continue;
            }
            self.write_article(uid).await?;
            summary.written += 1;
        }

        self.save_manifest()?;
        tracing::info!(
            "Generated {} article pages ({} up to date) in {:?}",
            summary.written,
            summary.fresh,
            start.elapsed()
        );

        Ok(summary)
    }

    /// Listing data, with the preview ref when one is given
    pub async fn listing_page(&self, preview_ref: Option<String>) -> ContentResult<ListingPage> {
        build_listing(self.source(), &self.config, &self.projector, preview_ref).await
    }

    /// Article data, with the preview ref when one is given
    pub async fn article_page(
        &self,
        uid: &str,
        preview_ref: Option<String>,
    ) -> ContentResult<ArticlePage> {
        build_article(self.source(), &self.config, &self.projector, uid, preview_ref).await
    }

    /// Build and write `index.html`
    pub async fn write_listing(&self) -> Result<PathBuf> {
        let page = self.listing_page(None).await?;
        let html = self.renderer.render_listing(&page)?;

        let output_path = self.public_dir.join("index.html");
        write_page(&output_path, &html)?;
        self.manifest().listing_generated_at = Some(unix_now());
        tracing::debug!("Generated: {:?}", output_path);

        Ok(output_path)
    }

    /// Build and write `post/<uid>/index.html`, recording it in the manifest
    pub async fn write_article(&self, uid: &str) -> Result<PathBuf> {
        let Some(relative) = article_output(uid) else {
            bail!("Refusing to write article with unsafe uid {:?}", uid);
        };

        let page = self.article_page(uid, None).await?;
        let html = self
            .renderer
            .render_article(&ArticleState::Ready(Box::new(page)))?;

        let output_path = self.public_dir.join(&relative);
        write_page(&output_path, &html)?;
        self.manifest()
            .record(uid, &relative.to_string_lossy(), unix_now());
        tracing::debug!("Generated post: {:?}", output_path);

        Ok(output_path)
    }

    /// Whether `uid` has no page yet or has outlived the revalidate budget
    pub fn is_stale(&self, uid: &str) -> bool {
        self.manifest()
            .is_stale(uid, unix_now(), self.config.revalidate)
    }

    /// Whether the listing is missing or has outlived the revalidate budget
    pub fn is_listing_stale(&self) -> bool {
        self.manifest()
            .is_listing_stale(unix_now(), self.config.revalidate)
    }

    /// Whether `uid` was ever generated
    pub fn is_generated(&self, uid: &str) -> bool {
        self.manifest().contains(uid)
    }

    /// Path of an article page inside the public dir, if the uid is usable
    /// as a directory name
    pub fn article_path(&self, uid: &str) -> Option<PathBuf> {
        article_output(uid).map(|relative| self.public_dir.join(relative))
    }

    pub fn save_manifest(&self) -> Result<()> {
        let manifest = self.manifest().clone();
        manifest.save(&self.base_dir)
    }

    fn manifest(&self) -> MutexGuard<'_, RenderManifest> {
        self.manifest.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// `post/<uid>/index.html`, or `None` when the uid would escape its directory
fn article_output(uid: &str) -> Option<PathBuf> {
    let usable = !uid.is_empty()
        && uid != "."
        && uid != ".."
        && !uid.contains(['/', '\\', '\0']);
    usable.then(|| Path::new("post").join(uid).join("index.html"))
}

fn write_page(path: &Path, html: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, html)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::prismic::testing::{post, MemorySource};
    use tempfile::TempDir;

    fn app(dir: &TempDir) -> Spacetraveling {
        let mut config = SiteConfig::default();
        config.title = "Blog".to_string();
        Spacetraveling::with_config(dir.path().to_path_buf(), config)
    }

    fn generator(dir: &TempDir, source: MemorySource) -> Generator {
        Generator::new(&app(dir), Arc::new(source)).unwrap()
    }

    #[tokio::test]
    async fn test_generate_writes_pages() {
        let dir = TempDir::new().unwrap();
        let source = MemorySource::new(vec![post("1", "a", "Alpha"), post("2", "b", "Beta")]);
        let generator = generator(&dir, source);

        let summary = generator.generate(false).await.unwrap();
        assert_eq!(summary, GenerateSummary { written: 2, fresh: 0 });

        let index = fs::read_to_string(dir.path().join("public/index.html")).unwrap();
        assert!(index.contains("Alpha"));
        assert!(index.contains("Beta"));

        let article = fs::read_to_string(dir.path().join("public/post/a/index.html")).unwrap();
        assert!(article.contains("<h1>Alpha</h1>"));
        assert!(dir.path().join("public/post/b/index.html").exists());

        let manifest = RenderManifest::load(dir.path());
        assert!(manifest.contains("a"));
        assert!(manifest.listing_generated_at.is_some());
        assert!(!generator.is_listing_stale());
    }

    #[tokio::test]
    async fn test_listing_stale_after_budget() {
        let dir = TempDir::new().unwrap();
        let mut config = SiteConfig::default();
        config.revalidate = 0;
        let app = Spacetraveling::with_config(dir.path().to_path_buf(), config);
        let generator = Generator::new(&app, Arc::new(MemorySource::new(vec![post("1", "a", "Alpha")])))
            .unwrap();

        assert!(generator.is_listing_stale());
        generator.write_listing().await.unwrap();
        // A zero budget makes every written page stale right away
        assert!(generator.is_listing_stale());
    }

    #[tokio::test]
    async fn test_generate_skips_fresh_pages() {
        let dir = TempDir::new().unwrap();
        let docs = vec![post("1", "a", "Alpha")];

        generator(&dir, MemorySource::new(docs.clone()))
            .generate(false)
            .await
            .unwrap();

        // A second generator picks the manifest up from disk
        let second = generator(&dir, MemorySource::new(docs.clone()));
        assert!(!second.is_stale("a"));
        assert_eq!(
            second.generate(false).await.unwrap(),
            GenerateSummary { written: 0, fresh: 1 }
        );

        let forced = generator(&dir, MemorySource::new(docs));
        assert_eq!(
            forced.generate(true).await.unwrap(),
            GenerateSummary { written: 1, fresh: 0 }
        );
    }

    #[tokio::test]
    async fn test_missing_article_fails() {
        let dir = TempDir::new().unwrap();
        let generator = generator(&dir, MemorySource::new(vec![post("1", "a", "Alpha")]));

        let err = generator.write_article("missing").await.unwrap_err();
        let content = err.downcast_ref::<crate::prismic::ContentError>().unwrap();
        assert!(content.is_not_found());
        assert!(!generator.is_generated("missing"));
    }

    #[test]
    fn test_article_output() {
        assert_eq!(
            article_output("como-utilizar-hooks"),
            Some(PathBuf::from("post/como-utilizar-hooks/index.html"))
        );
        assert_eq!(article_output(""), None);
        assert_eq!(article_output(".."), None);
        assert_eq!(article_output("a/b"), None);
    }
}
