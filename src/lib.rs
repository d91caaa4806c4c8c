//! spacetraveling: a static blog generator backed by a headless CMS
//!
//! Posts are fetched from a Prismic-style content API and projected into a
//! listing page and one page per article, rendered with embedded Tera
//! templates. A small axum server serves the output, resolves articles that
//! were not pre-rendered and refreshes stale ones.

pub mod cache;
pub mod commands;
pub mod config;
pub mod content;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod pagination;
pub mod prismic;
pub mod server;
pub mod templates;

use anyhow::Result;
use std::path::{Path, PathBuf};

/// The main application: configuration plus resolved directories
#[derive(Debug, Clone)]
pub struct Spacetraveling {
    /// Site configuration, with environment overrides applied
    pub config: config::SiteConfig,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
    /// Language override directory
    pub i18n_dir: PathBuf,
}

impl Spacetraveling {
    /// Create a new instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let mut config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            tracing::debug!("No _config.yml in {:?}, using defaults", base_dir);
            config::SiteConfig::default()
        };
        config.apply_env();

        Ok(Self::with_config(base_dir, config))
    }

    /// Create an instance from an already loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> Self {
        let public_dir = base_dir.join(&config.public_dir);
        let i18n_dir = base_dir.join(&config.i18n_dir);

        Self {
            config,
            base_dir,
            public_dir,
            i18n_dir,
        }
    }

    /// Build a content client for published content
    pub fn client(&self) -> Result<prismic::ContentClient> {
        Ok(prismic::ContentClient::new(
            &self.config.content_service,
            prismic::RequestContext::default(),
        )?)
    }

    /// Clean the public directory and render manifest
    pub fn clean(&self) -> Result<()> {
        commands::clean::run(self)
    }
}
