//! Site configuration (_config.yml)

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Environment variable overriding `content_service.api_endpoint`
pub const ENV_API_ENDPOINT: &str = "PRISMIC_API_ENDPOINT";
/// Environment variable overriding `content_service.access_token`
pub const ENV_ACCESS_TOKEN: &str = "PRISMIC_ACCESS_TOKEN";

/// Main site configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    // Site
    pub title: String,
    pub description: String,
    pub language: String,
    pub timezone: String,

    // URL
    pub url: String,
    pub root: String,

    // Directory
    pub public_dir: String,
    pub i18n_dir: String,

    // Content service
    #[serde(default)]
    pub content_service: ContentServiceConfig,

    // Date / Time format
    #[serde(default)]
    pub date_formats: DateFormatConfig,

    /// Seconds an article page stays fresh before it is regenerated
    pub revalidate: u64,

    /// Render the previous/next links under each article
    pub post_navigation: bool,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            title: "spacetraveling".to_string(),
            description: String::new(),
            language: "pt-BR".to_string(),
            timezone: String::new(),

            url: "http://example.com".to_string(),
            root: "/".to_string(),

            public_dir: "public".to_string(),
            i18n_dir: "languages".to_string(),

            content_service: ContentServiceConfig::default(),
            date_formats: DateFormatConfig::default(),

            revalidate: crate::generator::article::REVALIDATE_SECS,
            post_navigation: false,
        }
    }
}

impl SiteConfig {
    /// Load configuration from a file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())?;
        let config: SiteConfig = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Apply `PRISMIC_API_ENDPOINT` / `PRISMIC_ACCESS_TOKEN` from the process
    /// environment. Called once at startup; the config is not mutated after.
    pub fn apply_env(&mut self) {
        self.apply_overrides(
            std::env::var(ENV_API_ENDPOINT).ok(),
            std::env::var(ENV_ACCESS_TOKEN).ok(),
        );
    }

    fn apply_overrides(&mut self, endpoint: Option<String>, token: Option<String>) {
        if let Some(endpoint) = endpoint.filter(|e| !e.trim().is_empty()) {
            tracing::debug!("Content service endpoint taken from {}", ENV_API_ENDPOINT);
            self.content_service.api_endpoint = endpoint;
        }
        if let Some(token) = token.filter(|t| !t.trim().is_empty()) {
            self.content_service.access_token = Some(token);
        }
    }

    /// Locale name understood by chrono (`pt-BR` -> `pt_BR`)
    pub fn chrono_locale(&self) -> String {
        self.language.replace('-', "_")
    }
}

/// Connection settings for the headless CMS
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentServiceConfig {
    /// API root, e.g. `https://my-repo.cdn.prismic.io/api/v2`
    pub api_endpoint: String,
    /// Permanent access token, if the repository is private
    pub access_token: Option<String>,
    /// Custom type holding blog posts
    pub document_type: String,
}

impl Default for ContentServiceConfig {
    fn default() -> Self {
        Self {
            api_endpoint: String::new(),
            access_token: None,
            document_type: "post".to_string(),
        }
    }
}

/// Date patterns (Moment.js style, `[...]` for literal text)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DateFormatConfig {
    /// First publication date on the listing page
    pub summary: String,
    /// First publication date on an article page
    pub published: String,
    /// Last publication date on an article page
    pub updated: String,
}

impl Default for DateFormatConfig {
    fn default() -> Self {
        Self {
            summary: "DD MMM YYYY".to_string(),
            published: "D [de] MMM[.] [de] YYYY".to_string(),
            updated: "D [de] MMM[.] [de] YYYY, [às] HH:mm".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SiteConfig::default();
        assert_eq!(config.title, "spacetraveling");
        assert_eq!(config.content_service.document_type, "post");
        assert_eq!(config.revalidate, 86_400);
        assert!(!config.post_navigation);
    }

    #[test]
    fn test_parse_config() {
        let yaml = r#"
title: My Blog
language: en
content_service:
  api_endpoint: https://blog.cdn.prismic.io/api/v2
  access_token: secret
date_formats:
  summary: YYYY-MM-DD
"#;
        let config: SiteConfig = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(config.title, "My Blog");
        assert_eq!(
            config.content_service.api_endpoint,
            "https://blog.cdn.prismic.io/api/v2"
        );
        assert_eq!(config.content_service.access_token.as_deref(), Some("secret"));
        assert_eq!(config.content_service.document_type, "post");
        assert_eq!(config.date_formats.summary, "YYYY-MM-DD");
        assert_eq!(config.date_formats.published, "D [de] MMM[.] [de] YYYY");
    }

    #[test]
    fn test_env_overrides() {
        let mut config = SiteConfig::default();
        config.content_service.api_endpoint = "https://old.example/api/v2".to_string();

        config.apply_overrides(None, Some("token".to_string()));
        assert_eq!(config.content_service.api_endpoint, "https://old.example/api/v2");
        assert_eq!(config.content_service.access_token.as_deref(), Some("token"));

        config.apply_overrides(Some("https://new.example/api/v2".to_string()), Some(" ".into()));
        assert_eq!(config.content_service.api_endpoint, "https://new.example/api/v2");
        assert_eq!(config.content_service.access_token.as_deref(), Some("token"));
    }

    #[test]
    fn test_chrono_locale() {
        let config = SiteConfig::default();
        assert_eq!(config.chrono_locale(), "pt_BR");
    }
}
