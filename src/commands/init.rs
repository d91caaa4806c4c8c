//! Initialize a new site

use anyhow::{bail, Result};
use std::fs;
use std::path::Path;

use crate::config::{ENV_ACCESS_TOKEN, ENV_API_ENDPOINT};

const CONFIG_TEMPLATE: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
language: pt-BR
timezone: ''

# URL
url: http://example.com
root: /

# Directory
public_dir: public
i18n_dir: languages

# Content service
## The endpoint and token can also come from PRISMIC_API_ENDPOINT and
## PRISMIC_ACCESS_TOKEN (or a .env file), which take precedence.
content_service:
  api_endpoint: https://your-repo.cdn.prismic.io/api/v2
  document_type: post

# Date / Time format
## Moment-style tokens; text inside [brackets] is printed as-is
date_formats:
  summary: DD MMM YYYY
  published: D [de] MMM[.] [de] YYYY
  updated: D [de] MMM[.] [de] YYYY, [às] HH:mm

# Seconds before an article page is regenerated
revalidate: 86400

# Show previous/next links under each article
post_navigation: false
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        bail!("Site already initialized: {:?}", config_path);
    }

    fs::create_dir_all(target_dir)?;
    fs::create_dir_all(target_dir.join("languages"))?;
    fs::write(&config_path, CONFIG_TEMPLATE)?;

    let env_example = format!(
        "{}=https://your-repo.cdn.prismic.io/api/v2\n{}=\n",
        ENV_API_ENDPOINT, ENV_ACCESS_TOKEN
    );
    fs::write(target_dir.join(".env.example"), env_example)?;

    Ok(())
}
