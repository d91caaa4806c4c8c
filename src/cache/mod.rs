//! Render manifest for time-based revalidation
//!
//! Records when the listing and each article page were last generated so that `generate`
//! and the server can tell whether a page has outlived its revalidation
//! budget. Only timestamps are stored; derived content (reading time,
//! navigation) is always recomputed from the source documents.

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Cache directory, relative to the site base directory
pub const CACHE_DIR: &str = ".spacetraveling-cache";

/// Cache file name
const CACHE_FILE: &str = ".spacetraveling-cache/db.json";

/// Generation record for one article
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderEntry {
    /// When the page was written (unix timestamp)
    pub generated_at: u64,
    /// Output path relative to the public dir
    pub output_path: String,
}

/// Generation records keyed by uid
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RenderManifest {
    /// Version of the manifest format
    pub version: u32,
    /// When the listing page was written
    pub listing_generated_at: Option<u64>,
    pub articles: HashMap<String, RenderEntry>,
}

impl RenderManifest {
    /// Current manifest format version
    const VERSION: u32 = 1;

    /// Create an empty manifest with version set
    pub fn new() -> Self {
        Self {
            version: Self::VERSION,
            ..Default::default()
        }
    }

    /// Load the manifest from disk, or start empty
    pub fn load(base_dir: &Path) -> Self {
        let cache_path = base_dir.join(CACHE_FILE);
        if let Ok(content) = fs::read_to_string(&cache_path) {
            match serde_json::from_str::<RenderManifest>(&content) {
                Ok(manifest) if manifest.version == Self::VERSION => return manifest,
                Ok(_) => tracing::info!("Render manifest version mismatch, starting fresh"),
                Err(e) => tracing::warn!("Ignoring unreadable render manifest: {}", e),
            }
        }
        Self::new()
    }

    /// Save the manifest to disk
    pub fn save(&self, base_dir: &Path) -> Result<()> {
        fs::create_dir_all(base_dir.join(CACHE_DIR))?;

        let content = serde_json::to_string_pretty(self)?;
        fs::write(base_dir.join(CACHE_FILE), content)?;
        Ok(())
    }

    /// Whether `uid` has no page yet or its page is at least `revalidate`
    /// seconds old
    pub fn is_stale(&self, uid: &str, now: u64, revalidate: u64) -> bool {
        match self.articles.get(uid) {
            Some(entry) => now.saturating_sub(entry.generated_at) >= revalidate,
            None => true,
        }
    }

    /// Whether the listing has never been written or is at least
    /// `revalidate` seconds old
    pub fn is_listing_stale(&self, now: u64, revalidate: u64) -> bool {
        match self.listing_generated_at {
            Some(at) => now.saturating_sub(at) >= revalidate,
            None => true,
        }
    }

    /// Whether `uid` has been generated at all
    pub fn contains(&self, uid: &str) -> bool {
        self.articles.contains_key(uid)
    }

    /// Record that `uid` was written to `output_path` at `now`
    pub fn record(&mut self, uid: &str, output_path: &str, now: u64) {
        self.articles.insert(
            uid.to_string(),
            RenderEntry {
                generated_at: now,
                output_path: output_path.to_string(),
            },
        );
    }
}
