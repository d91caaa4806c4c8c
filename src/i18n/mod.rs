//! Internationalization (i18n) support
//!
//! UI strings ship with built-in `pt-BR` and `en` tables. A `languages/`
//! directory next to `_config.yml` may override any key per language with
//! `<lang>.yml` files.

use anyhow::Result;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

const BUILTIN_PT_BR: &str = r#"
load_more: Carregar mais posts
loading: Carregando...
exit_preview: Sair do modo Preview
edited_on: editado no dia
minutes: "%d min"
previous_post: Post anterior
next_post: Próximo post
not_found: Post não encontrado
"#;

const BUILTIN_EN: &str = r#"
load_more: Load more posts
loading: Loading...
exit_preview: Exit preview mode
edited_on: edited on
minutes: "%d min"
previous_post: Previous post
next_post: Next post
not_found: Post not found
"#;

type Table = HashMap<String, serde_yaml::Value>;

/// Internationalization handler
#[derive(Debug, Clone)]
pub struct I18n {
    /// Current language
    language: String,
    /// Language data: lang -> key -> translation
    translations: HashMap<String, Table>,
}

impl I18n {
    /// Create a handler with the built-in tables loaded
    pub fn new(language: &str) -> Self {
        let mut translations = HashMap::new();
        for (lang, source) in [("pt-BR", BUILTIN_PT_BR), ("en", BUILTIN_EN)] {
            match serde_yaml::from_str::<Table>(source) {
                Ok(table) => {
                    translations.insert(lang.to_string(), table);
                }
                Err(e) => tracing::error!("Built-in {} strings are invalid: {}", lang, e),
            }
        }

        Self {
            language: language.to_string(),
            translations,
        }
    }

    /// Merge language files from a directory over the built-in tables
    pub fn load_languages<P: AsRef<Path>>(&mut self, dir: P) -> Result<()> {
        let dir = dir.as_ref();
        if !dir.exists() {
            return Ok(());
        }

        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let ext = path.extension().and_then(|e| e.to_str());
            if !path.is_file() || !matches!(ext, Some("yml") | Some("yaml")) {
                continue;
            }

            let Some(lang) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };

            let content = fs::read_to_string(&path)?;
            match serde_yaml::from_str::<Table>(&content) {
                Ok(data) => {
                    self.translations
                        .entry(lang.to_string())
                        .or_default()
                        .extend(data);
                    tracing::debug!("Loaded language file: {:?}", path);
                }
                Err(e) => tracing::warn!("Failed to parse language file {:?}: {}", path, e),
            }
        }

        Ok(())
    }

    /// Get the current language
    pub fn language(&self) -> &str {
        &self.language
    }

    /// Get a translation by key, falling back to English and then the key
    pub fn get(&self, key: &str) -> String {
        self.lookup(&self.language, key)
            .or_else(|| self.lookup("en", key))
            .unwrap_or_else(|| key.to_string())
    }

    /// Get a translation with `%d` replaced by `count`
    pub fn get_count(&self, key: &str, count: u32) -> String {
        self.get(key).replace("%d", &count.to_string())
    }

    /// All keys for the current language, English filling the gaps
    pub fn get_all_translations(&self) -> HashMap<String, String> {
        let mut result = HashMap::new();
        for lang in [self.language.as_str(), "en"] {
            if let Some(table) = self.translations.get(lang) {
                for (key, value) in table {
                    if let Some(text) = value_to_string(value) {
                        result.entry(key.clone()).or_insert(text);
                    }
                }
            }
        }
        result
    }

    fn lookup(&self, lang: &str, key: &str) -> Option<String> {
        self.translations
            .get(lang)
            .and_then(|table| table.get(key))
            .and_then(value_to_string)
    }
}

fn value_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

impl Default for I18n {
    fn default() -> Self {
        Self::new("en")
    }
}
