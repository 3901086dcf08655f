use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::explain::DEFAULT_MAX_CHARS;
use crate::retrieve::DEFAULT_K;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub storage: StorageConfig,
    pub catalog: CatalogConfig,
    pub embed: EmbedConfig,
    pub explain: ExplainConfig,
    pub retrieval: RetrievalConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Where the .appraise cache directory lives (default: inside the root)
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Catalog dataset file: a JSON array of assessment rows
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbedConfig {
    pub backend: EmbedBackend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EmbedBackend {
    /// Deterministic offline feature-hashing embedder
    #[serde(rename = "hash")]
    Hash { dimensions: usize },
    #[serde(rename = "ollama")]
    Ollama { model: String, url: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExplainConfig {
    pub backend: ExplainBackend,
    /// How many ranked records `recommend` hands to the explainer
    pub top_k: usize,
    /// Upper bound on accepted generated text, in characters
    pub max_chars: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ExplainBackend {
    /// No generation backend; explanations come from the built-in template
    #[serde(rename = "template")]
    Template,
    #[serde(rename = "ollama")]
    Ollama {
        model: String,
        url: String,
        timeout_secs: u64,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// `k` used when a caller doesn't specify one
    pub default_k: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageConfig { path: None },
            catalog: CatalogConfig {
                path: PathBuf::from("data/catalog.json"),
            },
            embed: EmbedConfig {
                backend: EmbedBackend::Hash { dimensions: 256 },
            },
            explain: ExplainConfig {
                backend: ExplainBackend::Template,
                top_k: 5,
                max_chars: DEFAULT_MAX_CHARS,
            },
            retrieval: RetrievalConfig { default_k: DEFAULT_K },
        }
    }
}

impl Config {
    /// Load config from <root>/.appraise/config.toml, falling back to defaults.
    pub fn load(root: &Path) -> Result<Self> {
        let config_path = root.join(".appraise").join("config.toml");
        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)
                .with_context(|| format!("reading config from {}", config_path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("parsing config from {}", config_path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Resolve the actual storage directory path.
    pub fn storage_dir(&self, root: &Path) -> PathBuf {
        self.storage
            .path
            .clone()
            .unwrap_or_else(|| root.join(".appraise"))
    }

    /// Resolve the catalog dataset path relative to the root.
    pub fn catalog_path(&self, root: &Path) -> PathBuf {
        if self.catalog.path.is_absolute() {
            self.catalog.path.clone()
        } else {
            root.join(&self.catalog.path)
        }
    }

    /// Write current config to disk (for `appraise init`).
    pub fn save(&self, root: &Path) -> Result<()> {
        let dir = self.storage_dir(root);
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("creating storage dir {}", dir.display()))?;
        let config_path = dir.join("config.toml");
        let contents = toml::to_string_pretty(self)?;
        std::fs::write(&config_path, contents)
            .with_context(|| format!("writing config to {}", config_path.display()))?;
        Ok(())
    }
}
