use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

use ns_core::{Error, Result, Source};
use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Crawl settings, read from an optional TOML file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScrapeConfig {
    /// Per-request timeout in seconds (default: 30)
    pub timeout_secs: u64,

    /// User agent sent with every request
    pub user_agent: String,

    /// Sources to crawl, one `[[sources]]` table each
    pub sources: Vec<Source>,
}

impl Default for ScrapeConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            sources: default_sources(),
        }
    }
}

impl ScrapeConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut config: ScrapeConfig =
            toml::from_str(&raw).map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        config.assign_missing_ids();
        config.validate()?;
        debug!(path = %path.display(), sources = config.sources.len(), "Loaded configuration");
        Ok(config)
    }

    /// Loads `path` when given, otherwise the built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn active_sources(&self) -> Vec<&Source> {
        self.sources.iter().filter(|s| s.active).collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.timeout_secs == 0 {
            return Err(Error::Config("timeout_secs must be greater than zero".to_string()));
        }
        let mut slugs = HashSet::new();
        for source in &self.sources {
            if source.slug.trim().is_empty() {
                return Err(Error::Config(format!("source '{}' has an empty slug", source.name)));
            }
            if !slugs.insert(source.slug.as_str()) {
                return Err(Error::Config(format!("duplicate source slug '{}'", source.slug)));
            }
            Url::parse(&source.base_url)
                .map_err(|e| Error::Config(format!("source '{}' has an invalid base_url: {}", source.slug, e)))?;
        }
        Ok(())
    }

    // Sources read from TOML may omit ids.
    fn assign_missing_ids(&mut self) {
        let mut next = self.sources.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        for source in self.sources.iter_mut().filter(|s| s.id == 0) {
            source.id = next;
            next += 1;
        }
    }
}

pub fn default_sources() -> Vec<Source> {
    vec![
        Source::new(1, "The Guardian", "guardian", "https://www.theguardian.com/europe", "en")
            .with_sections(&["europe"]),
        Source::new(2, "Novinky.cz", "novinky", "https://www.novinky.cz/", "cs"),
        Source::new(3, "Ukrainska Pravda", "pravda", "https://www.pravda.com.ua/", "uk"),
    ]
}
