use serde::Deserialize;
use std::path::Path;
use tracing::info;

use crate::collector::{MAX_RESULTS, MIN_RESULTS};

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct Config {
    pub database_url: String,
    /// Address the web interface listens on
    pub bind_addr: String,
    pub search: SearchConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_url: "sqlite:my_data.db?mode=rwc".to_string(),
            bind_addr: "0.0.0.0:3000".to_string(),
            search: SearchConfig::default(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct SearchConfig {
    pub endpoint: String,
    /// DuckDuckGo region code, e.g. `cn-zh` or `us-en`
    pub region: String,
    pub default_keyword: String,
    pub default_count: usize,
    /// HTTP timeout in seconds
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://html.duckduckgo.com/html/".to_string(),
            region: "cn-zh".to_string(),
            default_keyword: "人工智能".to_string(),
            default_count: 5,
            timeout_secs: 15,
            user_agent: "Mozilla/5.0 (compatible; IntelBoard/0.1)".to_string(),
        }
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    /// Parse config from a TOML string (useful for testing)
    pub fn from_str(content: &str) -> anyhow::Result<Self> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load the file if it exists, otherwise fall back to the built-in defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            info!("No config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    fn validate(&self) -> anyhow::Result<()> {
        let count = self.search.default_count;
        if !(MIN_RESULTS..=MAX_RESULTS).contains(&count) {
            anyhow::bail!(
                "search.default_count must be between {} and {}, got {}",
                MIN_RESULTS,
                MAX_RESULTS,
                count
            );
        }
        if self.search.timeout_secs == 0 {
            anyhow::bail!("search.timeout_secs must be positive");
        }
        Ok(())
    }
}
