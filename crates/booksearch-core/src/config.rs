use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::env;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Error;

pub struct Config {
    figment: Figment,
}

impl Config {
    pub fn load() -> anyhow::Result<Self> {
        let env_name = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());

        let mut figment = Figment::new().merge(Toml::file("config.toml"));
        match env_name.as_str() {
            "dev" | "development" => figment = figment.merge(Toml::file("config.dev.toml")),
            "prod" | "production" => figment = figment.merge(Toml::file("config.prod.toml")),
            "test" | "testing" => figment = figment.merge(Toml::file("config.test.toml")),
            _ => {}
        }
        figment = figment.merge(Env::prefixed("APP_").split("__"));

        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    /// Wrap an already assembled figment, e.g. one built from inline TOML.
    pub fn from_figment(figment: Figment) -> anyhow::Result<Self> {
        let config = Self { figment };
        config.validate()?;
        Ok(config)
    }

    pub fn get<T>(&self, key: &str) -> anyhow::Result<T>
    where
        T: serde::de::DeserializeOwned,
    {
        self.figment
            .extract_inner(key)
            .map_err(|e| anyhow::anyhow!("Failed to get '{}': {}", key, e))
    }

    /// The `[search]` section, falling back to defaults when it is absent.
    pub fn search(&self) -> anyhow::Result<SearchConfig> {
        if self.figment.contains("search") { self.get("search") } else { Ok(SearchConfig::default()) }
    }

    /// Directory relative document paths are resolved against (`data.document_dir`).
    pub fn document_dir(&self) -> PathBuf {
        let dir: String = self.get("data.document_dir").unwrap_or_else(|_| ".".to_string());
        expand_path(dir)
    }

    fn validate(&self) -> anyhow::Result<()> {
        self.search()?.validate()?;
        Ok(())
    }
}

/// Tuning knobs for the dispatcher and its worker pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Paragraphs per chunk handed to a worker.
    pub chunk_size: usize,
    /// Explicit worker count. `Some(0)` scores everything on the coordinator.
    pub workers: Option<usize>,
    /// Cores left free when `workers` is unset.
    pub reserved_cores: usize,
    /// Length of the ranked result list.
    pub top_k: usize,
    /// Upper bound on snapshots emitted per second; 0 disables pacing.
    pub max_emits_per_sec: u32,
    /// DP cell budget (needle chars x paragraph chars) per paragraph.
    pub max_match_cells: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            chunk_size: 10,
            workers: None,
            reserved_cores: 2,
            top_k: 10,
            max_emits_per_sec: 60,
            max_match_cells: 64 * 1024 * 1024,
        }
    }
}

impl SearchConfig {
    pub fn worker_count(&self) -> usize {
        if let Some(n) = self.workers {
            return n;
        }
        let available = std::thread::available_parallelism().map_or(1, NonZeroUsize::get);
        available.saturating_sub(self.reserved_cores).max(1)
    }

    pub fn emit_interval(&self) -> Duration {
        if self.max_emits_per_sec == 0 {
            Duration::ZERO
        } else {
            Duration::from_secs(1) / self.max_emits_per_sec
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::InvalidConfig("search.chunk_size must be at least 1".to_string()));
        }
        if self.top_k == 0 {
            return Err(Error::InvalidConfig("search.top_k must be at least 1".to_string()));
        }
        Ok(())
    }
}

/// Expand a user-provided path string:
/// - Expands leading '~' to the user's home directory
/// - Expands ${VAR} and $VAR environment variables
/// - Returns a PathBuf without attempting to canonicalize
pub fn expand_path<S: AsRef<str>>(input: S) -> PathBuf {
    let s = input.as_ref();
    let expanded_env = shellexpand::env(s).unwrap_or(std::borrow::Cow::Borrowed(s));
    let expanded = shellexpand::tilde(&expanded_env);
    PathBuf::from(expanded.as_ref())
}

/// Resolve a possibly relative path against a given base directory after expansion.
/// If `p` is absolute, it's returned as-is; otherwise `base.join(p)` is returned.
pub fn resolve_with_base<S: AsRef<str>>(base: &Path, p: S) -> PathBuf {
    let p = expand_path(p);
    if p.is_absolute() { p } else { base.join(p) }
}
