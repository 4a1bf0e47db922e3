//! Serializable application configuration.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or no file
//! at all) yields a working synthetic setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use crate::catalog::{Catalog, CatalogError};
use crate::data::{
    CircuitBreaker, DataError, FileProvider, HttpProvider, HttpSettings, SnapshotProvider,
    SyntheticProvider,
};
use crate::virtualize::{SizeModel, DEFAULT_OVERSCAN};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Catalog(#[from] CatalogError),

    #[error(transparent)]
    Provider(#[from] DataError),
}

/// Where snapshots come from.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    Http { base_url: String },
    File { path: PathBuf },
    Synthetic { assets_per_source: usize, seed: u64 },
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Synthetic {
            assets_per_source: 400,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct NetworkConfig {
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_delay_ms: u64,
    pub breaker_threshold: u32,
    pub breaker_cooldown_secs: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 15,
            max_retries: 3,
            retry_base_delay_ms: 500,
            breaker_threshold: 3,
            breaker_cooldown_secs: 300,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoaderConfig {
    /// Seconds after which a resolved scope counts as stale.
    pub freshness_secs: u64,
    /// Delay between staggered background prefetches.
    pub prefetch_stagger_ms: u64,
    /// Fetch worker pool size.
    pub worker_threads: usize,
    /// Category shown first.
    pub default_category: String,
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            freshness_secs: 60,
            prefetch_stagger_ms: 200,
            worker_threads: 4,
            default_category: "crypto".into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ViewConfig {
    pub overscan: usize,
    pub header_height: u32,
    pub subheader_height: u32,
    pub tile_row_height: u32,
    pub min_tile_width: u32,
    pub max_columns: usize,
    pub clock_interval_ms: u64,
}

impl Default for ViewConfig {
    fn default() -> Self {
        let sizes = SizeModel::default();
        Self {
            overscan: DEFAULT_OVERSCAN,
            header_height: sizes.header,
            subheader_height: sizes.subheader,
            tile_row_height: sizes.tile_row,
            min_tile_width: 26,
            max_columns: 8,
            clock_interval_ms: 1000,
        }
    }
}

impl ViewConfig {
    pub fn size_model(&self) -> SizeModel {
        SizeModel::new(self.header_height, self.subheader_height, self.tile_row_height)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PricewallConfig {
    pub provider: ProviderConfig,
    pub network: NetworkConfig,
    pub loader: LoaderConfig,
    pub view: ViewConfig,
    /// Optional catalog override; the built-in catalog is used otherwise.
    pub catalog_path: Option<PathBuf>,
}

/// Upper bound on HTTP retries per request.
pub const MAX_RETRIES: u32 = 10;

impl PricewallConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Load `path` when given, else the file at `default_path` if it exists,
    /// else built-in defaults.
    pub fn load_or_default(
        path: Option<&Path>,
        default_path: Option<&Path>,
    ) -> Result<Self, ConfigError> {
        match (path, default_path) {
            (Some(p), _) => Self::from_file(p),
            (None, Some(p)) if p.is_file() => Self::from_file(p),
            _ => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.view.max_columns == 0 {
            return Err(ConfigError::Invalid("view.max_columns must be at least 1".into()));
        }
        if self.loader.freshness_secs == 0 {
            return Err(ConfigError::Invalid("loader.freshness_secs must be at least 1".into()));
        }
        if self.network.max_retries > MAX_RETRIES {
            return Err(ConfigError::Invalid(format!(
                "network.max_retries must be at most {MAX_RETRIES}, got {}",
                self.network.max_retries
            )));
        }
        if self.loader.worker_threads == 0 {
            return Err(ConfigError::Invalid("loader.worker_threads must be at least 1".into()));
        }
        if let ProviderConfig::Http { base_url } = &self.provider {
            if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
                return Err(ConfigError::Invalid(format!(
                    "provider.base_url must be an http(s) URL, got '{base_url}'"
                )));
            }
        }
        Ok(())
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.loader.freshness_secs)
    }

    pub fn prefetch_stagger(&self) -> Duration {
        Duration::from_millis(self.loader.prefetch_stagger_ms)
    }

    pub fn clock_interval(&self) -> Duration {
        Duration::from_millis(self.view.clock_interval_ms.max(1))
    }

    pub fn load_catalog(&self) -> Result<Catalog, ConfigError> {
        match &self.catalog_path {
            Some(path) => Ok(Catalog::from_file(path)?),
            None => Ok(Catalog::default_catalog()),
        }
    }

    /// Build the configured provider. The synthetic provider covers every
    /// source in the catalog's navigation order.
    pub fn build_provider(
        &self,
        catalog: &Catalog,
    ) -> Result<Arc<dyn SnapshotProvider>, ConfigError> {
        let provider: Arc<dyn SnapshotProvider> = match &self.provider {
            ProviderConfig::Http { base_url } => {
                let breaker = Arc::new(CircuitBreaker::new(
                    Duration::from_secs(self.network.breaker_cooldown_secs),
                    self.network.breaker_threshold,
                ));
                let settings = HttpSettings {
                    base_url: base_url.clone(),
                    timeout: Duration::from_secs(self.network.timeout_secs),
                    max_retries: self.network.max_retries,
                    base_delay: Duration::from_millis(self.network.retry_base_delay_ms),
                };
                Arc::new(HttpProvider::new(settings, breaker)?)
            }
            ProviderConfig::File { path } => Arc::new(FileProvider::new(path.clone())),
            ProviderConfig::Synthetic {
                assets_per_source,
                seed,
            } => Arc::new(SyntheticProvider::new(
                catalog.navigation_order(),
                *assets_per_source,
                *seed,
            )),
        };
        Ok(provider)
    }
}
