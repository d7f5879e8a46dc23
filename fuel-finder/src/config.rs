//! Pipeline configuration.

use std::env::VarError;
use std::path::PathBuf;
use std::time::Duration;

use crate::dataset::{DEFAULT_TTL, DatasetClientConfig};
use crate::domain::Coordinates;
use crate::favorites::{FavoritesConfig, UserId};
use crate::geo::WatchOptions;

/// Directory for persisted state when none is configured.
pub const DEFAULT_DATA_DIR: &str = "./fuel-data";

/// Quiet period before a radius change is applied.
pub const DEFAULT_RADIUS_DEBOUNCE: Duration = Duration::from_millis(500);

/// Quiet period before a text query change is applied.
pub const DEFAULT_QUERY_DEBOUNCE: Duration = Duration::from_millis(300);

/// Invalid configuration value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {var}: {value:?}")]
    Invalid { var: String, value: String },
}

/// Everything needed to assemble a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub dataset: DatasetClientConfig,

    /// Maximum age of a cached snapshot before it is refetched.
    pub cache_ttl: Duration,

    /// Where the file-backed store keeps its entries.
    pub data_dir: PathBuf,

    pub radius_debounce: Duration,

    pub query_debounce: Duration,

    pub watch: WatchOptions,

    pub favorites: FavoritesConfig,

    /// Signed-in user at startup; anonymous when absent.
    pub user: Option<UserId>,

    /// Fixed position fed to the geolocation watch instead of a live sensor.
    pub position: Option<Coordinates>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            dataset: DatasetClientConfig::default(),
            cache_ttl: DEFAULT_TTL,
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            radius_debounce: DEFAULT_RADIUS_DEBOUNCE,
            query_debounce: DEFAULT_QUERY_DEBOUNCE,
            watch: WatchOptions::default(),
            favorites: FavoritesConfig::default(),
            user: None,
            position: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_dataset(mut self, dataset: DatasetClientConfig) -> Self {
        self.dataset = dataset;
        self
    }

    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }

    pub fn with_debounce(mut self, radius: Duration, query: Duration) -> Self {
        self.radius_debounce = radius;
        self.query_debounce = query;
        self
    }

    pub fn with_require_sign_in(mut self, require: bool) -> Self {
        self.favorites = self.favorites.with_require_sign_in(require);
        self
    }

    /// Defaults overridden by `FUEL_DATASET_URL`, `FUEL_DATA_DIR`,
    /// `FUEL_CACHE_TTL_MINS`, `FUEL_REQUIRE_SIGN_IN`, `FUEL_USER` and
    /// `FUEL_POSITION` (`"lat,lon"`).
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var))
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Result<String, VarError>,
    {
        let mut config = Self::default();

        if let Ok(url) = lookup("FUEL_DATASET_URL") {
            if url.trim().is_empty() {
                return Err(invalid("FUEL_DATASET_URL", url));
            }
            config.dataset.url = url;
        }

        if let Ok(dir) = lookup("FUEL_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }

        if let Ok(raw) = lookup("FUEL_CACHE_TTL_MINS") {
            let secs = raw
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|mins| *mins > 0)
                .and_then(|mins| mins.checked_mul(60))
                .ok_or_else(|| invalid("FUEL_CACHE_TTL_MINS", raw.clone()))?;
            config.cache_ttl = Duration::from_secs(secs);
        }

        if let Ok(raw) = lookup("FUEL_REQUIRE_SIGN_IN") {
            let require = parse_bool(&raw).ok_or_else(|| invalid("FUEL_REQUIRE_SIGN_IN", raw.clone()))?;
            config.favorites.require_sign_in = require;
        }

        if let Ok(raw) = lookup("FUEL_USER") {
            let user = raw.trim();
            if user.is_empty() {
                return Err(invalid("FUEL_USER", raw.clone()));
            }
            config.user = Some(UserId::new(user));
        }

        if let Ok(raw) = lookup("FUEL_POSITION") {
            let position = parse_position(&raw).ok_or_else(|| invalid("FUEL_POSITION", raw.clone()))?;
            config.position = Some(position);
        }

        Ok(config)
    }
}

fn invalid(var: &str, value: String) -> ConfigError {
    ConfigError::Invalid {
        var: var.to_string(),
        value,
    }
}

/// `"lat,lon"` in decimal degrees.
fn parse_position(raw: &str) -> Option<Coordinates> {
    let (lat, lon) = raw.split_once(',')?;
    Coordinates::new(lat.trim().parse().ok()?, lon.trim().parse().ok()?)
}

fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
