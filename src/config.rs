use config::{Config, Environment, File};
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub downloads: DownloadsConfig,
    #[serde(default)]
    pub gallery: GalleryConfig,
    #[serde(default)]
    pub query: QueryConfig,
    #[serde(default)]
    pub rate_limit: RateLimitConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            environment: default_environment(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8788
}
fn default_environment() -> String {
    "development".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct StorageConfig {
    /// When false the service runs without a store: write endpoints become
    /// silent no-ops and read endpoints answer 503.
    #[serde(default = "default_storage_enabled")]
    pub enabled: bool,
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
    #[serde(default = "default_pool_size")]
    pub pool_size: usize,
    #[serde(default = "default_purge_interval")]
    pub purge_interval_secs: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            enabled: default_storage_enabled(),
            path: default_storage_path(),
            pool_size: default_pool_size(),
            purge_interval_secs: default_purge_interval(),
        }
    }
}

fn default_storage_enabled() -> bool {
    true
}
fn default_storage_path() -> PathBuf {
    PathBuf::from("mula.db")
}
fn default_pool_size() -> usize {
    8
}
fn default_purge_interval() -> u64 {
    3600
}

#[derive(Debug, Deserialize, Clone)]
pub struct DownloadsConfig {
    /// Base of the GitHub releases page; installers live under `/latest/download/`.
    #[serde(default = "default_releases_url")]
    pub releases_url: String,
}

impl Default for DownloadsConfig {
    fn default() -> Self {
        Self {
            releases_url: default_releases_url(),
        }
    }
}

fn default_releases_url() -> String {
    "https://github.com/saintgo7/web-music-heartlib/releases".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct GalleryConfig {
    #[serde(default)]
    pub admin_api_key: String,
    #[serde(default = "default_seed_samples")]
    pub seed_samples: bool,
}

impl Default for GalleryConfig {
    fn default() -> Self {
        Self {
            admin_api_key: String::new(),
            seed_samples: default_seed_samples(),
        }
    }
}

fn default_seed_samples() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct QueryConfig {
    /// TTL of the stats/analytics response cache. 0 disables caching.
    #[serde(default)]
    pub cache_ttl_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct RateLimitConfig {
    #[serde(default = "default_per_second")]
    pub per_second: u64,
    #[serde(default = "default_burst_size")]
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_second: default_per_second(),
            burst_size: default_burst_size(),
        }
    }
}

fn default_per_second() -> u64 {
    10
}
fn default_burst_size() -> u32 {
    50
}

/// Admin keys shorter than this are rejected at startup.
const MIN_ADMIN_KEY_LEN: usize = 16;

impl AppConfig {
    /// Validate configuration before the server binds.
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("server.port must be non-zero".to_string());
        }
        if self.storage.enabled && self.storage.path.as_os_str().is_empty() {
            return Err("storage.path must be set when storage.enabled = true. \
                 Set it in config.toml or via MULA__STORAGE__PATH env var."
                .to_string());
        }
        let key = &self.gallery.admin_api_key;
        if !key.is_empty() && key.len() < MIN_ADMIN_KEY_LEN {
            return Err(format!(
                "gallery.admin_api_key must be at least {MIN_ADMIN_KEY_LEN} characters. \
                 Set a longer key in config.toml or via MULA__GALLERY__ADMIN_API_KEY env var."
            ));
        }
        if self.rate_limit.per_second == 0 || self.rate_limit.burst_size == 0 {
            return Err("rate_limit.per_second and rate_limit.burst_size must be non-zero".to_string());
        }
        Ok(())
    }

    pub fn load(config_path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = Config::builder();

        let path = config_path.unwrap_or("config.toml");
        builder = builder.add_source(File::with_name(path).required(false));

        // Overlay with environment variables (MULA__SERVER__PORT=8080, etc.)
        builder = builder.add_source(
            Environment::with_prefix("MULA")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }
}
