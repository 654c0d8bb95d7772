use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::models::Coordinate;
use crate::services::{GeocoderConfig, RouteClientConfig};

/// Application configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub geocoder: GeocoderSettings,
    #[serde(default)]
    pub routing: RoutingSettings,
    #[serde(default)]
    pub corridor: CorridorSettings,
    #[serde(default)]
    pub matching: MatchingSettings,
    #[serde(default)]
    pub loads: LoadSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

#[derive(Debug, Clone, Deserialize)]
pub struct GeocoderSettings {
    #[serde(default = "default_geocoder_url")]
    pub base_url: String,
    /// Falls back to `MAPBOX_ACCESS_TOKEN`
    pub access_token: Option<String>,
    #[serde(default = "default_proximity_lat")]
    pub proximity_lat: f64,
    #[serde(default = "default_proximity_lng")]
    pub proximity_lng: f64,
    #[serde(default = "default_country")]
    pub country: String,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_geocode_cache_ttl_secs")]
    pub cache_ttl_secs: u64,
    #[serde(default = "default_geocode_cache_capacity")]
    pub cache_capacity: u64,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: default_geocoder_url(),
            access_token: None,
            proximity_lat: default_proximity_lat(),
            proximity_lng: default_proximity_lng(),
            country: default_country(),
            timeout_secs: default_request_timeout_secs(),
            cache_ttl_secs: default_geocode_cache_ttl_secs(),
            cache_capacity: default_geocode_cache_capacity(),
        }
    }
}

impl GeocoderSettings {
    pub fn to_client_config(&self) -> GeocoderConfig {
        GeocoderConfig {
            base_url: self.base_url.clone(),
            access_token: self.access_token.clone(),
            proximity: Coordinate::new(self.proximity_lat, self.proximity_lng),
            country: self.country.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
            cache_ttl: Duration::from_secs(self.cache_ttl_secs),
            cache_capacity: self.cache_capacity,
        }
    }
}

fn default_geocoder_url() -> String { "https://api.mapbox.com".to_string() }
// Davidson, NC
fn default_proximity_lat() -> f64 { 35.4993 }
fn default_proximity_lng() -> f64 { -80.8481 }
fn default_country() -> String { "us".to_string() }
fn default_request_timeout_secs() -> u64 { 10 }
fn default_geocode_cache_ttl_secs() -> u64 { 24 * 60 * 60 }
fn default_geocode_cache_capacity() -> u64 { 10_000 }

#[derive(Debug, Clone, Deserialize)]
pub struct RoutingSettings {
    #[serde(default = "default_routing_url")]
    pub base_url: String,
    /// Falls back to `PCMILER_API_KEY`
    pub api_key: Option<String>,
    #[serde(default = "default_request_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for RoutingSettings {
    fn default() -> Self {
        Self {
            base_url: default_routing_url(),
            api_key: None,
            timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl RoutingSettings {
    pub fn to_client_config(&self) -> RouteClientConfig {
        RouteClientConfig {
            base_url: self.base_url.clone(),
            api_key: self.api_key.clone(),
            timeout: Duration::from_secs(self.timeout_secs),
        }
    }
}

fn default_routing_url() -> String { "https://pcmiler.alk.com/apis/rest/v1.0/Service.svc".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct CorridorSettings {
    #[serde(default = "default_corridor_width")]
    pub width_miles: f64,
    #[serde(default = "default_clip_to_land")]
    pub clip_to_land: bool,
    #[serde(default = "default_corridor_ttl_secs")]
    pub cache_ttl_secs: u64,
}

impl Default for CorridorSettings {
    fn default() -> Self {
        Self {
            width_miles: default_corridor_width(),
            clip_to_land: default_clip_to_land(),
            cache_ttl_secs: default_corridor_ttl_secs(),
        }
    }
}

fn default_corridor_width() -> f64 { 25.0 }
fn default_clip_to_land() -> bool { true }
fn default_corridor_ttl_secs() -> u64 { 60 * 60 }

#[derive(Debug, Clone, Deserialize)]
pub struct MatchingSettings {
    #[serde(default = "default_limit")]
    pub default_limit: usize,
    #[serde(default = "default_max_limit")]
    pub max_limit: usize,
}

impl Default for MatchingSettings {
    fn default() -> Self {
        Self {
            default_limit: default_limit(),
            max_limit: default_max_limit(),
        }
    }
}

fn default_limit() -> usize { 50 }
fn default_max_limit() -> usize { 500 }

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoadSettings {
    /// JSON array of load records to seed the repository with
    pub seed_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

/// Output format of the tracing subscriber
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    /// Case-insensitive; unknown names get compact output
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Self::Json,
            "pretty" => Self::Pretty,
            _ => Self::Compact,
        }
    }
}

impl LoggingSettings {
    pub fn log_format(&self) -> LogFormat {
        LogFormat::parse(&self.format)
    }
}

fn environment() -> Environment {
    // e.g., BACKHAUL__SERVER__PORT -> server.port
    Environment::with_prefix("BACKHAUL")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, then config/local.toml)
    /// 3. Environment variables (prefixed with BACKHAUL__)
    /// 4. Provider secrets (MAPBOX_ACCESS_TOKEN, PCMILER_API_KEY)
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            .add_source(environment())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(environment())
            .build()?;

        substitute_env_vars(settings)?.try_deserialize()
    }

    /// Parse settings from TOML text, without consulting the environment
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from_str(text, FileFormat::Toml))
            .build()?
            .try_deserialize()
    }
}

/// Pick up provider secrets from their conventional variables
///
/// Only applied when the key is absent from files and `BACKHAUL__` variables.
fn substitute_env_vars(settings: Config) -> Result<Config, ConfigError> {
    use std::env;

    let mut builder = Config::builder().add_source(settings.clone());

    if settings.get_string("geocoder.access_token").is_err() {
        if let Ok(token) = env::var("MAPBOX_ACCESS_TOKEN") {
            builder = builder.set_override("geocoder.access_token", token)?;
        }
    }
    if settings.get_string("routing.api_key").is_err() {
        if let Ok(key) = env::var("PCMILER_API_KEY") {
            builder = builder.set_override("routing.api_key", key)?;
        }
    }

    builder.build()
}
