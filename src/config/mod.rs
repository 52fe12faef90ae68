//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `ATLAS_*` environment variables.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::cache::{EmbeddingCacheConfig, VectorCacheConfig};
use crate::constants::{
    DEFAULT_CACHE_TTL_SECS, DEFAULT_COMPLETION_MAX_TOKENS, DEFAULT_COMPLETION_MODEL,
    DEFAULT_COMPLETION_TEMPERATURE, DEFAULT_COST_PER_1K_COMPLETION, DEFAULT_COST_PER_1K_PROMPT,
    DEFAULT_EMBEDDING_CACHE_CAPACITY, DEFAULT_EMBEDDING_MODEL, DEFAULT_EMBEDDING_URL,
    DEFAULT_FALLBACK_TIMEOUT_SECS, DEFAULT_SIMILARITY_THRESHOLD, DEFAULT_VECTOR_CACHE_CAPACITY,
};
use crate::embedding::EmbeddingClientConfig;
use crate::generation::{CostModel, SamplingConfig};
use crate::resolver::ResolverConfig;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `ATLAS_*` overrides on top of defaults.
#[derive(Clone)]
pub struct Config {
    /// HTTP server port. Default: `8080`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Directory for the JSON-lines persistence store. Default: `./.data`.
    pub storage_path: PathBuf,

    /// Optional JSON file of POIs loaded into the spatial store at startup.
    pub seed_path: Option<PathBuf>,

    /// TTL shared by the vector and embedding caches. Default: 600 s.
    pub cache_ttl: Duration,

    pub vector_cache_capacity: u64,
    pub embedding_cache_capacity: u64,

    /// Minimum cosine similarity for a semantic hit. Default: `0.93`.
    pub similarity_threshold: f32,

    /// Bounded wait on the generative fallback. Default: 90 s.
    pub fallback_timeout: Duration,

    pub completion_model: String,
    pub completion_max_tokens: u32,
    pub completion_temperature: f64,

    pub embedding_url: String,
    pub embedding_model: String,
    pub embedding_api_key: Option<String>,

    /// USD per 1 000 prompt tokens.
    pub cost_per_1k_prompt: f64,
    /// USD per 1 000 completion tokens.
    pub cost_per_1k_completion: f64,

    /// Coalesce concurrent identical fallbacks. Default: `true`.
    pub single_flight: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            storage_path: PathBuf::from("./.data"),
            seed_path: None,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            vector_cache_capacity: DEFAULT_VECTOR_CACHE_CAPACITY,
            embedding_cache_capacity: DEFAULT_EMBEDDING_CACHE_CAPACITY,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            fallback_timeout: Duration::from_secs(DEFAULT_FALLBACK_TIMEOUT_SECS),
            completion_model: DEFAULT_COMPLETION_MODEL.to_string(),
            completion_max_tokens: DEFAULT_COMPLETION_MAX_TOKENS,
            completion_temperature: DEFAULT_COMPLETION_TEMPERATURE,
            embedding_url: DEFAULT_EMBEDDING_URL.to_string(),
            embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
            embedding_api_key: None,
            cost_per_1k_prompt: DEFAULT_COST_PER_1K_PROMPT,
            cost_per_1k_completion: DEFAULT_COST_PER_1K_COMPLETION,
            single_flight: true,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "ATLAS_PORT";
    const ENV_BIND_ADDR: &'static str = "ATLAS_BIND_ADDR";
    const ENV_STORAGE_PATH: &'static str = "ATLAS_STORAGE_PATH";
    const ENV_SEED_PATH: &'static str = "ATLAS_SEED_PATH";
    const ENV_CACHE_TTL_SECS: &'static str = "ATLAS_CACHE_TTL_SECS";
    const ENV_VECTOR_CACHE_CAPACITY: &'static str = "ATLAS_VECTOR_CACHE_CAPACITY";
    const ENV_EMBEDDING_CACHE_CAPACITY: &'static str = "ATLAS_EMBEDDING_CACHE_CAPACITY";
    const ENV_SIMILARITY_THRESHOLD: &'static str = "ATLAS_SIMILARITY_THRESHOLD";
    const ENV_FALLBACK_TIMEOUT_SECS: &'static str = "ATLAS_FALLBACK_TIMEOUT_SECS";
    const ENV_COMPLETION_MODEL: &'static str = "ATLAS_COMPLETION_MODEL";
    const ENV_COMPLETION_MAX_TOKENS: &'static str = "ATLAS_COMPLETION_MAX_TOKENS";
    const ENV_COMPLETION_TEMPERATURE: &'static str = "ATLAS_COMPLETION_TEMPERATURE";
    const ENV_EMBEDDING_URL: &'static str = "ATLAS_EMBEDDING_URL";
    const ENV_EMBEDDING_MODEL: &'static str = "ATLAS_EMBEDDING_MODEL";
    const ENV_EMBEDDING_API_KEY: &'static str = "ATLAS_EMBEDDING_API_KEY";
    const ENV_COST_PER_1K_PROMPT: &'static str = "ATLAS_COST_PER_1K_PROMPT";
    const ENV_COST_PER_1K_COMPLETION: &'static str = "ATLAS_COST_PER_1K_COMPLETION";
    const ENV_SINGLE_FLIGHT: &'static str = "ATLAS_SINGLE_FLIGHT";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            port: Self::parse_port_from_env(defaults.port)?,
            bind_addr: Self::parse_bind_addr_from_env(defaults.bind_addr)?,
            storage_path: Self::parse_path_from_env(Self::ENV_STORAGE_PATH, defaults.storage_path),
            seed_path: Self::parse_optional_string_from_env(Self::ENV_SEED_PATH).map(PathBuf::from),
            cache_ttl: Duration::from_secs(Self::parse_u64_from_env(
                Self::ENV_CACHE_TTL_SECS,
                defaults.cache_ttl.as_secs(),
            )),
            vector_cache_capacity: Self::parse_u64_from_env(
                Self::ENV_VECTOR_CACHE_CAPACITY,
                defaults.vector_cache_capacity,
            ),
            embedding_cache_capacity: Self::parse_u64_from_env(
                Self::ENV_EMBEDDING_CACHE_CAPACITY,
                defaults.embedding_cache_capacity,
            ),
            similarity_threshold: Self::parse_strict_from_env(
                Self::ENV_SIMILARITY_THRESHOLD,
                defaults.similarity_threshold,
            )?,
            fallback_timeout: Duration::from_secs(Self::parse_u64_from_env(
                Self::ENV_FALLBACK_TIMEOUT_SECS,
                defaults.fallback_timeout.as_secs(),
            )),
            completion_model: Self::parse_string_from_env(
                Self::ENV_COMPLETION_MODEL,
                defaults.completion_model,
            ),
            completion_max_tokens: Self::parse_strict_from_env(
                Self::ENV_COMPLETION_MAX_TOKENS,
                defaults.completion_max_tokens,
            )?,
            completion_temperature: Self::parse_strict_from_env(
                Self::ENV_COMPLETION_TEMPERATURE,
                defaults.completion_temperature,
            )?,
            embedding_url: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_URL,
                defaults.embedding_url,
            ),
            embedding_model: Self::parse_string_from_env(
                Self::ENV_EMBEDDING_MODEL,
                defaults.embedding_model,
            ),
            embedding_api_key: Self::parse_optional_string_from_env(Self::ENV_EMBEDDING_API_KEY),
            cost_per_1k_prompt: Self::parse_strict_from_env(
                Self::ENV_COST_PER_1K_PROMPT,
                defaults.cost_per_1k_prompt,
            )?,
            cost_per_1k_completion: Self::parse_strict_from_env(
                Self::ENV_COST_PER_1K_COMPLETION,
                defaults.cost_per_1k_completion,
            )?,
            single_flight: Self::parse_strict_from_env(
                Self::ENV_SINGLE_FLIGHT,
                defaults.single_flight,
            )?,
        })
    }

    /// Checks ranges and paths (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.storage_path.exists() && !self.storage_path.is_dir() {
            return Err(ConfigError::NotADirectory {
                path: self.storage_path.clone(),
            });
        }

        if let Some(ref path) = self.seed_path {
            if !path.exists() {
                return Err(ConfigError::PathNotFound { path: path.clone() });
            }
            if !path.is_file() {
                return Err(ConfigError::NotAFile { path: path.clone() });
            }
        }

        if !(self.similarity_threshold > 0.0 && self.similarity_threshold <= 1.0) {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_SIMILARITY_THRESHOLD,
                reason: format!("must be in (0, 1], got {}", self.similarity_threshold),
            });
        }
        if self.cache_ttl.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_CACHE_TTL_SECS,
                reason: "must be > 0".to_string(),
            });
        }
        if self.vector_cache_capacity == 0 || self.embedding_cache_capacity == 0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_VECTOR_CACHE_CAPACITY,
                reason: "cache capacities must be > 0".to_string(),
            });
        }
        if self.fallback_timeout.is_zero() {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_FALLBACK_TIMEOUT_SECS,
                reason: "must be > 0".to_string(),
            });
        }
        if self.cost_per_1k_prompt < 0.0 || self.cost_per_1k_completion < 0.0 {
            return Err(ConfigError::OutOfRange {
                name: Self::ENV_COST_PER_1K_PROMPT,
                reason: "cost rates must be >= 0".to_string(),
            });
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn vector_cache_config(&self) -> VectorCacheConfig {
        VectorCacheConfig::default()
            .similarity_threshold(self.similarity_threshold)
            .ttl(self.cache_ttl)
            .max_capacity(self.vector_cache_capacity)
    }

    pub fn embedding_cache_config(&self) -> EmbeddingCacheConfig {
        EmbeddingCacheConfig {
            ttl: self.cache_ttl,
            max_capacity: self.embedding_cache_capacity,
        }
    }

    pub fn embedding_client_config(&self) -> EmbeddingClientConfig {
        EmbeddingClientConfig {
            url: self.embedding_url.clone(),
            model: self.embedding_model.clone(),
            api_key: self.embedding_api_key.clone(),
            ..Default::default()
        }
    }

    pub fn sampling_config(&self) -> SamplingConfig {
        SamplingConfig {
            temperature: self.completion_temperature,
            max_tokens: self.completion_max_tokens,
        }
    }

    pub fn cost_model(&self) -> CostModel {
        CostModel {
            per_1k_prompt: self.cost_per_1k_prompt,
            per_1k_completion: self.cost_per_1k_completion,
        }
    }

    pub fn resolver_config(&self) -> ResolverConfig {
        ResolverConfig::default()
            .fallback_timeout(self.fallback_timeout)
            .single_flight(self.single_flight)
    }

    fn parse_port_from_env(default: u16) -> Result<u16, ConfigError> {
        match env::var(Self::ENV_PORT) {
            Ok(value) => {
                let port: u16 = value.parse().map_err(|e| ConfigError::PortParseError {
                    value: value.clone(),
                    source: e,
                })?;

                if port == 0 {
                    return Err(ConfigError::InvalidPort { value });
                }

                Ok(port)
            }
            Err(_) => Ok(default),
        }
    }

    fn parse_bind_addr_from_env(default: IpAddr) -> Result<IpAddr, ConfigError> {
        match env::var(Self::ENV_BIND_ADDR) {
            Ok(value) => value
                .parse()
                .map_err(|e| ConfigError::InvalidBindAddr { value, source: e }),
            Err(_) => Ok(default),
        }
    }

    fn parse_path_from_env(var_name: &str, default: PathBuf) -> PathBuf {
        env::var(var_name).map(PathBuf::from).unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_string_from_env(var_name: &str, default: String) -> String {
        Self::parse_optional_string_from_env(var_name).unwrap_or(default)
    }

    fn parse_u64_from_env(var_name: &str, default: u64) -> u64 {
        env::var(var_name)
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(default)
    }

    /// Like the lenient parsers, but a set-and-malformed value is an error.
    fn parse_strict_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => value.parse().map_err(|e: T::Err| ConfigError::InvalidValue {
                name: var_name,
                reason: e.to_string(),
                value,
            }),
            None => Ok(default),
        }
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("port", &self.port)
            .field("bind_addr", &self.bind_addr)
            .field("storage_path", &self.storage_path)
            .field("seed_path", &self.seed_path)
            .field("cache_ttl", &self.cache_ttl)
            .field("similarity_threshold", &self.similarity_threshold)
            .field("fallback_timeout", &self.fallback_timeout)
            .field("completion_model", &self.completion_model)
            .field("embedding_url", &self.embedding_url)
            .field("embedding_model", &self.embedding_model)
            .field(
                "embedding_api_key",
                &self.embedding_api_key.as_ref().map(|_| "<redacted>"),
            )
            .field("single_flight", &self.single_flight)
            .finish_non_exhaustive()
    }
}
