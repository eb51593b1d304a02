//! Environment-backed configuration.
//!
//! Every setting has a default. Override with `FACEGATE_*` environment
//! variables. Values that affect match decisions are parsed strictly: a
//! malformed value is an error, never a silent fallback.

pub mod error;


pub use error::ConfigError;

use std::env;
use std::fmt::Display;
use std::net::IpAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::assets::FingerprintMode;
use crate::embedding::{DEFAULT_EMBEDDING_DIM, FacePolicy, RemoteProviderConfig};
use crate::normalize::{DEFAULT_MAX_WIDTH, ImageNormalizer};
use crate::scoring::{DEFAULT_THRESHOLD, MatchOperator};
use crate::verify::VerifierConfig;

/// Model id reported for a remote provider when none is configured.
pub const DEFAULT_PROVIDER_MODEL: &str = "dlib-resnet-v1";

/// Default upload limit for verification requests (10 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Server configuration loaded from environment variables.
///
/// Use [`Config::from_env`] to read `FACEGATE_*` overrides on top of defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// HTTP server port. Default: `5000`.
    pub port: u16,

    /// IP address to bind to. Default: `127.0.0.1`.
    pub bind_addr: IpAddr,

    /// Directory holding one enrolled image per subject. Default: `./assets/users`.
    pub assets_dir: PathBuf,

    /// Directory for persisted reference embeddings. Default: `./.data/embeddings`.
    pub cache_dir: PathBuf,

    /// Match threshold on Euclidean distance. Default: `0.65`.
    pub threshold: f64,

    /// Distance/threshold comparison. Default: strict (`<`).
    pub match_operator: MatchOperator,

    /// Images wider than this are downscaled; `0` disables. Default: `800`.
    pub max_image_width: u32,

    /// Extraction service endpoint. Unset selects the stub provider.
    pub provider_url: Option<String>,

    /// Model id of the remote provider. Default: `dlib-resnet-v1`.
    pub provider_model: String,

    /// Embedding length of the remote provider. Default: `128`.
    pub embedding_dim: usize,

    /// Per-call provider timeout in milliseconds. Default: `10000`.
    pub provider_timeout_ms: u64,

    /// Max entries in the in-memory cache tier; `0` disables. Default: `10_000`.
    pub memory_cache_capacity: u64,

    /// Fail requests whose reference embedding cannot be persisted. Default: `false`.
    pub require_persistence: bool,

    /// How enrolled images are fingerprinted. Default: content hash.
    pub fingerprint_mode: FingerprintMode,

    /// Which face to use when several are detected. Default: first detected.
    pub face_policy: FacePolicy,

    /// Request body limit for uploads. Default: 10 MiB.
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 5000,
            bind_addr: IpAddr::V4(std::net::Ipv4Addr::new(127, 0, 0, 1)),
            assets_dir: PathBuf::from("./assets/users"),
            cache_dir: PathBuf::from("./.data/embeddings"),
            threshold: DEFAULT_THRESHOLD,
            match_operator: MatchOperator::default(),
            max_image_width: DEFAULT_MAX_WIDTH,
            provider_url: None,
            provider_model: DEFAULT_PROVIDER_MODEL.to_string(),
            embedding_dim: DEFAULT_EMBEDDING_DIM,
            provider_timeout_ms: 10_000,
            memory_cache_capacity: 10_000,
            require_persistence: false,
            fingerprint_mode: FingerprintMode::default(),
            face_policy: FacePolicy::default(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl Config {
    const ENV_PORT: &'static str = "FACEGATE_PORT";
    const ENV_BIND_ADDR: &'static str = "FACEGATE_BIND_ADDR";
    const ENV_ASSETS_DIR: &'static str = "FACEGATE_ASSETS_DIR";
    const ENV_CACHE_DIR: &'static str = "FACEGATE_CACHE_DIR";
    const ENV_THRESHOLD: &'static str = "FACEGATE_THRESHOLD";
    const ENV_MATCH_OPERATOR: &'static str = "FACEGATE_MATCH_OPERATOR";
    const ENV_MAX_IMAGE_WIDTH: &'static str = "FACEGATE_MAX_IMAGE_WIDTH";
    const ENV_PROVIDER_URL: &'static str = "FACEGATE_PROVIDER_URL";
    const ENV_PROVIDER_MODEL: &'static str = "FACEGATE_PROVIDER_MODEL";
    const ENV_EMBEDDING_DIM: &'static str = "FACEGATE_EMBEDDING_DIM";
    const ENV_PROVIDER_TIMEOUT_MS: &'static str = "FACEGATE_PROVIDER_TIMEOUT_MS";
    const ENV_MEMORY_CACHE_CAPACITY: &'static str = "FACEGATE_MEMORY_CACHE_CAPACITY";
    const ENV_REQUIRE_PERSISTENCE: &'static str = "FACEGATE_REQUIRE_PERSISTENCE";
    const ENV_FINGERPRINT: &'static str = "FACEGATE_FINGERPRINT";
    const ENV_FACE_POLICY: &'static str = "FACEGATE_FACE_POLICY";
    const ENV_MAX_UPLOAD_BYTES: &'static str = "FACEGATE_MAX_UPLOAD_BYTES";

    /// Loads configuration from environment variables (falling back to defaults).
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        Ok(Self {
            port: Self::parse_port_from_env(defaults.port)?,
            bind_addr: Self::parse_bind_addr_from_env(defaults.bind_addr)?,
            assets_dir: Self::parse_path_from_env(Self::ENV_ASSETS_DIR, defaults.assets_dir),
            cache_dir: Self::parse_path_from_env(Self::ENV_CACHE_DIR, defaults.cache_dir),
            threshold: Self::parse_from_env(Self::ENV_THRESHOLD, defaults.threshold)?,
            match_operator: Self::parse_from_env(
                Self::ENV_MATCH_OPERATOR,
                defaults.match_operator,
            )?,
            max_image_width: Self::parse_from_env(
                Self::ENV_MAX_IMAGE_WIDTH,
                defaults.max_image_width,
            )?,
            provider_url: Self::parse_optional_string_from_env(Self::ENV_PROVIDER_URL),
            provider_model: Self::parse_optional_string_from_env(Self::ENV_PROVIDER_MODEL)
                .unwrap_or(defaults.provider_model),
            embedding_dim: Self::parse_from_env(Self::ENV_EMBEDDING_DIM, defaults.embedding_dim)?,
            provider_timeout_ms: Self::parse_from_env(
                Self::ENV_PROVIDER_TIMEOUT_MS,
                defaults.provider_timeout_ms,
            )?,
            memory_cache_capacity: Self::parse_from_env(
                Self::ENV_MEMORY_CACHE_CAPACITY,
                defaults.memory_cache_capacity,
            )?,
            require_persistence: Self::parse_bool_from_env(
                Self::ENV_REQUIRE_PERSISTENCE,
                defaults.require_persistence,
            )?,
            fingerprint_mode: Self::parse_from_env(
                Self::ENV_FINGERPRINT,
                defaults.fingerprint_mode,
            )?,
            face_policy: Self::parse_from_env(Self::ENV_FACE_POLICY, defaults.face_policy)?,
            max_upload_bytes: Self::parse_from_env(
                Self::ENV_MAX_UPLOAD_BYTES,
                defaults.max_upload_bytes,
            )?,
        })
    }

    /// Validates invariants (does not create directories).
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.threshold.is_finite() || self.threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold {
                value: self.threshold,
            });
        }

        for (name, value) in [
            (Self::ENV_EMBEDDING_DIM, self.embedding_dim as u64),
            (Self::ENV_PROVIDER_TIMEOUT_MS, self.provider_timeout_ms),
            (Self::ENV_MAX_UPLOAD_BYTES, self.max_upload_bytes as u64),
        ] {
            if value == 0 {
                return Err(ConfigError::ZeroValue { name });
            }
        }

        if let Some(url) = &self.provider_url
            && !(url.starts_with("http://") || url.starts_with("https://"))
        {
            return Err(ConfigError::InvalidProviderUrl { value: url.clone() });
        }

        for path in [&self.assets_dir, &self.cache_dir] {
            if path.exists() && !path.is_dir() {
                return Err(ConfigError::NotADirectory { path: path.clone() });
            }
        }

        Ok(())
    }

    /// Returns `"{bind_addr}:{port}"` (useful for logging/binding).
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_millis(self.provider_timeout_ms)
    }

    pub fn normalizer(&self) -> ImageNormalizer {
        ImageNormalizer::new(Some(self.max_image_width))
    }

    /// Remote provider settings, or `None` when the stub should be used.
    pub fn remote_provider(&self) -> Option<RemoteProviderConfig> {
        self.provider_url.as_ref().map(|url| RemoteProviderConfig {
            url: url.clone(),
            model_id: self.provider_model.clone(),
            dimension: self.embedding_dim,
            timeout: self.provider_timeout(),
        })
    }

    pub fn verifier_config(&self) -> VerifierConfig {
        VerifierConfig {
            threshold: self.threshold,
            operator: self.match_operator,
            face_policy: self.face_policy,
            provider_timeout: self.provider_timeout(),
            require_persistence: self.require_persistence,
            normalizer: self.normalizer(),
        }
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
        Self::parse_optional_string_from_env(var_name)
            .map(PathBuf::from)
            .unwrap_or(default)
    }

    fn parse_optional_string_from_env(var_name: &str) -> Option<String> {
        env::var(var_name)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn parse_from_env<T>(var_name: &'static str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: Display,
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

    fn parse_bool_from_env(var_name: &'static str, default: bool) -> Result<bool, ConfigError> {
        match Self::parse_optional_string_from_env(var_name) {
            Some(value) => match value.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ConfigError::InvalidValue {
                    name: var_name,
                    value,
                    reason: "expected a boolean".to_string(),
                }),
            },
            None => Ok(default),
        }
    }
}
