//! Server configuration management

use std::path::{Path, PathBuf};
use std::time::Duration;

use indieauth::IndieAuthConfig;
use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// Environment variable prefix for configuration overrides
pub const ENV_PREFIX: &str = "INDIEAUTH";

/// Slack added on top of the slowest outbound sequence a handler can run
const TIMEOUT_MARGIN: Duration = Duration::from_secs(5);

/// Server configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Socket address to listen on
    pub bind: String,
    /// Public base URL; when unset it is derived from each request's `Host`
    pub public_url: Option<String>,
    /// Instance title shown on the login page
    pub title: String,
    /// Root signing secret; a random one is generated when unset
    #[serde(deserialize_with = "deserialize_secret")]
    pub secret: Option<SecretString>,
    /// Path of the login page; the callback lives at `<login_path>/done`
    pub login_path: String,
    /// Whole-request timeout in seconds; raised when discovery limits need longer
    pub request_timeout_secs: u64,
    /// Logging configuration
    pub logging: LoggingConfig,
    /// Engine configuration (`restrict_access`, `discovery`)
    #[serde(flatten)]
    pub indieauth: IndieAuthConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive; `RUST_LOG` takes precedence
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8001".to_string(),
            public_url: None,
            title: "IndieAuth".to_string(),
            secret: None,
            login_path: "/-/indieauth".to_string(),
            request_timeout_secs: 30,
            logging: LoggingConfig::default(),
            indieauth: IndieAuthConfig::default(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// Custom deserialization for SecretString
fn deserialize_secret<'de, D>(deserializer: D) -> Result<Option<SecretString>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s: Option<String> = Deserialize::deserialize(deserializer)?;
    Ok(s.filter(|s| !s.is_empty()).map(SecretString::new))
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Config file not found
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// Unsupported file format
    #[error("Unsupported configuration file format. Use .toml, .yaml, .yml, or .json")]
    UnsupportedFormat,

    /// Configuration parsing error
    #[error("Failed to parse configuration: {0}")]
    ParseError(#[from] config::ConfigError),

    /// A value parsed but is unusable
    #[error("Invalid configuration value for {field}: {reason}")]
    InvalidValue {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        reason: String,
    },
}

impl ServerConfig {
    /// Load configuration from a file (TOML, YAML, or JSON)
    ///
    /// Environment variables with the `INDIEAUTH_` prefix override file
    /// settings; nested keys use `__`, e.g. `INDIEAUTH_DISCOVERY__MAX_REDIRECTS=5`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file doesn't exist, has an unsupported
    /// extension, or contains invalid configuration.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        use config::{Config, File, FileFormat};

        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::FileNotFound(path.to_path_buf()));
        }

        let format = match path.extension().and_then(|s| s.to_str()) {
            Some("toml") => FileFormat::Toml,
            Some("yaml" | "yml") => FileFormat::Yaml,
            Some("json") => FileFormat::Json,
            _ => return Err(ConfigError::UnsupportedFormat),
        };

        let config = Config::builder()
            .add_source(File::new(path.to_str().ok_or(ConfigError::UnsupportedFormat)?, format))
            .add_source(environment())
            .build()?;

        let config: Self = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from `INDIEAUTH_` environment variables only
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds an invalid value.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(environment())
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Check values that deserialize fine but cannot work
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first bad field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.login_path.starts_with('/') || self.login_path.len() < 2 {
            return Err(ConfigError::InvalidValue {
                field: "login_path",
                reason: "must be an absolute path other than /".to_string(),
            });
        }
        self.public_base_url()?;
        Ok(())
    }

    /// The configured public base URL, parsed
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if `public_url` is not an
    /// absolute http(s) URL.
    pub fn public_base_url(&self) -> Result<Option<Url>, ConfigError> {
        let Some(raw) = &self.public_url else {
            return Ok(None);
        };
        let url = Url::parse(raw).map_err(|e| ConfigError::InvalidValue {
            field: "public_url",
            reason: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::InvalidValue {
                field: "public_url",
                reason: "scheme must be http or https".to_string(),
            });
        }
        Ok(Some(url))
    }

    /// Path of the callback endpoint
    pub fn callback_path(&self) -> String {
        format!("{}/done", self.login_path.trim_end_matches('/'))
    }

    /// Whole-request timeout applied to every route
    ///
    /// Never shorter than [`ServerConfig::outbound_worst_case`] plus a small
    /// margin, so a slow profile site surfaces as the inline login error
    /// instead of a bare `408`.
    pub fn request_timeout(&self) -> Duration {
        let configured = Duration::from_secs(self.request_timeout_secs);
        configured.max(self.outbound_worst_case().saturating_add(TIMEOUT_MARGIN))
    }

    /// Longest a single handler can spend on outbound requests
    ///
    /// The callback is the slowest route: one code exchange followed by a
    /// discovery that may follow `max_redirects` hops, each request bounded by
    /// the discovery request timeout.
    pub fn outbound_worst_case(&self) -> Duration {
        let discovery = &self.indieauth.discovery;
        let requests = u32::try_from(discovery.max_redirects)
            .unwrap_or(u32::MAX)
            .saturating_add(2);
        discovery.request_timeout().saturating_mul(requests)
    }
}

fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
        .separator("__")
        .try_parsing(true)
}
