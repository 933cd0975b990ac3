//! Loading configuration from files and environment variables.
//!
//! Layers, later ones winning:
//!
//! 1. Built-in defaults
//! 2. A TOML or JSON file, chosen by extension
//! 3. `PALISADE_*` environment variables

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::{ConfigError, ConfigResult, GatewayConfig};

/// Prefix of the environment variables read by
/// [`GatewayConfig::with_env_overrides`].
pub const ENV_PREFIX: &str = "PALISADE_";

impl GatewayConfig {
    /// Loads configuration from a `.toml` or `.json` file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }

        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();

        let config = Self::from_str_format(&content, &extension)?;
        debug!(path = %path.display(), routes = config.routes.len(), "Configuration file loaded");
        Ok(config)
    }

    /// Parses configuration text in the given format (`toml` or `json`).
    ///
    /// ```
    /// use palisade_config::GatewayConfig;
    ///
    /// let config = GatewayConfig::from_str_format(
    ///     r#"
    ///     [server]
    ///     listen_port = 9090
    ///     "#,
    ///     "toml",
    /// )
    /// .unwrap();
    ///
    /// assert_eq!(config.server.listen_port, 9090);
    /// ```
    pub fn from_str_format(content: &str, format: &str) -> ConfigResult<Self> {
        match format.to_lowercase().as_str() {
            "toml" => Ok(toml::from_str(content)?),
            "json" => Ok(serde_json::from_str(content)?),
            other => Err(ConfigError::UnsupportedFormat(other.to_string())),
        }
    }

    /// Loads the given file, or the defaults when there is none, then applies
    /// environment overrides.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> ConfigResult<Self> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Applies `PALISADE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides_from(std::env::vars())
    }

    /// Applies `PALISADE_*` overrides from the given variables.
    ///
    /// Unknown `PALISADE_*` names are ignored.
    pub fn with_overrides_from<I, K, V>(mut self, vars: I) -> ConfigResult<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        for (key, value) in vars {
            let key = key.as_ref();
            if let Some(name) = key.strip_prefix(ENV_PREFIX) {
                self.apply_env_var(key, name, value.as_ref())?;
            }
        }
        Ok(self)
    }

    fn apply_env_var(&mut self, key: &str, name: &str, value: &str) -> ConfigResult<()> {
        match name {
            "LISTEN_ADDR" => self.server.listen_addr = value.to_string(),
            "LISTEN_PORT" => {
                self.server.listen_port = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected port number"))?;
            }
            "LOG_LEVEL" => self.logging.level = value.to_string(),
            "LOG_JSON" => {
                self.logging.json_format = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            "JWT_SECRET" => self.jwt.secret = value.to_string(),
            "CACHE_ENABLED" => {
                self.cache.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            "CACHE_DEFAULT_TTL" => {
                self.cache.default_ttl_seconds = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "CACHE_MAX_SIZE" => {
                self.cache.max_size = value
                    .parse()
                    .map_err(|_| ConfigError::env_parse_error(key, "expected integer"))?;
            }
            "OAUTH2_INTROSPECTION_URI" => self.oauth2.introspection_uri = value.to_string(),
            "OAUTH2_CLIENT_ID" => self.oauth2.client_id = value.to_string(),
            "OAUTH2_CLIENT_SECRET" => self.oauth2.client_secret = value.to_string(),
            "HEALTH_CHECK_BACKENDS" => {
                self.health.check_backends = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            "API_DOCS_ENABLED" => {
                self.api_docs.enabled = parse_bool(value)
                    .ok_or_else(|| ConfigError::env_parse_error(key, "expected boolean"))?;
            }
            _ => {
                debug!(var = key, "Ignoring unknown environment override");
            }
        }
        Ok(())
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
