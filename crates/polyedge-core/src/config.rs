//! Deployment configuration.

use std::collections::HashMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{PlatformError, Result};
use crate::provider::Provider;

/// Environment variable selecting the provider.
pub const ENV_PROVIDER: &str = "POLYEDGE_PROVIDER";
/// Environment variable selecting the minimum log level.
pub const ENV_LOG_LEVEL: &str = "POLYEDGE_LOG_LEVEL";
/// Environment variable selecting the log format (`json` or `human`).
pub const ENV_LOG_FORMAT: &str = "POLYEDGE_LOG_FORMAT";
/// Environment variable naming the key-value namespace.
pub const ENV_KV_NAMESPACE: &str = "POLYEDGE_KV_NAMESPACE";

/// Configuration for one deployment of the abstraction layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Active provider.
    pub provider: Provider,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Key-value configuration.
    #[serde(default)]
    pub kv: KvConfig,

    /// Static environment values injected into every facade.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

/// File shape of [`PlatformConfig`]. The provider stays a string until it
/// is parsed, so unknown names report as `UnsupportedProvider`.
#[derive(Deserialize)]
struct ConfigFile {
    provider: String,
    #[serde(default)]
    logging: LoggingConfig,
    #[serde(default)]
    kv: KvConfig,
    #[serde(default)]
    env: HashMap<String, String>,
}

impl ConfigFile {
    fn into_config(self) -> Result<PlatformConfig> {
        Ok(PlatformConfig {
            provider: self.provider.parse()?,
            logging: self.logging,
            kv: self.kv,
            env: self.env,
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Minimum level: trace, debug, info, warn or error.
    #[serde(default = "default_level")]
    pub level: String,

    /// Output format: json or human.
    #[serde(default = "default_format")]
    pub format: String,
}

fn default_level() -> String {
    "info".to_string()
}

fn default_format() -> String {
    "json".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: default_format(),
        }
    }
}

/// Key-value configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct KvConfig {
    /// Namespace / store name bound in the provider.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

impl PlatformConfig {
    /// Minimal configuration for a provider.
    pub fn new(provider: Provider) -> Self {
        Self {
            provider,
            logging: LoggingConfig::default(),
            kv: KvConfig::default(),
            env: HashMap::new(),
        }
    }

    /// Load from a `.toml` or `.json` file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            PlatformError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        if path.extension().is_some_and(|ext| ext == "json") {
            Self::from_json_str(&content)
        } else {
            Self::from_toml_str(&content)
        }
    }

    /// Parse TOML.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str::<ConfigFile>(content)
            .map_err(|e| PlatformError::Config(e.to_string()))?
            .into_config()
    }

    /// Parse JSON.
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str::<ConfigFile>(content)
            .map_err(|e| PlatformError::Config(e.to_string()))?
            .into_config()
    }

    /// Build from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let provider = lookup(ENV_PROVIDER)
            .ok_or_else(|| PlatformError::MissingEnvVariable(ENV_PROVIDER.to_string()))?
            .parse()?;

        let mut config = Self::new(provider);
        if let Some(level) = lookup(ENV_LOG_LEVEL) {
            config.logging.level = level;
        }
        if let Some(format) = lookup(ENV_LOG_FORMAT) {
            config.logging.format = format;
        }
        config.kv.namespace = lookup(ENV_KV_NAMESPACE);
        Ok(config)
    }

    /// Add a static environment value.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_toml() {
        let config = PlatformConfig::from_toml_str(
            r#"
            provider = "fastly"

            [logging]
            level = "debug"

            [kv]
            namespace = "flags"

            [env]
            SDK_KEY = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.provider, Provider::Fastly);
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.kv.namespace.as_deref(), Some("flags"));
        assert_eq!(config.env.get("SDK_KEY").map(String::as_str), Some("abc"));
    }

    #[test]
    fn test_from_json() {
        let config = PlatformConfig::from_json_str(r#"{"provider": "akamai"}"#).unwrap();
        assert_eq!(config.provider, Provider::Akamai);
        assert_eq!(config.logging.level, "info");
        assert!(config.kv.namespace.is_none());
    }

    #[test]
    fn test_unsupported_provider_in_file() {
        let err = PlatformConfig::from_toml_str(r#"provider = "netlify""#).unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedProvider(name) if name == "netlify"));
    }

    #[test]
    fn test_unsupported_provider_in_json() {
        let err = PlatformConfig::from_json_str(r#"{"provider": "deno", "env": {}}"#).unwrap_err();
        assert!(matches!(err, PlatformError::UnsupportedProvider(name) if name == "deno"));
    }

    #[test]
    fn test_missing_provider_is_config_error() {
        let err = PlatformConfig::from_toml_str("[logging]\nlevel = \"warn\"").unwrap_err();
        assert!(matches!(err, PlatformError::Config(_)));
    }

    #[test]
    fn test_from_lookup() {
        let vars: HashMap<&str, &str> = [
            (ENV_PROVIDER, "vercel"),
            (ENV_LOG_FORMAT, "human"),
            (ENV_KV_NAMESPACE, "edge-kv"),
        ]
        .into_iter()
        .collect();

        let config =
            PlatformConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.provider, Provider::Vercel);
        assert_eq!(config.logging.format, "human");
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.kv.namespace.as_deref(), Some("edge-kv"));
    }

    #[test]
    fn test_from_lookup_missing_provider() {
        let err = PlatformConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, PlatformError::MissingEnvVariable(name) if name == ENV_PROVIDER));
    }

    #[test]
    fn test_load_json_file() {
        let path = std::env::temp_dir().join(format!(
            "polyedge-config-{}.json",
            std::process::id()
        ));
        std::fs::write(&path, r#"{"provider": "cloudflare", "env": {"A": "1"}}"#).unwrap();

        let config = PlatformConfig::load(&path).unwrap();
        std::fs::remove_file(&path).ok();

        assert_eq!(config.provider, Provider::Cloudflare);
        assert_eq!(config.env.get("A").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_load_missing_file() {
        let err = PlatformConfig::load("/nonexistent/polyedge.toml").unwrap_err();
        assert!(matches!(err, PlatformError::Config(_)));
    }
}
