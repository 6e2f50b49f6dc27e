//! Configuration management for recipe-relay
//!
//! Parses TOML configuration files and provides typed access to settings.
//! API keys never live in the file: they are read from the environment
//! (optionally seeded from a `.env` file) into [`Credentials`].

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Root configuration structure
///
/// Every section has defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub openai: OpenAiConfig,
    #[serde(default)]
    pub fal: FalConfig,
    #[serde(default)]
    pub static_files: StaticFilesConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

/// OpenAI-compatible API settings (text completion and image generation)
///
/// `temperature` and `max_tokens` are the defaults applied when a route
/// does not pass its own sampling overrides.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct OpenAiConfig {
    #[serde(default = "default_openai_base_url")]
    pub base_url: String,
    #[serde(default = "default_chat_model")]
    pub chat_model: String,
    #[serde(default = "default_temperature")]
    pub temperature: f64,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_image_model")]
    pub image_model: String,
    #[serde(default = "default_image_size")]
    pub image_size: String,
    #[serde(default = "default_image_quality")]
    pub image_quality: String,
    #[serde(default = "default_image_style")]
    pub image_style: String,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            base_url: default_openai_base_url(),
            chat_model: default_chat_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            image_model: default_image_model(),
            image_size: default_image_size(),
            image_quality: default_image_quality(),
            image_style: default_image_style(),
        }
    }
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_chat_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_temperature() -> f64 {
    0.8
}

fn default_max_tokens() -> u32 {
    100
}

fn default_image_model() -> String {
    "dall-e-3".to_string()
}

fn default_image_size() -> String {
    "1024x1024".to_string()
}

fn default_image_quality() -> String {
    "standard".to_string()
}

fn default_image_style() -> String {
    "vivid".to_string()
}

/// fal.ai queue settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FalConfig {
    #[serde(default = "default_fal_base_url")]
    pub base_url: String,
    /// Delay between queue status polls
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for FalConfig {
    fn default() -> Self {
        Self {
            base_url: default_fal_base_url(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl FalConfig {
    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }
}

fn default_fal_base_url() -> String {
    "https://queue.fal.run".to_string()
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Static asset serving
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticFilesConfig {
    /// Directory unmatched paths are resolved against
    #[serde(default = "default_static_root")]
    pub root: String,
    /// Where `GET /` redirects to
    #[serde(default = "default_landing_page")]
    pub landing_page: String,
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: default_static_root(),
            landing_page: default_landing_page(),
        }
    }
}

fn default_static_root() -> String {
    ".".to_string()
}

fn default_landing_page() -> String {
    "/public/scene3.html".to_string()
}

/// Observability configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> crate::error::AppResult<Self> {
        let path_display = path.as_ref().display().to_string();

        let content = std::fs::read_to_string(path.as_ref()).map_err(|source| {
            crate::error::AppError::ConfigFileRead {
                path: path_display.clone(),
                source,
            }
        })?;

        let config: Self = toml::from_str(&content).map_err(|source| {
            crate::error::AppError::ConfigParseFailed {
                path: path_display.clone(),
                source,
            }
        })?;

        config
            .validate()
            .map_err(|e| crate::error::AppError::ConfigValidationFailed {
                path: path_display,
                reason: e.to_string(),
            })?;

        Ok(config)
    }

    /// Validate value ranges that serde cannot express
    pub fn validate(&self) -> crate::error::AppResult<()> {
        use crate::error::AppError;

        if self.server.port == 0 {
            return Err(AppError::Config("server.port must be greater than 0".into()));
        }

        for (field, url) in [
            ("openai.base_url", &self.openai.base_url),
            ("fal.base_url", &self.fal.base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(AppError::Config(format!(
                    "{} must start with http:// or https://, got '{}'",
                    field, url
                )));
            }
        }

        let temperature = self.openai.temperature;
        if !temperature.is_finite() || !(0.0..=2.0).contains(&temperature) {
            return Err(AppError::Config(format!(
                "openai.temperature must be between 0.0 and 2.0, got {}",
                temperature
            )));
        }

        if self.openai.max_tokens == 0 {
            return Err(AppError::Config(
                "openai.max_tokens must be greater than 0".into(),
            ));
        }

        if self.fal.poll_interval_ms == 0 || self.fal.poll_interval_ms > 60_000 {
            return Err(AppError::Config(format!(
                "fal.poll_interval_ms must be in (0, 60000], got {}",
                self.fal.poll_interval_ms
            )));
        }

        if !self.static_files.landing_page.starts_with('/') {
            return Err(AppError::Config(format!(
                "static_files.landing_page must be an absolute path, got '{}'",
                self.static_files.landing_page
            )));
        }

        Ok(())
    }
}

/// API keys for the upstream services
///
/// Absence is not an error: the server still starts and the upstream
/// rejects the unauthenticated call.
#[derive(Clone, Default)]
pub struct Credentials {
    pub openai_api_key: Option<String>,
    pub fal_api_key: Option<String>,
}

impl Credentials {
    /// Read keys from the process environment
    ///
    /// `FAL_KEY` is accepted as an alias for `FAL_API_KEY`. Empty values
    /// count as absent.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        Self {
            openai_api_key: non_empty("OPENAI_API_KEY"),
            fal_api_key: non_empty("FAL_API_KEY").or_else(|| non_empty("FAL_KEY")),
        }
    }

    /// Log a warning for every missing key
    pub fn warn_missing(&self) {
        if self.openai_api_key.is_none() {
            tracing::warn!("No OPENAI_API_KEY in environment or .env file");
        }
        if self.fal_api_key.is_none() {
            tracing::warn!("No FAL_API_KEY in environment or .env file");
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redact = |key: &Option<String>| key.as_ref().map(|_| "<redacted>");
        f.debug_struct("Credentials")
            .field("openai_api_key", &redact(&self.openai_api_key))
            .field("fal_api_key", &redact(&self.fal_api_key))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config: Config = toml::from_str("").expect("empty config should parse");
        assert_eq!(config.server.port, 8000);
        assert_eq!(config.openai.chat_model, "gpt-3.5-turbo");
        assert_eq!(config.openai.max_tokens, 100);
        assert_eq!(config.fal.base_url, "https://queue.fal.run");
        assert_eq!(config.static_files.landing_page, "/public/scene3.html");
        assert_eq!(config.observability.log_level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let toml = r#"
[openai]
chat_model = "gpt-4o-mini"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert_eq!(config.openai.chat_model, "gpt-4o-mini");
        assert_eq!(config.openai.image_model, "dall-e-3");
        assert_eq!(config.openai.temperature, 0.8);
    }

    #[test]
    fn test_rejects_zero_port() {
        let config: Config = toml::from_str("[server]\nport = 0").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("server.port"));
    }

    #[test]
    fn test_rejects_base_url_without_scheme() {
        let config: Config = toml::from_str("[fal]\nbase_url = \"queue.fal.run\"").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("fal.base_url"));
    }

    #[test]
    fn test_rejects_out_of_range_temperature() {
        let config: Config = toml::from_str("[openai]\ntemperature = 2.5").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_poll_interval() {
        let config: Config = toml::from_str("[fal]\npoll_interval_ms = 0").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_relative_landing_page() {
        let config: Config =
            toml::from_str("[static_files]\nlanding_page = \"public/index.html\"").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_file_reports_missing_file() {
        let err = Config::from_file("/definitely/not/here/config.toml").unwrap_err();
        assert!(matches!(
            err,
            crate::error::AppError::ConfigFileRead { .. }
        ));
    }

    #[test]
    fn test_credentials_fal_key_alias() {
        let env: HashMap<&str, &str> = [("FAL_KEY", "fal-secret")].into_iter().collect();
        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(creds.fal_api_key.as_deref(), Some("fal-secret"));
        assert!(creds.openai_api_key.is_none());
    }

    #[test]
    fn test_credentials_prefers_fal_api_key() {
        let env: HashMap<&str, &str> = [("FAL_API_KEY", "primary"), ("FAL_KEY", "alias")]
            .into_iter()
            .collect();
        let creds = Credentials::from_lookup(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(creds.fal_api_key.as_deref(), Some("primary"));
    }

    #[test]
    fn test_credentials_blank_value_is_absent() {
        let creds = Credentials::from_lookup(|k| (k == "OPENAI_API_KEY").then(|| "  ".to_string()));
        assert!(creds.openai_api_key.is_none());
    }

    #[test]
    fn test_credentials_debug_redacts_keys() {
        let creds = Credentials {
            openai_api_key: Some("sk-very-secret".to_string()),
            fal_api_key: None,
        };
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("sk-very-secret"));
        assert!(debug.contains("<redacted>"));
    }
}
