//! Server configuration
//!
//! Precedence, lowest to highest: built-in defaults, config file (YAML or TOML),
//! environment variables, CLI flags.

use olhovivo_core::ApiToken;
use olhovivo_egress::olhovivo::DEFAULT_BASE_URL;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::warn;

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid TOML config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Environment variable not found: {var_name}")]
    EnvVarNotFound { var_name: String },
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default)]
    pub upstream: UpstreamConfig,

    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub cors: CorsConfig,
}

/// Olho Vivo upstream settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Literal token or a `$VAR` / `${VAR}` reference
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_token: Option<String>,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log one INFO line per completed search
    #[serde(default)]
    pub log_requests: bool,

    /// Emit JSON lines instead of human-readable output
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CorsConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            upstream: UpstreamConfig::default(),
            logging: LoggingConfig::default(),
            cors: CorsConfig::default(),
        }
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_token: None,
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            log_requests: false,
            json: false,
        }
    }
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl ServerConfig {
    /// Load configuration from a YAML or TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)?
        };

        Ok(config)
    }

    /// Apply environment overrides
    ///
    /// Runs before logging is initialized, so rejected values are reported on stderr.
    pub fn merge_env(&mut self) {
        // Upstream credentials keep their historical name
        if let Ok(token) = std::env::var("SPTRANS_API_KEY") {
            self.upstream.api_token = Some(token);
        }

        if let Ok(val) = std::env::var("OLHOVIVO_BASE_URL") {
            self.upstream.base_url = val;
        }

        if let Ok(val) = std::env::var("OLHOVIVO_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => self.upstream.timeout_secs = secs,
                Err(_) => eprintln!("Warning: Invalid OLHOVIVO_TIMEOUT_SECS '{}', ignoring", val),
            }
        }

        // Logging settings
        if let Ok(val) = std::env::var("OLHOVIVO_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("OLHOVIVO_LOG_REQUESTS") {
            match val.parse::<bool>() {
                Ok(enabled) => self.logging.log_requests = enabled,
                Err(_) => eprintln!("Warning: Invalid OLHOVIVO_LOG_REQUESTS '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("OLHOVIVO_LOG_JSON") {
            match val.parse::<bool>() {
                Ok(enabled) => self.logging.json = enabled,
                Err(_) => eprintln!("Warning: Invalid OLHOVIVO_LOG_JSON '{}', ignoring", val),
            }
        }

        // Server settings
        if let Ok(val) = std::env::var("OLHOVIVO_PORT") {
            match val.parse::<u16>() {
                Ok(port) => self.port = port,
                Err(_) => eprintln!("Warning: Invalid OLHOVIVO_PORT '{}', ignoring", val),
            }
        }

        if let Ok(val) = std::env::var("OLHOVIVO_HOST") {
            self.host = val;
        }
    }

    /// Resolve the configured token
    ///
    /// A missing, blank or unresolvable token yields `None`; the server still starts and
    /// answers searches with a configuration error.
    pub fn api_token(&self) -> Option<ApiToken> {
        let raw = self.upstream.api_token.as_deref()?;
        match resolve_env_var(raw) {
            Ok(value) => ApiToken::new(value),
            Err(e) => {
                warn!("Upstream token not resolved: {}", e);
                None
            }
        }
    }

    /// Copy of the configuration safe to print
    pub fn redacted(&self) -> Self {
        let mut config = self.clone();
        if let Some(token) = &mut config.upstream.api_token {
            // Keep variable references visible, they are not secrets
            if !token.trim().starts_with('$') {
                *token = "<redacted>".to_string();
            }
        }
        config
    }
}

/// Resolve a single environment variable reference
/// Supports: $VAR_NAME or ${VAR_NAME}
/// If no $ prefix, returns value as-is
fn resolve_env_var(value: &str) -> Result<String, ConfigError> {
    let trimmed = value.trim();

    if let Some(var_name) = trimmed.strip_prefix('$') {
        let var_name = var_name
            .strip_prefix('{')
            .and_then(|s| s.strip_suffix('}'))
            .unwrap_or(var_name);

        std::env::var(var_name).map_err(|_| ConfigError::EnvVarNotFound {
            var_name: var_name.to_string(),
        })
    } else {
        Ok(value.to_string())
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    15
}

fn default_connect_timeout_secs() -> u64 {
    5
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;

    const ENV_VARS: &[&str] = &[
        "SPTRANS_API_KEY",
        "OLHOVIVO_BASE_URL",
        "OLHOVIVO_TIMEOUT_SECS",
        "OLHOVIVO_LOG_LEVEL",
        "OLHOVIVO_LOG_REQUESTS",
        "OLHOVIVO_LOG_JSON",
        "OLHOVIVO_PORT",
        "OLHOVIVO_HOST",
    ];

    fn clear_env() {
        for var in ENV_VARS {
            unsafe {
                std::env::remove_var(var);
            }
        }
    }

    #[test]
    fn test_defaults() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 3000);
        assert_eq!(config.upstream.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.upstream.timeout_secs, 15);
        assert_eq!(config.upstream.connect_timeout_secs, 5);
        assert!(config.upstream.api_token.is_none());
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.log_requests);
        assert!(config.cors.enabled);
    }

    #[test]
    fn test_from_yaml_file() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(
            file,
            r#"
port: 8080
upstream:
  base_url: "http://localhost:9000/v2.1"
  api_token: "abc123"
logging:
  level: debug
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.upstream.base_url, "http://localhost:9000/v2.1");
        assert_eq!(config.upstream.api_token.as_deref(), Some("abc123"));
        assert_eq!(config.upstream.timeout_secs, 15);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_from_toml_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
host = "0.0.0.0"

[upstream]
timeout_secs = 30

[cors]
enabled = false
"#
        )
        .unwrap();

        let config = ServerConfig::from_file(file.path()).unwrap();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.upstream.timeout_secs, 30);
        assert!(!config.cors.enabled);
    }

    #[test]
    fn test_from_file_invalid_yaml() {
        let mut file = tempfile::Builder::new().suffix(".yaml").tempfile().unwrap();
        writeln!(file, "port: [not a number").unwrap();

        let err = ServerConfig::from_file(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }

    #[test]
    fn test_from_file_missing() {
        let err = ServerConfig::from_file("/nonexistent/olhovivo.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }

    #[test]
    #[serial]
    fn test_merge_env_overrides() {
        clear_env();
        unsafe {
            std::env::set_var("SPTRANS_API_KEY", "from-env");
            std::env::set_var("OLHOVIVO_PORT", "4000");
            std::env::set_var("OLHOVIVO_HOST", "0.0.0.0");
            std::env::set_var("OLHOVIVO_LOG_REQUESTS", "true");
            std::env::set_var("OLHOVIVO_TIMEOUT_SECS", "7");
            std::env::set_var("OLHOVIVO_BASE_URL", "http://mirror.local/v2.1");
        }

        let mut config = ServerConfig::default();
        config.upstream.api_token = Some("from-file".to_string());
        config.merge_env();

        assert_eq!(config.upstream.api_token.as_deref(), Some("from-env"));
        assert_eq!(config.port, 4000);
        assert_eq!(config.host, "0.0.0.0");
        assert!(config.logging.log_requests);
        assert_eq!(config.upstream.timeout_secs, 7);
        assert_eq!(config.upstream.base_url, "http://mirror.local/v2.1");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_merge_env_ignores_invalid_values() {
        clear_env();
        unsafe {
            std::env::set_var("OLHOVIVO_PORT", "not-a-port");
            std::env::set_var("OLHOVIVO_LOG_REQUESTS", "maybe");
        }

        let mut config = ServerConfig::default();
        config.merge_env();

        assert_eq!(config.port, 3000);
        assert!(!config.logging.log_requests);

        clear_env();
    }

    #[test]
    #[serial]
    fn test_api_token_literal() {
        clear_env();
        let mut config = ServerConfig::default();
        config.upstream.api_token = Some("literal-token".to_string());

        assert_eq!(config.api_token().unwrap().expose(), "literal-token");
    }

    #[test]
    #[serial]
    fn test_api_token_env_reference() {
        unsafe {
            std::env::set_var("OLHOVIVO_TEST_TOKEN", "resolved-token");
        }

        let mut config = ServerConfig::default();
        config.upstream.api_token = Some("${OLHOVIVO_TEST_TOKEN}".to_string());
        assert_eq!(config.api_token().unwrap().expose(), "resolved-token");

        config.upstream.api_token = Some("$OLHOVIVO_TEST_TOKEN".to_string());
        assert_eq!(config.api_token().unwrap().expose(), "resolved-token");

        unsafe {
            std::env::remove_var("OLHOVIVO_TEST_TOKEN");
        }
    }

    #[test]
    #[serial]
    fn test_api_token_unresolved_reference_is_none() {
        unsafe {
            std::env::remove_var("OLHOVIVO_TEST_MISSING_TOKEN");
        }

        let mut config = ServerConfig::default();
        config.upstream.api_token = Some("$OLHOVIVO_TEST_MISSING_TOKEN".to_string());
        assert!(config.api_token().is_none());
    }

    #[test]
    fn test_api_token_blank_is_none() {
        let mut config = ServerConfig::default();
        config.upstream.api_token = Some("   ".to_string());
        assert!(config.api_token().is_none());

        config.upstream.api_token = None;
        assert!(config.api_token().is_none());
    }

    #[test]
    fn test_redacted_hides_literal_token() {
        let mut config = ServerConfig::default();
        config.upstream.api_token = Some("super-secret".to_string());

        let printed = serde_yaml::to_string(&config.redacted()).unwrap();
        assert!(!printed.contains("super-secret"));
        assert!(printed.contains("<redacted>"));

        config.upstream.api_token = Some("$SPTRANS_API_KEY".to_string());
        assert_eq!(
            config.redacted().upstream.api_token.as_deref(),
            Some("$SPTRANS_API_KEY")
        );
    }
}
