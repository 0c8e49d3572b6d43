//! Resolver configuration.
//!
//! Settings come from a TOML file with a `[resolver]` and a `[logging]`
//! table. Missing keys fall back to their defaults, and command-line flags
//! override whatever the file says:
//!
//! ```toml
//! [resolver]
//! root_server = "198.41.0.4"
//! timeout_ms = 3000
//! max_referrals = 16
//! max_ns_depth = 4
//! max_hops = 80
//!
//! [logging]
//! level = "info"
//! ```

use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::dns::HEADER_LEN;
use crate::transport::DNS_PORT;

/// Default configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "iterative-resolver.toml";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {0}: {1}")]
    FileRead(String, String),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Resolution and transport settings
    pub resolver: ResolverConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ResolverConfig {
    /// Server every lookup starts from (a.root-servers.net)
    pub root_server: Ipv4Addr,

    pub port: u16,

    /// Read timeout per attempt, in milliseconds
    pub timeout_ms: u64,

    /// Attempts per hop before a timeout is reported
    pub attempts: u32,

    /// Referrals followed for a single name before giving up
    pub max_referrals: usize,

    /// How deep nameserver host name lookups may nest
    pub max_ns_depth: usize,

    /// Queries one resolution may send in total, nested lookups included
    pub max_hops: usize,

    /// Receive buffer size; larger replies are reported as truncated
    pub buffer_size: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            root_server: Ipv4Addr::new(198, 41, 0, 4),
            port: DNS_PORT,
            timeout_ms: 3000,
            attempts: 3,
            max_referrals: 16,
            max_ns_depth: 4,
            max_hops: 80,
            buffer_size: 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "warn".to_string()
}

/// Values given on the command line; `None` keeps the file or default value.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub root_server: Option<Ipv4Addr>,
    pub timeout_ms: Option<u64>,
    pub attempts: Option<u32>,
    pub max_referrals: Option<usize>,
    pub max_ns_depth: Option<usize>,
    pub max_hops: Option<usize>,
    pub log_level: Option<String>,
}

impl Config {
    /// Load configuration from file or use defaults
    ///
    /// Priority order:
    /// 1. Explicitly provided path
    /// 2. iterative-resolver.toml in current directory
    /// 3. Default configuration
    ///
    /// Command-line overrides are applied last and the result is validated.
    pub fn load(path: Option<&str>, cli_overrides: CliOverrides) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = path {
            Self::from_file(path)?
        } else if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)?
        } else {
            Self::default()
        };

        config.apply_cli_overrides(cli_overrides);
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &str) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::FileRead(path.to_string(), e.to_string()))?;
        toml::from_str(&contents).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    fn apply_cli_overrides(&mut self, overrides: CliOverrides) {
        if let Some(root) = overrides.root_server {
            self.resolver.root_server = root;
        }
        if let Some(timeout) = overrides.timeout_ms {
            self.resolver.timeout_ms = timeout;
        }
        if let Some(attempts) = overrides.attempts {
            self.resolver.attempts = attempts;
        }
        if let Some(max) = overrides.max_referrals {
            self.resolver.max_referrals = max;
        }
        if let Some(depth) = overrides.max_ns_depth {
            self.resolver.max_ns_depth = depth;
        }
        if let Some(hops) = overrides.max_hops {
            self.resolver.max_hops = hops;
        }
        if let Some(level) = overrides.log_level {
            self.logging.level = level;
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let r = &self.resolver;
        if r.port == 0 {
            return Err(ConfigError::Validation("port cannot be 0".to_string()));
        }
        if r.timeout_ms == 0 {
            return Err(ConfigError::Validation("timeout_ms cannot be 0".to_string()));
        }
        if r.attempts == 0 {
            return Err(ConfigError::Validation("attempts cannot be 0".to_string()));
        }
        if r.max_referrals == 0 || r.max_ns_depth == 0 || r.max_hops == 0 {
            return Err(ConfigError::Validation(
                "max_referrals, max_ns_depth and max_hops must be at least 1".to_string(),
            ));
        }
        if r.buffer_size < HEADER_LEN {
            return Err(ConfigError::Validation(format!(
                "buffer_size must be at least {} bytes",
                HEADER_LEN
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.resolver.root_server, Ipv4Addr::new(198, 41, 0, 4));
        assert_eq!(config.resolver.port, 53);
        assert_eq!(config.resolver.buffer_size, 1024);
        assert_eq!(config.resolver.max_hops, 80);
        assert_eq!(config.logging.level, "warn");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[resolver]\nroot_server = \"199.9.14.201\"\ntimeout_ms = 500").unwrap();

        let config =
            Config::load(Some(file.path().to_str().unwrap()), CliOverrides::default()).unwrap();
        assert_eq!(config.resolver.root_server, Ipv4Addr::new(199, 9, 14, 201));
        assert_eq!(config.resolver.timeout_ms, 500);
        assert_eq!(config.resolver.attempts, 3);
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn test_cli_overrides_win() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[resolver]\nattempts = 5\n[logging]\nlevel = \"info\"").unwrap();

        let overrides = CliOverrides {
            attempts: Some(1),
            max_ns_depth: Some(2),
            max_hops: Some(20),
            log_level: Some("debug".to_string()),
            ..Default::default()
        };
        let config = Config::load(Some(file.path().to_str().unwrap()), overrides).unwrap();
        assert_eq!(config.resolver.attempts, 1);
        assert_eq!(config.resolver.max_ns_depth, 2);
        assert_eq!(config.resolver.max_hops, 20);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = Config::load(Some("/nonexistent/resolver.toml"), CliOverrides::default())
            .unwrap_err();
        assert!(matches!(err, ConfigError::FileRead(..)));
    }

    #[test]
    fn test_bad_toml_is_parse_error() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[resolver]\nroot_server = \"not an ip\"").unwrap();

        let err =
            Config::load(Some(file.path().to_str().unwrap()), CliOverrides::default()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_rejects_zero_bounds() {
        let overrides = CliOverrides {
            timeout_ms: Some(0),
            ..Default::default()
        };
        let mut config = Config::default();
        config.apply_cli_overrides(overrides);
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));

        let mut config = Config::default();
        config.resolver.max_ns_depth = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.resolver.max_hops = 0;
        assert!(config.validate().is_err());

        let mut config = Config::default();
        config.resolver.buffer_size = 11;
        assert!(config.validate().is_err());
    }
}
