//! Configuration module for the rio-echo listener.
//!
//! Supports both command-line arguments and TOML configuration file.
//! CLI arguments take precedence over config file values.

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the echo listener
#[derive(Parser, Debug)]
#[command(name = "rio-echo")]
#[command(version = "0.1.0")]
#[command(about = "A delimiter-framed TCP echo listener for roboRIO control handshakes", long_about = None)]
pub struct CliArgs {
    /// Path to TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// IP literal to bind to (e.g. 127.0.0.1 or ::1)
    #[arg(short = 'l', long)]
    pub listen: Option<String>,

    /// Port to listen on (5800-5810 is the historically legal range)
    #[arg(short = 'p', long, value_parser = clap::value_parser!(u16).range(1..))]
    pub port: Option<u16>,

    /// Team number; the listener binds to the address that
    /// roborio-<team>-frc.local resolves to
    #[arg(short = 't', long)]
    pub team: Option<u16>,

    /// Maximum accumulated message size in bytes
    #[arg(long)]
    pub max_message_size: Option<usize>,

    /// Per-read deadline in seconds
    #[arg(long)]
    pub read_timeout: Option<u64>,

    /// Maximum number of concurrent sessions
    #[arg(long)]
    pub max_sessions: Option<usize>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

/// TOML configuration file structure
#[derive(Debug, Deserialize, Default)]
pub struct TomlConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server-related configuration
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    /// IP literal to bind to
    #[serde(default = "default_listen")]
    pub listen: String,
    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,
    /// Team number for mDNS address resolution
    pub team: Option<u16>,
    /// Maximum number of concurrent sessions
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: default_listen(),
            port: default_port(),
            team: None,
            max_sessions: default_max_sessions(),
        }
    }
}

/// Per-session configuration
#[derive(Debug, Deserialize)]
pub struct SessionConfig {
    /// Maximum accumulated message size in bytes
    #[serde(default = "default_max_message_size")]
    pub max_message_size: usize,
    /// Per-read deadline in seconds
    #[serde(default = "default_read_timeout")]
    pub read_timeout: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_message_size: default_max_message_size(),
            read_timeout: default_read_timeout(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    /// Log level
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

fn default_listen() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    5805
}

fn default_max_sessions() -> usize {
    1
}

fn default_max_message_size() -> usize {
    1024 * 1024 // 1 MiB
}

fn default_read_timeout() -> u64 {
    30 // seconds
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Final resolved configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub listen: String,
    pub port: u16,
    pub team: Option<u16>,
    pub max_message_size: usize,
    pub read_timeout: Duration,
    pub max_sessions: usize,
    pub log_level: String,
}

impl Config {
    /// Load configuration from CLI args and optional TOML file.
    /// CLI arguments take precedence over TOML file values.
    pub fn load() -> Result<Self, ConfigError> {
        let cli = CliArgs::parse();

        // Load TOML config if specified
        let toml_config = if let Some(ref config_path) = cli.config {
            let contents = std::fs::read_to_string(config_path)
                .map_err(|e| ConfigError::FileRead(config_path.clone(), e))?;
            toml::from_str(&contents)
                .map_err(|e| ConfigError::TomlParse(config_path.clone(), e))?
        } else {
            TomlConfig::default()
        };

        // Merge CLI args with TOML config (CLI takes precedence)
        Ok(Config {
            listen: cli.listen.unwrap_or(toml_config.server.listen),
            port: cli.port.unwrap_or(toml_config.server.port),
            team: cli.team.or(toml_config.server.team),
            max_message_size: cli
                .max_message_size
                .unwrap_or(toml_config.session.max_message_size),
            read_timeout: Duration::from_secs(
                cli.read_timeout.unwrap_or(toml_config.session.read_timeout),
            ),
            max_sessions: cli
                .max_sessions
                .unwrap_or(toml_config.server.max_sessions),
            log_level: if cli.log_level != "info" {
                cli.log_level
            } else {
                toml_config.logging.level
            },
        })
    }
}

/// Configuration loading errors
#[derive(Debug)]
pub enum ConfigError {
    FileRead(PathBuf, std::io::Error),
    TomlParse(PathBuf, toml::de::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::FileRead(path, e) => {
                write!(f, "Failed to read config file '{}': {}", path.display(), e)
            }
            ConfigError::TomlParse(path, e) => {
                write!(f, "Failed to parse config file '{}': {}", path.display(), e)
            }
        }
    }
}

impl std::error::Error for ConfigError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TomlConfig::default();
        assert_eq!(config.server.listen, "127.0.0.1");
        assert_eq!(config.server.port, 5805);
        assert_eq!(config.server.team, None);
        assert_eq!(config.server.max_sessions, 1);
        assert_eq!(config.session.max_message_size, 1024 * 1024);
        assert_eq!(config.session.read_timeout, 30);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_toml_parsing() {
        let toml_str = r#"
            [server]
            listen = "::1"
            port = 5800
            team = 2486
            max_sessions = 4

            [session]
            max_message_size = 4096
            read_timeout = 10

            [logging]
            level = "debug"
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "::1");
        assert_eq!(config.server.port, 5800);
        assert_eq!(config.server.team, Some(2486));
        assert_eq!(config.server.max_sessions, 4);
        assert_eq!(config.session.max_message_size, 4096);
        assert_eq!(config.session.read_timeout, 10);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_toml_partial_sections_fall_back_to_defaults() {
        let toml_str = r#"
            [server]
            port = 5810
        "#;

        let config: TomlConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.server.listen, "127.0.0.1");
        assert_eq!(config.server.port, 5810);
        assert_eq!(config.session.max_message_size, 1024 * 1024);
        assert_eq!(config.logging.level, "info");
    }
}
