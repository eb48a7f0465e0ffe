//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.latency-api.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::{IpAddr, SocketAddr, ToSocketAddrs};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".latency-api.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dataset settings.
    #[serde(default)]
    pub data: DataConfig,

    /// CORS settings.
    #[serde(default)]
    pub cors: CorsConfig,
}

/// General application settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Log the effective configuration at startup.
    #[serde(default)]
    pub verbose: bool,
}

/// HTTP listener settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind: an IPv4/IPv6 literal or a resolvable host name.
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind.
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
    5000
}

impl ServerConfig {
    /// Resolve `host` and `port` into a socket address.
    ///
    /// IP literals (including bare IPv6 such as `::`) are used as is;
    /// anything else is resolved and the first address wins.
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        if let Ok(ip) = self.host.parse::<IpAddr>() {
            return Ok(SocketAddr::new(ip, self.port));
        }

        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .with_context(|| format!("Cannot resolve listen host '{}'", self.host))?
            .next()
            .with_context(|| format!("Listen host '{}' has no addresses", self.host))
    }
}

/// Dataset settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    /// Path to the telemetry JSON file, relative to the working directory.
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

fn default_data_path() -> PathBuf {
    PathBuf::from("q-vercel-latency.json")
}

/// Which CORS policy the server applies.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum CorsMode {
    /// Any origin, no credentials (default)
    #[default]
    Wildcard,
    /// Credentials allowed; origin restricted or mirrored from the request
    Credentialed,
}

/// CORS settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CorsConfig {
    /// Policy to apply.
    #[serde(default)]
    pub mode: CorsMode,

    /// Origins allowed in credentialed mode.
    /// Empty means the request origin is echoed back.
    #[serde(default)]
    pub allowed_origins: Vec<String>,
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given explicitly on the command line (or via env) override.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref host) = args.host {
            self.server.host = host.clone();
        }
        if let Some(port) = args.port {
            self.server.port = port;
        }

        if let Some(ref data) = args.data {
            self.data.path = data.clone();
        }

        if let Some(mode) = args.cors {
            self.cors.mode = mode;
        }
        if let Some(ref origins) = args.allow_origin {
            self.cors.allowed_origins = origins.clone();
        }

        // Flags always override
        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check settings that cannot be expressed through serde alone.
    pub fn validate(&self) -> Result<()> {
        self.server.socket_addr()?;

        if self.cors.mode == CorsMode::Wildcard && !self.cors.allowed_origins.is_empty() {
            anyhow::bail!(
                "allowed_origins only applies to cors mode 'credentialed' (current mode: wildcard)"
            );
        }

        for origin in &self.cors.allowed_origins {
            if origin == "*" {
                anyhow::bail!(
                    "'*' is not a valid allowed origin; use cors mode 'wildcard' instead"
                );
            }
            axum::http::HeaderValue::from_str(origin)
                .with_context(|| format!("Invalid allowed origin: {}", origin))?;
        }

        Ok(())
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
