//! Server configuration
//!
//! Settings for the HTTP surface, loaded from environment variables and then
//! overridden by command line flags.
//!
//! - `SITE_META_BIND_ALL`: set to "true" to bind 0.0.0.0 (containers)
//! - `SITE_META_PORT`: listen port (default: 3050)
//! - `SITE_META_USER_AGENT`: default user agent for fetches
//! - `SITE_META_TIMEOUT_MS`: fetch timeout in milliseconds (default: 15000)

use crate::fetch::{FetchConfig, UserSettings};
use std::env;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use thiserror::Error;
use tracing::{info, warn};

/// Default listen port
pub const DEFAULT_PORT: u16 = 3050;

/// Configuration errors
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// A variable held something that does not parse
    #[error("Invalid value for {name}: {value}")]
    InvalidValue {
        /// Variable name
        name: &'static str,
        /// Offending value
        value: String,
    },
}

/// HTTP server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind (127.0.0.1 unless bind-all is enabled)
    pub bind_addr: IpAddr,
    /// Listen port
    pub port: u16,
    /// Settings applied when a request carries none
    pub default_settings: UserSettings,
    /// Fetcher transport settings
    pub fetch: FetchConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: IpAddr::V4(Ipv4Addr::LOCALHOST),
            port: DEFAULT_PORT,
            default_settings: UserSettings::default(),
            fetch: FetchConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let bind_all = lookup("SITE_META_BIND_ALL")
            .map(|v| v.eq_ignore_ascii_case("true"))
            .unwrap_or(false);
        if bind_all {
            warn!("Binding to 0.0.0.0 (SITE_META_BIND_ALL=true)");
            config.bind_addr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);
        }

        if let Some(port) = lookup("SITE_META_PORT") {
            config.port = port
                .trim()
                .parse::<u16>()
                .ok()
                .filter(|p| *p > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "SITE_META_PORT",
                    value: port,
                })?;
        }

        if let Some(ua) = lookup("SITE_META_USER_AGENT") {
            config.default_settings = UserSettings::with_user_agent(ua);
        }

        if let Some(timeout) = lookup("SITE_META_TIMEOUT_MS") {
            config.fetch.timeout_ms = timeout
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|t| *t > 0)
                .ok_or(ConfigError::InvalidValue {
                    name: "SITE_META_TIMEOUT_MS",
                    value: timeout,
                })?;
        }

        info!(
            bind_addr = %config.bind_addr,
            port = config.port,
            timeout_ms = config.fetch.timeout_ms,
            "server configuration loaded"
        );

        Ok(config)
    }

    /// Socket address to listen on
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.bind_addr, self.port)
    }
}
