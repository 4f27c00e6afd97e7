//! Bridge configuration loaded from environment variables.
//!
//! Follows 12-factor style: all settings come from environment variables
//! (or a `.env` file via `dotenvy`).

use std::net::SocketAddr;
use std::time::Duration;

/// Top-level bridge configuration.
///
/// Loaded once at startup via [`BridgeConfig::from_env`].
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// Socket address to bind the HTTP server to (e.g. `0.0.0.0:3000`).
    pub listen_addr: SocketAddr,

    /// Externally reachable base URL devices push webhooks to.
    pub public_url: String,

    /// Display name of the configured device.
    pub sonic_name: String,

    /// Host or URL of the device's local API. No device is set up when
    /// unset.
    pub sonic_address: Option<String>,

    /// Seconds between scheduled refreshes.
    pub refresh_interval_secs: u64,

    /// Upper bound in seconds for one refresh cycle.
    pub refresh_timeout_secs: u64,

    /// Per-request timeout in seconds for device HTTP calls.
    pub device_request_timeout_secs: u64,

    /// Capacity of the `EventBus` broadcast channel.
    pub event_bus_capacity: usize,

    /// Emit logs as JSON lines.
    pub log_json: bool,
}

impl BridgeConfig {
    /// Loads configuration from environment variables.
    ///
    /// Falls back to sensible defaults when a variable is not set.
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns an error if `LISTEN_ADDR` is set but cannot be parsed as
    /// a [`SocketAddr`].
    pub fn from_env() -> Result<Self, std::net::AddrParseError> {
        dotenvy::dotenv().ok();

        let listen_addr: SocketAddr = std::env::var("LISTEN_ADDR")
            .unwrap_or_else(|_| "0.0.0.0:3000".to_string())
            .parse()?;

        let public_url =
            std::env::var("PUBLIC_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let sonic_name = std::env::var("SONIC_NAME").unwrap_or_else(|_| "Sonic".to_string());
        let sonic_address = std::env::var("SONIC_ADDRESS")
            .ok()
            .filter(|address| !address.trim().is_empty());

        let refresh_interval_secs = parse_env("REFRESH_INTERVAL_SECS", 120);
        let refresh_timeout_secs = parse_env("REFRESH_TIMEOUT_SECS", 30);
        let device_request_timeout_secs = parse_env("DEVICE_REQUEST_TIMEOUT_SECS", 10);
        let event_bus_capacity = parse_env("EVENT_BUS_CAPACITY", 1024);
        let log_json = std::env::var("LOG_FORMAT").is_ok_and(|v| v.eq_ignore_ascii_case("json"));

        Ok(Self {
            listen_addr,
            public_url,
            sonic_name,
            sonic_address,
            refresh_interval_secs,
            refresh_timeout_secs,
            device_request_timeout_secs,
            event_bus_capacity,
            log_json,
        })
    }

    /// Interval between scheduled refreshes. Never zero.
    #[must_use]
    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    /// Bound on one refresh cycle. Never zero.
    #[must_use]
    pub fn refresh_timeout(&self) -> Duration {
        Duration::from_secs(self.refresh_timeout_secs.max(1))
    }

    /// Per-request device timeout. Never zero.
    #[must_use]
    pub fn device_request_timeout(&self) -> Duration {
        Duration::from_secs(self.device_request_timeout_secs.max(1))
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
