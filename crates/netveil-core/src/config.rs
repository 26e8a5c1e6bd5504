//! Configuration types for netveil
//!
//! Every pause and timeout the tool uses is a named field here so it can be
//! tuned, and so tests can shrink it.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::time::Duration;

/// Main netveil configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetveilConfig {
    /// Network interface used by MAC rotation (e.g., "eth0")
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Prefix privileged commands with `sudo`
    #[serde(default = "default_use_sudo")]
    pub use_sudo: bool,

    /// Pauses between and after steps
    #[serde(default)]
    pub timing: TimingConfig,

    /// Upper bounds on blocking external calls
    #[serde(default)]
    pub timeouts: TimeoutConfig,

    /// Tor service, control port and transparent proxy settings
    #[serde(default)]
    pub tor: TorConfig,

    /// Public HTTP endpoints
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// Controller settings
    #[serde(default)]
    pub engine: EngineConfig,
}

impl NetveilConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self {
            interface: default_interface(),
            use_sudo: default_use_sudo(),
            timing: TimingConfig::default(),
            timeouts: TimeoutConfig::default(),
            tor: TorConfig::default(),
            endpoints: EndpointConfig::default(),
            engine: EngineConfig::default(),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        validate_interface_name(&self.interface)?;
        self.timing.validate()?;
        self.timeouts.validate()?;
        self.tor.validate()?;
        self.endpoints.validate()?;

        if self.engine.event_channel_capacity == 0 {
            return Err(crate::Error::config("Event channel capacity must be > 0"));
        }

        Ok(())
    }
}

impl Default for NetveilConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Check that a name is usable as a Linux interface name
///
/// Linux caps interface names at 15 bytes (IFNAMSIZ - 1) and rejects
/// whitespace and `/`.
pub fn validate_interface_name(name: &str) -> Result<(), crate::Error> {
    if name.is_empty() {
        return Err(crate::Error::config("Interface name cannot be empty"));
    }
    if name.len() > 15 {
        return Err(crate::Error::config(format!(
            "Interface name too long: {} chars (max 15). Got: {}",
            name.len(),
            name
        )));
    }
    if name.chars().any(|c| c.is_whitespace() || c == '/') {
        return Err(crate::Error::config(format!(
            "Interface name contains invalid characters: '{}'",
            name
        )));
    }
    Ok(())
}

/// Pauses used by the rotation controller and dashboard
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimingConfig {
    /// Pause after bringing the interface down and after randomizing the MAC
    #[serde(default = "default_mac_step_delay_ms")]
    pub mac_step_delay_ms: u64,

    /// Pause after bringing the interface back up
    #[serde(default = "default_link_up_settle_ms")]
    pub link_up_settle_ms: u64,

    /// Time for a new Tor identity to propagate before verifying the address
    #[serde(default = "default_identity_settle_secs")]
    pub identity_settle_secs: u64,

    /// Pause between the MAC rotation and the identity request in automatic mode
    #[serde(default = "default_post_mac_delay_secs")]
    pub post_mac_delay_secs: u64,

    /// Interval between automatic rotation cycles
    #[serde(default = "default_auto_interval_secs")]
    pub auto_interval_secs: u64,

    /// Live dashboard refresh cadence
    #[serde(default = "default_dashboard_refresh_ms")]
    pub dashboard_refresh_ms: u64,

    /// Pause after starting the Tor service
    #[serde(default = "default_tor_start_settle_secs")]
    pub tor_start_settle_secs: u64,

    /// Pause between firewall rules
    #[serde(default = "default_rule_step_delay_ms")]
    pub rule_step_delay_ms: u64,
}

impl TimingConfig {
    /// Validate the timing configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.auto_interval_secs == 0 {
            return Err(crate::Error::config("Automatic interval must be > 0"));
        }
        if self.dashboard_refresh_ms == 0 {
            return Err(crate::Error::config("Dashboard refresh must be > 0"));
        }
        Ok(())
    }

    pub fn mac_step_delay(&self) -> Duration {
        Duration::from_millis(self.mac_step_delay_ms)
    }

    pub fn link_up_settle(&self) -> Duration {
        Duration::from_millis(self.link_up_settle_ms)
    }

    pub fn identity_settle(&self) -> Duration {
        Duration::from_secs(self.identity_settle_secs)
    }

    pub fn post_mac_delay(&self) -> Duration {
        Duration::from_secs(self.post_mac_delay_secs)
    }

    pub fn auto_interval(&self) -> Duration {
        Duration::from_secs(self.auto_interval_secs)
    }

    pub fn dashboard_refresh(&self) -> Duration {
        Duration::from_millis(self.dashboard_refresh_ms)
    }

    pub fn tor_start_settle(&self) -> Duration {
        Duration::from_secs(self.tor_start_settle_secs)
    }

    pub fn rule_step_delay(&self) -> Duration {
        Duration::from_millis(self.rule_step_delay_ms)
    }

    /// All pauses set to zero, for tests that only care about ordering
    pub fn immediate() -> Self {
        Self {
            mac_step_delay_ms: 0,
            link_up_settle_ms: 0,
            identity_settle_secs: 0,
            post_mac_delay_secs: 0,
            auto_interval_secs: 1,
            dashboard_refresh_ms: 1,
            tor_start_settle_secs: 0,
            rule_step_delay_ms: 0,
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            mac_step_delay_ms: default_mac_step_delay_ms(),
            link_up_settle_ms: default_link_up_settle_ms(),
            identity_settle_secs: default_identity_settle_secs(),
            post_mac_delay_secs: default_post_mac_delay_secs(),
            auto_interval_secs: default_auto_interval_secs(),
            dashboard_refresh_ms: default_dashboard_refresh_ms(),
            tor_start_settle_secs: default_tor_start_settle_secs(),
            rule_step_delay_ms: default_rule_step_delay_ms(),
        }
    }
}

/// Timeouts for blocking external calls
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    /// Timeout for a single system command
    #[serde(default = "default_command_secs")]
    pub command_secs: u64,

    /// Timeout for a single HTTP request
    #[serde(default = "default_http_secs")]
    pub http_secs: u64,

    /// Timeout for a Tor control-port exchange
    #[serde(default = "default_control_secs")]
    pub control_secs: u64,
}

impl TimeoutConfig {
    /// Validate the timeout configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.command_secs == 0 || self.http_secs == 0 || self.control_secs == 0 {
            return Err(crate::Error::config("Timeouts must be > 0"));
        }
        Ok(())
    }

    pub fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    pub fn http(&self) -> Duration {
        Duration::from_secs(self.http_secs)
    }

    pub fn control(&self) -> Duration {
        Duration::from_secs(self.control_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            command_secs: default_command_secs(),
            http_secs: default_http_secs(),
            control_secs: default_control_secs(),
        }
    }
}

/// Tor settings
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TorConfig {
    /// Control port address
    #[serde(default = "default_control_addr")]
    pub control_addr: String,

    /// Control port password (empty for a Tor without HashedControlPassword)
    #[serde(default)]
    pub control_password: Option<String>,

    /// SOCKS proxy URL used for anonymized lookups
    #[serde(default = "default_socks_proxy")]
    pub socks_proxy: String,

    /// System user the Tor daemon runs as
    #[serde(default = "default_tor_user")]
    pub user: String,

    /// Tor TransPort
    #[serde(default = "default_trans_port")]
    pub trans_port: u16,

    /// Tor DNSPort
    #[serde(default = "default_dns_port")]
    pub dns_port: u16,
}

// Keeps the control password out of logs
impl std::fmt::Debug for TorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorConfig")
            .field("control_addr", &self.control_addr)
            .field(
                "control_password",
                &self.control_password.as_ref().map(|_| "<REDACTED>"),
            )
            .field("socks_proxy", &self.socks_proxy)
            .field("user", &self.user)
            .field("trans_port", &self.trans_port)
            .field("dns_port", &self.dns_port)
            .finish()
    }
}

impl TorConfig {
    /// Validate the Tor configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.control_socket_addr()?;

        if !self.socks_proxy.starts_with("socks5://") && !self.socks_proxy.starts_with("socks5h://")
        {
            return Err(crate::Error::config(format!(
                "Invalid SOCKS proxy URL: '{}'. Must start with socks5:// or socks5h://",
                self.socks_proxy
            )));
        }

        if self.user.is_empty() {
            return Err(crate::Error::config("Tor user cannot be empty"));
        }

        if self.trans_port == 0 || self.dns_port == 0 {
            return Err(crate::Error::config("Tor ports must be > 0"));
        }

        Ok(())
    }

    /// Parsed control port address
    pub fn control_socket_addr(&self) -> Result<SocketAddr, crate::Error> {
        self.control_addr.parse().map_err(|_| {
            crate::Error::config(format!(
                "Invalid Tor control address: '{}'",
                self.control_addr
            ))
        })
    }
}

impl Default for TorConfig {
    fn default() -> Self {
        Self {
            control_addr: default_control_addr(),
            control_password: None,
            socks_proxy: default_socks_proxy(),
            user: default_tor_user(),
            trans_port: default_trans_port(),
            dns_port: default_dns_port(),
        }
    }
}

/// Public HTTP endpoints
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Service answering with the caller's address as plain text
    #[serde(default = "default_address_url")]
    pub address_url: String,

    /// Geolocation service base URL; the address is appended as a path segment
    #[serde(default = "default_geo_url")]
    pub geo_url: String,
}

impl EndpointConfig {
    /// Validate the endpoint configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        for (name, url) in [("address", &self.address_url), ("geolocation", &self.geo_url)] {
            if !url.starts_with("https://") && !url.starts_with("http://") {
                return Err(crate::Error::config(format!(
                    "The {} URL must use HTTP or HTTPS scheme. Got: {}",
                    name, url
                )));
            }
        }
        Ok(())
    }
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            address_url: default_address_url(),
            geo_url: default_geo_url(),
        }
    }
}

/// Controller configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Capacity of the rotation event channel
    ///
    /// When full, new events are dropped with a warning log.
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_interface() -> String {
    "eth0".to_string()
}

fn default_use_sudo() -> bool {
    true
}

fn default_mac_step_delay_ms() -> u64 {
    1000
}

fn default_link_up_settle_ms() -> u64 {
    2000
}

fn default_identity_settle_secs() -> u64 {
    3
}

fn default_post_mac_delay_secs() -> u64 {
    2
}

fn default_auto_interval_secs() -> u64 {
    20
}

fn default_dashboard_refresh_ms() -> u64 {
    1000
}

fn default_tor_start_settle_secs() -> u64 {
    5
}

fn default_rule_step_delay_ms() -> u64 {
    500
}

fn default_command_secs() -> u64 {
    15
}

fn default_http_secs() -> u64 {
    10
}

fn default_control_secs() -> u64 {
    10
}

fn default_control_addr() -> String {
    "127.0.0.1:9051".to_string()
}

fn default_socks_proxy() -> String {
    "socks5h://127.0.0.1:9050".to_string()
}

fn default_tor_user() -> String {
    "debian-tor".to_string()
}

fn default_trans_port() -> u16 {
    9040
}

fn default_dns_port() -> u16 {
    5353
}

fn default_address_url() -> String {
    "https://ifconfig.me/ip".to_string()
}

fn default_geo_url() -> String {
    "http://ip-api.com/json".to_string()
}

fn default_event_channel_capacity() -> usize {
    256
}
