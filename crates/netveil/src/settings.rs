//! Environment configuration
//!
//! Every variable is optional; unset variables keep the library defaults.
//! A variable that is set but cannot be parsed is a configuration error.

use anyhow::{Context, Result, bail};
use netveil_core::NetveilConfig;
use std::env;
use std::str::FromStr;
use tracing::Level;

/// Configuration assembled from `NETVEIL_*` variables
#[derive(Debug, Clone)]
pub struct Settings {
    pub config: NetveilConfig,
    pub log_level: String,
}

impl Settings {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = NetveilConfig::default();

        if let Some(interface) = lookup("NETVEIL_INTERFACE") {
            config.interface = interface;
        }
        if let Some(use_sudo) = lookup("NETVEIL_USE_SUDO") {
            config.use_sudo = parse_bool("NETVEIL_USE_SUDO", &use_sudo)?;
        }
        if let Some(secs) = parse_var(&lookup, "NETVEIL_AUTO_INTERVAL_SECS")? {
            config.timing.auto_interval_secs = secs;
        }
        if let Some(addr) = lookup("NETVEIL_TOR_CONTROL_ADDR") {
            config.tor.control_addr = addr;
        }
        if let Some(password) = lookup("NETVEIL_TOR_CONTROL_PASSWORD") {
            config.tor.control_password = Some(password);
        }
        if let Some(proxy) = lookup("NETVEIL_TOR_SOCKS") {
            config.tor.socks_proxy = proxy;
        }
        if let Some(user) = lookup("NETVEIL_TOR_USER") {
            config.tor.user = user;
        }
        if let Some(url) = lookup("NETVEIL_ADDRESS_URL") {
            config.endpoints.address_url = url;
        }
        if let Some(url) = lookup("NETVEIL_GEO_URL") {
            config.endpoints.geo_url = url;
        }
        if let Some(secs) = parse_var(&lookup, "NETVEIL_COMMAND_TIMEOUT_SECS")? {
            config.timeouts.command_secs = secs;
        }
        if let Some(secs) = parse_var(&lookup, "NETVEIL_HTTP_TIMEOUT_SECS")? {
            config.timeouts.http_secs = secs;
        }

        Ok(Self {
            config,
            log_level: lookup("NETVEIL_LOG_LEVEL").unwrap_or_else(|| "warn".to_string()),
        })
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        self.config
            .validate()
            .context("Invalid netveil configuration")?;

        match self.log_level.to_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            _ => bail!(
                "NETVEIL_LOG_LEVEL '{}' is not valid. \
                Valid levels: trace, debug, info, warn, error",
                self.log_level
            ),
        }

        Ok(())
    }

    pub fn log_level(&self) -> Level {
        match self.log_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "error" => Level::ERROR,
            _ => Level::WARN,
        }
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(name) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse() {
            Ok(value) => Ok(Some(value)),
            Err(e) => bail!("{} must be a number. Got: '{}' ({})", name, raw, e),
        },
    }
}

fn parse_bool(name: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => bail!("{} must be true or false. Got: '{}'", name, raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn settings(vars: &[(&str, &str)]) -> Result<Settings> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Settings::from_lookup(|name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_variables() {
        let settings = settings(&[]).unwrap();

        assert_eq!(settings.config, NetveilConfig::default());
        assert_eq!(settings.log_level(), Level::WARN);
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn test_overrides() {
        let settings = settings(&[
            ("NETVEIL_INTERFACE", "wlan0"),
            ("NETVEIL_USE_SUDO", "no"),
            ("NETVEIL_AUTO_INTERVAL_SECS", "45"),
            ("NETVEIL_TOR_CONTROL_PASSWORD", "hunter2"),
            ("NETVEIL_HTTP_TIMEOUT_SECS", "3"),
            ("NETVEIL_LOG_LEVEL", "DEBUG"),
        ])
        .unwrap();

        assert_eq!(settings.config.interface, "wlan0");
        assert!(!settings.config.use_sudo);
        assert_eq!(settings.config.timing.auto_interval_secs, 45);
        assert_eq!(settings.config.tor.control_password.as_deref(), Some("hunter2"));
        assert_eq!(settings.config.timeouts.http_secs, 3);
        assert_eq!(settings.log_level(), Level::DEBUG);
    }

    #[test]
    fn test_unparseable_number_is_error() {
        let err = settings(&[("NETVEIL_AUTO_INTERVAL_SECS", "soon")]).unwrap_err();
        assert!(err.to_string().contains("NETVEIL_AUTO_INTERVAL_SECS"));
    }

    #[test]
    fn test_unparseable_bool_is_error() {
        assert!(settings(&[("NETVEIL_USE_SUDO", "maybe")]).is_err());
    }

    #[test]
    fn test_validation_rejects_bad_values() {
        let bad_level = settings(&[("NETVEIL_LOG_LEVEL", "verbose")]).unwrap();
        assert!(bad_level.validate().is_err());

        let bad_interval = settings(&[("NETVEIL_AUTO_INTERVAL_SECS", "0")]).unwrap();
        assert!(bad_interval.validate().is_err());

        let bad_proxy = settings(&[("NETVEIL_TOR_SOCKS", "http://127.0.0.1:8080")]).unwrap();
        assert!(bad_proxy.validate().is_err());
    }
}
