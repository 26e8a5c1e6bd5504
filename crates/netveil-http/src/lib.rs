// # HTTP Address Lookup
//
// This crate observes the public address netveil's traffic leaves from.
//
// ## Routes
//
// - **Direct**: a plain GET against a service that answers with the
//   caller's address as text (default `https://ifconfig.me/ip`)
// - **Anonymized**: the same GET through Tor's SOCKS port. The proxy URL
//   should use `socks5h://` so that name resolution also happens inside Tor.
//
// Two clients are kept so that the direct route never picks up a proxy from
// the environment and the anonymized route never bypasses Tor.

use async_trait::async_trait;
use netveil_core::config::NetveilConfig;
use netveil_core::traits::{AddressLookup, LookupRoute};
use netveil_core::{Error, Result};
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

/// Address lookup over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpAddressLookup {
    /// Service answering with the caller's address
    url: String,

    /// Client without any proxy
    direct: reqwest::Client,

    /// Client routed through Tor
    anonymized: reqwest::Client,
}

impl HttpAddressLookup {
    /// Create a lookup against `url`
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the proxy URL is invalid or a client cannot
    /// be built.
    pub fn new(url: impl Into<String>, socks_proxy: &str, timeout: Duration) -> Result<Self> {
        let direct = reqwest::Client::builder()
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        let proxy = reqwest::Proxy::all(socks_proxy)
            .map_err(|e| Error::config(format!("Invalid SOCKS proxy '{}': {}", socks_proxy, e)))?;

        let anonymized = reqwest::Client::builder()
            .timeout(timeout)
            .proxy(proxy)
            .build()
            .map_err(|e| Error::config(format!("Failed to build Tor HTTP client: {}", e)))?;

        Ok(Self {
            url: url.into(),
            direct,
            anonymized,
        })
    }

    pub fn from_config(config: &NetveilConfig) -> Result<Self> {
        Self::new(
            config.endpoints.address_url.clone(),
            &config.tor.socks_proxy,
            config.timeouts.http(),
        )
    }

    fn client(&self, route: LookupRoute) -> &reqwest::Client {
        match route {
            LookupRoute::Direct => &self.direct,
            LookupRoute::Anonymized => &self.anonymized,
        }
    }
}

#[async_trait]
impl AddressLookup for HttpAddressLookup {
    async fn lookup(&self, route: LookupRoute) -> Result<IpAddr> {
        debug!("GET {} ({})", self.url, route);

        let response = self
            .client(route)
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::unreachable(format!("{} ({}): {}", self.url, route, e)))?;

        if !response.status().is_success() {
            return Err(Error::unreachable(format!(
                "{} ({}): HTTP {}",
                self.url,
                route,
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::unreachable(format!("Failed to read response: {}", e)))?;

        parse_address(&body)
    }
}

/// Parse a plain-text address response
pub fn parse_address(body: &str) -> Result<IpAddr> {
    let text = body.trim();
    text.parse().map_err(|_| {
        // Keep error messages short when a service returns an HTML page
        let excerpt: String = text.chars().take(64).collect();
        Error::invalid_address(format!("Not an IP address: '{}'", excerpt))
    })
}
