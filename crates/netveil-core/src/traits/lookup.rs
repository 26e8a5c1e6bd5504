// # Lookup Traits
//
// Observing the host's public identity from the outside.
//
// ## Implementations
//
// - Address lookup over HTTP(S), direct or via Tor SOCKS: `netveil-http`
// - ip-api.com geolocation: `netveil-geo-ipapi`

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;

/// Which path an address lookup takes out of the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LookupRoute {
    /// Straight out of the default route; reveals the real address
    Direct,
    /// Through the anonymization channel (Tor)
    Anonymized,
}

impl std::fmt::Display for LookupRoute {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LookupRoute::Direct => f.write_str("direct"),
            LookupRoute::Anonymized => f.write_str("anonymized"),
        }
    }
}

/// Trait for public address lookup
#[async_trait]
pub trait AddressLookup: Send + Sync {
    /// Ask an external service which address our traffic appears to come from
    ///
    /// # Returns
    ///
    /// - `Ok(IpAddr)`: The observed address
    /// - `Err(Error::NetworkUnreachable)`: The service could not be reached
    /// - `Err(Error::InvalidAddress)`: The service answered with something else
    async fn lookup(&self, route: LookupRoute) -> Result<IpAddr, crate::Error>;
}

/// Geolocation metadata for an address
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeoInfo {
    pub country: String,
    pub city: String,
    /// Network provider (ISP) name
    pub isp: String,
}

impl GeoInfo {
    /// Placeholder used whenever a lookup fails
    pub fn unknown() -> Self {
        Self {
            country: "Unknown".to_string(),
            city: "Unknown".to_string(),
            isp: "Unknown".to_string(),
        }
    }

    pub fn is_unknown(&self) -> bool {
        *self == Self::unknown()
    }
}

impl Default for GeoInfo {
    fn default() -> Self {
        Self::unknown()
    }
}

/// Trait for geolocation lookup
#[async_trait]
pub trait GeoLookup: Send + Sync {
    /// Resolve `address` to country, city and provider
    async fn locate(&self, address: IpAddr) -> Result<GeoInfo, crate::Error>;

    /// Best-effort variant: any failure becomes [`GeoInfo::unknown`]
    async fn locate_or_unknown(&self, address: IpAddr) -> GeoInfo {
        match self.locate(address).await {
            Ok(info) => info,
            Err(e) => {
                tracing::debug!("Geolocation of {} failed: {}", address, e);
                GeoInfo::unknown()
            }
        }
    }
}
