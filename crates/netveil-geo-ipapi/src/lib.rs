// # ip-api.com Geolocation
//
// Resolves an address to country, city and ISP through the free
// `http://ip-api.com/json/<address>` endpoint.
//
// ## Response Shape
//
// ```json
// { "status": "success", "country": "Germany", "city": "Frankfurt am Main",
//   "isp": "Hetzner Online GmbH", ... }
// { "status": "fail", "message": "private range", "query": "10.0.0.1" }
// ```
//
// Missing fields in a successful answer become `Unknown`. Callers that
// want a value no matter what use `GeoLookup::locate_or_unknown`.
//
// ## Rate Limits
//
// The free endpoint allows 45 requests per minute. The dashboard caches
// results per address, so steady-state traffic is one request per new
// address.

use async_trait::async_trait;
use netveil_core::config::NetveilConfig;
use netveil_core::traits::{GeoInfo, GeoLookup};
use netveil_core::{Error, Result};
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;
use tracing::debug;

const UNKNOWN: &str = "Unknown";

/// Geolocation via ip-api.com
#[derive(Debug, Clone)]
pub struct IpApiGeoLookup {
    /// Endpoint base; the address is appended as a path segment
    base_url: String,

    client: reqwest::Client,
}

impl IpApiGeoLookup {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &NetveilConfig) -> Result<Self> {
        Self::new(config.endpoints.geo_url.clone(), config.timeouts.http())
    }

    fn url_for(&self, address: IpAddr) -> String {
        format!("{}/{}", self.base_url, address)
    }
}

#[async_trait]
impl GeoLookup for IpApiGeoLookup {
    async fn locate(&self, address: IpAddr) -> Result<GeoInfo> {
        let url = self.url_for(address);
        debug!("Geolocating {} via {}", address, url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| Error::unreachable(format!("ip-api.com: {}", e)))?;

        if !response.status().is_success() {
            return Err(Error::unreachable(format!(
                "ip-api.com: HTTP {}",
                response.status()
            )));
        }

        let json: Value = response
            .json()
            .await
            .map_err(|e| Error::Other(format!("ip-api.com: Failed to parse response: {}", e)))?;

        parse_geo(&json)
    }
}

/// Extract [`GeoInfo`] from an ip-api.com JSON answer
pub fn parse_geo(json: &Value) -> Result<GeoInfo> {
    if json["status"].as_str() != Some("success") {
        let message = json["message"].as_str().unwrap_or("lookup failed");
        return Err(Error::Other(format!("ip-api.com: {}", message)));
    }

    let field = |name: &str| {
        json[name]
            .as_str()
            .filter(|s| !s.is_empty())
            .unwrap_or(UNKNOWN)
            .to_string()
    };

    Ok(GeoInfo {
        country: field("country"),
        city: field("city"),
        isp: field("isp"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_parse_success() {
        let json = json!({
            "status": "success",
            "country": "Sweden",
            "city": "Stockholm",
            "isp": "Bahnhof AB",
            "query": "5.6.7.8"
        });

        let info = assert_ok!(parse_geo(&json));

        assert_eq!(info.country, "Sweden");
        assert_eq!(info.city, "Stockholm");
        assert_eq!(info.isp, "Bahnhof AB");
    }

    #[test]
    fn test_parse_missing_fields_become_unknown() {
        let json = json!({ "status": "success", "country": "Romania", "city": "" });

        let info = assert_ok!(parse_geo(&json));

        assert_eq!(info.country, "Romania");
        assert_eq!(info.city, UNKNOWN);
        assert_eq!(info.isp, UNKNOWN);
    }

    #[test]
    fn test_parse_failure_status() {
        let json = json!({ "status": "fail", "message": "private range", "query": "10.0.0.1" });

        let err = assert_err!(parse_geo(&json));

        assert!(err.to_string().contains("private range"));
    }

    #[test]
    fn test_url_for_address() {
        let lookup = IpApiGeoLookup::new("http://ip-api.com/json/", Duration::from_secs(1)).unwrap();

        assert_eq!(
            lookup.url_for(IpAddr::from([5, 6, 7, 8])),
            "http://ip-api.com/json/5.6.7.8"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_yields_unknown() {
        // Nothing listens on port 9 of localhost in test environments
        let lookup = IpApiGeoLookup::new("http://127.0.0.1:9/json", Duration::from_secs(2)).unwrap();

        let info = lookup.locate_or_unknown(IpAddr::from([5, 6, 7, 8])).await;

        assert!(info.is_unknown());
    }
}
