// # Firewall Trait
//
// Installs the rule set that pushes all outbound TCP and DNS traffic through
// Tor's TransPort and DNSPort.
//
// ## Implementations
//
// - iptables: `netveil-sys::IptablesFirewall`

use async_trait::async_trait;

/// Trait for firewall rule installation
#[async_trait]
pub trait Firewall: Send + Sync {
    /// Flush existing rules, then install the transparent-proxy rule set
    ///
    /// Idempotent: running it twice leaves the same rules in place.
    /// Stops at the first failing rule; rules installed before it stay.
    async fn install_transparent_routing(&self) -> Result<(), crate::Error>;
}
