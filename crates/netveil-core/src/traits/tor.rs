// # Tor Traits
//
// Two separate seams: the system service (started once, through the init
// system) and the control channel (used on every identity rotation).
//
// ## Implementations
//
// - `service tor start`: `netveil-sys::SystemTorService`
// - Control port (`AUTHENTICATE` / `SIGNAL NEWNYM`): `netveil-sys::TorControlPort`

use async_trait::async_trait;

/// Trait for starting the Tor daemon
#[async_trait]
pub trait TorService: Send + Sync {
    /// Start the Tor service
    ///
    /// Returns once the start command has completed; the caller decides how
    /// long to wait for Tor to bootstrap.
    async fn start(&self) -> Result<(), crate::Error>;
}

/// Trait for the Tor control channel
///
/// # Retry Policy
///
/// None. A failed identity request is reported once; the automatic loop
/// simply tries again next cycle.
#[async_trait]
pub trait IdentityChannel: Send + Sync {
    /// Authenticate and ask Tor for new circuits
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Tor acknowledged the signal
    /// - `Err(Error::IdentityChannelUnavailable)`: Connection refused, timed out,
    ///   or a command was rejected
    async fn new_identity(&self) -> Result<(), crate::Error>;
}
