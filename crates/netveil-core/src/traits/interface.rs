// # Interface Control Trait
//
// Defines the interface for toggling a network link and randomizing its
// hardware address.
//
// ## Implementations
//
// - ifconfig + macchanger: `netveil-sys` crate
//
// ## Usage
//
// ```rust,ignore
// use netveil_core::traits::{InterfaceControl, LinkState};
//
// control.set_link("eth0", LinkState::Down).await?;
// control.randomize_mac("eth0").await?;
// control.set_link("eth0", LinkState::Up).await?;
// ```

use async_trait::async_trait;

/// Administrative state of a network link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkState {
    Up,
    Down,
}

impl LinkState {
    /// Argument understood by `ifconfig` / `ip link set`
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkState::Up => "up",
            LinkState::Down => "down",
        }
    }
}

impl std::fmt::Display for LinkState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trait for network interface control
///
/// Each call is a single blocking external operation with its own timeout.
/// Implementations do not sequence calls, roll back, or retry; the rotation
/// controller owns ordering and pauses.
#[async_trait]
pub trait InterfaceControl: Send + Sync {
    /// Bring `interface` up or down
    ///
    /// # Returns
    ///
    /// - `Ok(())`: The command succeeded
    /// - `Err(Error::ExternalCommandFailed)`: Non-zero exit, spawn failure or timeout
    async fn set_link(&self, interface: &str, state: LinkState) -> Result<(), crate::Error>;

    /// Assign a random MAC address to `interface`
    ///
    /// Most drivers require the link to be down for this to succeed.
    async fn randomize_mac(&self, interface: &str) -> Result<(), crate::Error>;
}
