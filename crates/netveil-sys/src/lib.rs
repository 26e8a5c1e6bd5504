// # System Collaborators
//
// Implementations of the netveil-core collaborator traits that shell out to
// system tools or talk to local daemons.
//
// ## Components
//
// - **CommandRunner**: runs a program (optionally through `sudo -n`) with a
//   timeout, killing it if the timeout expires. Collaborators hold it behind
//   the `Execute` trait
// - **IfconfigInterface**: `ifconfig` link control and `macchanger` MAC
//   randomization
// - **SystemTorService**: `service tor start`
// - **TorControlPort**: `SIGNAL NEWNYM` over the Tor control protocol
// - **IptablesFirewall**: transparent-proxy rule set
//
// ## Privileges
//
// Everything except the control port needs root. When the process already
// runs as root, `sudo` is skipped regardless of configuration.

pub mod command;
pub mod firewall;
pub mod interface;
pub mod tor;

pub use command::{CommandRunner, Execute};
pub use firewall::IptablesFirewall;
pub use interface::IfconfigInterface;
pub use tor::{SystemTorService, TorControlPort};

/// Whether the process runs with an effective UID of 0
#[cfg(target_os = "linux")]
pub fn is_root() -> bool {
    // SAFETY: geteuid has no preconditions and cannot fail
    unsafe { libc::geteuid() == 0 }
}

/// Whether the process runs with an effective UID of 0
#[cfg(not(target_os = "linux"))]
pub fn is_root() -> bool {
    false
}
