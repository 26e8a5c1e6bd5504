//! Collaborator traits for netveil
//!
//! Every external effect netveil has goes through one of these interfaces.
//!
//! - [`InterfaceControl`]: Bring links up/down and randomize MAC addresses
//! - [`TorService`] / [`IdentityChannel`]: Start Tor and request new circuits
//! - [`AddressLookup`]: Observe the public address, directly or through Tor
//! - [`GeoLookup`]: Best-effort geolocation of an address
//! - [`Firewall`]: Install the transparent-proxy rule set

pub mod firewall;
pub mod interface;
pub mod lookup;
pub mod tor;

pub use firewall::Firewall;
pub use interface::{InterfaceControl, LinkState};
pub use lookup::{AddressLookup, GeoInfo, GeoLookup, LookupRoute};
pub use tor::{IdentityChannel, TorService};
