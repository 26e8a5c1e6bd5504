// # netveil-core
//
// Core library for the netveil anonymization dashboard.
//
// ## Architecture Overview
//
// Everything netveil does is a call into an external program or HTTP endpoint.
// This crate owns the part that is not: the session bookkeeping and the loops
// that drive those calls.
//
// - **Session**: Counters, timestamps and addresses for the current run
// - **RotationController**: MAC rotation, Tor identity rotation and address
//   verification, once or on a fixed interval until cancelled
// - **Dashboard**: Pull-based refresh loop that renders session snapshots
// - **Collaborator traits**: `InterfaceControl`, `TorService`,
//   `IdentityChannel`, `AddressLookup`, `GeoLookup`, `Firewall`, `Clock`
//
// ## Design Principles
//
// 1. **No globals**: the session is an explicit object shared by reference
// 2. **Best-effort**: every delegated failure is recoverable
// 3. **Injectable time**: every pause goes through a `Clock`
// 4. **Cooperative cancellation**: loops observe a `ShutdownSignal` between steps

pub mod clock;
pub mod config;
pub mod controller;
pub mod dashboard;
pub mod error;
pub mod session;
pub mod shutdown;
pub mod traits;
pub mod view;

// Re-export core types for convenience
pub use clock::{Clock, TokioClock};
pub use config::NetveilConfig;
pub use controller::{Collaborators, RotationController, RotationEvent};
pub use dashboard::{Dashboard, Presenter};
pub use error::{Error, Result};
pub use session::{Session, SessionSnapshot, SharedSession};
pub use shutdown::{ShutdownSignal, ShutdownTrigger};
pub use traits::{
    AddressLookup, Firewall, GeoInfo, GeoLookup, IdentityChannel, InterfaceControl, LookupRoute,
    TorService,
};
pub use view::{AddressReport, AddressStatus, DashboardView};
