//! Rotation controller
//!
//! The RotationController is responsible for:
//! - Rotating the MAC address of the configured interface
//! - Requesting new Tor identities
//! - Verifying the public address, directly or through Tor
//! - Running all three on a fixed interval until cancelled
//!
//! ## Architecture
//!
//! ```text
//!                         ┌────────────────────┐
//!    menu / auto loop ───▶│ RotationController │───▶ RotationEvent (mpsc)
//!                         └────────────────────┘
//!                                   │
//!     ┌──────────────────┬──────────┼─────────────┬──────────────┐
//!     ▼                  ▼          ▼             ▼              ▼
//! ┌──────────────┐ ┌───────────┐ ┌──────────┐ ┌───────────┐ ┌──────────┐
//! │InterfaceCtl  │ │Identity   │ │Address   │ │TorService │ │Firewall  │
//! │(down/mac/up) │ │Channel    │ │Lookup    │ │(start)    │ │(rules)   │
//! └──────────────┘ └───────────┘ └──────────┘ └───────────┘ └──────────┘
//!                                   │
//!                                   ▼
//!                            ┌─────────────┐
//!                            │  Session    │
//!                            └─────────────┘
//! ```
//!
//! ## Automatic Cycle
//!
//! 1. Rotate MAC address
//! 2. Short pause
//! 3. Request new Tor identity
//! 4. Settle pause
//! 5. Verify address through Tor
//! 6. Sleep for the interval, then repeat
//!
//! Every step's failure is reported and absorbed. Cancellation is observed
//! between every two steps and interrupts every pause.

use crate::clock::Clock;
use crate::config::{NetveilConfig, TimingConfig};
use crate::error::Result;
use crate::session::SharedSession;
use crate::shutdown::ShutdownSignal;
use crate::traits::{
    AddressLookup, Firewall, IdentityChannel, InterfaceControl, LinkState, LookupRoute, TorService,
};
use crate::view::{AddressReport, LookupOutcome};
use std::net::IpAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

/// Events emitted by the RotationController
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RotationEvent {
    /// MAC address rotated
    MacRotated { interface: String, total: u64 },

    /// MAC rotation failed; the interface may be down
    MacRotationFailed { interface: String, error: String },

    /// Tor acknowledged a new identity request
    IdentityChanged { total: u64 },

    /// Identity request failed
    IdentityChangeFailed { error: String },

    /// Public address observed
    AddressVerified { route: LookupRoute, address: IpAddr },

    /// Address lookup failed
    VerificationFailed { route: LookupRoute, error: String },

    /// Tor service started
    TorStarted,

    /// Tor service failed to start
    TorStartFailed { error: String },

    /// Firewall rules installed
    RoutingInstalled,

    /// Firewall rule installation failed
    RoutingFailed { error: String },

    /// Automatic cycle started
    CycleStarted { cycle: u64 },

    /// Automatic cycle ran all its steps
    CycleCompleted {
        cycle: u64,
        ip_changes: u64,
        mac_changes: u64,
        address: Option<IpAddr>,
    },

    /// Automatic mode stopped
    Stopped { reason: String },
}

/// External collaborators the controller delegates to
pub struct Collaborators {
    pub interface: Box<dyn InterfaceControl>,
    pub tor_service: Box<dyn TorService>,
    pub identity: Box<dyn IdentityChannel>,
    pub lookup: Box<dyn AddressLookup>,
    pub firewall: Box<dyn Firewall>,
    pub clock: Arc<dyn Clock>,
}

/// Rotation controller
///
/// Owns no state of its own beyond the pending identity settle; all
/// observable state lives in the shared [`Session`](crate::Session).
///
/// ## Threading
///
/// All methods take `&self`. The session lock is never held across an
/// external call.
pub struct RotationController {
    /// Shared session state
    session: SharedSession,

    /// Network interface control
    interface: Box<dyn InterfaceControl>,

    /// Tor service control
    tor_service: Box<dyn TorService>,

    /// Tor control channel
    identity: Box<dyn IdentityChannel>,

    /// Public address lookup
    lookup: Box<dyn AddressLookup>,

    /// Firewall rule installation
    firewall: Box<dyn Firewall>,

    /// Source of time and pauses
    clock: Arc<dyn Clock>,

    /// Pauses between steps
    timing: TimingConfig,

    /// Set by a successful identity request, cleared once the settle delay
    /// has been waited out
    identity_settle_pending: AtomicBool,

    /// Event sender for the presentation layer
    event_tx: mpsc::Sender<RotationEvent>,
}

impl RotationController {
    /// Create a new rotation controller
    ///
    /// # Returns
    ///
    /// A tuple of (controller, event_receiver) where event_receiver yields
    /// rotation events
    pub fn new(
        session: SharedSession,
        collaborators: Collaborators,
        config: &NetveilConfig,
    ) -> Result<(Self, mpsc::Receiver<RotationEvent>)> {
        config.timing.validate()?;

        let capacity = config.engine.event_channel_capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);

        let controller = Self {
            session,
            interface: collaborators.interface,
            tor_service: collaborators.tor_service,
            identity: collaborators.identity,
            lookup: collaborators.lookup,
            firewall: collaborators.firewall,
            clock: collaborators.clock,
            timing: config.timing.clone(),
            identity_settle_pending: AtomicBool::new(false),
            event_tx: tx,
        };

        Ok((controller, rx))
    }

    /// The session this controller mutates
    pub fn session(&self) -> &SharedSession {
        &self.session
    }

    /// Rotate the MAC address of the session's interface
    ///
    /// Brings the interface down, randomizes the MAC, and brings it back up.
    /// Counts the rotation only if all three succeed.
    ///
    /// # Partial Failure
    ///
    /// No rollback is attempted. If the randomization or the final `up`
    /// fails, the interface stays down until the next successful rotation
    /// or manual intervention; this is logged at `warn`.
    pub async fn rotate_mac_address(&self) -> Result<()> {
        let interface = self.session.read().await.network_interface().to_string();
        debug!("Rotating MAC address of {}", interface);

        match self.do_rotate_mac(&interface).await {
            Ok(()) => {
                let total = {
                    let mut session = self.session.write().await;
                    session.record_mac_change();
                    session.mac_change_count()
                };
                info!("MAC address of {} rotated ({} total)", interface, total);
                self.emit_event(RotationEvent::MacRotated { interface, total });

                self.clock.sleep(self.timing.link_up_settle()).await;
                Ok(())
            }
            Err(e) => {
                warn!("MAC rotation of {} failed: {}", interface, e);
                self.emit_event(RotationEvent::MacRotationFailed {
                    interface,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Down, randomize, up
    async fn do_rotate_mac(&self, interface: &str) -> Result<()> {
        self.interface.set_link(interface, LinkState::Down).await?;
        self.clock.sleep(self.timing.mac_step_delay()).await;

        if let Err(e) = self.interface.randomize_mac(interface).await {
            warn!("Interface {} may have been left down", interface);
            return Err(e);
        }
        self.clock.sleep(self.timing.mac_step_delay()).await;

        if let Err(e) = self.interface.set_link(interface, LinkState::Up).await {
            warn!("Interface {} may have been left down", interface);
            return Err(e);
        }

        Ok(())
    }

    /// Ask Tor for a new identity
    ///
    /// On success the identity counter is incremented and the next
    /// anonymized verification waits out the settle delay first. No retry
    /// on failure.
    pub async fn request_new_identity(&self) -> Result<()> {
        debug!("Requesting new Tor identity");

        match self.identity.new_identity().await {
            Ok(()) => {
                let total = {
                    let mut session = self.session.write().await;
                    session.record_identity_change();
                    session.ip_change_count()
                };
                self.identity_settle_pending.store(true, Ordering::SeqCst);
                info!("New Tor identity acknowledged ({} total)", total);
                self.emit_event(RotationEvent::IdentityChanged { total });
                Ok(())
            }
            Err(e) => {
                warn!("New Tor identity request failed: {}", e);
                self.emit_event(RotationEvent::IdentityChangeFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Observe the public address through `route`
    ///
    /// A direct observation becomes the session's original address if none
    /// is recorded yet. An anonymized observation becomes the current
    /// address, after any pending identity settle delay.
    pub async fn verify_current_address(&self, route: LookupRoute) -> Result<IpAddr> {
        if route == LookupRoute::Anonymized {
            self.await_identity_settle().await;
        }

        debug!("Looking up public address ({})", route);

        match self.lookup.lookup(route).await {
            Ok(address) => {
                {
                    let mut session = self.session.write().await;
                    match route {
                        LookupRoute::Direct => {
                            if session.set_original_address(address) {
                                info!("Original address recorded: {}", address);
                            }
                        }
                        LookupRoute::Anonymized => session.set_current_address(address),
                    }
                }
                self.emit_event(RotationEvent::AddressVerified { route, address });
                Ok(address)
            }
            Err(e) => {
                warn!("Address lookup ({}) failed: {}", route, e);
                self.emit_event(RotationEvent::VerificationFailed {
                    route,
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Look up the address both ways and compare
    pub async fn check_addresses(&self) -> AddressReport {
        let direct = LookupOutcome::from(self.verify_current_address(LookupRoute::Direct).await);
        let anonymized =
            LookupOutcome::from(self.verify_current_address(LookupRoute::Anonymized).await);

        AddressReport { direct, anonymized }
    }

    /// Request a new identity and, if Tor acknowledged it, verify the new address
    pub async fn new_identity_and_verify(&self) -> Result<IpAddr> {
        self.request_new_identity().await?;
        self.verify_current_address(LookupRoute::Anonymized).await
    }

    /// Start the Tor service and give it time to bootstrap
    pub async fn start_tor_service(&self) -> Result<()> {
        match self.tor_service.start().await {
            Ok(()) => {
                self.clock.sleep(self.timing.tor_start_settle()).await;
                info!("Tor service started");
                self.emit_event(RotationEvent::TorStarted);
                Ok(())
            }
            Err(e) => {
                warn!("Tor service failed to start: {}", e);
                self.emit_event(RotationEvent::TorStartFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Install the transparent-proxy firewall rules
    pub async fn install_routing(&self) -> Result<()> {
        match self.firewall.install_transparent_routing().await {
            Ok(()) => {
                info!("Transparent Tor routing installed");
                self.emit_event(RotationEvent::RoutingInstalled);
                Ok(())
            }
            Err(e) => {
                warn!("Transparent Tor routing failed: {}", e);
                self.emit_event(RotationEvent::RoutingFailed {
                    error: e.to_string(),
                });
                Err(e)
            }
        }
    }

    /// Rotate MAC, identity and address every `interval` until cancelled
    ///
    /// Marks the session as started. Step failures are reported through
    /// events and never stop the loop. Cancellation is checked between
    /// steps and interrupts every pause; an in-flight step always runs to
    /// completion.
    ///
    /// # Returns
    ///
    /// The number of cycles that ran all their steps
    pub async fn run_automatic_cycle(&self, interval: Duration, shutdown: &ShutdownSignal) -> u64 {
        let now = self.clock.now();
        self.session.write().await.ensure_started(now);

        info!("Automatic mode started (interval={:?})", interval);

        let mut cycle = 0;
        let mut completed = 0;

        loop {
            if shutdown.is_triggered() {
                break;
            }

            cycle += 1;
            self.emit_event(RotationEvent::CycleStarted { cycle });

            let _ = self.rotate_mac_address().await;
            if !self.pause(self.timing.post_mac_delay(), shutdown).await {
                break;
            }

            let _ = self.request_new_identity().await;
            if !self.pause(self.timing.identity_settle(), shutdown).await {
                break;
            }
            self.identity_settle_pending.store(false, Ordering::SeqCst);

            let address = self
                .verify_current_address(LookupRoute::Anonymized)
                .await
                .ok();

            completed += 1;
            let (ip_changes, mac_changes) = {
                let session = self.session.read().await;
                (session.ip_change_count(), session.mac_change_count())
            };
            debug!(
                "Cycle {} done: IP({}) | MAC({})",
                cycle, ip_changes, mac_changes
            );
            self.emit_event(RotationEvent::CycleCompleted {
                cycle,
                ip_changes,
                mac_changes,
                address,
            });

            if !self.pause(interval, shutdown).await {
                break;
            }
        }

        info!("Automatic mode stopped after {} cycle(s)", completed);
        self.emit_event(RotationEvent::Stopped {
            reason: "Shutdown signal".to_string(),
        });

        completed
    }

    /// Sleep for `duration` unless cancelled first
    ///
    /// Returns `false` if the loop should stop.
    async fn pause(&self, duration: Duration, shutdown: &ShutdownSignal) -> bool {
        if shutdown.is_triggered() {
            return false;
        }

        tokio::select! {
            biased;
            _ = shutdown.cancelled() => false,
            _ = self.clock.sleep(duration) => !shutdown.is_triggered(),
        }
    }

    /// Wait out the settle delay of the last acknowledged identity, once
    async fn await_identity_settle(&self) {
        if self.identity_settle_pending.swap(false, Ordering::SeqCst) {
            debug!(
                "Waiting {:?} for the new identity to propagate",
                self.timing.identity_settle()
            );
            self.clock.sleep(self.timing.identity_settle()).await;
        }
    }

    /// Emit a rotation event
    fn emit_event(&self, event: RotationEvent) {
        // Send event, logging warning if channel is full (backpressure)
        if self.event_tx.try_send(event).is_err() {
            warn!("Event channel full, dropping rotation event. Consider increasing event_channel_capacity.");
        }
    }
}
