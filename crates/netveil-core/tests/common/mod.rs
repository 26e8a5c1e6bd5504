//! Test doubles and common utilities for contract tests
//!
//! Every fake appends to a shared [`CallLog`], so tests can assert on the
//! exact order of external calls and pauses.

#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use netveil_core::config::{NetveilConfig, TimingConfig};
use netveil_core::controller::{Collaborators, RotationController, RotationEvent};
use netveil_core::dashboard::Presenter;
use netveil_core::error::{Error, Result};
use netveil_core::session::{Session, SharedSession};
use netveil_core::shutdown::{self, ShutdownSignal, ShutdownTrigger};
use netveil_core::traits::{
    AddressLookup, Firewall, GeoInfo, GeoLookup, IdentityChannel, InterfaceControl, LinkState,
    LookupRoute, TorService,
};
use netveil_core::view::DashboardView;
use netveil_core::Clock;
use std::collections::VecDeque;
use std::net::IpAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;

pub fn ip(s: &str) -> IpAddr {
    s.parse().expect("valid test address")
}

pub fn t0() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 5, 1, 12, 0, 0).unwrap()
}

/// One observable external effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Link(String, LinkState),
    RandomizeMac(String),
    NewIdentity,
    Lookup(LookupRoute),
    Locate(IpAddr),
    TorStart,
    InstallRouting,
    Sleep(Duration),
}

/// Shared, ordered record of calls
#[derive(Debug, Clone, Default)]
pub struct CallLog(Arc<Mutex<Vec<Call>>>);

impl CallLog {
    pub fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    pub fn calls(&self) -> Vec<Call> {
        self.0.lock().unwrap().clone()
    }

    pub fn count(&self, pred: impl Fn(&Call) -> bool) -> usize {
        self.0.lock().unwrap().iter().filter(|c| pred(c)).count()
    }

    /// Calls other than pauses, in order
    pub fn effects(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| !matches!(c, Call::Sleep(_)))
            .collect()
    }
}

/// Scripted outcomes, falling back to a default once exhausted
pub struct Script<T: Clone> {
    outcomes: Mutex<VecDeque<T>>,
    default: T,
}

impl<T: Clone> Script<T> {
    pub fn new(outcomes: Vec<T>, default: T) -> Self {
        Self {
            outcomes: Mutex::new(outcomes.into()),
            default,
        }
    }

    pub fn next(&self) -> T {
        self.outcomes
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone())
    }
}

/// Fires a shutdown trigger on the n-th call (1-based)
pub struct CancelAt {
    call: usize,
    seen: AtomicUsize,
    trigger: Arc<ShutdownTrigger>,
}

impl CancelAt {
    pub fn new(call: usize, trigger: Arc<ShutdownTrigger>) -> Self {
        Self {
            call,
            seen: AtomicUsize::new(0),
            trigger,
        }
    }

    pub fn tick(&self) {
        if self.seen.fetch_add(1, Ordering::SeqCst) + 1 == self.call {
            self.trigger.trigger();
        }
    }
}

/// Clock that records pauses and advances virtual time instead of sleeping
pub struct RecordingClock {
    log: CallLog,
    now: Mutex<DateTime<Utc>>,
}

impl RecordingClock {
    pub fn new(log: CallLog, start: DateTime<Utc>) -> Self {
        Self {
            log,
            now: Mutex::new(start),
        }
    }
}

#[async_trait]
impl Clock for RecordingClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }

    async fn sleep(&self, duration: Duration) {
        self.log.push(Call::Sleep(duration));
        {
            let mut now = self.now.lock().unwrap();
            *now += chrono::Duration::from_std(duration).unwrap();
        }
        tokio::task::yield_now().await;
    }
}

pub struct FakeInterface {
    log: CallLog,
    link_down: Script<bool>,
    link_up: Script<bool>,
    randomize: Script<bool>,
    cancel: Option<CancelAt>,
}

#[async_trait]
impl InterfaceControl for FakeInterface {
    async fn set_link(&self, interface: &str, state: LinkState) -> Result<()> {
        self.log.push(Call::Link(interface.to_string(), state));
        let ok = match state {
            LinkState::Down => self.link_down.next(),
            LinkState::Up => self.link_up.next(),
        };
        if ok {
            Ok(())
        } else {
            Err(Error::command_failed(
                format!("sudo ifconfig {} {}", interface, state.as_str()),
                "exit status: 255: SIOCSIFFLAGS: Cannot assign requested address",
            ))
        }
    }

    async fn randomize_mac(&self, interface: &str) -> Result<()> {
        self.log.push(Call::RandomizeMac(interface.to_string()));
        if let Some(cancel) = &self.cancel {
            cancel.tick();
        }
        if self.randomize.next() {
            Ok(())
        } else {
            Err(Error::command_failed(
                format!("sudo macchanger -r {}", interface),
                "exit status: 1",
            ))
        }
    }
}

pub struct FakeIdentity {
    log: CallLog,
    results: Script<bool>,
    cancel: Option<CancelAt>,
}

#[async_trait]
impl IdentityChannel for FakeIdentity {
    async fn new_identity(&self) -> Result<()> {
        self.log.push(Call::NewIdentity);
        if let Some(cancel) = &self.cancel {
            cancel.tick();
        }
        if self.results.next() {
            Ok(())
        } else {
            Err(Error::identity_channel("connection refused (127.0.0.1:9051)"))
        }
    }
}

pub struct FakeLookup {
    log: CallLog,
    direct: Script<Option<IpAddr>>,
    anonymized: Script<Option<IpAddr>>,
    cancel_on_anonymized: Option<CancelAt>,
}

#[async_trait]
impl AddressLookup for FakeLookup {
    async fn lookup(&self, route: LookupRoute) -> Result<IpAddr> {
        self.log.push(Call::Lookup(route));
        let outcome = match route {
            LookupRoute::Direct => self.direct.next(),
            LookupRoute::Anonymized => {
                if let Some(cancel) = &self.cancel_on_anonymized {
                    cancel.tick();
                }
                self.anonymized.next()
            }
        };
        outcome.ok_or_else(|| Error::unreachable(format!("{} lookup timed out", route)))
    }
}

pub struct FakeTorService {
    log: CallLog,
    ok: bool,
}

#[async_trait]
impl TorService for FakeTorService {
    async fn start(&self) -> Result<()> {
        self.log.push(Call::TorStart);
        if self.ok {
            Ok(())
        } else {
            Err(Error::command_failed("sudo service tor start", "exit status: 1"))
        }
    }
}

pub struct FakeFirewall {
    log: CallLog,
    ok: bool,
}

#[async_trait]
impl Firewall for FakeFirewall {
    async fn install_transparent_routing(&self) -> Result<()> {
        self.log.push(Call::InstallRouting);
        if self.ok {
            Ok(())
        } else {
            Err(Error::command_failed("sudo iptables -F", "exit status: 4"))
        }
    }
}

/// Geolocation fake answering with a fixed country
pub struct FakeGeo {
    pub log: CallLog,
    pub fail: bool,
}

#[async_trait]
impl GeoLookup for FakeGeo {
    async fn locate(&self, address: IpAddr) -> Result<GeoInfo> {
        self.log.push(Call::Locate(address));
        if self.fail {
            return Err(Error::unreachable("ip-api.com"));
        }
        Ok(GeoInfo {
            country: "Netherlands".to_string(),
            city: "Amsterdam".to_string(),
            isp: format!("AS for {}", address),
        })
    }
}

/// Geolocation that never answers, like an API stuck behind a dead route
pub struct StalledGeo {
    pub log: CallLog,
}

#[async_trait]
impl GeoLookup for StalledGeo {
    async fn locate(&self, address: IpAddr) -> Result<GeoInfo> {
        self.log.push(Call::Locate(address));
        std::future::pending().await
    }
}

/// Presenter that keeps every frame and cancels after `stop_after` frames
pub struct RecordingPresenter {
    pub frames: Vec<DashboardView>,
    stop_after: usize,
    trigger: Arc<ShutdownTrigger>,
}

impl RecordingPresenter {
    pub fn new(stop_after: usize, trigger: Arc<ShutdownTrigger>) -> Self {
        Self {
            frames: Vec::new(),
            stop_after,
            trigger,
        }
    }
}

impl Presenter for RecordingPresenter {
    fn render_dashboard(&mut self, view: &DashboardView) -> Result<()> {
        self.frames.push(view.clone());
        if self.frames.len() >= self.stop_after {
            self.trigger.trigger();
        }
        Ok(())
    }
}

/// Knobs for building a controller wired to fakes
pub struct HarnessBuilder {
    pub link_down: Vec<bool>,
    pub link_up: Vec<bool>,
    pub mac: Vec<bool>,
    pub identity: Vec<bool>,
    pub direct: Vec<Option<IpAddr>>,
    pub direct_default: Option<IpAddr>,
    pub anonymized: Vec<Option<IpAddr>>,
    pub anonymized_default: Option<IpAddr>,
    pub cancel_on_randomize: Option<usize>,
    pub cancel_on_identity: Option<usize>,
    pub cancel_on_anonymized_lookup: Option<usize>,
    pub tor_ok: bool,
    pub firewall_ok: bool,
    pub timing: TimingConfig,
    pub clock: Option<Arc<dyn Clock>>,
}

impl Default for HarnessBuilder {
    fn default() -> Self {
        Self {
            link_down: Vec::new(),
            link_up: Vec::new(),
            mac: Vec::new(),
            identity: Vec::new(),
            direct: Vec::new(),
            direct_default: Some(ip("1.2.3.4")),
            anonymized: Vec::new(),
            anonymized_default: Some(ip("5.6.7.8")),
            cancel_on_randomize: None,
            cancel_on_identity: None,
            cancel_on_anonymized_lookup: None,
            tor_ok: true,
            firewall_ok: true,
            timing: TimingConfig::default(),
            clock: None,
        }
    }
}

impl HarnessBuilder {
    pub fn build(self) -> Harness {
        let log = CallLog::default();
        let (trigger, shutdown) = shutdown::channel();
        let trigger = Arc::new(trigger);

        let cancel = |at: Option<usize>| at.map(|n| CancelAt::new(n, trigger.clone()));

        let clock: Arc<dyn Clock> = self
            .clock
            .unwrap_or_else(|| Arc::new(RecordingClock::new(log.clone(), t0())));

        let collaborators = Collaborators {
            interface: Box::new(FakeInterface {
                log: log.clone(),
                link_down: Script::new(self.link_down, true),
                link_up: Script::new(self.link_up, true),
                randomize: Script::new(self.mac, true),
                cancel: cancel(self.cancel_on_randomize),
            }),
            tor_service: Box::new(FakeTorService {
                log: log.clone(),
                ok: self.tor_ok,
            }),
            identity: Box::new(FakeIdentity {
                log: log.clone(),
                results: Script::new(self.identity, true),
                cancel: cancel(self.cancel_on_identity),
            }),
            lookup: Box::new(FakeLookup {
                log: log.clone(),
                direct: Script::new(self.direct, self.direct_default),
                anonymized: Script::new(self.anonymized, self.anonymized_default),
                cancel_on_anonymized: cancel(self.cancel_on_anonymized_lookup),
            }),
            firewall: Box::new(FakeFirewall {
                log: log.clone(),
                ok: self.firewall_ok,
            }),
            clock: clock.clone(),
        };

        let config = NetveilConfig {
            timing: self.timing,
            ..NetveilConfig::default()
        };

        let session = Session::new("eth0").shared();
        let (controller, events) =
            RotationController::new(session.clone(), collaborators, &config)
                .expect("controller construction succeeds");

        Harness {
            log,
            session,
            controller,
            events,
            trigger,
            shutdown,
            clock,
        }
    }
}

pub struct Harness {
    pub log: CallLog,
    pub session: SharedSession,
    pub controller: RotationController,
    pub events: mpsc::Receiver<RotationEvent>,
    pub trigger: Arc<ShutdownTrigger>,
    pub shutdown: ShutdownSignal,
    pub clock: Arc<dyn Clock>,
}

impl Harness {
    pub fn new() -> Self {
        HarnessBuilder::default().build()
    }

    /// (ip_change_count, mac_change_count)
    pub async fn counters(&self) -> (u64, u64) {
        let session = self.session.read().await;
        (session.ip_change_count(), session.mac_change_count())
    }

    pub fn drain_events(&mut self) -> Vec<RotationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}
