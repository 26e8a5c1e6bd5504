//! Live dashboard loop
//!
//! Pull-based: on every tick the dashboard takes a session snapshot, resolves
//! geolocation for the two addresses, builds a [`DashboardView`] and hands it
//! to a [`Presenter`]. It never mutates the session beyond marking it started.

use crate::clock::Clock;
use crate::error::Result;
use crate::session::SharedSession;
use crate::shutdown::ShutdownSignal;
use crate::traits::{GeoInfo, GeoLookup};
use crate::view::DashboardView;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// How long an `Unknown` geolocation result is reused before retrying
const GEO_RETRY_SECS: i64 = 30;

/// Renders dashboard views
///
/// Implemented by the terminal frontend; tests use recording presenters.
pub trait Presenter: Send {
    /// Draw one frame
    fn render_dashboard(&mut self, view: &DashboardView) -> Result<()>;
}

/// Live dashboard
pub struct Dashboard {
    session: SharedSession,
    geo: Box<dyn GeoLookup>,
    clock: Arc<dyn Clock>,
    refresh: Duration,
    geo_cache: GeoCache,
}

impl Dashboard {
    /// Create a dashboard refreshing every `refresh`
    pub fn new(
        session: SharedSession,
        geo: Box<dyn GeoLookup>,
        clock: Arc<dyn Clock>,
        refresh: Duration,
    ) -> Self {
        Self {
            session,
            geo,
            clock,
            refresh,
            geo_cache: GeoCache::new(chrono::Duration::seconds(GEO_RETRY_SECS)),
        }
    }

    /// Build the view for the current session state
    pub async fn current_view(&mut self) -> DashboardView {
        let snapshot = self.session.read().await.snapshot();

        self.geo_cache
            .retain_shown(&[snapshot.original_address, snapshot.current_address]);

        let original_geo = self.resolve(snapshot.original_address).await;
        let current_geo = self.resolve(snapshot.current_address).await;

        DashboardView::build(&snapshot, self.clock.now(), original_geo, current_geo)
    }

    /// Render until cancelled
    ///
    /// Marks the session as started. A presenter error ends the loop and is
    /// returned to the caller.
    ///
    /// # Returns
    ///
    /// The number of frames rendered
    pub async fn run(&mut self, presenter: &mut dyn Presenter, shutdown: &ShutdownSignal) -> Result<u64> {
        let now = self.clock.now();
        self.session.write().await.ensure_started(now);

        let mut frames = 0;

        loop {
            if shutdown.is_triggered() {
                break;
            }

            // Geolocation may wait on a slow API
            let view = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                view = self.current_view() => view,
            };
            presenter.render_dashboard(&view)?;
            frames += 1;

            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = self.clock.sleep(self.refresh) => {}
            }
        }

        debug!("Dashboard closed after {} frame(s)", frames);
        Ok(frames)
    }

    async fn resolve(&mut self, address: Option<IpAddr>) -> Option<GeoInfo> {
        let address = address?;
        let now = self.clock.now();

        if let Some(info) = self.geo_cache.get(address, now) {
            return Some(info);
        }

        let info = self.geo.locate_or_unknown(address).await;
        self.geo_cache.insert(address, info.clone(), now);
        Some(info)
    }
}

/// Per-address geolocation cache
///
/// Only the addresses currently on screen are kept. Known results live as
/// long as their address is shown; `Unknown` results expire after
/// `retry_after` so a transient API failure is retried.
#[derive(Debug)]
struct GeoCache {
    entries: HashMap<IpAddr, (GeoInfo, DateTime<Utc>)>,
    retry_after: chrono::Duration,
}

impl GeoCache {
    fn new(retry_after: chrono::Duration) -> Self {
        Self {
            entries: HashMap::new(),
            retry_after,
        }
    }

    fn get(&self, address: IpAddr, now: DateTime<Utc>) -> Option<GeoInfo> {
        let (info, fetched_at) = self.entries.get(&address)?;
        if info.is_unknown() && now.signed_duration_since(*fetched_at) >= self.retry_after {
            return None;
        }
        Some(info.clone())
    }

    fn insert(&mut self, address: IpAddr, info: GeoInfo, now: DateTime<Utc>) {
        self.entries.insert(address, (info, now));
    }

    /// Drop entries for addresses that are no longer displayed
    fn retain_shown(&mut self, shown: &[Option<IpAddr>]) {
        self.entries
            .retain(|address, _| shown.contains(&Some(*address)));
    }
}
