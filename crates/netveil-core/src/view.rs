//! Renderable views of session state
//!
//! Views are plain data built from a [`SessionSnapshot`]. Absent fields are
//! replaced by explicit placeholders here, so presenters never deal with
//! `Option`s.

use crate::session::SessionSnapshot;
use crate::traits::GeoInfo;
use chrono::{DateTime, Local, Utc};
use serde::Serialize;
use std::net::IpAddr;

/// Placeholder for an address that has not been observed yet
pub const UNKNOWN_ADDRESS: &str = "unknown";

/// Placeholder uptime for a session that has not started
pub const ZERO_UPTIME: &str = "00:00:00";

/// Outcome of a single address lookup
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LookupOutcome {
    Observed { address: IpAddr },
    Failed { error: String },
}

impl LookupOutcome {
    pub fn address(&self) -> Option<IpAddr> {
        match self {
            LookupOutcome::Observed { address } => Some(*address),
            LookupOutcome::Failed { .. } => None,
        }
    }

    /// Address, or the error message when the lookup failed
    pub fn display(&self) -> String {
        match self {
            LookupOutcome::Observed { address } => address.to_string(),
            LookupOutcome::Failed { error } => format!("Error: {}", error),
        }
    }
}

impl<E: std::fmt::Display> From<Result<IpAddr, E>> for LookupOutcome {
    fn from(result: Result<IpAddr, E>) -> Self {
        match result {
            Ok(address) => LookupOutcome::Observed { address },
            Err(e) => LookupOutcome::Failed {
                error: e.to_string(),
            },
        }
    }
}

/// Verdict of a direct-vs-anonymized address comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStatus {
    /// The anonymized path exits from a different address
    Anonymous,
    /// Both paths exit from the same address
    Problem,
    /// At least one lookup failed, nothing can be concluded
    Unverified,
}

impl std::fmt::Display for AddressStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AddressStatus::Anonymous => f.write_str("anonymous"),
            AddressStatus::Problem => f.write_str("problem"),
            AddressStatus::Unverified => f.write_str("unverified"),
        }
    }
}

/// Result of checking both lookup routes
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressReport {
    pub direct: LookupOutcome,
    pub anonymized: LookupOutcome,
}

impl AddressReport {
    pub fn status(&self) -> AddressStatus {
        match (self.direct.address(), self.anonymized.address()) {
            (Some(direct), Some(anonymized)) if direct != anonymized => AddressStatus::Anonymous,
            (Some(_), Some(_)) => AddressStatus::Problem,
            _ => AddressStatus::Unverified,
        }
    }
}

/// One row of the address table
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AddressRow {
    pub label: &'static str,
    pub address: String,
    pub geo: GeoInfo,
}

/// Everything the live dashboard shows
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DashboardView {
    /// Local wall-clock time, `HH:MM:SS`
    pub time: String,
    /// Time since the session started, `HH:MM:SS`
    pub uptime: String,
    pub ip_changes: u64,
    pub mac_changes: u64,
    pub interface: String,
    pub addresses: Vec<AddressRow>,
}

impl DashboardView {
    /// Build a view from a snapshot
    ///
    /// Missing geolocation is rendered as [`GeoInfo::unknown`], missing
    /// addresses as [`UNKNOWN_ADDRESS`].
    pub fn build(
        snapshot: &SessionSnapshot,
        now: DateTime<Utc>,
        original_geo: Option<GeoInfo>,
        current_geo: Option<GeoInfo>,
    ) -> Self {
        let addresses = vec![
            address_row("Original", snapshot.original_address, original_geo),
            address_row("Current (Tor)", snapshot.current_address, current_geo),
        ];

        Self {
            time: now.with_timezone(&Local).format("%H:%M:%S").to_string(),
            uptime: format_uptime(snapshot.session_start, now),
            ip_changes: snapshot.ip_change_count,
            mac_changes: snapshot.mac_change_count,
            interface: snapshot.network_interface.clone(),
            addresses,
        }
    }
}

fn address_row(label: &'static str, address: Option<IpAddr>, geo: Option<GeoInfo>) -> AddressRow {
    AddressRow {
        label,
        address: address
            .map(|a| a.to_string())
            .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
        geo: geo.unwrap_or_default(),
    }
}

/// Format the time elapsed since `start` as `HH:MM:SS`
///
/// Hours are not wrapped at 24. A missing or future start yields
/// [`ZERO_UPTIME`].
pub fn format_uptime(start: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(start) = start else {
        return ZERO_UPTIME.to_string();
    };

    let secs = now.signed_duration_since(start).num_seconds();
    if secs <= 0 {
        return ZERO_UPTIME.to_string();
    }

    format!("{:02}:{:02}:{:02}", secs / 3600, (secs % 3600) / 60, secs % 60)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Session;
    use chrono::TimeZone;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_report_anonymous_when_addresses_differ() {
        let report = AddressReport {
            direct: LookupOutcome::Observed { address: ip("1.2.3.4") },
            anonymized: LookupOutcome::Observed { address: ip("5.6.7.8") },
        };
        assert_eq!(report.status(), AddressStatus::Anonymous);
    }

    #[test]
    fn test_report_problem_when_addresses_match() {
        let report = AddressReport {
            direct: LookupOutcome::Observed { address: ip("1.2.3.4") },
            anonymized: LookupOutcome::Observed { address: ip("1.2.3.4") },
        };
        assert_eq!(report.status(), AddressStatus::Problem);
    }

    #[test]
    fn test_report_unverified_on_failed_lookup() {
        let report = AddressReport {
            direct: LookupOutcome::Observed { address: ip("1.2.3.4") },
            anonymized: LookupOutcome::Failed {
                error: "connection refused".to_string(),
            },
        };
        assert_eq!(report.status(), AddressStatus::Unverified);
        assert_eq!(report.anonymized.display(), "Error: connection refused");
    }

    #[test]
    fn test_uptime_formatting() {
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        assert_eq!(format_uptime(None, start), "00:00:00");
        assert_eq!(
            format_uptime(Some(start), start + chrono::Duration::seconds(3723)),
            "01:02:03"
        );
        assert_eq!(
            format_uptime(Some(start), start + chrono::Duration::hours(26)),
            "26:00:00"
        );
        assert_eq!(
            format_uptime(Some(start), start - chrono::Duration::seconds(5)),
            "00:00:00"
        );
    }

    #[test]
    fn test_view_substitutes_placeholders() {
        let snapshot = Session::new("eth0").snapshot();
        let now = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();

        let view = DashboardView::build(&snapshot, now, None, None);

        assert_eq!(view.uptime, ZERO_UPTIME);
        assert_eq!(view.interface, "eth0");
        assert_eq!(view.addresses.len(), 2);
        for row in &view.addresses {
            assert_eq!(row.address, UNKNOWN_ADDRESS);
            assert!(row.geo.is_unknown());
        }
    }

    #[test]
    fn test_view_carries_counters_and_geo() {
        let mut session = Session::new("wlan0");
        let start = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        session.ensure_started(start);
        session.record_mac_change();
        session.record_identity_change();
        session.record_identity_change();
        session.set_current_address(ip("5.6.7.8"));

        let geo = GeoInfo {
            country: "Iceland".to_string(),
            city: "Reykjavik".to_string(),
            isp: "1984 ehf".to_string(),
        };
        let view = DashboardView::build(
            &session.snapshot(),
            start + chrono::Duration::seconds(61),
            None,
            Some(geo.clone()),
        );

        assert_eq!(view.uptime, "00:01:01");
        assert_eq!(view.mac_changes, 1);
        assert_eq!(view.ip_changes, 2);
        assert_eq!(view.addresses[1].address, "5.6.7.8");
        assert_eq!(view.addresses[1].geo, geo);
        assert_eq!(view.addresses[0].address, UNKNOWN_ADDRESS);
    }
}
