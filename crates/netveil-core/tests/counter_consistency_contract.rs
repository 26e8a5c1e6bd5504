//! Architectural Contract Test: Counter Consistency
//!
//! This test verifies that the session counters count acknowledged changes
//! and nothing else.
//!
//! Constraints verified:
//! - mac_change_count grows by one per fully successful rotation
//! - ip_change_count grows by one per acknowledged identity request
//! - Failed operations leave both counters untouched
//! - A failed link step is not rolled back or retried
//!
//! If this test fails, someone has:
//! - Counted attempts instead of successes
//! - Moved the increment before the external call returns

mod common;

use common::*;
use netveil_core::RotationEvent;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn successful_rotation_counts_once() {
    let mut h = Harness::new();

    assert_ok!(h.controller.rotate_mac_address().await);

    assert_eq!(h.counters().await, (0, 1));
    assert_eq!(
        h.log.effects(),
        vec![
            Call::Link("eth0".to_string(), netveil_core::traits::LinkState::Down),
            Call::RandomizeMac("eth0".to_string()),
            Call::Link("eth0".to_string(), netveil_core::traits::LinkState::Up),
        ]
    );
    assert_eq!(
        h.drain_events(),
        vec![RotationEvent::MacRotated {
            interface: "eth0".to_string(),
            total: 1,
        }]
    );
}

#[tokio::test]
async fn failed_randomization_does_not_count() {
    let mut h = HarnessBuilder {
        mac: vec![false],
        ..Default::default()
    }
    .build();

    let err = assert_err!(h.controller.rotate_mac_address().await);
    assert!(err.to_string().contains("macchanger"));

    assert_eq!(h.counters().await, (0, 0));
    // No rollback: the interface is not brought back up
    assert!(!h.log.effects().contains(&Call::Link(
        "eth0".to_string(),
        netveil_core::traits::LinkState::Up
    )));
    assert!(matches!(
        h.drain_events().as_slice(),
        [RotationEvent::MacRotationFailed { .. }]
    ));
}

#[tokio::test]
async fn failed_link_down_stops_rotation() {
    let mut h = HarnessBuilder {
        link_down: vec![false],
        ..Default::default()
    }
    .build();

    let err = assert_err!(h.controller.rotate_mac_address().await);
    assert!(err.to_string().contains("ifconfig eth0 down"));

    assert_eq!(h.counters().await, (0, 0));
    // Nothing after the failed step runs
    assert_eq!(
        h.log.effects(),
        vec![Call::Link(
            "eth0".to_string(),
            netveil_core::traits::LinkState::Down
        )]
    );
    assert!(!h.log.calls().iter().any(|c| matches!(c, Call::Sleep(_))));
    assert!(matches!(
        h.drain_events().as_slice(),
        [RotationEvent::MacRotationFailed { .. }]
    ));
}

#[tokio::test]
async fn failed_link_up_leaves_interface_down() {
    let mut h = HarnessBuilder {
        link_up: vec![false],
        ..Default::default()
    }
    .build();

    let err = assert_err!(h.controller.rotate_mac_address().await);
    assert!(err.to_string().contains("ifconfig eth0 up"));

    assert_eq!(h.counters().await, (0, 0));
    // No rollback and no second attempt to bring the link up
    assert_eq!(
        h.log.effects(),
        vec![
            Call::Link("eth0".to_string(), netveil_core::traits::LinkState::Down),
            Call::RandomizeMac("eth0".to_string()),
            Call::Link("eth0".to_string(), netveil_core::traits::LinkState::Up),
        ]
    );
    match h.drain_events().as_slice() {
        [RotationEvent::MacRotationFailed { interface, error }] => {
            assert_eq!(interface, "eth0");
            assert!(error.contains("SIOCSIFFLAGS"));
        }
        other => panic!("unexpected events: {:?}", other),
    }

    // The next rotation starts from scratch and counts normally
    assert_ok!(h.controller.rotate_mac_address().await);
    assert_eq!(h.counters().await, (0, 1));
}

#[tokio::test]
async fn acknowledged_identity_counts_once() {
    let h = Harness::new();

    assert_ok!(h.controller.request_new_identity().await);
    assert_ok!(h.controller.request_new_identity().await);

    assert_eq!(h.counters().await, (2, 0));
}

#[tokio::test]
async fn rejected_identity_does_not_count() {
    let mut h = HarnessBuilder {
        identity: vec![false],
        ..Default::default()
    }
    .build();

    assert_err!(h.controller.request_new_identity().await);

    assert_eq!(h.counters().await, (0, 0));
    assert!(matches!(
        h.drain_events().as_slice(),
        [RotationEvent::IdentityChangeFailed { .. }]
    ));
}

#[tokio::test]
async fn new_identity_and_verify_skips_lookup_when_rejected() {
    let h = HarnessBuilder {
        identity: vec![false],
        ..Default::default()
    }
    .build();

    assert_err!(h.controller.new_identity_and_verify().await);

    assert_eq!(h.log.effects(), vec![Call::NewIdentity]);
    assert_eq!(h.session.read().await.current_address(), None);
}

#[tokio::test]
async fn tor_and_routing_report_outcomes() {
    let mut h = HarnessBuilder {
        tor_ok: false,
        ..Default::default()
    }
    .build();

    assert_err!(h.controller.start_tor_service().await);
    assert_ok!(h.controller.install_routing().await);

    assert_eq!(h.log.effects(), vec![Call::TorStart, Call::InstallRouting]);
    let events = h.drain_events();
    assert!(matches!(events[0], RotationEvent::TorStartFailed { .. }));
    assert_eq!(events[1], RotationEvent::RoutingInstalled);
    assert_eq!(h.counters().await, (0, 0));
}
