//! iptables transparent-proxy rules
//!
//! All TCP connections not opened by the Tor user are redirected to Tor's
//! TransPort, DNS to its DNSPort, and any other outbound traffic is rejected.

use crate::command::{CommandRunner, Execute};
use async_trait::async_trait;
use netveil_core::config::NetveilConfig;
use netveil_core::traits::Firewall;
use netveil_core::{Clock, Result};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const IPTABLES: &str = "iptables";

/// Firewall backed by `iptables`
pub struct IptablesFirewall<R = CommandRunner> {
    runner: R,
    rules: Vec<Vec<String>>,
    rule_step_delay: Duration,
    clock: Arc<dyn Clock>,
}

impl<R: Execute> IptablesFirewall<R> {
    pub fn new(
        runner: R,
        rules: Vec<Vec<String>>,
        rule_step_delay: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            runner,
            rules,
            rule_step_delay,
            clock,
        }
    }
}

impl IptablesFirewall {
    pub fn from_config(config: &NetveilConfig, runner: CommandRunner, clock: Arc<dyn Clock>) -> Self {
        Self::new(
            runner,
            rule_set(&config.tor.user, config.tor.trans_port, config.tor.dns_port),
            config.timing.rule_step_delay(),
            clock,
        )
    }
}

/// Commands that empty the `filter` and `nat` tables
pub fn flush_commands() -> Vec<Vec<String>> {
    vec![args(&["-F"]), args(&["-t", "nat", "-F"])]
}

/// The transparent-proxy rules, in installation order
pub fn rule_set(tor_user: &str, trans_port: u16, dns_port: u16) -> Vec<Vec<String>> {
    let trans_port = trans_port.to_string();
    let dns_port = dns_port.to_string();

    vec![
        args(&[
            "-t", "nat", "-A", "OUTPUT", "-m", "owner", "!", "--uid-owner", tor_user, "-p", "tcp",
            "--syn", "-j", "REDIRECT", "--to-ports", &trans_port,
        ]),
        args(&[
            "-t", "nat", "-A", "OUTPUT", "-p", "udp", "--dport", "53", "-j", "REDIRECT",
            "--to-ports", &dns_port,
        ]),
        args(&[
            "-A", "OUTPUT", "-m", "state", "--state", "ESTABLISHED,RELATED", "-j", "ACCEPT",
        ]),
        args(&["-A", "OUTPUT", "-m", "owner", "--uid-owner", tor_user, "-j", "ACCEPT"]),
        args(&["-A", "OUTPUT", "-j", "REJECT"]),
    ]
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|p| p.to_string()).collect()
}

async fn run_iptables<R: Execute>(runner: &R, rule: &[String]) -> Result<()> {
    let rule: Vec<&str> = rule.iter().map(String::as_str).collect();
    runner.run(IPTABLES, &rule).await
}

#[async_trait]
impl<R: Execute> Firewall for IptablesFirewall<R> {
    async fn install_transparent_routing(&self) -> Result<()> {
        for flush in flush_commands() {
            run_iptables(&self.runner, &flush).await?;
        }

        for (index, rule) in self.rules.iter().enumerate() {
            if index > 0 {
                self.clock.sleep(self.rule_step_delay).await;
            }

            if let Err(e) = run_iptables(&self.runner, rule).await {
                warn!(
                    "Firewall left partially configured ({} of {} rules installed)",
                    index,
                    self.rules.len()
                );
                return Err(e);
            }
        }

        debug!("Installed {} iptables rules", self.rules.len());
        Ok(())
    }
}
