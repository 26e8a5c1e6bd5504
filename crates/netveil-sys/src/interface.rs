//! `ifconfig` / `macchanger` interface control

use crate::command::{CommandRunner, Execute};
use async_trait::async_trait;
use netveil_core::config::validate_interface_name;
use netveil_core::traits::{InterfaceControl, LinkState};
use netveil_core::Result;

/// Interface control through `ifconfig` and `macchanger`
#[derive(Debug, Clone)]
pub struct IfconfigInterface<R = CommandRunner> {
    runner: R,
}

impl<R: Execute> IfconfigInterface<R> {
    pub fn new(runner: R) -> Self {
        Self { runner }
    }
}

#[async_trait]
impl<R: Execute> InterfaceControl for IfconfigInterface<R> {
    async fn set_link(&self, interface: &str, state: LinkState) -> Result<()> {
        // Names reach a privileged command line
        validate_interface_name(interface)?;
        self.runner.run("ifconfig", &[interface, state.as_str()]).await
    }

    async fn randomize_mac(&self, interface: &str) -> Result<()> {
        validate_interface_name(interface)?;
        self.runner.run("macchanger", &["-r", interface]).await
    }
}
