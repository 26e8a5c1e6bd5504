//! Interactive application
//!
//! Wires the system collaborators into a controller and dashboard, then
//! runs the setup prompts and the main menu. All rotation logic lives in
//! netveil-core; this module only sequences prompts, spinners and output.

use crate::prompt::Prompt;
use crate::render::{self, TerminalPresenter};
use anyhow::{Context, Result};
use netveil_core::config::validate_interface_name;
use netveil_core::shutdown::{self, ShutdownSignal};
use netveil_core::{
    Clock, Collaborators, Dashboard, NetveilConfig, RotationController, RotationEvent, Session,
    SharedSession, TokioClock,
};
use netveil_geo_ipapi::IpApiGeoLookup;
use netveil_http::HttpAddressLookup;
use netveil_sys::{
    CommandRunner, IfconfigInterface, IptablesFirewall, SystemTorService, TorControlPort,
};
use std::future::Future;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_stream::StreamExt;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

/// How an interactive session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The user quit from the menu or interrupted a prompt
    Finished,
    /// The user declined to continue without root privileges
    Declined,
}

pub struct App {
    config: NetveilConfig,
    session: SharedSession,
    controller: RotationController,
    events: ReceiverStream<RotationEvent>,
    dashboard: Dashboard,
    prompt: Prompt,
}

impl App {
    pub fn new(config: NetveilConfig) -> Result<Self> {
        let clock: Arc<dyn Clock> = Arc::new(TokioClock);
        let runner = CommandRunner::from_config(&config);

        let collaborators = Collaborators {
            interface: Box::new(IfconfigInterface::new(runner.clone())),
            tor_service: Box::new(SystemTorService::new(runner.clone())),
            identity: Box::new(
                TorControlPort::from_config(&config).context("Invalid Tor control settings")?,
            ),
            lookup: Box::new(
                HttpAddressLookup::from_config(&config).context("Failed to set up address lookup")?,
            ),
            firewall: Box::new(IptablesFirewall::from_config(&config, runner, clock.clone())),
            clock: clock.clone(),
        };

        let session = Session::new(config.interface.clone()).shared();
        let (controller, events) = RotationController::new(session.clone(), collaborators, &config)
            .context("Failed to create rotation controller")?;

        let geo = IpApiGeoLookup::from_config(&config).context("Failed to set up geolocation")?;
        let dashboard = Dashboard::new(
            session.clone(),
            Box::new(geo),
            clock,
            config.timing.dashboard_refresh(),
        );

        Ok(Self {
            config,
            session,
            controller,
            events: ReceiverStream::new(events),
            dashboard,
            prompt: Prompt::new(),
        })
    }

    /// Setup prompts followed by the main menu
    pub async fn run(mut self) -> Result<Outcome> {
        if !self.initial_setup().await? {
            return Ok(Outcome::Declined);
        }
        self.menu_loop().await?;
        Ok(Outcome::Finished)
    }

    /// Returns `false` if the user chose not to continue
    async fn initial_setup(&mut self) -> Result<bool> {
        render::banner()?;
        render::heading("Initial setup");

        if !netveil_sys::is_root() {
            render::notice("Some actions need root privileges (MAC change, Tor, routing)");
            match self.prompt.confirm("Continue without root privileges?").await? {
                Some(true) => {}
                _ => return Ok(false),
            }
        }

        loop {
            let default = self.config.interface.clone();
            let Some(interface) = self
                .prompt
                .ask_with_default("Network interface", &default)
                .await?
            else {
                return Ok(false);
            };
            if self.set_interface(interface).await {
                break;
            }
        }

        render::success("Setup complete");
        Ok(true)
    }

    async fn menu_loop(&mut self) -> Result<()> {
        loop {
            render::banner()?;
            render::menu();

            let Some(choice) = self.prompt.ask("Choose an option [1-9]: ").await? else {
                println!("\nGoodbye!");
                return Ok(());
            };

            match choice.as_str() {
                "1" => self.check_current_ip().await,
                "2" => self.change_mac().await,
                "3" => self.start_tor().await,
                "4" => self.configure_routing().await,
                "5" => self.new_identity().await,
                "6" => self.automatic_mode().await,
                "7" => self.live_dashboard().await?,
                "8" => self.settings().await?,
                "9" => {
                    println!("Thanks for using netveil!");
                    return Ok(());
                }
                other => render::failure(&format!("Invalid option: '{}'", other)),
            }

            if choice != "6" && choice != "7" && !self.prompt.pause().await? {
                return Ok(());
            }
        }
    }

    async fn check_current_ip(&mut self) {
        render::heading("Checking IP addresses");
        let report = interruptible(
            "Looking up public address (direct, then through Tor)...",
            self.controller.check_addresses(),
        )
        .await;

        // The report table covers every lookup event
        self.discard_events();
        match report {
            Some(report) => render::address_report(&report),
            None => render::notice("Cancelled"),
        }
    }

    async fn change_mac(&mut self) {
        let outcome =
            interruptible("Changing MAC address...", self.controller.rotate_mac_address()).await;
        self.finish_action(outcome);
    }

    async fn start_tor(&mut self) {
        let outcome = interruptible("Starting Tor...", self.controller.start_tor_service()).await;
        self.finish_action(outcome);
    }

    async fn configure_routing(&mut self) {
        let outcome =
            interruptible("Configuring Tor routing...", self.controller.install_routing()).await;
        self.finish_action(outcome);
    }

    async fn new_identity(&mut self) {
        let outcome = interruptible(
            "Generating a new identity...",
            self.controller.new_identity_and_verify(),
        )
        .await;
        self.finish_action(outcome);
    }

    /// Print what a single action reported
    ///
    /// `None` means the user interrupted it.
    fn finish_action<T>(&mut self, outcome: Option<netveil_core::Result<T>>) {
        self.print_events();
        match outcome {
            None => render::notice("Cancelled"),
            Some(Err(e)) if !e.is_recoverable() => {
                render::notice("Check the network interface under Settings (option 8)")
            }
            Some(_) => {}
        }
    }

    async fn automatic_mode(&mut self) {
        let interval = self.config.timing.auto_interval();
        render::heading("Automatic mode enabled");
        println!("Changes every {} seconds", interval.as_secs());
        println!("Ctrl+C to stop\n");

        let (signal, interrupt) = interrupt_signal();

        let completed = {
            let run = self.controller.run_automatic_cycle(interval, &signal);
            tokio::pin!(run);

            loop {
                tokio::select! {
                    completed = &mut run => break completed,
                    Some(event) = self.events.next() => {
                        println!("{}", render::event_line(&event));
                        if matches!(event, RotationEvent::CycleCompleted { .. }) {
                            println!("Waiting {} seconds...\n", interval.as_secs());
                        }
                    }
                }
            }
        };
        interrupt.abort();

        self.print_events();
        info!("Automatic mode ran {} cycle(s)", completed);
        println!("{} cycle(s) completed", completed);
    }

    async fn live_dashboard(&mut self) -> Result<()> {
        let (signal, interrupt) = interrupt_signal();
        let mut presenter = TerminalPresenter::new();

        let frames = self.dashboard.run(&mut presenter, &signal).await;
        interrupt.abort();

        let frames = frames.context("Dashboard rendering failed")?;
        debug!("Dashboard rendered {} frame(s)", frames);
        println!();
        render::notice("Dashboard closed");
        Ok(())
    }

    async fn settings(&mut self) -> Result<()> {
        render::heading("Settings");

        let current = self.session.read().await.network_interface().to_string();
        let Some(interface) = self
            .prompt
            .ask_with_default(
                &format!("Current network interface: {}. New interface", current),
                &current,
            )
            .await?
        else {
            return Ok(());
        };

        // An invalid name was already reported; keep the current one
        self.set_interface(interface).await;
        Ok(())
    }

    /// Switch the session to `interface`; `false` if the name is invalid
    async fn set_interface(&mut self, interface: String) -> bool {
        if let Err(e) = validate_interface_name(&interface) {
            render::failure(&e.to_string());
            return false;
        }

        self.session
            .write()
            .await
            .set_network_interface(interface.clone());
        render::success(&format!("Interface set to {}", interface));
        self.config.interface = interface;
        true
    }

    fn print_events(&mut self) {
        while let Ok(event) = self.events.as_mut().try_recv() {
            println!("{}", render::event_line(&event));
        }
    }

    fn discard_events(&mut self) {
        while self.events.as_mut().try_recv().is_ok() {}
    }
}

/// Shutdown signal fired by the next Ctrl+C
///
/// Abort the returned handle once the guarded loop has ended.
fn interrupt_signal() -> (ShutdownSignal, JoinHandle<()>) {
    let (trigger, signal) = shutdown::channel();
    let handle = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            trigger.trigger();
        }
    });
    (signal, handle)
}

/// Run a single menu action under a spinner until it ends or Ctrl+C
async fn interruptible<F: Future>(message: &str, action: F) -> Option<F::Output> {
    let (signal, interrupt) = interrupt_signal();
    let output = with_spinner(message, action, &signal).await;
    interrupt.abort();
    output
}

/// `None` if `shutdown` fires first; the action is dropped, which kills any
/// command it was waiting on
async fn with_spinner<F: Future>(
    message: &str,
    action: F,
    shutdown: &ShutdownSignal,
) -> Option<F::Output> {
    let pb = render::spinner(message);
    let output = tokio::select! {
        biased;
        _ = shutdown.cancelled() => None,
        output = action => Some(output),
    };
    pb.finish_and_clear();
    output
}
