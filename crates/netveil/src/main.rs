// # netveil - Anonymization Dashboard
//
// Interactive front end for MAC rotation, Tor identity rotation and public
// address verification.
//
// The binary is responsible for:
// 1. Reading configuration from environment variables
// 2. Initializing logging and the runtime
// 3. Wiring system collaborators into the core controller
// 4. Running the setup prompts and the main menu
//
// ## Configuration
//
// All configuration is done via environment variables; every one is optional:
//
// ### Interface
// - `NETVEIL_INTERFACE`: Network interface for MAC rotation (default `eth0`)
// - `NETVEIL_USE_SUDO`: Prefix system commands with `sudo -n` (default `true`)
//
// ### Tor
// - `NETVEIL_TOR_CONTROL_ADDR`: Control port (default `127.0.0.1:9051`)
// - `NETVEIL_TOR_CONTROL_PASSWORD`: Control port password
// - `NETVEIL_TOR_SOCKS`: SOCKS proxy URL (default `socks5h://127.0.0.1:9050`)
// - `NETVEIL_TOR_USER`: User the Tor daemon runs as (default `debian-tor`)
//
// ### Endpoints
// - `NETVEIL_ADDRESS_URL`: Plain-text address service (default `https://ifconfig.me/ip`)
// - `NETVEIL_GEO_URL`: Geolocation base URL (default `http://ip-api.com/json`)
//
// ### Timing
// - `NETVEIL_AUTO_INTERVAL_SECS`: Pause between automatic cycles (default 20)
// - `NETVEIL_COMMAND_TIMEOUT_SECS`: System command timeout (default 15)
// - `NETVEIL_HTTP_TIMEOUT_SECS`: HTTP request timeout (default 10)
//
// ### Logging
// - `NETVEIL_LOG_LEVEL`: trace, debug, info, warn, error (default `warn`).
//   Logs go to stderr so they do not interleave with the menu.
//
// ## Example
//
// ```bash
// sudo NETVEIL_INTERFACE=wlan0 NETVEIL_LOG_LEVEL=info netveil 2>netveil.log
// ```

mod app;
mod prompt;
mod render;
mod settings;

use app::{App, Outcome};
use console::style;
use settings::Settings;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::FmtSubscriber;

/// Exit codes for different termination scenarios
#[derive(Debug, Clone, Copy)]
enum NetveilExitCode {
    /// The user quit
    CleanShutdown = 0,
    /// Configuration error, or the user declined to continue without root
    ConfigError = 1,
    /// Runtime error, including panics
    RuntimeError = 2,
}

impl From<NetveilExitCode> for ExitCode {
    fn from(code: NetveilExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("Configuration error: {:#}", e);
            return NetveilExitCode::ConfigError.into();
        }
    };

    if let Err(e) = settings.validate() {
        eprintln!("Configuration validation error: {:#}", e);
        return NetveilExitCode::ConfigError.into();
    }

    let subscriber = FmtSubscriber::builder()
        .with_max_level(settings.log_level())
        .with_writer(std::io::stderr)
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return NetveilExitCode::ConfigError.into();
    }

    info!("Starting netveil (interface={})", settings.config.interface);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return NetveilExitCode::RuntimeError.into();
        }
    };

    let code = rt.block_on(async {
        let app = match App::new(settings.config) {
            Ok(app) => app,
            Err(e) => {
                error!("Startup failed: {:#}", e);
                eprintln!("{} {:#}", style("✗").red(), e);
                return NetveilExitCode::ConfigError;
            }
        };

        // A panic inside the session surfaces as a JoinError instead of
        // tearing down the terminal mid-frame
        match tokio::spawn(app.run()).await {
            Ok(Ok(Outcome::Finished)) => NetveilExitCode::CleanShutdown,
            Ok(Ok(Outcome::Declined)) => NetveilExitCode::ConfigError,
            Ok(Err(e)) => {
                error!("Fatal error: {:#}", e);
                eprintln!("\n{} Fatal error: {:#}", style("✗").red(), e);
                NetveilExitCode::RuntimeError
            }
            Err(e) => {
                error!("Session task failed: {}", e);
                eprintln!("\n{} Fatal error: {}", style("✗").red(), e);
                NetveilExitCode::RuntimeError
            }
        }
    });

    // Blocking stdin reads cannot be cancelled; do not wait for them
    rt.shutdown_background();

    code.into()
}
