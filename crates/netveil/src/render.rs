//! Terminal rendering

use console::style;
use crossterm::{cursor, execute, terminal};
use indicatif::{ProgressBar, ProgressStyle};
use netveil_core::view::{AddressReport, AddressStatus, DashboardView};
use netveil_core::{Error, Presenter, RotationEvent};
use std::io::{self, Stdout, Write, stdout};
use std::time::Duration;

const WIDTH: usize = 72;

pub const MENU: &[(&str, &str)] = &[
    ("1", "Check current IP"),
    ("2", "Change MAC address"),
    ("3", "Start Tor"),
    ("4", "Configure Tor routing"),
    ("5", "New Tor identity"),
    ("6", "Automatic mode"),
    ("7", "Live dashboard"),
    ("8", "Settings"),
    ("9", "Quit"),
];

fn separator() -> String {
    "─".repeat(WIDTH)
}

/// Clear the screen and print the title banner
pub fn banner() -> io::Result<()> {
    let mut out = stdout();
    execute!(
        out,
        terminal::Clear(terminal::ClearType::All),
        cursor::MoveTo(0, 0)
    )?;

    println!("{}", style(separator()).blue());
    println!("  {}", style("n e t v e i l").cyan().bold());
    println!("  {}", style("Anonymization dashboard").magenta().bold());
    println!("{}", style(separator()).blue());
    println!();
    out.flush()
}

pub fn menu() {
    println!("{}", style("MAIN MENU").cyan().bold());
    for (key, label) in MENU {
        println!("  {}  {}", style(key).bold(), label);
    }
    println!();
}

pub fn heading(text: &str) {
    println!("\n{}", style(text).cyan().bold());
}

pub fn success(text: &str) {
    println!("{} {}", style("✓").green(), text);
}

pub fn failure(text: &str) {
    println!("{} {}", style("✗").red(), text);
}

pub fn notice(text: &str) {
    println!("{} {}", style("!").yellow(), text);
}

/// Spinner shown while a single action runs
pub fn spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// One progress line per rotation event
pub fn event_line(event: &RotationEvent) -> String {
    match event {
        RotationEvent::MacRotated { interface, total } => format!(
            "{} MAC address of {} changed ({} total)",
            style("✓").green(),
            interface,
            total
        ),
        RotationEvent::MacRotationFailed { interface, error } => format!(
            "{} MAC change failed: {}\n  {} {} may have been left down",
            style("✗").red(),
            error,
            style("!").yellow(),
            interface
        ),
        RotationEvent::IdentityChanged { total } => format!(
            "{} New Tor identity ({} total)",
            style("✓").green(),
            total
        ),
        RotationEvent::IdentityChangeFailed { error } => {
            format!("{} New identity failed: {}", style("✗").red(), error)
        }
        RotationEvent::AddressVerified { route, address } => format!(
            "{} {} IP: {}",
            style("✓").green(),
            route_label(*route),
            style(address).yellow()
        ),
        RotationEvent::VerificationFailed { route, error } => format!(
            "{} {} IP lookup failed: {}",
            style("✗").red(),
            route_label(*route),
            error
        ),
        RotationEvent::TorStarted => format!("{} Tor service started", style("✓").green()),
        RotationEvent::TorStartFailed { error } => {
            format!("{} Tor failed to start: {}", style("✗").red(), error)
        }
        RotationEvent::RoutingInstalled => format!(
            "{} All traffic is now routed through Tor",
            style("✓").green()
        ),
        RotationEvent::RoutingFailed { error } => {
            format!("{} Tor routing failed: {}", style("✗").red(), error)
        }
        RotationEvent::CycleStarted { cycle } => {
            format!("{}", style(format!("── cycle {} ──", cycle)).dim())
        }
        RotationEvent::CycleCompleted {
            ip_changes,
            mac_changes,
            address,
            ..
        } => {
            let address = address
                .map(|a| a.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            format!(
                "{} New IP: {}\n  {}",
                style("→").cyan(),
                style(address).green().bold(),
                style(format!("Changes: IP({}) | MAC({})", ip_changes, mac_changes)).cyan()
            )
        }
        RotationEvent::Stopped { .. } => {
            format!("{} Automatic mode stopped", style("■").red())
        }
    }
}

fn route_label(route: netveil_core::LookupRoute) -> &'static str {
    match route {
        netveil_core::LookupRoute::Direct => "Direct",
        netveil_core::LookupRoute::Anonymized => "Tor",
    }
}

/// Result table for the "check current IP" action
pub fn address_report(report: &AddressReport) {
    println!();
    println!(
        "  {:<12} {:<40} {}",
        style("Route").bold(),
        style("IP address").bold(),
        style("Status").bold()
    );
    println!("  {}", "─".repeat(WIDTH - 2));
    println!(
        "  {:<12} {:<40} {}",
        "Without Tor",
        report.direct.display(),
        "direct"
    );

    let status = match report.status() {
        AddressStatus::Anonymous => style("anonymous").green().to_string(),
        AddressStatus::Problem => style("⚠ problem: same address as direct").red().bold().to_string(),
        AddressStatus::Unverified => style("unverified").yellow().to_string(),
    };
    println!(
        "  {:<12} {:<40} {}",
        "With Tor",
        report.anonymized.display(),
        status
    );
}

/// Full dashboard frame as text
pub fn dashboard_text(view: &DashboardView) -> String {
    let mut text = String::new();

    text.push_str(&format!(
        "{:<50} {}\n",
        style("ANONYMIZATION STATUS").cyan().bold(),
        view.time
    ));
    text.push_str(&separator());
    text.push('\n');

    for (label, value) in [
        ("Uptime", view.uptime.clone()),
        ("IP changes", view.ip_changes.to_string()),
        ("MAC changes", view.mac_changes.to_string()),
        ("Interface", view.interface.clone()),
    ] {
        text.push_str(&format!("  {:<16} {}\n", label, style(value).green()));
    }

    text.push('\n');
    text.push_str(&format!("{}\n", style("IP INFORMATION").magenta().bold()));
    text.push_str(&format!(
        "  {:<14} {:<40} {:<16} {:<18} {}\n",
        "Type", "IP address", "Country", "City", "ISP"
    ));
    for row in &view.addresses {
        text.push_str(&format!(
            "  {:<14} {:<40} {:<16} {:<18} {}\n",
            row.label, row.address, row.geo.country, row.geo.city, row.geo.isp
        ));
    }

    text.push_str(&separator());
    text.push_str("\nPress Ctrl+C to exit\n");
    text
}

/// Redraws the dashboard in place
pub struct TerminalPresenter {
    out: Stdout,
    cleared: bool,
}

impl TerminalPresenter {
    pub fn new() -> Self {
        Self {
            out: stdout(),
            cleared: false,
        }
    }

    fn draw(&mut self, view: &DashboardView) -> io::Result<()> {
        if !self.cleared {
            execute!(self.out, terminal::Clear(terminal::ClearType::All))?;
            self.cleared = true;
        }

        execute!(
            self.out,
            cursor::MoveTo(0, 0),
            terminal::Clear(terminal::ClearType::FromCursorDown)
        )?;
        write!(self.out, "{}", dashboard_text(view))?;
        self.out.flush()
    }
}

impl Default for TerminalPresenter {
    fn default() -> Self {
        Self::new()
    }
}

impl Presenter for TerminalPresenter {
    fn render_dashboard(&mut self, view: &DashboardView) -> netveil_core::Result<()> {
        self.draw(view)
            .map_err(|e| Error::presentation(format!("Failed to draw dashboard: {}", e)))
    }
}
