//! External command execution
//!
//! Every system call netveil makes goes through [`CommandRunner::run`], which
//! adds the privilege prefix, enforces the command timeout and turns any
//! failure into [`Error::ExternalCommandFailed`]. The collaborators hold it
//! behind [`Execute`] so their command sequences can be tested without
//! spawning anything.

use async_trait::async_trait;
use netveil_core::config::NetveilConfig;
use netveil_core::{Error, Result};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tracing::debug;

/// Something that runs a program to completion
#[async_trait]
pub trait Execute: Send + Sync {
    /// Run `program` with `args`; `Ok` only on a zero exit status
    async fn run(&self, program: &str, args: &[&str]) -> Result<()>;
}

/// Runs external programs with a timeout
#[derive(Debug, Clone)]
pub struct CommandRunner {
    /// Prefix every command with `sudo -n`
    use_sudo: bool,

    /// Maximum run time of a single command
    timeout: Duration,
}

impl CommandRunner {
    pub fn new(use_sudo: bool, timeout: Duration) -> Self {
        Self { use_sudo, timeout }
    }

    /// Runner for the given configuration
    ///
    /// `sudo` is dropped when the process is already root.
    pub fn from_config(config: &NetveilConfig) -> Self {
        Self::new(
            config.use_sudo && !crate::is_root(),
            config.timeouts.command(),
        )
    }

    /// Full argument vector, including the privilege prefix
    pub fn argv(&self, program: &str, args: &[&str]) -> Vec<String> {
        let mut argv = Vec::with_capacity(args.len() + 3);
        if self.use_sudo {
            argv.push("sudo".to_string());
            argv.push("-n".to_string());
        }
        argv.push(program.to_string());
        argv.extend(args.iter().map(|a| a.to_string()));
        argv
    }

    /// Run `program` to completion
    ///
    /// Succeeds only on a zero exit status. Output is captured and only the
    /// last line of stderr is kept, as the failure reason.
    ///
    /// # Errors
    ///
    /// [`Error::ExternalCommandFailed`] when the program cannot be spawned,
    /// exits non-zero, or runs past the timeout. A timed-out child is killed.
    pub async fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        let argv = self.argv(program, args);
        let line = argv.join(" ");
        debug!("Running `{}`", line);

        let mut command = Command::new(&argv[0]);
        command
            .args(&argv[1..])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match tokio::time::timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => return Err(Error::command_failed(line, e.to_string())),
            Err(_) => {
                return Err(Error::command_failed(
                    line,
                    format!("timed out after {:?}", self.timeout),
                ));
            }
        };

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let reason = match stderr.lines().rev().find(|l| !l.trim().is_empty()) {
            Some(last) => format!("{}: {}", output.status, last.trim()),
            None => output.status.to_string(),
        };

        Err(Error::command_failed(line, reason))
    }
}

#[async_trait]
impl Execute for CommandRunner {
    async fn run(&self, program: &str, args: &[&str]) -> Result<()> {
        CommandRunner::run(self, program, args).await
    }
}
