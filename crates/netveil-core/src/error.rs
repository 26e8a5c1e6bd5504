//! Error types for netveil
//!
//! Every failure a delegated operation can produce maps onto one of the
//! variants below. The first three form the recoverable taxonomy the
//! rotation controller absorbs; the rest surface configuration and
//! presentation problems.

use thiserror::Error;

/// Result type alias for netveil operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for netveil
#[derive(Error, Debug)]
pub enum Error {
    /// A delegated system command exited non-zero, could not be spawned or timed out
    #[error("Command `{command}` failed: {reason}")]
    ExternalCommandFailed {
        /// The command line that was run
        command: String,
        /// Exit status, stderr excerpt or timeout description
        reason: String,
    },

    /// An address or geolocation lookup could not reach its endpoint
    #[error("Network unreachable: {0}")]
    NetworkUnreachable(String),

    /// The Tor control channel refused the connection or rejected a command
    #[error("Identity channel unavailable: {0}")]
    IdentityChannelUnavailable(String),

    /// A lookup answered with something that is not an IP address
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Rendering errors reported by a presenter
    #[error("Presentation error: {0}")]
    Presentation(String),

    /// Generic error with context
    #[error("{0}")]
    Other(String),
}

impl Error {
    /// Create an external command failure
    pub fn command_failed(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExternalCommandFailed {
            command: command.into(),
            reason: reason.into(),
        }
    }

    /// Create a network unreachable error
    pub fn unreachable(msg: impl Into<String>) -> Self {
        Self::NetworkUnreachable(msg.into())
    }

    /// Create an identity channel error
    pub fn identity_channel(msg: impl Into<String>) -> Self {
        Self::IdentityChannelUnavailable(msg.into())
    }

    /// Create an invalid address error
    pub fn invalid_address(msg: impl Into<String>) -> Self {
        Self::InvalidAddress(msg.into())
    }

    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a presentation error
    pub fn presentation(msg: impl Into<String>) -> Self {
        Self::Presentation(msg.into())
    }

    /// Whether the controller may absorb this error and keep going
    ///
    /// Configuration errors are the only ones that should stop a caller.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::Config(_))
    }
}
