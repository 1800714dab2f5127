//! Error types for venos.
//!
//! The top-level [`Error`] keeps every failure class callers need to tell
//! apart (classification, probe, authorization, timeout, command, config)
//! as its own variant, with the lower transport layers nested beneath.

use std::io;
use std::time::Duration;

use thiserror::Error;

/// Boxed error used to carry an underlying failure inside a richer error.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for venos operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Device family could not be determined (unreachable, bad credentials,
    /// session failure or no classifier stage matched).
    #[error("Target error: {0}")]
    Target(#[from] TargetError),

    /// Liveness probe failed or was misconfigured.
    #[error("Probe error: {0}")]
    Probe(#[from] ProbeError),

    /// Credentials rejected by an HTTP management API.
    #[error("Not authorized: {url}")]
    Unauthorized { url: String },

    /// A single RPC exceeded its deadline.
    #[error("Request timed out after {timeout:?}")]
    Timeout { timeout: Duration },

    /// A remote command failed or returned a non-success status.
    #[error("Command error: {0}")]
    Command(#[from] CommandError),

    /// A configuration push failed.
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    /// SSH/HTTP transport-level errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Interactive channel errors
    #[error("Channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Connector state and capability errors
    #[error("Connector error: {0}")]
    Connector(#[from] ConnectorError),

    /// Device registry errors
    #[error("Registry error: {0}")]
    Registry(#[from] RegistryError),
}

/// Classification failures. Any of these aborts device construction.
#[derive(Error, Debug)]
pub enum TargetError {
    /// The target did not accept a connection.
    #[error("Unable to reach {target}: {source}")]
    Unreachable {
        target: String,
        #[source]
        source: Box<Error>,
    },

    /// The target rejected the supplied credentials.
    #[error("Authentication rejected by {target} for user '{user}'")]
    AuthenticationFailed { target: String, user: String },

    /// Any other failure while establishing or driving the session.
    #[error("Error logging in to {target}: {source}")]
    Session {
        target: String,
        #[source]
        source: Box<Error>,
    },

    /// Every classifier stage fell through.
    #[error("Unable to determine device type for {target}")]
    Unclassified { target: String },
}

impl TargetError {
    /// The target this error refers to.
    pub fn target(&self) -> &str {
        match self {
            Self::Unreachable { target, .. }
            | Self::AuthenticationFailed { target, .. }
            | Self::Session { target, .. }
            | Self::Unclassified { target } => target,
        }
    }
}

/// Probe errors.
#[derive(Error, Debug)]
pub enum ProbeError {
    /// No listener accepted within the allotted time.
    #[error("Unable to reach {target} within {timeout:?}")]
    Unreachable { target: String, timeout: Duration },

    /// The protocol has no well-known port.
    #[error("Unknown service protocol '{protocol}'")]
    UnknownService { protocol: String },

    /// Neither a port nor a protocol was given.
    #[error("No port or protocol given")]
    MissingPort,

    /// The target name does not resolve.
    #[error("Unable to resolve {target}: {source}")]
    Resolve {
        target: String,
        #[source]
        source: io::Error,
    },

    /// A non-retryable socket error.
    #[error("Socket error probing {target}: {source}")]
    Io {
        target: String,
        #[source]
        source: io::Error,
    },
}

/// A failed remote command.
#[derive(Error, Debug)]
#[error("{message}")]
pub struct CommandError {
    /// Human readable description.
    pub message: String,

    /// The commands that were issued.
    pub commands: Vec<String>,

    /// HTTP status, for HTTP based connectors.
    pub status: Option<u16>,

    /// The underlying failure, if any.
    #[source]
    pub source: Option<BoxError>,
}

impl CommandError {
    /// Create a command error without an underlying cause.
    pub fn new<S: Into<String>>(message: impl Into<String>, commands: impl IntoIterator<Item = S>) -> Self {
        Self {
            message: message.into(),
            commands: commands.into_iter().map(Into::into).collect(),
            status: None,
            source: None,
        }
    }

    /// Wrap an underlying failure.
    pub fn wrap<S: Into<String>>(
        commands: impl IntoIterator<Item = S>,
        source: impl Into<BoxError>,
    ) -> Self {
        let source = source.into();
        Self {
            message: format!("command failed: {source}"),
            commands: commands.into_iter().map(Into::into).collect(),
            status: None,
            source: Some(source),
        }
    }

    /// Attach an HTTP status code.
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }
}

/// A failed configuration push.
#[derive(Error, Debug)]
#[error("configuration failed: {source}")]
pub struct ConfigError {
    /// The content that was pushed.
    pub contents: Vec<String>,

    #[source]
    pub source: BoxError,
}

impl ConfigError {
    pub fn new(contents: Vec<String>, source: impl Into<BoxError>) -> Self {
        Self {
            contents,
            source: source.into(),
        }
    }
}

/// Transport layer errors (SSH connection, authentication, HTTP).
#[derive(Error, Debug)]
pub enum TransportError {
    /// Failed to connect to host
    #[error("Connection failed to {host}:{port}: {source}")]
    ConnectionFailed {
        host: String,
        port: u16,
        #[source]
        source: io::Error,
    },

    /// SSH handshake or protocol error
    #[error("SSH error: {0}")]
    Ssh(#[from] russh::Error),

    /// Authentication failed
    #[error("Authentication failed for user '{user}'")]
    AuthenticationFailed { user: String },

    /// Host key is not in known_hosts and verification is strict
    #[error("Unknown host key for {host}:{port}")]
    HostKeyUnknown { host: String, port: u16 },

    /// Host key differs from the known_hosts entry
    #[error("Host key for {host}:{port} changed (known_hosts line {line})")]
    HostKeyChanged { host: String, port: u16, line: usize },

    /// known_hosts could not be read or written
    #[error("known_hosts error: {0}")]
    KnownHosts(String),

    /// HTTP client setup or request failure
    #[error("HTTP error: {0}")]
    Http(#[source] BoxError),

    /// Operation timed out
    #[error("Operation timed out after {0:?}")]
    Timeout(Duration),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Interactive channel errors.
#[derive(Error, Debug)]
pub enum ChannelError {
    /// Channel closed unexpectedly
    #[error("Channel closed")]
    Closed,

    /// SSH protocol error on the channel
    #[error("Channel SSH error: {0}")]
    Ssh(russh::Error),

    /// Invalid regex pattern
    #[error("Invalid regex pattern: {0}")]
    InvalidPattern(#[from] regex::Error),
}

/// Connector state and capability errors.
#[derive(Error, Debug)]
pub enum ConnectorError {
    /// Connector not connected
    #[error("Connector not connected - call open() first")]
    NotConnected,

    /// Connector already connected
    #[error("Connector already connected")]
    AlreadyConnected,

    /// Connector was closed and cannot be reused
    #[error("Connector closed")]
    Closed,

    /// Operation not offered by this connector
    #[error("{connector} does not support {operation}")]
    Unsupported {
        connector: &'static str,
        operation: &'static str,
    },

    /// The device replied with something we cannot interpret
    #[error("Unexpected reply: {message}")]
    Protocol { message: String },
}

/// Device registry errors.
#[derive(Error, Debug)]
pub enum RegistryError {
    /// No constructor registered under this name
    #[error("Unknown device family '{name}'")]
    UnknownFamily { name: String },

    /// A constructor is already registered under this name
    #[error("Device family '{name}' is already registered")]
    AlreadyRegistered { name: String },
}

/// Result type alias using venos's Error.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_error_wrap_keeps_commands_and_source() {
        let io = io::Error::other("connection reset");
        let err = CommandError::wrap(["enable", "show version"], io);

        assert_eq!(err.commands, vec!["enable", "show version"]);
        assert!(err.source.is_some());
        assert!(err.to_string().contains("connection reset"));
    }

    #[test]
    fn test_target_error_names_target() {
        let err: Error = TargetError::Unclassified {
            target: "10.0.0.1".into(),
        }
        .into();

        assert_eq!(
            err.to_string(),
            "Target error: Unable to determine device type for 10.0.0.1"
        );
        match err {
            Error::Target(t) => assert_eq!(t.target(), "10.0.0.1"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_config_error_carries_contents() {
        let err = ConfigError::new(
            vec!["enable".into(), "configure".into(), "hostname x".into()],
            io::Error::other("rejected"),
        );
        assert_eq!(err.contents.len(), 3);
        assert_eq!(err.to_string(), "configuration failed: rejected");
    }
}
