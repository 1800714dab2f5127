//! Connection configuration shared by every connector.

use std::path::PathBuf;
use std::time::Duration;

use secrecy::SecretString;

use crate::error::{ProbeError, Result};
use crate::probe;

/// Host key verification mode, analogous to OpenSSH's `StrictHostKeyChecking`.
#[derive(Debug, Clone, Default)]
pub enum HostKeyVerification {
    /// Reject unknown and changed keys. Connection fails if the host
    /// is not already in known_hosts.
    Strict,

    /// Accept and auto-learn unknown keys, but reject changed keys.
    #[default]
    AcceptNew,

    /// Accept all keys without checking. Used by the classifier, which
    /// talks to freshly provisioned devices.
    Disabled,
}

/// Parameters accepted by every connector variant.
///
/// The password is write-only: it can be set through the constructor but is
/// never handed back out through a public accessor.
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    /// Target hostname or IP address.
    pub hostname: String,

    /// Explicit port. When `None` the port is derived from `proto`.
    pub port: Option<u16>,

    /// Protocol name (`ssh`, `http`, `https`). When `None` the connector's
    /// default protocol is used.
    pub proto: Option<String>,

    /// Login user name.
    pub user: String,

    passwd: SecretString,

    /// Per-operation timeout. When `None` the connector default applies.
    pub timeout: Option<Duration>,

    /// Host key policy for SSH based connectors.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl ConnectorConfig {
    /// Create a configuration for `hostname` using password authentication.
    pub fn new(
        hostname: impl Into<String>,
        user: impl Into<String>,
        passwd: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            port: None,
            proto: None,
            user: user.into(),
            passwd: SecretString::from(passwd.into()),
            timeout: None,
            host_key_verification: HostKeyVerification::default(),
            known_hosts_path: None,
        }
    }

    /// Set an explicit port.
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    /// Set the protocol.
    pub fn with_proto(mut self, proto: impl Into<String>) -> Self {
        self.proto = Some(proto.into());
        self
    }

    /// Set the operation timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Set the host key policy.
    pub fn with_host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.host_key_verification = mode;
        self
    }

    /// Replace the password.
    pub fn set_passwd(&mut self, passwd: impl Into<String>) {
        self.passwd = SecretString::from(passwd.into());
    }

    pub(crate) fn passwd(&self) -> &SecretString {
        &self.passwd
    }

    /// Resolve `(protocol, port)`, falling back to `default_proto` and to the
    /// protocol's well-known port.
    pub fn endpoint(&self, default_proto: &str) -> Result<(String, u16)> {
        let proto = self.proto.as_deref().unwrap_or(default_proto).to_string();
        let port = match self.port {
            Some(port) => port,
            None => probe::service_port(&proto).ok_or_else(|| ProbeError::UnknownService {
                protocol: proto.clone(),
            })?,
        };
        Ok((proto, port))
    }

    /// Build the SSH settings for this target.
    pub fn ssh_config(&self, port: u16, default_timeout: Duration) -> SshConfig {
        SshConfig {
            host: self.hostname.clone(),
            port,
            username: self.user.clone(),
            password: self.passwd.clone(),
            timeout: self.timeout.unwrap_or(default_timeout),
            terminal_width: 511,
            terminal_height: 24,
            host_key_verification: self.host_key_verification.clone(),
            known_hosts_path: self.known_hosts_path.clone(),
        }
    }
}

/// SSH connection configuration.
#[derive(Debug, Clone)]
pub struct SshConfig {
    /// Target host (hostname or IP address).
    pub host: String,

    /// SSH port (default: 22).
    pub port: u16,

    /// Username for authentication.
    pub username: String,

    /// Login password.
    pub password: SecretString,

    /// Connection and per-command timeout.
    pub timeout: Duration,

    /// Terminal width for PTY.
    pub terminal_width: u32,

    /// Terminal height for PTY.
    pub terminal_height: u32,

    /// Host key verification mode.
    pub host_key_verification: HostKeyVerification,

    /// Path to known_hosts file.
    pub known_hosts_path: Option<PathBuf>,
}

impl SshConfig {
    /// Get the socket address for connection.
    pub fn socket_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use secrecy::ExposeSecret;

    #[test]
    fn test_endpoint_from_protocol() {
        let config = ConnectorConfig::new("sw1", "admin", "admin");
        assert_eq!(config.endpoint("ssh").unwrap(), ("ssh".to_string(), 22));

        let config = config.with_proto("https");
        assert_eq!(config.endpoint("http").unwrap(), ("https".to_string(), 443));
    }

    #[test]
    fn test_endpoint_explicit_port_wins() {
        let config = ConnectorConfig::new("sw1", "admin", "admin")
            .with_proto("http")
            .with_port(8080);
        assert_eq!(config.endpoint("ssh").unwrap(), ("http".to_string(), 8080));
    }

    #[test]
    fn test_endpoint_unknown_protocol_is_fatal() {
        let config = ConnectorConfig::new("sw1", "admin", "admin").with_proto("gopher-ng");
        let err = config.endpoint("ssh").unwrap_err();
        assert!(matches!(
            err,
            Error::Probe(ProbeError::UnknownService { ref protocol }) if protocol == "gopher-ng"
        ));
    }

    #[test]
    fn test_password_not_in_debug_output() {
        let config = ConnectorConfig::new("sw1", "admin", "hunter2");
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[test]
    fn test_ssh_config_defaults() {
        let config = ConnectorConfig::new("sw1", "admin", "admin");
        let ssh = config.ssh_config(22, Duration::from_secs(30));
        assert_eq!(ssh.socket_addr(), "sw1:22");
        assert_eq!(ssh.timeout, Duration::from_secs(30));
        assert_eq!(ssh.password.expose_secret(), "admin");
    }
}
