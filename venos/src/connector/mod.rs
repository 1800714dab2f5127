//! Transport connectors.
//!
//! A connector executes remote commands or queries against one device.
//! Three variants share the [`Connector`] contract:
//!
//! - [`ShellConnector`]: sequential commands over one SSH session
//! - [`EapiConnector`]: batched JSON-RPC with an implicit `enable` prefix
//! - [`NxapiConnector`]: XML envelope requests with typed error nodes

mod eapi;
mod nxapi;
mod shell;

use std::future::Future;

pub use eapi::{BatchReply, EapiConnector};
pub use nxapi::{MessageType, NxapiConnector, NxapiReply, NxapiRequest, ResponseFormat};
pub use shell::{run_commands, CommandRunner, ExecResult, ShellConnector, ShellOutput};

use crate::error::{ConnectorError, Result};

/// Lifecycle of a connector.
///
/// `Disconnected -> Connected` on `open`, any state `-> Closed` on `close`.
/// `Closed` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    #[default]
    Disconnected,
    Connected,
    Closed,
}

impl SessionState {
    /// Fail unless commands may be issued.
    pub fn ensure_connected(self) -> Result<()> {
        match self {
            SessionState::Connected => Ok(()),
            SessionState::Disconnected => Err(ConnectorError::NotConnected.into()),
            SessionState::Closed => Err(ConnectorError::Closed.into()),
        }
    }

    /// Fail unless `open` may be called.
    pub fn ensure_openable(self) -> Result<()> {
        match self {
            SessionState::Disconnected => Ok(()),
            SessionState::Connected => Err(ConnectorError::AlreadyConnected.into()),
            SessionState::Closed => Err(ConnectorError::Closed.into()),
        }
    }
}

/// Capability contract shared by every connector variant.
pub trait Connector: Send {
    /// What `execute` produces.
    type Output: Send;

    fn state(&self) -> SessionState;

    fn hostname(&self) -> &str;

    fn port(&self) -> u16;

    /// Establish the session.
    fn open(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Tear down the session. The connector cannot be reopened.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Run `commands` and collect their output.
    fn execute(&mut self, commands: &[&str]) -> impl Future<Output = Result<Self::Output>> + Send;

    /// Push configuration lines.
    fn configure(&mut self, lines: &[&str]) -> impl Future<Output = Result<()>> + Send {
        let _ = lines;
        std::future::ready(Err(ConnectorError::Unsupported {
            connector: std::any::type_name::<Self>(),
            operation: "configure",
        }
        .into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_state_guards() {
        assert!(SessionState::Connected.ensure_connected().is_ok());
        assert!(matches!(
            SessionState::Disconnected.ensure_connected(),
            Err(Error::Connector(ConnectorError::NotConnected))
        ));
        assert!(matches!(
            SessionState::Closed.ensure_connected(),
            Err(Error::Connector(ConnectorError::Closed))
        ));

        assert!(SessionState::Disconnected.ensure_openable().is_ok());
        assert!(matches!(
            SessionState::Connected.ensure_openable(),
            Err(Error::Connector(ConnectorError::AlreadyConnected))
        ));
        assert!(matches!(
            SessionState::Closed.ensure_openable(),
            Err(Error::Connector(ConnectorError::Closed))
        ));
    }
}
