//! Shell connector: sequential remote commands over one SSH session.

use std::future::Future;
use std::time::Duration;

use log::{debug, warn};
use serde::Serialize;

use super::{Connector, SessionState};
use crate::error::{ConnectorError, Result};
use crate::transport::{ConnectorConfig, SshTransport};

/// Per-command timeout when the config sets none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Output of one remote command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExecResult {
    pub cmd: String,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
}

impl ExecResult {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Aggregate output of a command list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ShellOutput {
    /// `true` when every command that ran exited with status zero.
    pub all_ok: bool,
    pub results: Vec<ExecResult>,
}

/// Something that runs one shell command at a time.
pub trait CommandRunner: Send + Sync {
    fn run(&self, command: &str) -> impl Future<Output = Result<ExecResult>> + Send;
}

impl CommandRunner for SshTransport {
    async fn run(&self, command: &str) -> Result<ExecResult> {
        self.exec(command).await
    }
}

/// Run `commands` in order.
///
/// The aggregate flag is the OR of all exit codes compared against zero.
/// With `stop_on_error` the list ends at the first failing command, which
/// is included.
pub async fn run_commands<R: CommandRunner>(
    runner: &R,
    commands: &[&str],
    stop_on_error: bool,
) -> Result<ShellOutput> {
    let mut results = Vec::with_capacity(commands.len());
    let mut status = 0;

    for command in commands {
        let result = runner.run(command).await?;
        status |= result.exit_code;

        let failed = !result.success();
        results.push(result);
        if failed && stop_on_error {
            debug!("'{}' failed, skipping remaining commands", command);
            break;
        }
    }

    Ok(ShellOutput {
        all_ok: status == 0,
        results,
    })
}

/// [`Connector`] that runs commands over SSH, one exec channel per command.
pub struct ShellConnector {
    config: ConnectorConfig,
    port: u16,
    state: SessionState,
    transport: Option<SshTransport>,
}

impl ShellConnector {
    /// Create a connector. The port defaults to the `ssh` service port.
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        let (_, port) = config.endpoint("ssh")?;
        Ok(Self {
            config,
            port,
            state: SessionState::Disconnected,
            transport: None,
        })
    }

    /// Run `commands`, optionally continuing past failures.
    pub async fn execute_with(&mut self, commands: &[&str], stop_on_error: bool) -> Result<ShellOutput> {
        self.state.ensure_connected()?;
        let transport = self.transport.as_ref().ok_or(ConnectorError::NotConnected)?;
        run_commands(transport, commands, stop_on_error).await
    }
}

impl Connector for ShellConnector {
    type Output = ShellOutput;

    fn state(&self) -> SessionState {
        self.state
    }

    fn hostname(&self) -> &str {
        &self.config.hostname
    }

    fn port(&self) -> u16 {
        self.port
    }

    async fn open(&mut self) -> Result<()> {
        self.state.ensure_openable()?;

        let ssh_config = self.config.ssh_config(self.port, DEFAULT_TIMEOUT);
        let transport = SshTransport::connect(ssh_config).await?;

        debug!("shell session open to {}:{}", self.config.hostname, self.port);
        self.transport = Some(transport);
        self.state = SessionState::Connected;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        if let Some(transport) = self.transport.take() {
            if let Err(e) = transport.close().await {
                warn!("error closing session to {}: {}", self.config.hostname, e);
                return Err(e);
            }
        }
        Ok(())
    }

    async fn execute(&mut self, commands: &[&str]) -> Result<ShellOutput> {
        self.execute_with(commands, true).await
    }
}
