//! Arista eAPI connector: JSON-RPC `runCmds` over HTTP(S).

use std::time::Duration;

use log::debug;
use serde_json::{json, Value};

use super::{Connector, SessionState};
use crate::error::{CommandError, ConfigError, ConnectorError, Error, Result};
use crate::transport::{ConnectorConfig, HttpRequest, HttpTransport, ReqwestTransport};

/// Request timeout when the config sets none.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Reply shape of [`EapiConnector::execute`].
#[derive(Debug, Clone, PartialEq)]
pub enum BatchReply {
    /// Exactly one user command was given.
    Single(Value),
    /// One entry per user command, in order.
    Many(Vec<Value>),
}

impl BatchReply {
    /// The reply to the `index`-th user command.
    pub fn get(&self, index: usize) -> Option<&Value> {
        match self {
            BatchReply::Single(value) if index == 0 => Some(value),
            BatchReply::Single(_) => None,
            BatchReply::Many(values) => values.get(index),
        }
    }
}

/// [`Connector`] for the eAPI `/command-api` endpoint.
///
/// Every request is a single batch that starts with `enable`; the reply to
/// `enable` is dropped before results are returned.
pub struct EapiConnector<T = ReqwestTransport> {
    config: ConnectorConfig,
    url: String,
    port: u16,
    timeout: Duration,
    state: SessionState,
    http: T,
}

impl EapiConnector {
    /// Create a connector using reqwest. Defaults to plain `http`.
    pub fn new(config: ConnectorConfig) -> Result<Self> {
        Self::with_transport(config, ReqwestTransport::new()?)
    }
}

impl<T: HttpTransport> EapiConnector<T> {
    /// Create a connector over an explicit HTTP transport.
    pub fn with_transport(config: ConnectorConfig, http: T) -> Result<Self> {
        let (proto, port) = config.endpoint("http")?;
        let url = format!("{}://{}:{}/command-api", proto, config.hostname, port);
        let timeout = config.timeout.unwrap_or(DEFAULT_TIMEOUT);

        Ok(Self {
            config,
            url,
            port,
            timeout,
            state: SessionState::Disconnected,
            http,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn http(&self) -> &T {
        &self.http
    }

    /// Send one `runCmds` batch and return the `result` array.
    async fn run_cmds(&self, cmds: &[String]) -> Result<Vec<Value>> {
        let body = json!({
            "jsonrpc": "2.0",
            "method": "runCmds",
            "params": {
                "version": 1,
                "cmds": cmds,
                "format": "json",
            },
            "id": "venos",
        });

        debug!("eapi runCmds {:?}", cmds);

        let reply = self
            .http
            .post(HttpRequest {
                url: &self.url,
                content_type: "application/json",
                headers: &[],
                body: body.to_string(),
                timeout: self.timeout,
                user: &self.config.user,
                passwd: self.config.passwd(),
            })
            .await
            .map_err(|e| CommandError::wrap(cmds.iter().cloned(), e))?;

        if reply.status != 200 {
            return Err(CommandError::new(
                format!("eAPI request failed: HTTP {} {}", reply.status, reply.reason),
                cmds.iter().cloned(),
            )
            .with_status(reply.status)
            .into());
        }

        let value: Value = serde_json::from_str(&reply.body).map_err(|e| {
            CommandError::wrap(cmds.iter().cloned(), e).with_status(reply.status)
        })?;

        if let Some(error) = value.get("error") {
            let message = error
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("unknown eAPI error");
            let code = error.get("code").and_then(Value::as_i64).unwrap_or_default();
            return Err(CommandError::new(
                format!("CLI command failed (code {code}): {message}"),
                cmds.iter().cloned(),
            )
            .with_status(reply.status)
            .into());
        }

        match value.get("result") {
            Some(Value::Array(results)) => Ok(results.clone()),
            _ => Err(ConnectorError::Protocol {
                message: format!("eAPI reply without result array (HTTP {})", reply.status),
            }
            .into()),
        }
    }
}

/// `enable` followed by `commands`, unless `enable` already leads.
fn with_enable(commands: &[&str]) -> Vec<String> {
    let mut cmds: Vec<String> = Vec::with_capacity(commands.len() + 1);
    if commands.first().map(|c| c.trim()) != Some("enable") {
        cmds.push("enable".to_string());
    }
    cmds.extend(commands.iter().map(|c| c.to_string()));
    cmds
}

impl<T: HttpTransport> Connector for EapiConnector<T> {
    type Output = BatchReply;

    fn state(&self) -> SessionState {
        self.state
    }

    fn hostname(&self) -> &str {
        &self.config.hostname
    }

    fn port(&self) -> u16 {
        self.port
    }

    /// HTTP is connectionless; opening only enables the connector.
    async fn open(&mut self) -> Result<()> {
        self.state.ensure_openable()?;
        self.state = SessionState::Connected;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        Ok(())
    }

    async fn execute(&mut self, commands: &[&str]) -> Result<BatchReply> {
        self.state.ensure_connected()?;

        let cmds = with_enable(commands);
        let user_commands = cmds.len() - 1;

        let mut results = self.run_cmds(&cmds).await.map_err(|e| match e {
            Error::Command(_) => e,
            other => CommandError::wrap(cmds.iter().cloned(), other).into(),
        })?;

        if results.len() != cmds.len() {
            return Err(CommandError::new(
                format!(
                    "expected {} results, device returned {}",
                    cmds.len(),
                    results.len()
                ),
                cmds,
            )
            .into());
        }

        results.remove(0);
        if user_commands == 1 {
            Ok(BatchReply::Single(results.remove(0)))
        } else {
            Ok(BatchReply::Many(results))
        }
    }

    async fn configure(&mut self, lines: &[&str]) -> Result<()> {
        let mut contents = vec!["enable", "configure"];
        contents.extend(lines.iter().copied().filter(|line| !line.trim().is_empty()));

        let result = match self.state.ensure_connected() {
            Ok(()) => self
                .run_cmds(&contents.iter().map(|c| c.to_string()).collect::<Vec<_>>())
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };

        result.map_err(|e| {
            ConfigError::new(contents.iter().map(|c| c.to_string()).collect(), e).into()
        })
    }
}
