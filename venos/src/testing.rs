//! Scripted stand-ins for devices, used by the unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use regex::bytes::Regex;

use crate::channel::{first_match, Expect, InteractiveSession};
use crate::connector::{run_commands, CommandRunner, Connector, ExecResult, SessionState, ShellOutput};
use crate::error::{ChannelError, Result};
use crate::transport::{HttpError, HttpReply, HttpRequest, HttpTransport};

/// What a scripted session does after a command is sent.
#[derive(Debug, Clone)]
enum Reply {
    Output(String),
    Silence,
    Drop,
}

/// [`InteractiveSession`] that answers commands from a script.
///
/// Unknown commands produce no output, so `expect` times out.
#[derive(Debug, Default)]
pub(crate) struct ScriptedSession {
    script: Vec<(String, Reply)>,
    pending: Option<Reply>,
    sent: Vec<String>,
    closed: bool,
}

impl ScriptedSession {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(mut self, command: &str, output: &str) -> Self {
        self.script.push((command.to_string(), Reply::Output(output.to_string())));
        self
    }

    /// The session drops while waiting for this command's output.
    pub(crate) fn drop_on(mut self, command: &str) -> Self {
        self.script.push((command.to_string(), Reply::Drop));
        self
    }

    pub(crate) fn sent(&self) -> &[String] {
        &self.sent
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.closed
    }
}

impl InteractiveSession for ScriptedSession {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        self.sent.push(line.to_string());
        self.pending = Some(
            self.script
                .iter()
                .find(|(command, _)| command == line)
                .map(|(_, reply)| reply.clone())
                .unwrap_or(Reply::Silence),
        );
        Ok(())
    }

    async fn expect(&mut self, patterns: &[Regex], _timeout: Duration) -> Result<Expect> {
        match self.pending.take() {
            Some(Reply::Output(output)) => match first_match(patterns, output.as_bytes()) {
                Some(found) => Ok(Expect::Matched {
                    index: found.index,
                    before: output[..found.start].to_string(),
                    matched: output[found.start..found.end].to_string(),
                }),
                None => Ok(Expect::Timeout { output }),
            },
            Some(Reply::Drop) => Err(ChannelError::Closed.into()),
            Some(Reply::Silence) | None => Ok(Expect::Timeout {
                output: String::new(),
            }),
        }
    }

    async fn close(&mut self) -> Result<()> {
        self.closed = true;
        Ok(())
    }
}

/// [`CommandRunner`] answering from a table. Unknown commands exit 127.
#[derive(Debug, Default)]
pub(crate) struct ScriptedRunner {
    replies: Vec<(String, i32, String)>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(mut self, command: &str, exit_code: i32, stdout: &str) -> Self {
        self.replies.push((command.to_string(), exit_code, stdout.to_string()));
        self
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().map(|calls| calls.clone()).unwrap_or_default()
    }
}

impl CommandRunner for ScriptedRunner {
    async fn run(&self, command: &str) -> Result<ExecResult> {
        if let Ok(mut calls) = self.calls.lock() {
            calls.push(command.to_string());
        }

        let result = match self.replies.iter().find(|(cmd, _, _)| cmd == command) {
            Some((_, exit_code, stdout)) => ExecResult {
                cmd: command.to_string(),
                exit_code: *exit_code,
                stdout: stdout.clone(),
                stderr: String::new(),
            },
            None => ExecResult {
                cmd: command.to_string(),
                exit_code: 127,
                stdout: String::new(),
                stderr: format!("-bash: {command}: command not found\n"),
            },
        };
        Ok(result)
    }
}

/// Shell [`Connector`] over a [`ScriptedRunner`].
#[derive(Debug)]
pub(crate) struct ScriptedShell {
    runner: ScriptedRunner,
    state: SessionState,
    opened: usize,
}

impl ScriptedShell {
    pub(crate) fn new(runner: ScriptedRunner) -> Self {
        Self {
            runner,
            state: SessionState::Disconnected,
            opened: 0,
        }
    }

    pub(crate) fn calls(&self) -> Vec<String> {
        self.runner.calls()
    }

    pub(crate) fn opened(&self) -> usize {
        self.opened
    }
}

impl Connector for ScriptedShell {
    type Output = ShellOutput;

    fn state(&self) -> SessionState {
        self.state
    }

    fn hostname(&self) -> &str {
        "127.0.0.1"
    }

    fn port(&self) -> u16 {
        22
    }

    async fn open(&mut self) -> Result<()> {
        self.state.ensure_openable()?;
        self.opened += 1;
        self.state = SessionState::Connected;
        Ok(())
    }

    async fn close(&mut self) -> Result<()> {
        self.state = SessionState::Closed;
        Ok(())
    }

    async fn execute(&mut self, commands: &[&str]) -> Result<ShellOutput> {
        self.state.ensure_connected()?;
        run_commands(&self.runner, commands, true).await
    }
}

/// A request as seen by [`ScriptedHttp`].
#[derive(Debug, Clone)]
pub(crate) struct RecordedRequest {
    pub url: String,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
    pub timeout: Duration,
}

/// [`HttpTransport`] replaying queued replies in order.
#[derive(Debug, Default)]
pub(crate) struct ScriptedHttp {
    replies: Mutex<VecDeque<std::result::Result<HttpReply, HttpError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedHttp {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(self, reply: HttpReply) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Ok(reply));
        }
        self
    }

    pub(crate) fn push_error(self, error: HttpError) -> Self {
        if let Ok(mut replies) = self.replies.lock() {
            replies.push_back(Err(error));
        }
        self
    }

    pub(crate) fn requests(&self) -> Vec<RecordedRequest> {
        self.requests
            .lock()
            .map(|requests| requests.clone())
            .unwrap_or_default()
    }
}

impl HttpTransport for ScriptedHttp {
    async fn post(&self, request: HttpRequest<'_>) -> std::result::Result<HttpReply, HttpError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(RecordedRequest {
                url: request.url.to_string(),
                content_type: request.content_type.to_string(),
                headers: request
                    .headers
                    .iter()
                    .map(|(name, value)| (name.to_string(), value.to_string()))
                    .collect(),
                body: request.body,
                timeout: request.timeout,
            });
        }

        self.replies
            .lock()
            .ok()
            .and_then(|mut replies| replies.pop_front())
            .unwrap_or_else(|| Err(HttpError::Request("no scripted reply left".into())))
    }
}
