//! Interactive sessions driven by send/expect.

use std::future::Future;
use std::time::Duration;

use log::{debug, trace};
use regex::bytes::Regex;
use russh::client::Msg;
use russh::{Channel, ChannelMsg};
use tokio::time::Instant;

use super::buffer::PatternBuffer;
use super::patterns::compile_prompt_pattern;
use crate::error::{ChannelError, Result};
use crate::transport::{SshConfig, SshTransport};

/// Prompt that ends a login banner on every supported family.
const LOGIN_PROMPT: &str = r"[#$>]";

/// Outcome of waiting for a set of alternatives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expect {
    /// Alternative `index` matched. `before` holds the output preceding the
    /// match.
    Matched {
        index: usize,
        before: String,
        matched: String,
    },

    /// Nothing matched before the deadline. `output` holds everything
    /// received while waiting.
    Timeout { output: String },
}

/// A line-oriented interactive session.
///
/// The classifier only depends on this trait, so it can be driven by any
/// transport that offers a shell.
pub trait InteractiveSession: Send {
    /// Send `line` followed by a newline.
    ///
    /// Output received before the line is sent is discarded.
    fn send_line(&mut self, line: &str) -> impl Future<Output = Result<()>> + Send;

    /// Wait until one of `patterns` matches the output, or `timeout` passes.
    ///
    /// Patterns are tried in list order; the first one that matches wins.
    /// Matched output is consumed.
    fn expect(
        &mut self,
        patterns: &[Regex],
        timeout: Duration,
    ) -> impl Future<Output = Result<Expect>> + Send;

    /// Close the session.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;
}

/// [`InteractiveSession`] over an SSH PTY shell.
pub struct SshSession {
    transport: Option<SshTransport>,
    channel: Channel<Msg>,
    buffer: PatternBuffer,
    eof: bool,
}

impl SshSession {
    /// Connect, authenticate and open a shell, then wait for the first
    /// prompt.
    ///
    /// A prompt that does not show up within `prompt_timeout` is tolerated;
    /// some devices print nothing recognizable until a command is sent.
    pub async fn login(config: SshConfig, prompt_timeout: Duration) -> Result<Self> {
        let transport = SshTransport::connect(config).await?;
        let channel = transport.open_shell().await?;

        let mut session = Self {
            transport: Some(transport),
            channel,
            buffer: PatternBuffer::default(),
            eof: false,
        };

        let prompt = compile_prompt_pattern(LOGIN_PROMPT).map_err(ChannelError::from)?;
        if session.wait_for_prompt(&prompt, prompt_timeout).await? {
            debug!("shell prompt seen");
        } else {
            debug!("no shell prompt within {:?}, continuing", prompt_timeout);
        }
        session.buffer.clear();

        Ok(session)
    }

    async fn wait_for_prompt(&mut self, prompt: &Regex, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.buffer.search_tail(prompt).is_some() {
                return Ok(true);
            }
            if !self.read_until(deadline).await? {
                return Ok(false);
            }
        }
    }

    /// Read one message into the buffer. Returns `false` once the deadline
    /// has passed.
    async fn read_until(&mut self, deadline: Instant) -> Result<bool> {
        if self.eof {
            return Err(ChannelError::Closed.into());
        }

        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Ok(false);
        }

        match tokio::time::timeout(remaining, self.channel.wait()).await {
            Err(_) => Ok(false),
            Ok(None) => {
                self.eof = true;
                Ok(true)
            }
            Ok(Some(msg)) => {
                match msg {
                    ChannelMsg::Data { ref data } | ChannelMsg::ExtendedData { ref data, .. } => {
                        trace!("received {} bytes", data.len());
                        self.buffer.extend(data);
                    }
                    ChannelMsg::Eof | ChannelMsg::Close => self.eof = true,
                    _ => {}
                }
                Ok(true)
            }
        }
    }
}

impl InteractiveSession for SshSession {
    async fn send_line(&mut self, line: &str) -> Result<()> {
        trace!("sending '{}'", line);
        self.buffer.clear();
        let data = format!("{line}\n");
        self.channel
            .data(data.as_bytes())
            .await
            .map_err(ChannelError::Ssh)?;
        Ok(())
    }

    async fn expect(&mut self, patterns: &[Regex], timeout: Duration) -> Result<Expect> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(found) = self.buffer.find_first(patterns) {
                let consumed = self.buffer.consume(found.end);
                return Ok(Expect::Matched {
                    index: found.index,
                    before: String::from_utf8_lossy(&consumed[..found.start]).into_owned(),
                    matched: String::from_utf8_lossy(&consumed[found.start..]).into_owned(),
                });
            }

            if !self.read_until(deadline).await? {
                let output = String::from_utf8_lossy(&self.buffer.take()).into_owned();
                return Ok(Expect::Timeout { output });
            }
        }
    }

    async fn close(&mut self) -> Result<()> {
        if let Err(e) = self.channel.close().await {
            trace!("channel close failed: {}", e);
        }
        if let Some(transport) = self.transport.take() {
            transport.close().await?;
        }
        Ok(())
    }
}
