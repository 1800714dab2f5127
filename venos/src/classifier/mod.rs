//! Device family fingerprinting.
//!
//! The classifier logs in over SSH, sends a short series of commands and
//! matches the output against ordered alternatives until one of them names
//! a [`Family`]. Each [`Stage`] is a command plus its alternatives; a stage
//! that times out, or whose matching alternative is [`Outcome::Next`], falls
//! through to the following stage. Running out of stages is an error.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use venos::classifier::{Classifier, Outcome, Stage};
//! use venos::Family;
//!
//! # fn example() -> Result<(), venos::Error> {
//! let sonic = Stage::new("sonic", "show platform summary", Duration::from_secs(5))
//!     .with_alternative("Cumulus", Outcome::Family(Family::Cumulus))?;
//! let classifier = Classifier::default().with_stage(sonic);
//! # Ok(())
//! # }
//! ```

pub mod stages;

use std::time::Duration;

use log::{debug, info, warn};
use regex::bytes::Regex;

use crate::channel::{Expect, InteractiveSession, SshSession};
use crate::error::{ChannelError, Error, Result, TargetError, TransportError};
use crate::family::Family;
use crate::transport::SshConfig;

/// How long login waits for the first prompt.
pub const LOGIN_TIMEOUT: Duration = Duration::from_secs(10);

/// What a matched alternative means.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The device runs this family.
    Family(Family),
    /// Inconclusive; continue with the next stage.
    Next,
}

/// One pattern of a stage.
#[derive(Debug, Clone)]
pub struct Alternative {
    pattern: Regex,
    outcome: Outcome,
}

impl Alternative {
    pub fn new(pattern: &str, outcome: Outcome) -> Result<Self> {
        Ok(Self {
            pattern: Regex::new(pattern).map_err(ChannelError::from)?,
            outcome,
        })
    }

    pub fn pattern(&self) -> &Regex {
        &self.pattern
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

/// A command and the alternatives its output is matched against.
#[derive(Debug, Clone)]
pub struct Stage {
    name: String,
    command: String,
    alternatives: Vec<Alternative>,
    timeout: Duration,
}

impl Stage {
    pub fn new(name: impl Into<String>, command: impl Into<String>, timeout: Duration) -> Self {
        Self {
            name: name.into(),
            command: command.into(),
            alternatives: Vec::new(),
            timeout,
        }
    }

    /// Append an alternative. Alternatives are tried in the order added.
    pub fn with_alternative(mut self, pattern: &str, outcome: Outcome) -> Result<Self> {
        self.alternatives.push(Alternative::new(pattern, outcome)?);
        Ok(self)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn alternatives(&self) -> &[Alternative] {
        &self.alternatives
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

/// Which stage decided, and on what text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Evidence {
    pub stage: String,
    pub matched: String,
}

/// Result of a successful classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    pub family: Family,
    pub evidence: Evidence,
}

/// Ordered list of fingerprinting stages.
#[derive(Debug, Clone)]
pub struct Classifier {
    stages: Vec<Stage>,
    login_timeout: Duration,
}

impl Default for Classifier {
    fn default() -> Self {
        Self {
            stages: stages::builtin(),
            login_timeout: LOGIN_TIMEOUT,
        }
    }
}

impl Classifier {
    /// A classifier with no stages.
    pub fn empty() -> Self {
        Self {
            stages: Vec::new(),
            login_timeout: LOGIN_TIMEOUT,
        }
    }

    /// Append a stage after the existing ones.
    pub fn with_stage(mut self, stage: Stage) -> Self {
        self.stages.push(stage);
        self
    }

    /// Insert a stage at `index`, shifting later stages back.
    ///
    /// An `index` past the end appends.
    pub fn insert_stage(&mut self, index: usize, stage: Stage) {
        let index = index.min(self.stages.len());
        self.stages.insert(index, stage);
    }

    pub fn with_login_timeout(mut self, timeout: Duration) -> Self {
        self.login_timeout = timeout;
        self
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Run the stages over an established session.
    pub async fn classify<S: InteractiveSession>(
        &self,
        target: &str,
        session: &mut S,
    ) -> Result<ClassificationResult> {
        let session_error = |source: Error| TargetError::Session {
            target: target.to_string(),
            source: Box::new(source),
        };

        for stage in &self.stages {
            debug!("{}: stage {} ('{}')", target, stage.name, stage.command);

            session
                .send_line(&stage.command)
                .await
                .map_err(session_error)?;

            let patterns: Vec<Regex> = stage
                .alternatives
                .iter()
                .map(|alt| alt.pattern.clone())
                .collect();

            let reply = session
                .expect(&patterns, stage.timeout)
                .await
                .map_err(session_error)?;

            match reply {
                Expect::Matched { index, matched, .. } => match stage.alternatives[index].outcome {
                    Outcome::Family(family) => {
                        info!("{} is {} (stage {} matched '{}')", target, family, stage.name, matched);
                        return Ok(ClassificationResult {
                            family,
                            evidence: Evidence {
                                stage: stage.name.clone(),
                                matched,
                            },
                        });
                    }
                    Outcome::Next => {
                        debug!("{}: stage {} inconclusive ('{}')", target, stage.name, matched);
                    }
                },
                Expect::Timeout { .. } => {
                    debug!("{}: stage {} timed out after {:?}", target, stage.name, stage.timeout);
                }
            }
        }

        Err(TargetError::Unclassified {
            target: target.to_string(),
        }
        .into())
    }

    /// Log in to `config.host`, classify it and log out.
    ///
    /// The session is closed whatever the outcome.
    pub async fn classify_target(&self, config: SshConfig) -> Result<ClassificationResult> {
        let target = config.host.clone();
        let user = config.username.clone();

        let mut session = SshSession::login(config, self.login_timeout)
            .await
            .map_err(|e| login_error(&target, &user, e))?;

        let result = self.classify(&target, &mut session).await;

        if let Err(e) = session.close().await {
            warn!("error closing classifier session to {}: {}", target, e);
        }

        result
    }
}

fn login_error(target: &str, user: &str, err: Error) -> Error {
    let target = target.to_string();
    match err {
        Error::Transport(TransportError::ConnectionFailed { .. })
        | Error::Transport(TransportError::Timeout(_)) => TargetError::Unreachable {
            target,
            source: Box::new(err),
        },
        Error::Transport(TransportError::AuthenticationFailed { .. }) => {
            TargetError::AuthenticationFailed {
                target,
                user: user.to_string(),
            }
        }
        other => TargetError::Session {
            target,
            source: Box::new(other),
        },
    }
    .into()
}
