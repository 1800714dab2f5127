//! Device facades.
//!
//! A device owns one connector and the facts gathered through it. There is
//! one concrete type per [`Family`], each generic over its connector so the
//! fact extraction can be exercised against scripted replies.

pub mod extract;
mod factory;
mod registry;
pub mod vendors;

use std::time::Duration;

use async_trait::async_trait;
use log::{debug, warn};

pub use factory::{get_device, DeviceBuilder, Discovery};
pub use registry::{Constructor, DeviceRegistry};
pub use vendors::{CentosDevice, CumulusDevice, EosDevice, NxosDevice, OpxDevice, UbuntuDevice};

use crate::connector::{Connector, ExecResult, SessionState, ShellOutput};
use crate::error::{CommandError, ProbeError, Result};
use crate::facts::Facts;
use crate::family::Family;
use crate::probe::{self, ProbeOutcome};

/// A device of any family.
pub type DeviceHandle = Box<dyn Device>;

/// Uniform contract of the per-family facades.
#[async_trait]
pub trait Device: Send {
    fn family(&self) -> Family;

    /// Hostname or address the device was built for.
    fn target(&self) -> &str;

    /// Facts from the last successful gather.
    fn facts(&self) -> Option<&Facts>;

    /// Wait for the management port to accept connections.
    ///
    /// Fails with [`ProbeError::Unreachable`] when it does not within the
    /// probe timeout.
    async fn probe(&mut self) -> Result<ProbeOutcome>;

    /// Query the device and replace the stored facts.
    ///
    /// Opens the connector first if needed. On failure the stored facts are
    /// left as they were.
    async fn gather_facts(&mut self) -> Result<&Facts>;

    /// Close the connector.
    async fn close(&mut self) -> Result<()>;

    /// `"<vendor> <os> at <target>"`.
    fn describe(&self) -> String {
        let facts = self.facts();
        let field = |value: Option<&Option<String>>| {
            value
                .and_then(|v| v.as_deref())
                .unwrap_or("unknown")
                .to_string()
        };
        format!(
            "{} {} at {}",
            field(facts.map(|f| &f.vendor)),
            field(facts.map(|f| &f.os_name)),
            self.target()
        )
    }
}

/// Construction options shared by every family.
#[derive(Debug, Clone)]
pub struct DeviceOptions {
    /// Skip the reachability probe.
    pub no_probe: bool,

    /// Skip the initial fact gather.
    pub no_gather_facts: bool,

    /// Probe deadline. `None` uses the family default.
    pub probe_timeout: Option<Duration>,

    /// Pause between probe attempts.
    pub probe_interval: Duration,
}

impl Default for DeviceOptions {
    fn default() -> Self {
        Self {
            no_probe: false,
            no_gather_facts: false,
            probe_timeout: None,
            probe_interval: probe::DEFAULT_INTERVAL,
        }
    }
}

/// State shared by every facade: the connector, the probe settings and the
/// gathered facts.
pub struct DeviceCore<C> {
    family: Family,
    connector: C,
    probe_timeout: Duration,
    probe_interval: Duration,
    facts: Option<Facts>,
}

impl<C: Connector> DeviceCore<C> {
    pub fn new(family: Family, connector: C, options: &DeviceOptions) -> Self {
        Self {
            family,
            probe_timeout: options
                .probe_timeout
                .unwrap_or_else(|| family.default_probe_timeout()),
            probe_interval: options.probe_interval,
            connector,
            facts: None,
        }
    }

    pub fn family(&self) -> Family {
        self.family
    }

    pub fn target(&self) -> &str {
        self.connector.hostname()
    }

    pub fn facts(&self) -> Option<&Facts> {
        self.facts.as_ref()
    }

    pub fn connector(&self) -> &C {
        &self.connector
    }

    pub fn connector_mut(&mut self) -> &mut C {
        &mut self.connector
    }

    /// Probe the connector's port.
    pub async fn probe(&mut self) -> Result<ProbeOutcome> {
        let target = self.connector.hostname().to_string();
        let outcome = probe::probe(
            &target,
            Some(self.connector.port()),
            None,
            self.probe_timeout,
            self.probe_interval,
        )
        .await?;

        if !outcome.reached {
            return Err(ProbeError::Unreachable {
                target,
                timeout: self.probe_timeout,
            }
            .into());
        }
        Ok(outcome)
    }

    /// Open the connector unless it is already open.
    pub async fn ensure_open(&mut self) -> Result<()> {
        if self.connector.state() == SessionState::Disconnected {
            debug!("opening {} connector to {}", self.family, self.target());
            self.connector.open().await?;
        }
        Ok(())
    }

    /// Store a complete set of facts.
    pub fn commit(&mut self, facts: Facts) -> &Facts {
        debug!("{} facts for {}: {:?}", self.family, self.target(), facts);
        self.facts.insert(facts)
    }

    pub async fn close(&mut self) -> Result<()> {
        self.connector.close().await
    }
}

impl<C: Connector<Output = ShellOutput>> DeviceCore<C> {
    /// Run shell commands that must all succeed.
    pub async fn run_required(&mut self, commands: &[&str]) -> Result<Vec<ExecResult>> {
        let output = self.connector.execute(commands).await?;
        if output.all_ok {
            return Ok(output.results);
        }

        let message = match output.results.last() {
            Some(failed) => format!(
                "'{}' exited with {}: {}",
                failed.cmd,
                failed.exit_code,
                failed.stderr.trim()
            ),
            None => "command failed".to_string(),
        };
        Err(CommandError::new(message, commands.iter().copied()).into())
    }

    /// Run one shell command and report only whether it exited with zero.
    pub async fn succeeds(&mut self, command: &str) -> Result<bool> {
        let output = self.connector.execute(&[command]).await?;
        Ok(output.all_ok)
    }
}

/// Run the construction sequence: probe, then gather, unless suppressed.
///
/// A device whose gather fails is closed before the error is returned.
pub async fn establish<D: Device>(mut device: D, options: &DeviceOptions) -> Result<D> {
    if !options.no_probe {
        device.probe().await?;
    }
    if !options.no_gather_facts {
        let gathered = device.gather_facts().await.map(|_| ());
        if let Err(e) = gathered {
            warn!("gathering facts from {} failed: {}", device.target(), e);
            if let Err(close_err) = device.close().await {
                debug!("closing {} after failed gather: {}", device.target(), close_err);
            }
            return Err(e);
        }
    }
    Ok(device)
}

/// [`establish`] a freshly built device and box it.
pub(crate) async fn into_handle<D: Device + 'static>(
    device: Result<D>,
    options: DeviceOptions,
) -> Result<DeviceHandle> {
    let device = establish(device?, &options).await?;
    Ok(Box::new(device))
}
