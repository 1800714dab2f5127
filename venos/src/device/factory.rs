//! Classify a target and build the matching device.

use std::fmt;
use std::time::Duration;

use log::{debug, info};

use super::{Device, DeviceHandle, DeviceOptions, DeviceRegistry};
use crate::channel::InteractiveSession;
use crate::classifier::{ClassificationResult, Classifier, LOGIN_TIMEOUT};
use crate::error::Result;
use crate::family::Family;
use crate::transport::{ConnectorConfig, HostKeyVerification};

/// Default login used when none is given.
pub const DEFAULT_USER: &str = "admin";
pub const DEFAULT_PASSWD: &str = "admin";

/// Port the classifier logs in on.
pub const DEFAULT_SSH_PORT: u16 = 22;

/// What [`DeviceBuilder::discover`] produced.
pub enum Discovery {
    /// A constructed device, probed and with facts unless suppressed.
    Device(DeviceHandle),
    /// Only the family, when discovery was asked to stop there.
    Family(Family),
}

impl Discovery {
    pub fn family(&self) -> Family {
        match self {
            Discovery::Device(device) => device.family(),
            Discovery::Family(family) => *family,
        }
    }

    pub fn into_device(self) -> Option<DeviceHandle> {
        match self {
            Discovery::Device(device) => Some(device),
            Discovery::Family(_) => None,
        }
    }
}

impl fmt::Debug for Discovery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Discovery::Device(device) => f.debug_tuple("Device").field(&device.describe()).finish(),
            Discovery::Family(family) => f.debug_tuple("Family").field(family).finish(),
        }
    }
}

/// Builder for discovering and constructing devices.
///
/// # Example
///
/// ```rust,no_run
/// use std::time::Duration;
/// use venos::DeviceBuilder;
///
/// # async fn example() -> Result<(), venos::Error> {
/// let mut device = DeviceBuilder::new("192.168.1.10")
///     .user("admin")
///     .password("secret")
///     .probe_timeout(Duration::from_secs(5))
///     .build()
///     .await?;
///
/// if let Some(facts) = device.facts() {
///     println!("{}", facts.to_json());
/// }
/// device.close().await?;
/// # Ok(())
/// # }
/// ```
pub struct DeviceBuilder {
    config: ConnectorConfig,
    ssh_port: u16,
    options: DeviceOptions,
    family: Option<Family>,
    classifier: Classifier,
    registry: DeviceRegistry,
}

impl DeviceBuilder {
    /// Create a builder for `target` with the default login.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            config: ConnectorConfig::new(target, DEFAULT_USER, DEFAULT_PASSWD),
            ssh_port: DEFAULT_SSH_PORT,
            options: DeviceOptions::default(),
            family: None,
            classifier: Classifier::default(),
            registry: DeviceRegistry::builtin(),
        }
    }

    /// Set the login user (default: admin).
    pub fn user(mut self, user: impl Into<String>) -> Self {
        self.config.user = user.into();
        self
    }

    /// Set the login password (default: admin).
    pub fn password(mut self, passwd: impl Into<String>) -> Self {
        self.config.set_passwd(passwd);
        self
    }

    /// Set the connector port. Defaults to the connector protocol's port.
    pub fn port(mut self, port: u16) -> Self {
        self.config.port = Some(port);
        self
    }

    /// Set the connector protocol, e.g. `https` for the RPC families.
    pub fn proto(mut self, proto: impl Into<String>) -> Self {
        self.config.proto = Some(proto.into());
        self
    }

    /// Set the connector operation timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the host key policy of SSH based connectors.
    pub fn host_key_verification(mut self, mode: HostKeyVerification) -> Self {
        self.config.host_key_verification = mode;
        self
    }

    /// Set the port the classifier logs in on (default: 22).
    pub fn ssh_port(mut self, port: u16) -> Self {
        self.ssh_port = port;
        self
    }

    /// Override the family's probe timeout.
    pub fn probe_timeout(mut self, timeout: Duration) -> Self {
        self.options.probe_timeout = Some(timeout);
        self
    }

    pub fn probe_interval(mut self, interval: Duration) -> Self {
        self.options.probe_interval = interval;
        self
    }

    /// Skip the reachability probe.
    pub fn no_probe(mut self) -> Self {
        self.options.no_probe = true;
        self
    }

    /// Skip the initial fact gather.
    pub fn no_gather_facts(mut self) -> Self {
        self.options.no_gather_facts = true;
        self
    }

    /// Skip classification and build a device of this family.
    pub fn family(mut self, family: Family) -> Self {
        self.family = Some(family);
        self
    }

    /// Use a custom classifier.
    pub fn classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    /// Use a custom registry.
    pub fn registry(mut self, registry: DeviceRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Log in over SSH and fingerprint the target.
    ///
    /// Host keys are not checked here.
    pub async fn classify(&self) -> Result<ClassificationResult> {
        let config = self
            .config
            .clone()
            .with_host_key_verification(HostKeyVerification::Disabled)
            .ssh_config(self.ssh_port, LOGIN_TIMEOUT);

        debug!("classifying {} on port {}", config.host, config.port);
        self.classifier.classify_target(config).await
    }

    /// Classify the target (unless a family was set) and build its device.
    pub async fn build(self) -> Result<DeviceHandle> {
        let family = self.resolve_family().await?;
        self.construct(family).await
    }

    /// Classify the target (unless a family was set). With `nos_only` stop
    /// there, otherwise build the device.
    pub async fn discover(self, nos_only: bool) -> Result<Discovery> {
        let family = self.resolve_family().await?;
        self.finish(family, nos_only).await
    }

    /// [`discover`](Self::discover) over an already established session.
    pub async fn discover_with<S: InteractiveSession>(
        self,
        session: &mut S,
        nos_only: bool,
    ) -> Result<Discovery> {
        let result = self
            .classifier
            .classify(&self.config.hostname, session)
            .await?;
        self.finish(result.family, nos_only).await
    }

    async fn resolve_family(&self) -> Result<Family> {
        match self.family {
            Some(family) => {
                debug!("{}: family set to {}, not classifying", self.config.hostname, family);
                Ok(family)
            }
            None => Ok(self.classify().await?.family),
        }
    }

    async fn finish(self, family: Family, nos_only: bool) -> Result<Discovery> {
        if nos_only {
            return Ok(Discovery::Family(family));
        }
        Ok(Discovery::Device(self.construct(family).await?))
    }

    async fn construct(self, family: Family) -> Result<DeviceHandle> {
        info!("building {} device for {}", family, self.config.hostname);
        self.registry
            .construct(family, self.config, self.options)
            .await
    }
}

/// Discover the family of `target` and, unless `nos_only`, build its device.
///
/// Uses the built-in classifier and registry with default timeouts; use
/// [`DeviceBuilder`] for anything else.
pub async fn get_device(
    target: impl Into<String>,
    user: impl Into<String>,
    passwd: impl Into<String>,
    nos_only: bool,
) -> Result<Discovery> {
    DeviceBuilder::new(target)
        .user(user)
        .password(passwd)
        .discover(nos_only)
        .await
}
