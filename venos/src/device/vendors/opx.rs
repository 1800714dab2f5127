//! OpenSwitch OPX over SSH.

use async_trait::async_trait;
use futures_util::future::BoxFuture;

use crate::connector::{Connector, ShellConnector, ShellOutput};
use crate::device::extract::{first_line, require_mac, serial_from_mac};
use crate::device::{into_handle, Device, DeviceCore, DeviceHandle, DeviceOptions};
use crate::error::Result;
use crate::facts::Facts;
use crate::family::Family;
use crate::probe::ProbeOutcome;
use crate::transport::ConnectorConfig;

pub const VENDOR: &str = "OPX";
pub const OS_NAME: &str = "OPX";

const HOSTNAME: &str = "hostname";
const VERSION: &str = r#"grep -oP '^OS_VERSION="\K.*\d' /etc/OPX-release-version"#;
const PLATFORM: &str = r#"grep -oP '^PLATFORM="\K.*\w' /etc/OPX-release-version"#;
const LINK_SHOW: &str = "ip link show";

const COMMANDS: [&str; 4] = [HOSTNAME, VERSION, PLATFORM, LINK_SHOW];

/// Build facts from `hostname`, the OS version, the platform name and
/// `ip link show`.
///
/// The platform string is the hardware model; VM platforms contain `vm`.
pub fn normalize(hostname: &str, version: &str, platform: &str, link_show: &str) -> Result<Facts> {
    let mac = require_mac(link_show, LINK_SHOW)?;
    let hostname = first_line(hostname);
    let platform = first_line(platform);
    let is_virtual = platform
        .as_deref()
        .is_some_and(|p| p.to_lowercase().contains("vm"));

    Ok(Facts {
        vendor: Some(VENDOR.to_string()),
        os_name: Some(OS_NAME.to_string()),
        os_version: first_line(version),
        fqdn: hostname.clone(),
        hostname,
        serial_number: Some(serial_from_mac(&mac)),
        mac_address: Some(mac),
        hw_model: platform,
        is_virtual: Some(is_virtual),
        ..Default::default()
    })
}

/// OPX switch.
pub struct OpxDevice<C = ShellConnector> {
    core: DeviceCore<C>,
}

impl OpxDevice {
    pub fn new(config: ConnectorConfig, options: &DeviceOptions) -> Result<Self> {
        Ok(Self::with_connector(ShellConnector::new(config)?, options))
    }
}

impl<C: Connector<Output = ShellOutput>> OpxDevice<C> {
    pub fn with_connector(connector: C, options: &DeviceOptions) -> Self {
        Self {
            core: DeviceCore::new(Family::Opx, connector, options),
        }
    }
}

#[async_trait]
impl<C: Connector<Output = ShellOutput>> Device for OpxDevice<C> {
    fn family(&self) -> Family {
        self.core.family()
    }

    fn target(&self) -> &str {
        self.core.target()
    }

    fn facts(&self) -> Option<&Facts> {
        self.core.facts()
    }

    async fn probe(&mut self) -> Result<ProbeOutcome> {
        self.core.probe().await
    }

    async fn gather_facts(&mut self) -> Result<&Facts> {
        self.core.ensure_open().await?;
        let results = self.core.run_required(&COMMANDS).await?;
        let facts = normalize(
            &results[0].stdout,
            &results[1].stdout,
            &results[2].stdout,
            &results[3].stdout,
        )?;
        Ok(self.core.commit(facts))
    }

    async fn close(&mut self) -> Result<()> {
        self.core.close().await
    }
}

pub(crate) fn construct(
    config: ConnectorConfig,
    options: DeviceOptions,
) -> BoxFuture<'static, Result<DeviceHandle>> {
    Box::pin(into_handle(OpxDevice::new(config, &options), options))
}
