//! Ubuntu servers over SSH.

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

pub const VENDOR: &str = "Canonical";
pub const OS_NAME: &str = "ubuntu";
pub const HW_MODEL: &str = "Server";

const HOSTNAME: &str = "hostname";
const RELEASE: &str = "cat /etc/lsb-release | grep RELEASE | cut -d= -f2";
const LINK_SHOW: &str = "ip link show dev eth0";

const COMMANDS: [&str; 3] = [HOSTNAME, RELEASE, LINK_SHOW];

/// Build facts from the outputs of `hostname`, the LSB release lookup and
/// `ip link show dev eth0`.
///
/// The eth0 MAC, without colons, doubles as the serial number. Whether the
/// host is virtual is not determined.
pub fn normalize(hostname: &str, release: &str, link_show: &str) -> Result<Facts> {
    let mac = require_mac(link_show, LINK_SHOW)?;
    let hostname = first_line(hostname);

    Ok(Facts {
        vendor: Some(VENDOR.to_string()),
        os_name: Some(OS_NAME.to_string()),
        os_version: first_line(release),
        fqdn: hostname.clone(),
        hostname,
        serial_number: Some(serial_from_mac(&mac)),
        mac_address: Some(mac),
        hw_model: Some(HW_MODEL.to_string()),
        ..Default::default()
    })
}

/// Ubuntu host.
pub struct UbuntuDevice<C = ShellConnector> {
    core: DeviceCore<C>,
}

impl UbuntuDevice {
    pub fn new(config: ConnectorConfig, options: &DeviceOptions) -> Result<Self> {
        Ok(Self::with_connector(ShellConnector::new(config)?, options))
    }
}

impl<C: Connector<Output = ShellOutput>> UbuntuDevice<C> {
    pub fn with_connector(connector: C, options: &DeviceOptions) -> Self {
        Self {
            core: DeviceCore::new(Family::Ubuntu, connector, options),
        }
    }

    pub fn connector(&self) -> &C {
        self.core.connector()
    }
}

#[async_trait]
impl<C: Connector<Output = ShellOutput>> Device for UbuntuDevice<C> {
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
        let facts = normalize(&results[0].stdout, &results[1].stdout, &results[2].stdout)?;
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
    Box::pin(into_handle(UbuntuDevice::new(config, &options), options))
}
