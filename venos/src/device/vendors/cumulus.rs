//! Cumulus Linux over SSH.
//!
//! Hardware switches carry an ONIE EEPROM decoded by `decode-syseeprom`.
//! Cumulus VX, the virtual appliance, has no such tool and no EEPROM, so
//! its identity comes from the management interface.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use log::debug;

use crate::connector::{Connector, ShellConnector, ShellOutput};
use crate::device::extract::{first_line, parse_syseeprom, require_mac, serial_from_mac};
use crate::device::{into_handle, Device, DeviceCore, DeviceHandle, DeviceOptions};
use crate::error::Result;
use crate::facts::Facts;
use crate::family::Family;
use crate::probe::ProbeOutcome;
use crate::transport::ConnectorConfig;

pub const OS_NAME: &str = "cumulus";
pub const VX_VENDOR: &str = "CUMULUS-NETWORKS";
pub const VX_MODEL: &str = "CUMULUS-VX";

const HOSTNAME: &str = "hostname";
const RELEASE: &str = "cat /etc/lsb-release | grep RELEASE | cut -d= -f2";
const HAS_SYSEEPROM: &str = "test -e /usr/cumulus/bin/decode-syseeprom";
const DECODE_SYSEEPROM: &str = "/usr/cumulus/bin/decode-syseeprom";
const LINK_SHOW: &str = "ip link show dev eth0";

/// Platform-specific output collected by the gather.
#[derive(Debug, Clone, Copy)]
pub enum Platform<'a> {
    /// `decode-syseeprom` output.
    Hardware { syseeprom: &'a str },
    /// `ip link show dev eth0` output.
    Vx { link_show: &'a str },
}

/// Build facts from `hostname`, the LSB release and the platform output.
///
/// EEPROM tags the switch does not program get `no-...` placeholders.
pub fn normalize(hostname: &str, release: &str, platform: Platform<'_>) -> Result<Facts> {
    let hostname = first_line(hostname);
    let mut facts = Facts {
        os_name: Some(OS_NAME.to_string()),
        os_version: first_line(release),
        fqdn: hostname.clone(),
        hostname,
        ..Default::default()
    };

    match platform {
        Platform::Hardware { syseeprom } => {
            let tags = parse_syseeprom(syseeprom);
            let tag = |name: &str, default: &str| {
                Some(tags.get(name).cloned().unwrap_or_else(|| default.to_string()))
            };

            facts.vendor = tag("Vendor Name", "no-vendor-name");
            facts.hw_model = tag("Product Name", "no-product-name");
            facts.serial_number = tag("Serial Number", "no-serial-number");
            facts.hw_part_number = tag("Part Number", "no-part-number");
            facts.hw_version = tag("Label Revision", "no-label-revision");
            facts.service_tag = tag("Service Tag", "no-service-tag");
            facts.mac_address = tag("Base MAC Address", "no-base-mac-address");
            facts.is_virtual = Some(false);
        }
        Platform::Vx { link_show } => {
            let mac = require_mac(link_show, LINK_SHOW)?;
            facts.vendor = Some(VX_VENDOR.to_string());
            facts.hw_model = Some(VX_MODEL.to_string());
            facts.serial_number = Some(serial_from_mac(&mac));
            facts.mac_address = Some(mac);
            facts.is_virtual = Some(true);
        }
    }

    Ok(facts)
}

/// Cumulus Linux switch or VX appliance.
pub struct CumulusDevice<C = ShellConnector> {
    core: DeviceCore<C>,
}

impl CumulusDevice {
    pub fn new(config: ConnectorConfig, options: &DeviceOptions) -> Result<Self> {
        Ok(Self::with_connector(ShellConnector::new(config)?, options))
    }
}

impl<C: Connector<Output = ShellOutput>> CumulusDevice<C> {
    pub fn with_connector(connector: C, options: &DeviceOptions) -> Self {
        Self {
            core: DeviceCore::new(Family::Cumulus, connector, options),
        }
    }

    pub fn connector_mut(&mut self) -> &mut C {
        self.core.connector_mut()
    }
}

#[async_trait]
impl<C: Connector<Output = ShellOutput>> Device for CumulusDevice<C> {
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

        let base = self.core.run_required(&[HOSTNAME, RELEASE]).await?;
        let hardware = self.core.succeeds(HAS_SYSEEPROM).await?;
        debug!("{}: syseeprom tool present: {}", self.core.target(), hardware);

        let command = if hardware { DECODE_SYSEEPROM } else { LINK_SHOW };
        let platform_output = self.core.run_required(&[command]).await?;
        let text = &platform_output[0].stdout;

        let platform = if hardware {
            Platform::Hardware { syseeprom: text }
        } else {
            Platform::Vx { link_show: text }
        };

        let facts = normalize(&base[0].stdout, &base[1].stdout, platform)?;
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
    Box::pin(into_handle(CumulusDevice::new(config, &options), options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{ScriptedRunner, ScriptedShell};

    const SYSEEPROM: &str = "TlvInfo Header:
   Id String:    TlvInfo
   Version:      1
   Total Length: 96
TLV Name             Code Len Value
-------------------- ---- --- -----
Product Name         0x21  12 S4048-ON
Part Number          0x22   6 0J6J6D
Serial Number        0x23  20 CN0J6J6D282984AI0015
Base MAC Address     0x24   6 F4:8E:38:16:BC:8D
Vendor Name          0x2D   4 Cumulus
CRC-32               0xFE   4 0x9F1D3BB5
";

    const LINK_SHOW_ETH0: &str = "2: eth0: <BROADCAST,MULTICAST,UP,LOWER_UP> mtu 1500 qdisc pfifo_fast master mgmt state UP mode DEFAULT group default qlen 1000
    link/ether 52:54:00:12:34:56 brd ff:ff:ff:ff:ff:ff
";

    fn device(runner: ScriptedRunner) -> CumulusDevice<ScriptedShell> {
        CumulusDevice::with_connector(ScriptedShell::new(runner), &DeviceOptions::default())
    }

    #[test]
    fn test_normalize_hardware_defaults_missing_tags() {
        let facts = normalize("leaf01\n", "3.5.0\n", Platform::Hardware { syseeprom: SYSEEPROM }).unwrap();

        assert_eq!(facts.vendor.as_deref(), Some("Cumulus"));
        assert_eq!(facts.hw_model.as_deref(), Some("S4048-ON"));
        assert_eq!(facts.serial_number.as_deref(), Some("CN0J6J6D282984AI0015"));
        assert_eq!(facts.mac_address.as_deref(), Some("F4:8E:38:16:BC:8D"));
        assert_eq!(facts.hw_version.as_deref(), Some("no-label-revision"));
        assert_eq!(facts.service_tag.as_deref(), Some("no-service-tag"));
        assert_eq!(facts.is_virtual, Some(false));
        assert_eq!(facts.os_version.as_deref(), Some("3.5.0"));
    }

    #[test]
    fn test_normalize_vx() {
        let facts = normalize("cumulus\n", "3.7.2\n", Platform::Vx { link_show: LINK_SHOW_ETH0 }).unwrap();

        assert_eq!(facts.vendor.as_deref(), Some(VX_VENDOR));
        assert_eq!(facts.hw_model.as_deref(), Some("CUMULUS-VX"));
        assert_eq!(facts.hw_part_number, None);
        assert_eq!(facts.serial_number.as_deref(), Some("525400123456"));
        assert_eq!(facts.mac_address.as_deref(), Some("52:54:00:12:34:56"));
        assert_eq!(facts.is_virtual, Some(true));
    }

    #[tokio::test]
    async fn test_gather_hardware() {
        let runner = ScriptedRunner::new()
            .reply(HOSTNAME, 0, "leaf01\n")
            .reply(RELEASE, 0, "3.5.0\n")
            .reply(HAS_SYSEEPROM, 0, "")
            .reply(DECODE_SYSEEPROM, 0, SYSEEPROM);
        let mut device = device(runner);

        let facts = device.gather_facts().await.unwrap().clone();
        assert_eq!(facts.hostname.as_deref(), Some("leaf01"));
        assert_eq!(facts.vendor.as_deref(), Some("Cumulus"));
        assert_eq!(facts.is_virtual, Some(false));
    }

    #[tokio::test]
    async fn test_gather_vx_when_tool_missing() {
        let runner = ScriptedRunner::new()
            .reply(HOSTNAME, 0, "cumulus\n")
            .reply(RELEASE, 0, "3.7.2\n")
            .reply(HAS_SYSEEPROM, 1, "")
            .reply(LINK_SHOW, 0, LINK_SHOW_ETH0);
        let mut device = device(runner);

        let facts = device.gather_facts().await.unwrap().clone();
        assert_eq!(facts.hw_model.as_deref(), Some(VX_MODEL));
        assert_eq!(facts.is_virtual, Some(true));
        assert_eq!(
            device.connector_mut().calls(),
            vec![HOSTNAME, RELEASE, HAS_SYSEEPROM, LINK_SHOW]
        );
    }

    #[tokio::test]
    async fn test_gather_aborts_on_required_failure() {
        let runner = ScriptedRunner::new().reply(HOSTNAME, 0, "leaf01\n");
        let mut device = device(runner);

        assert!(device.gather_facts().await.is_err());
        assert!(device.facts().is_none());
        assert_eq!(device.connector_mut().calls(), vec![HOSTNAME, RELEASE]);
    }
}
