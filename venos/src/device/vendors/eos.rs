//! Arista EOS over eAPI.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use log::warn;
use serde_json::Value;

use crate::connector::{BatchReply, Connector, EapiConnector};
use crate::device::extract::{json_str, require_str, serial_from_mac};
use crate::device::{into_handle, Device, DeviceCore, DeviceHandle, DeviceOptions};
use crate::error::{ConnectorError, Result};
use crate::facts::Facts;
use crate::family::Family;
use crate::probe::ProbeOutcome;
use crate::transport::ConnectorConfig;

pub const VENDOR: &str = "arista";
pub const OS_NAME: &str = "eos";

/// Hostname reported when `show hostname` fails.
pub const UNKNOWN_HOSTNAME: &str = "localhost";

const SHOW_VERSION: &str = "show version";
const SHOW_HOSTNAME: &str = "show hostname";

/// Build facts from `show version` and, if it succeeded, `show hostname`.
///
/// Virtual switches report no serial number; the system MAC stands in.
pub fn normalize(version: &Value, hostname: Option<&Value>) -> Result<Facts> {
    let model = require_str(version, "modelName", SHOW_VERSION)?;
    let mac = json_str(version, "systemMacAddress").map(|mac| mac.to_uppercase());
    let serial = json_str(version, "serialNumber").or_else(|| mac.as_deref().map(serial_from_mac));

    let name = |field: &str| {
        hostname
            .and_then(|reply| json_str(reply, field))
            .unwrap_or_else(|| UNKNOWN_HOSTNAME.to_string())
    };

    Ok(Facts {
        vendor: Some(VENDOR.to_string()),
        os_name: Some(OS_NAME.to_string()),
        os_version: Some(require_str(version, "version", SHOW_VERSION)?),
        hostname: Some(name("hostname")),
        fqdn: Some(name("fqdn")),
        serial_number: serial,
        mac_address: mac,
        is_virtual: Some(model.contains("vEOS")),
        hw_model: Some(model),
        hw_part_number: None,
        hw_version: json_str(version, "hardwareRevision"),
        service_tag: None,
    })
}

/// EOS switch.
pub struct EosDevice<C = EapiConnector> {
    core: DeviceCore<C>,
}

impl EosDevice {
    pub fn new(config: ConnectorConfig, options: &DeviceOptions) -> Result<Self> {
        Ok(Self::with_connector(EapiConnector::new(config)?, options))
    }
}

impl<C: Connector<Output = BatchReply>> EosDevice<C> {
    pub fn with_connector(connector: C, options: &DeviceOptions) -> Self {
        Self {
            core: DeviceCore::new(Family::Eos, connector, options),
        }
    }

    pub fn connector(&self) -> &C {
        self.core.connector()
    }

    pub fn connector_mut(&mut self) -> &mut C {
        self.core.connector_mut()
    }
}

#[async_trait]
impl<C: Connector<Output = BatchReply>> Device for EosDevice<C> {
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
        let connector = self.core.connector_mut();

        let version = connector
            .execute(&[SHOW_VERSION])
            .await?
            .get(0)
            .cloned()
            .ok_or_else(|| ConnectorError::Protocol {
                message: "empty 'show version' reply".to_string(),
            })?;

        let hostname = match connector.execute(&[SHOW_HOSTNAME]).await {
            Ok(reply) => reply.get(0).cloned(),
            Err(e) => {
                warn!("'{}' failed, using {}: {}", SHOW_HOSTNAME, UNKNOWN_HOSTNAME, e);
                None
            }
        };

        let facts = normalize(&version, hostname.as_ref())?;
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
    Box::pin(into_handle(EosDevice::new(config, &options), options))
}
