//! Cisco NX-OS over NX-API.

use async_trait::async_trait;
use futures_util::future::BoxFuture;
use serde_json::Value;

use crate::connector::{Connector, NxapiConnector, NxapiReply};
use crate::device::extract::{first_row, json_str, require_str};
use crate::device::{into_handle, Device, DeviceCore, DeviceHandle, DeviceOptions};
use crate::error::{CommandError, ConnectorError, Result};
use crate::facts::Facts;
use crate::family::Family;
use crate::probe::ProbeOutcome;
use crate::transport::ConnectorConfig;

pub const VENDOR: &str = "cisco";
pub const OS_NAME: &str = "nxos";

const SHOW_HOSTNAME: &str = "show hostname";
const SHOW_HARDWARE: &str = "show hardware";

/// Build facts from the `show hostname` and `show hardware` bodies.
///
/// The first row of the slot table describes the supervisor.
pub fn normalize(hostname: &Value, hardware: &Value) -> Result<Facts> {
    let fqdn = require_str(hostname, "hostname", SHOW_HOSTNAME)?;
    let short = fqdn
        .split_once('.')
        .map_or(fqdn.as_str(), |(host, _)| host)
        .to_string();

    let chassis_id = json_str(hardware, "chassis_id").unwrap_or_default();
    let row = hardware
        .pointer("/TABLE_slot/ROW_slot")
        .and_then(first_row)
        .and_then(|slot| slot.pointer("/TABLE_slot_info/ROW_slot_info"))
        .and_then(first_row)
        .ok_or_else(|| CommandError::new("'show hardware' reply has no slot table", [SHOW_HARDWARE]))?;

    Ok(Facts {
        vendor: Some(VENDOR.to_string()),
        os_name: Some(OS_NAME.to_string()),
        os_version: Some(require_str(hardware, "kickstart_ver_str", SHOW_HARDWARE)?),
        hostname: Some(short),
        fqdn: Some(fqdn),
        serial_number: json_str(row, "serial_num"),
        mac_address: None,
        hw_model: json_str(row, "model_num"),
        hw_part_number: json_str(row, "part_num"),
        hw_version: json_str(row, "hw_ver"),
        is_virtual: Some(chassis_id.contains("NX-OSv")),
        service_tag: None,
    })
}

fn json_body(reply: &NxapiReply) -> Result<&Value> {
    reply.as_json().ok_or_else(|| {
        ConnectorError::Protocol {
            message: "expected a JSON reply".to_string(),
        }
        .into()
    })
}

/// NX-OS switch.
pub struct NxosDevice<C = NxapiConnector> {
    core: DeviceCore<C>,
}

impl NxosDevice {
    pub fn new(config: ConnectorConfig, options: &DeviceOptions) -> Result<Self> {
        Ok(Self::with_connector(NxapiConnector::new(config)?, options))
    }
}

impl<C: Connector<Output = Vec<NxapiReply>>> NxosDevice<C> {
    pub fn with_connector(connector: C, options: &DeviceOptions) -> Self {
        Self {
            core: DeviceCore::new(Family::Nxos, connector, options),
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
impl<C: Connector<Output = Vec<NxapiReply>>> Device for NxosDevice<C> {
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

        let replies = self
            .core
            .connector_mut()
            .execute(&[SHOW_HOSTNAME, SHOW_HARDWARE])
            .await?;

        let facts = match replies.as_slice() {
            [hostname, hardware] => normalize(json_body(hostname)?, json_body(hardware)?)?,
            _ => {
                return Err(ConnectorError::Protocol {
                    message: format!("expected 2 replies, got {}", replies.len()),
                }
                .into());
            }
        };

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
    Box::pin(into_handle(NxosDevice::new(config, &options), options))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connector::SessionState;
    use crate::testing::ScriptedHttp;
    use crate::transport::HttpReply;
    use serde_json::json;

    fn hardware() -> Value {
        json!({
            "header_str": "Cisco Nexus Operating System (NX-OS) Software",
            "kickstart_ver_str": "7.0(3)I5(1)",
            "chassis_id": "NX-OSv Chassis",
            "TABLE_slot": {
                "ROW_slot": {
                    "TABLE_slot_info": {
                        "ROW_slot_info": [
                            {
                                "num_submods": "1",
                                "type": "NX-OSv Supervisor Module",
                                "model_num": "N9K-NXOSV",
                                "hw_ver": "0.0",
                                "part_num": "N9K-NXOSV",
                                "part_revision": "",
                                "serial_num": "TM6012EC74B"
                            },
                            {
                                "type": "NX-OSv Ethernet Module",
                                "model_num": "N9K-NXOSV",
                                "serial_num": "TM6012EC74C"
                            }
                        ]
                    }
                }
            }
        })
    }

    fn reply(body: Value) -> HttpReply {
        HttpReply::ok(
            json!({"ins_api": {"outputs": {"output": {"body": body, "code": "200", "msg": "Success"}}}})
                .to_string(),
        )
    }

    #[test]
    fn test_normalize() {
        let facts = normalize(&json!({"hostname": "n9k-1.lab.example.com"}), &hardware()).unwrap();

        assert_eq!(facts.vendor.as_deref(), Some("cisco"));
        assert_eq!(facts.os_name.as_deref(), Some("nxos"));
        assert_eq!(facts.os_version.as_deref(), Some("7.0(3)I5(1)"));
        assert_eq!(facts.hostname.as_deref(), Some("n9k-1"));
        assert_eq!(facts.fqdn.as_deref(), Some("n9k-1.lab.example.com"));
        assert_eq!(facts.serial_number.as_deref(), Some("TM6012EC74B"));
        assert_eq!(facts.hw_model.as_deref(), Some("N9K-NXOSV"));
        assert_eq!(facts.hw_part_number.as_deref(), Some("N9K-NXOSV"));
        assert_eq!(facts.hw_version.as_deref(), Some("0.0"));
        assert_eq!(facts.is_virtual, Some(true));
    }

    #[test]
    fn test_normalize_physical_single_row() {
        let hardware = json!({
            "kickstart_ver_str": "7.0(3)I7(3)",
            "chassis_id": "Nexus9000 C9372PX chassis",
            "TABLE_slot": {"ROW_slot": {"TABLE_slot_info": {"ROW_slot_info": {
                "model_num": "N9K-C9372PX",
                "serial_num": "SAL1234ABCD",
                "part_num": "73-15470-02",
                "hw_ver": "2.0"
            }}}}
        });
        let facts = normalize(&json!({"hostname": "leaf1"}), &hardware).unwrap();

        assert_eq!(facts.hostname.as_deref(), Some("leaf1"));
        assert_eq!(facts.fqdn.as_deref(), Some("leaf1"));
        assert_eq!(facts.is_virtual, Some(false));
        assert_eq!(facts.serial_number.as_deref(), Some("SAL1234ABCD"));
    }

    #[test]
    fn test_normalize_missing_table() {
        let err = normalize(&json!({"hostname": "x"}), &json!({"kickstart_ver_str": "7"})).unwrap_err();
        assert!(matches!(err, crate::Error::Command(_)));
    }

    #[tokio::test]
    async fn test_gather_opens_lazily() {
        let http = ScriptedHttp::new()
            .push(reply(json!({"hostname": "n9k-1"})))
            .push(reply(hardware()));
        let connector = NxapiConnector::with_transport(ConnectorConfig::new("n9k", "admin", "admin"), http).unwrap();
        let mut device = NxosDevice::with_connector(connector, &DeviceOptions::default());

        assert!(device.facts().is_none());
        assert_eq!(device.connector().state(), SessionState::Disconnected);

        let facts = device.gather_facts().await.unwrap().clone();
        assert_eq!(facts.hostname.as_deref(), Some("n9k-1"));
        assert_eq!(device.connector().state(), SessionState::Connected);
        assert_eq!(device.describe(), "cisco nxos at n9k");
    }
}
