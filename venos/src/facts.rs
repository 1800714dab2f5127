//! Canonical device facts.

use serde::Serialize;

/// Normalized identity and hardware record of a device.
///
/// Every field is always serialized. Unknown values are `null` or a
/// family-specific sentinel string such as `"no-vendor-name"`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facts {
    pub vendor: Option<String>,
    pub os_name: Option<String>,
    pub os_version: Option<String>,
    pub hostname: Option<String>,
    pub fqdn: Option<String>,
    pub serial_number: Option<String>,
    pub mac_address: Option<String>,
    pub hw_model: Option<String>,
    pub hw_part_number: Option<String>,
    pub hw_version: Option<String>,

    /// `None` when the family cannot tell.
    #[serde(rename = "virtual")]
    pub is_virtual: Option<bool>,

    pub service_tag: Option<String>,
}

impl Facts {
    /// Render as a JSON object.
    pub fn to_json(&self) -> serde_json::Value {
        // A struct of strings and bools always serializes.
        serde_json::to_value(self).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_key_present() {
        let json = Facts::default().to_json();
        let object = json.as_object().unwrap();

        assert_eq!(object.len(), 12);
        for key in [
            "vendor",
            "os_name",
            "os_version",
            "hostname",
            "fqdn",
            "serial_number",
            "mac_address",
            "hw_model",
            "hw_part_number",
            "hw_version",
            "virtual",
            "service_tag",
        ] {
            assert!(object.contains_key(key), "missing {key}");
            assert!(object[key].is_null());
        }
    }

    #[test]
    fn test_virtual_flag_serializes_as_bool() {
        let facts = Facts {
            is_virtual: Some(true),
            ..Default::default()
        };
        assert_eq!(facts.to_json()["virtual"], serde_json::Value::Bool(true));
    }
}
