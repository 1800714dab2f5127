//! Text and JSON extraction helpers shared by the family normalizers.
//!
//! Everything here is pure: command output in, values out.

use std::sync::LazyLock;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::error::{CommandError, Result};

/// One row of `decode-syseeprom` output:
///
/// ```text
/// Serial Number        0x23  20 CN0J6J6D282984AI0015
/// ```
static SYSEEPROM_ROW: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<tag>\S.*?)\s+0x(?P<code>[0-9A-Fa-f]{2})\s+(?P<len>\d+)\s+(?P<value>.*?)\s*$")
        .unwrap()
});

/// Pull the MAC address out of `ip link show` output, uppercased.
///
/// Takes the first `link/ether` entry.
pub fn mac_from_link_show(text: &str) -> Option<String> {
    let (_, rest) = text.split_once("link/ether ")?;
    rest.split_whitespace().next().map(str::to_uppercase)
}

/// Serial number derived from a MAC address: colons removed, uppercased.
pub fn serial_from_mac(mac: &str) -> String {
    mac.replace(':', "").to_uppercase()
}

/// Like [`mac_from_link_show`], failing when the output has no address.
pub fn require_mac(text: &str, command: &str) -> Result<String> {
    mac_from_link_show(text).ok_or_else(|| {
        CommandError::new(format!("no link/ether address in '{command}' output"), [command]).into()
    })
}

/// Parse `decode-syseeprom` output into a tag -> value map.
///
/// Header and separator lines are skipped. Tags keep their table order.
pub fn parse_syseeprom(text: &str) -> IndexMap<String, String> {
    text.lines()
        .filter_map(|line| SYSEEPROM_ROW.captures(line))
        .map(|caps| (caps["tag"].to_string(), caps["value"].to_string()))
        .collect()
}

/// First line of command output, trimmed. `None` when empty.
pub fn first_line(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| !line.is_empty())
        .map(str::to_string)
}

/// A string field of a JSON object. Empty strings count as missing.
pub fn json_str(value: &Value, field: &str) -> Option<String> {
    value
        .get(field)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

/// A string field that must be present in the reply to `command`.
pub fn require_str(value: &Value, field: &str, command: &str) -> Result<String> {
    json_str(value, field).ok_or_else(|| {
        CommandError::new(format!("'{command}' reply has no '{field}'"), [command]).into()
    })
}

/// NX-OS tables hold a single row as an object and several as an array.
pub fn first_row(value: &Value) -> Option<&Value> {
    match value {
        Value::Array(rows) => rows.first(),
        Value::Object(_) => Some(value),
        _ => None,
    }
}
