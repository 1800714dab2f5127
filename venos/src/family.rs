//! Device families this crate can drive.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::Serialize;

use crate::error::RegistryError;

/// Network operating system family of a target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Family {
    Nxos,
    Eos,
    Cumulus,
    Ubuntu,
    Centos,
    Opx,
}

impl Family {
    /// Every built-in family, in registry order.
    pub const ALL: [Family; 6] = [
        Family::Nxos,
        Family::Eos,
        Family::Cumulus,
        Family::Ubuntu,
        Family::Centos,
        Family::Opx,
    ];

    /// Short lowercase name, as used by the registry and the classifier.
    pub fn as_str(&self) -> &'static str {
        match self {
            Family::Nxos => "nxos",
            Family::Eos => "eos",
            Family::Cumulus => "cumulus",
            Family::Ubuntu => "ubuntu",
            Family::Centos => "centos",
            Family::Opx => "opx",
        }
    }

    /// How long construction waits for the management port to answer.
    ///
    /// Server-class families boot slower than switches.
    pub fn default_probe_timeout(&self) -> Duration {
        match self {
            Family::Ubuntu | Family::Centos | Family::Opx => Duration::from_secs(10),
            _ => Duration::from_secs(3),
        }
    }
}

impl fmt::Display for Family {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Family {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Family::ALL
            .into_iter()
            .find(|family| family.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| RegistryError::UnknownFamily {
                name: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_round_trips_names() {
        for family in Family::ALL {
            assert_eq!(family.as_str().parse::<Family>().unwrap(), family);
        }
        assert_eq!("EOS".parse::<Family>().unwrap(), Family::Eos);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "junos".parse::<Family>().unwrap_err();
        assert!(matches!(err, RegistryError::UnknownFamily { ref name } if name == "junos"));
    }

    #[test]
    fn test_probe_timeouts() {
        assert_eq!(Family::Eos.default_probe_timeout(), Duration::from_secs(3));
        assert_eq!(Family::Opx.default_probe_timeout(), Duration::from_secs(10));
        assert_eq!(Family::Ubuntu.default_probe_timeout(), Duration::from_secs(10));
        assert_eq!(Family::Cumulus.default_probe_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Family::Cumulus).unwrap(), "\"cumulus\"");
    }
}
