//! Built-in fingerprinting stages.
//!
//! ```text
//! show-version   show version        Cisco -> nxos, Arista -> eos,
//!                                    "command not found" -> next
//! proc-version   cat /proc/version   cumulus, Ubuntu, Red Hat -> centos
//! opx-release    OPX marker file     opx-42 -> opx, none-42 -> next
//! ```

use std::time::Duration;

use super::{Outcome, Stage};
use crate::family::Family;

/// How long each built-in stage waits for a fingerprint.
pub const STAGE_TIMEOUT: Duration = Duration::from_secs(10);

/// Prints `opx-42` when the OPX release file exists, `none-42` otherwise.
///
/// The arithmetic keeps the echoed command line from matching either
/// marker.
pub const OPX_PROBE: &str =
    "test -e /etc/OPX-release-version && echo opx-$((6*7)) || echo none-$((6*7))";

/// Network operating systems answer `show version`; Linux shells reject it.
pub fn show_version() -> Stage {
    Stage::new("show-version", "show version", STAGE_TIMEOUT)
        .with_alternative("Cisco", Outcome::Family(Family::Nxos))
        .unwrap()
        .with_alternative("Arista", Outcome::Family(Family::Eos))
        .unwrap()
        .with_alternative("command not found|not installed", Outcome::Next)
        .unwrap()
}

/// Linux distributions identify themselves in the kernel build string.
pub fn proc_version() -> Stage {
    Stage::new("proc-version", "cat /proc/version", STAGE_TIMEOUT)
        .with_alternative("cumulus", Outcome::Family(Family::Cumulus))
        .unwrap()
        .with_alternative("Ubuntu", Outcome::Family(Family::Ubuntu))
        .unwrap()
        .with_alternative("Red Hat", Outcome::Family(Family::Centos))
        .unwrap()
}

/// OpenSwitch OPX runs on a stock Debian kernel and is only told apart by
/// its release file.
pub fn opx_release() -> Stage {
    Stage::new("opx-release", OPX_PROBE, STAGE_TIMEOUT)
        .with_alternative("opx-42", Outcome::Family(Family::Opx))
        .unwrap()
        .with_alternative("none-42", Outcome::Next)
        .unwrap()
}

/// The default stage list, in evaluation order.
pub fn builtin() -> Vec<Stage> {
    vec![show_version(), proc_version(), opx_release()]
}
