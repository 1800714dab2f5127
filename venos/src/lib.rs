//! # Venos
//!
//! Vendor-agnostic discovery and fact gathering for network devices.
//!
//! Venos logs in to a target, works out which network operating system it
//! runs, opens the right management transport and returns a normalized set
//! of identity and hardware facts.
//!
//! ## Features
//!
//! - Interactive SSH fingerprinting with configurable stages
//! - Reachability probing with bounded retry
//! - Shell (SSH), eAPI (JSON-RPC) and NX-API (XML) connectors
//! - One facade per family: NX-OS, EOS, Cumulus, Ubuntu, CentOS, OPX
//! - A single [`Facts`] schema that serializes to JSON
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use venos::{get_device, Discovery};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), venos::Error> {
//!     match get_device("192.168.1.10", "admin", "secret", false).await? {
//!         Discovery::Device(mut device) => {
//!             if let Some(facts) = device.facts() {
//!                 println!("{}", facts.to_json());
//!             }
//!             device.close().await?;
//!         }
//!         Discovery::Family(family) => println!("{family}"),
//!     }
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod classifier;
pub mod connector;
pub mod device;
pub mod error;
pub mod facts;
pub mod family;
pub mod probe;
pub mod transport;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use classifier::{ClassificationResult, Classifier};
pub use connector::{Connector, SessionState};
pub use device::{get_device, Device, DeviceBuilder, DeviceHandle, DeviceOptions, DeviceRegistry, Discovery};
pub use error::{Error, Result};
pub use facts::Facts;
pub use family::Family;
pub use probe::{probe, ProbeOutcome};
pub use transport::{ConnectorConfig, HostKeyVerification};
