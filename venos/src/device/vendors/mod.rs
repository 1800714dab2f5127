//! One facade per supported family.

pub mod centos;
pub mod cumulus;
pub mod eos;
pub mod nxos;
pub mod opx;
pub mod ubuntu;

pub use centos::CentosDevice;
pub use cumulus::CumulusDevice;
pub use eos::EosDevice;
pub use nxos::NxosDevice;
pub use opx::OpxDevice;
pub use ubuntu::UbuntuDevice;
