//! Transport layer: SSH via russh and HTTP via reqwest.
//!
//! This module provides the low-level connection management the
//! connectors and the classifier build on.

pub mod config;
mod http;
mod ssh;

pub use config::{ConnectorConfig, HostKeyVerification, SshConfig};
pub use http::{HttpError, HttpReply, HttpRequest, HttpTransport, ReqwestTransport};
pub use ssh::SshTransport;
