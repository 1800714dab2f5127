//! HTTP transport for the RPC connectors.
//!
//! Connectors talk to the device through [`HttpTransport`] so that the
//! request/response handling can be driven without a live device.

use std::future::Future;
use std::time::Duration;

use log::trace;
use reqwest::header::CONTENT_TYPE;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::error::{BoxError, Result, TransportError};

/// A single POST request to a management API.
#[derive(Debug)]
pub struct HttpRequest<'a> {
    pub url: &'a str,
    pub content_type: &'a str,
    /// Extra headers sent with the request.
    pub headers: &'a [(&'a str, &'a str)],
    pub body: String,
    pub timeout: Duration,
    pub user: &'a str,
    pub passwd: &'a SecretString,
}

/// Status and body of an HTTP reply.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: u16,
    pub reason: String,
    pub body: String,
}

impl HttpReply {
    /// A `200 OK` reply with the given body.
    pub fn ok(body: impl Into<String>) -> Self {
        Self {
            status: 200,
            reason: "OK".to_string(),
            body: body.into(),
        }
    }
}

/// Failure to obtain any HTTP reply.
#[derive(Error, Debug)]
pub enum HttpError {
    /// The server did not answer within the request timeout.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or protocol failure.
    #[error("request failed: {0}")]
    Request(#[source] BoxError),
}

impl From<reqwest::Error> for HttpError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Request(Box::new(err))
        }
    }
}

/// Something that can POST a request and hand back the reply.
pub trait HttpTransport: Send + Sync {
    fn post(
        &self,
        request: HttpRequest<'_>,
    ) -> impl Future<Output = std::result::Result<HttpReply, HttpError>> + Send;
}

/// [`HttpTransport`] backed by a reqwest client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Build the client.
    ///
    /// Switch management interfaces ship self-signed certificates, so
    /// certificate validation is off.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .build()
            .map_err(|e| TransportError::Http(Box::new(e)))?;
        Ok(Self { client })
    }
}

impl HttpTransport for ReqwestTransport {
    async fn post(&self, request: HttpRequest<'_>) -> std::result::Result<HttpReply, HttpError> {
        trace!("POST {} ({} bytes)", request.url, request.body.len());

        let mut builder = self
            .client
            .post(request.url)
            .header(CONTENT_TYPE, request.content_type)
            .basic_auth(request.user, Some(request.passwd.expose_secret()))
            .timeout(request.timeout)
            .body(request.body);

        for (name, value) in request.headers {
            builder = builder.header(*name, *value);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        Ok(HttpReply {
            status: status.as_u16(),
            reason: status.canonical_reason().unwrap_or_default().to_string(),
            body,
        })
    }
}
