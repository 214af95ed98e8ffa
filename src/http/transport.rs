//! The byte-level exchange underneath [`RequestClient`](super::RequestClient).
//!
//! A [`Transport`] performs one request/response round-trip and hands back
//! whatever the remote answered, whatever the status code. Interpreting the
//! status and body is left to the client.

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Url};
use std::fmt;
use std::time::Duration;

use crate::request::{Headers, Method};

/// A fully resolved request, ready for the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    pub method: Method,
    pub url: Url,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

/// A complete response as received from the remote.
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    /// Reason phrase, when the status code has a known one.
    pub reason: Option<String>,
    pub headers: Headers,
    pub body: Vec<u8>,
}

impl WireResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            reason: reqwest::StatusCode::from_u16(status)
                .ok()
                .and_then(|s| s.canonical_reason())
                .map(str::to_string),
            headers: Headers::new(),
            body: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }
}

/// Why an exchange could not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The caller's deadline elapsed before the exchange finished.
    Timeout(Duration),
    /// DNS resolution or connection establishment failed.
    Connect(String),
    /// The redirect chain was too long or looped.
    Redirect(String),
    /// The request could not be addressed.
    InvalidUrl(String),
    Other(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::Timeout(limit) => {
                write!(f, "Request timed out after {}ms", limit.as_millis())
            }
            TransportError::Connect(msg) => write!(f, "Connection failed: {}", msg),
            TransportError::Redirect(msg) => write!(f, "Redirect failed: {}", msg),
            TransportError::InvalidUrl(msg) => write!(f, "Invalid URL: {}", msg),
            TransportError::Other(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        // A reqwest-side timeout with no known limit can only be the connect
        // timeout; the request deadline is enforced by `RequestClient`.
        let is_connect = err.is_connect() || err.is_timeout();
        let is_redirect = err.is_redirect();
        let is_builder = err.is_builder();
        // {:#} renders the whole source chain, e.g. "... : Connection refused".
        let msg = format!("{:#}", anyhow::Error::from(err));
        if is_connect {
            TransportError::Connect(msg)
        } else if is_redirect {
            TransportError::Redirect(msg)
        } else if is_builder {
            TransportError::InvalidUrl(msg)
        } else {
            TransportError::Other(msg)
        }
    }
}

/// Performs the network exchange for one request.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

/// [`Transport`] backed by a reqwest [`Client`].
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: Client,
    timeout_limit: Option<Duration>,
}

impl ReqwestTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            timeout_limit: None,
        }
    }

    /// Records the timeout configured on the reqwest client, so that hitting
    /// it is reported as [`TransportError::Timeout`].
    pub fn with_timeout_limit(mut self, limit: Duration) -> Self {
        self.timeout_limit = Some(limit);
        self
    }

    pub fn inner(&self) -> &Client {
        &self.client
    }

    fn classify(&self, err: reqwest::Error) -> TransportError {
        match self.timeout_limit {
            Some(limit) if err.is_timeout() => {
                debug!("reqwest timed out: {}", err);
                TransportError::Timeout(limit)
            }
            _ => err.into(),
        }
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    #[tracing::instrument(skip(self, request))]
    async fn execute(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let mut builder = self.client.request(request.method.into(), request.url);
        for (name, value) in request.headers.iter() {
            builder = builder.header(name, value);
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| self.classify(e))?;
        let status = response.status();

        let headers: Headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();

        let body = response.bytes().await.map_err(|e| self.classify(e))?;
        debug!("Received {} ({} bytes)", status, body.len());

        Ok(WireResponse {
            status: status.as_u16(),
            reason: status.canonical_reason().map(str::to_string),
            headers,
            body: body.to_vec(),
        })
    }
}
