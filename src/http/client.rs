//! Request client: one linear request/response exchange per call.

use log::debug;
use reqwest::Url;
use std::time::Duration;

use super::codec;
use super::transport::{ReqwestTransport, Transport, TransportError, WireRequest, WireResponse};
use crate::request::{RequestSpec, Target};
use crate::response::{Failure, ResponseResult, Success};

/// Issues requests through a [`Transport`] and classifies the outcome.
///
/// The client keeps no per-call state; `send` may be called concurrently
/// from any number of tasks.
#[derive(Clone)]
pub struct RequestClient<T = ReqwestTransport> {
    transport: T,
    base_url: Option<Url>,
    default_timeout: Option<Duration>,
}

impl<T: Transport> RequestClient<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            base_url: None,
            default_timeout: None,
        }
    }

    /// Base URL that relative request paths such as `/api/getData` resolve against.
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Deadline applied to requests that do not set their own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = Some(timeout);
        self
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Sends `spec` and returns the classified outcome.
    ///
    /// Status errors, transport errors and undecodable bodies are all reported
    /// in the returned [`ResponseResult`]. When a timeout applies and elapses,
    /// the in-flight exchange is dropped before the failure is returned.
    /// Dropping the returned future cancels the exchange as well.
    #[tracing::instrument(skip(self, spec))]
    pub async fn send(&self, spec: RequestSpec) -> ResponseResult {
        debug!("{} {}...", spec.method(), spec.target());

        let timeout = spec.timeout().or(self.default_timeout);
        let request = match self.resolve(spec) {
            Ok(request) => request,
            Err(failure) => return failure.into(),
        };

        let outcome = match timeout {
            Some(limit) => {
                match tokio::time::timeout(limit, self.transport.execute(request)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(TransportError::Timeout(limit)),
                }
            }
            None => self.transport.execute(request).await,
        };

        let result = match outcome {
            Ok(response) => interpret(response),
            Err(err) => Failure::transport(err.to_string()).into(),
        };

        match &result {
            ResponseResult::Success(success) => debug!("Completed with {}", success.status_code),
            ResponseResult::Failure(failure) => debug!("Failed: {}", failure),
        }
        result
    }

    fn resolve(&self, spec: RequestSpec) -> Result<WireRequest, Failure> {
        let url = match spec.target() {
            Target::Absolute(url) => url.clone(),
            Target::Relative(path) => {
                let Some(base) = &self.base_url else {
                    return Err(Failure::transport(format!(
                        "Cannot resolve {}: no base URL configured",
                        path
                    )));
                };
                base.join(path).map_err(|e| {
                    Failure::transport(format!("Cannot resolve {} against {}: {}", path, base, e))
                })?
            }
        };

        Ok(WireRequest {
            method: spec.method(),
            url,
            headers: spec.headers().clone(),
            body: spec.body().map(<[u8]>::to_vec),
        })
    }
}

/// Classifies a completed exchange.
fn interpret(response: WireResponse) -> ResponseResult {
    if !(200..=299).contains(&response.status) {
        let reason = response
            .reason
            .unwrap_or_else(|| "Unknown Status".to_string());
        return Failure::http_status(response.status, reason).into();
    }

    match codec::decode_body(&response.headers, response.body) {
        Ok(body) => Success {
            status_code: response.status,
            headers: response.headers,
            body,
        }
        .into(),
        Err(msg) => Failure::decode(msg).into(),
    }
}
