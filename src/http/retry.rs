//! Caller-side retry for requests that fail transiently.
//!
//! [`RequestClient::send`](super::RequestClient::send) never retries on its
//! own. Callers that want retries wrap it with [`send_with_retry`], which
//! issues a fresh `send` for each attempt.

use log::{debug, warn};
use std::time::Duration;

use super::client::RequestClient;
use super::transport::Transport;
use crate::request::RequestSpec;
use crate::response::{ErrorKind, ResponseResult};

/// Maximum number of attempts, including the first one.
pub const MAX_RETRIES: usize = 3;

/// Delay between retry attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// How a status code should be treated by the retry layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 408, 429 and 5xx: the same request may succeed later.
    Retryable,
    /// Any other 4xx: repeating the request won't change the answer.
    ClientError,
    /// Not an error status.
    NotAnError,
}

/// Classifies an HTTP status code for retry purposes.
pub fn classify_status(status: u16) -> StatusClass {
    match status {
        408 | 429 => StatusClass::Retryable,
        500..=599 => StatusClass::Retryable,
        400..=499 => StatusClass::ClientError,
        _ => StatusClass::NotAnError,
    }
}

/// Returns true if issuing the same request again could produce a different outcome.
pub fn is_retryable(result: &ResponseResult) -> bool {
    let Some(failure) = result.failure() else {
        return false;
    };
    match failure.kind() {
        ErrorKind::Transport => true,
        ErrorKind::HttpStatus => failure
            .status_code()
            .is_some_and(|code| classify_status(code) == StatusClass::Retryable),
        ErrorKind::Decode => false,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: usize,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: MAX_RETRIES,
            delay: Duration::from_millis(RETRY_DELAY_MS),
        }
    }
}

impl RetryPolicy {
    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn new(max_attempts: usize, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

/// Sends `spec`, reissuing it while the outcome is retryable and attempts remain.
///
/// Returns the outcome of the last attempt.
#[tracing::instrument(skip(client, spec, policy))]
pub async fn send_with_retry<T: Transport>(
    client: &RequestClient<T>,
    spec: &RequestSpec,
    policy: &RetryPolicy,
) -> ResponseResult {
    let max_attempts = policy.max_attempts.max(1);
    let mut attempt = 1;

    loop {
        let result = client.send(spec.clone()).await;

        if !is_retryable(&result) {
            if let Some(failure) = result.failure() {
                debug!("{}: non-retryable failure: {}", spec.target(), failure);
            }
            return result;
        }

        if attempt >= max_attempts {
            warn!(
                "{}: giving up after {} attempts",
                spec.target(),
                max_attempts
            );
            return result;
        }

        if let Some(failure) = result.failure() {
            warn!(
                "{}: attempt {}/{} failed ({}), retrying in {}ms...",
                spec.target(),
                attempt,
                max_attempts,
                failure,
                policy.delay.as_millis()
            );
        }
        tokio::time::sleep(policy.delay).await;
        attempt += 1;
    }
}
