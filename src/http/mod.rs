//! HTTP request client, its transport seam, and the retry layer built on top.

pub mod codec;
mod client;
mod retry;
mod transport;

pub use client::RequestClient;
pub use retry::{
    MAX_RETRIES, RETRY_DELAY_MS, RetryPolicy, StatusClass, classify_status, is_retryable,
    send_with_retry,
};
pub use transport::{ReqwestTransport, Transport, TransportError, WireRequest, WireResponse};
