//! Outcome of a single request.
//!
//! [`ResponseResult`] is a tagged union: a call either succeeded with a 2xx
//! status and a decoded body, or failed with one of the [`ErrorKind`]s.

use serde_json::Value;
use std::fmt;

use crate::request::Headers;

/// Decoded response payload.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// The response carried no bytes.
    NoContent,
    Json(Value),
    Text(String),
    Bytes(Vec<u8>),
}

impl Body {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Body::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::NoContent)
    }
}

/// A 2xx response.
#[derive(Debug, Clone, PartialEq)]
pub struct Success {
    pub status_code: u16,
    pub headers: Headers,
    pub body: Body,
}

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The remote answered with a status outside 200..=299.
    HttpStatus,
    /// The exchange could not complete: DNS, connect, I/O, or timeout.
    Transport,
    /// The body did not match its declared content type.
    Decode,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::HttpStatus => write!(f, "HTTP status"),
            ErrorKind::Transport => write!(f, "transport"),
            ErrorKind::Decode => write!(f, "decode"),
        }
    }
}

/// A failed request. Only `HttpStatus` failures carry a status code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    kind: ErrorKind,
    message: String,
    status_code: Option<u16>,
}

impl Failure {
    pub fn http_status(status_code: u16, reason: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::HttpStatus,
            message: reason.into(),
            status_code: Some(status_code),
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Transport,
            message: message.into(),
            status_code: None,
        }
    }

    pub fn decode(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Decode,
            message: message.into(),
            status_code: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status_code {
            Some(code) => write!(f, "HTTP {} {}", code, self.message),
            None => write!(f, "{} error: {}", self.kind, self.message),
        }
    }
}

impl std::error::Error for Failure {}

/// Result of [`RequestClient::send`](crate::http::RequestClient::send).
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseResult {
    Success(Success),
    Failure(Failure),
}

impl ResponseResult {
    pub fn is_success(&self) -> bool {
        matches!(self, ResponseResult::Success(_))
    }

    /// Status code of the response, if the remote answered at all.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ResponseResult::Success(success) => Some(success.status_code),
            ResponseResult::Failure(failure) => failure.status_code(),
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            ResponseResult::Failure(failure) => Some(failure),
            ResponseResult::Success(_) => None,
        }
    }

    pub fn into_result(self) -> Result<Success, Failure> {
        match self {
            ResponseResult::Success(success) => Ok(success),
            ResponseResult::Failure(failure) => Err(failure),
        }
    }
}

impl From<Failure> for ResponseResult {
    fn from(failure: Failure) -> Self {
        ResponseResult::Failure(failure)
    }
}

impl From<Success> for ResponseResult {
    fn from(success: Success) -> Self {
        ResponseResult::Success(success)
    }
}
