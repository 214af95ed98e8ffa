//! Outgoing request description.
//!
//! A [`RequestSpec`] is assembled through [`RequestSpecBuilder`], which
//! validates the URL and headers and encodes the body up front. Once built,
//! a `RequestSpec` is immutable and already holds the exact bytes that go on the wire.

use anyhow::{Context, Result, bail};
use reqwest::Url;
use reqwest::header::{HeaderName, HeaderValue};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use crate::http::codec;

/// HTTP request method.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Method {
    #[default]
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Method {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(Method::Get),
            "POST" => Ok(Method::Post),
            "PUT" => Ok(Method::Put),
            "PATCH" => Ok(Method::Patch),
            "DELETE" => Ok(Method::Delete),
            "HEAD" => Ok(Method::Head),
            "OPTIONS" => Ok(Method::Options),
            _ => bail!(
                "Unknown HTTP method: {}. Expected GET, POST, PUT, PATCH, DELETE, HEAD or OPTIONS.",
                s
            ),
        }
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
            Method::Head => reqwest::Method::HEAD,
            Method::Options => reqwest::Method::OPTIONS,
        }
    }
}

/// Case-insensitive header map. Names are stored lower-cased and a repeated
/// name replaces the earlier value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
        self.0
            .insert(name.as_ref().to_ascii_lowercase(), value.into());
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn content_type(&self) -> Option<&str> {
        self.get("content-type")
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name, value);
        }
        headers
    }
}

/// Request payload before wire encoding.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    /// Opaque bytes, sent verbatim.
    Bytes(Vec<u8>),
    /// UTF-8 text.
    Text(String),
    /// Structured value, encoded according to the declared content type.
    Json(Value),
}

/// Where a request is sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    /// Absolute `http`/`https` URL.
    Absolute(Url),
    /// Path resolved against the client's base URL, e.g. `/api/getData`.
    Relative(String),
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Target::Absolute(url) => write!(f, "{}", url),
            Target::Relative(path) => write!(f, "{}", path),
        }
    }
}

impl FromStr for Target {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            bail!("Request URL must not be empty");
        }
        if s.starts_with("//") {
            bail!(
                "Scheme-relative URL {} is not allowed. Use an absolute http(s) URL or a /path.",
                s
            );
        }
        if s.starts_with('/') {
            return Ok(Target::Relative(s.to_string()));
        }
        let url = Url::parse(s).with_context(|| format!("Invalid request URL: {}", s))?;
        match url.scheme() {
            "http" | "https" => Ok(Target::Absolute(url)),
            other => bail!(
                "Unsupported URL scheme '{}' in {}. Expected http or https.",
                other,
                s
            ),
        }
    }
}

/// Immutable description of one outgoing HTTP request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestSpec {
    method: Method,
    target: Target,
    headers: Headers,
    body: Option<Vec<u8>>,
    timeout: Option<Duration>,
}

impl RequestSpec {
    pub fn builder(method: Method, url: impl Into<String>) -> RequestSpecBuilder {
        RequestSpecBuilder {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            timeout: None,
        }
    }

    /// A plain GET with no headers and no body.
    pub fn get(url: impl Into<String>) -> Result<Self> {
        Self::builder(Method::Get, url).build()
    }

    /// A POST carrying `value` as JSON.
    pub fn post_json(url: impl Into<String>, value: Value) -> Result<Self> {
        Self::builder(Method::Post, url).json(value).build()
    }

    pub fn method(&self) -> Method {
        self.method
    }

    pub fn target(&self) -> &Target {
        &self.target
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    /// Encoded body bytes, if the request has a body.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }
}

/// Builder for [`RequestSpec`].
#[derive(Debug, Clone)]
pub struct RequestSpecBuilder {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
    timeout: Option<Duration>,
}

impl RequestSpecBuilder {
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: RequestBody) -> Self {
        self.body = Some(body);
        self
    }

    pub fn json(self, value: Value) -> Self {
        self.body(RequestBody::Json(value))
    }

    pub fn text(self, text: impl Into<String>) -> Self {
        self.body(RequestBody::Text(text.into()))
    }

    pub fn bytes(self, bytes: impl Into<Vec<u8>>) -> Self {
        self.body(RequestBody::Bytes(bytes.into()))
    }

    /// Sends `value`'s fields URL-encoded as a form.
    pub fn form(self, value: Value) -> Self {
        self.header("Content-Type", codec::FORM_URLENCODED)
            .json(value)
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn timeout_ms(self, millis: u64) -> Self {
        self.timeout(Duration::from_millis(millis))
    }

    /// Validates the request and encodes its body.
    ///
    /// Errors here are caller defects (bad URL, bad header, a body that cannot
    /// be expressed in the declared content type), never runtime conditions.
    pub fn build(self) -> Result<RequestSpec> {
        let target: Target = self.url.parse()?;

        let mut headers = Headers::new();
        for (name, value) in &self.headers {
            HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("Invalid header name: {:?}", name))?;
            HeaderValue::from_str(value)
                .with_context(|| format!("Invalid value for header {}: {:?}", name, value))?;
            headers.insert(name, value.clone());
        }

        let body = match self.body {
            Some(body) => Some(codec::encode_body(body, &mut headers)?),
            None => None,
        };

        Ok(RequestSpec {
            method: self.method,
            target,
            headers,
            body,
            timeout: self.timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_method_parse_is_case_insensitive() {
        assert_eq!("Get".parse::<Method>().unwrap(), Method::Get);
        assert_eq!("post".parse::<Method>().unwrap(), Method::Post);
        assert_eq!("DELETE".parse::<Method>().unwrap(), Method::Delete);
        assert!("FETCH".parse::<Method>().is_err());
    }

    #[test]
    fn test_method_display() {
        assert_eq!(Method::Patch.to_string(), "PATCH");
        assert_eq!(reqwest::Method::from(Method::Head), reqwest::Method::HEAD);
    }

    #[test]
    fn test_headers_last_write_wins() {
        let mut headers = Headers::new();
        headers.insert("X-Trace", "one");
        headers.insert("x-trace", "two");
        assert_eq!(headers.len(), 1);
        assert_eq!(headers.get("X-TRACE"), Some("two"));
    }

    #[test]
    fn test_builder_duplicate_headers_last_write_wins() {
        let spec = RequestSpec::builder(Method::Get, "https://api.example.com")
            .header("Accept", "text/plain")
            .header("accept", "application/json")
            .build()
            .unwrap();
        assert_eq!(spec.headers().get("Accept"), Some("application/json"));
        assert_eq!(spec.headers().len(), 1);
    }

    #[test]
    fn test_target_parsing() {
        assert!(matches!(
            "https://api.example.com".parse::<Target>().unwrap(),
            Target::Absolute(_)
        ));
        assert_eq!(
            "/api/getData".parse::<Target>().unwrap(),
            Target::Relative("/api/getData".to_string())
        );
        assert!("".parse::<Target>().is_err());
        assert!("   ".parse::<Target>().is_err());
        assert!("api.example.com".parse::<Target>().is_err());
        assert!("wss://example.com/socket".parse::<Target>().is_err());
    }

    #[test]
    fn test_target_rejects_scheme_relative() {
        let err = "//other.host/x".parse::<Target>().unwrap_err();
        assert!(err.to_string().contains("Scheme-relative"));
        assert!(
            RequestSpec::get("//other.host/x").is_err(),
            "a path must not be able to leave the base URL's host"
        );
    }

    #[test]
    fn test_build_rejects_missing_url() {
        let err = RequestSpec::builder(Method::Get, "").build().unwrap_err();
        assert!(err.to_string().contains("must not be empty"));
    }

    #[test]
    fn test_build_rejects_invalid_header() {
        let result = RequestSpec::builder(Method::Get, "https://api.example.com")
            .header("Bad Header", "x")
            .build();
        assert!(result.is_err());

        let result = RequestSpec::builder(Method::Get, "https://api.example.com")
            .header("X-Ok", "line\nbreak")
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_json_body_defaults_content_type() {
        let spec = RequestSpec::post_json("https://api.example.com", json!({"ok": true})).unwrap();
        assert_eq!(spec.method(), Method::Post);
        assert_eq!(spec.headers().content_type(), Some("application/json"));
        assert_eq!(spec.body(), Some(br#"{"ok":true}"#.as_slice()));
    }

    #[test]
    fn test_get_has_no_body() {
        let spec = RequestSpec::get("https://api.example.com").unwrap();
        assert_eq!(spec.method(), Method::Get);
        assert!(spec.body().is_none());
        assert!(spec.headers().is_empty());
        assert!(spec.timeout().is_none());
    }

    #[test]
    fn test_form_body() {
        let spec = RequestSpec::builder(Method::Post, "/login")
            .form(json!({"user": "ada", "lang": "en us"}))
            .build()
            .unwrap();
        assert_eq!(
            spec.headers().content_type(),
            Some("application/x-www-form-urlencoded")
        );
        assert_eq!(spec.body(), Some(b"lang=en+us&user=ada".as_slice()));
    }

    #[test]
    fn test_timeout_ms() {
        let spec = RequestSpec::builder(Method::Get, "https://api.example.com")
            .timeout_ms(50)
            .build()
            .unwrap();
        assert_eq!(spec.timeout(), Some(Duration::from_millis(50)));
    }
}
