use anyhow::{Context, Result, bail};
use log::debug;
use serde_json::Value;
use std::io::Write;
use std::path::Path;

use crate::{
    graphql,
    http::{RequestClient, RetryPolicy, Transport, send_with_retry},
    request::{Method, RequestSpec},
    response::{Body, Success},
};

/// Body source given on the command line.
#[derive(Debug, Clone, PartialEq)]
pub enum Data {
    /// JSON text, or `@path` to read JSON from a file.
    Json(String),
    /// Sent verbatim as text.
    Raw(String),
}

/// Parses a `Name: Value` header argument.
pub fn parse_header(raw: &str) -> Result<(String, String)> {
    let Some((name, value)) = raw.split_once(':') else {
        bail!("Invalid header '{}'. Expected 'Name: Value'.", raw);
    };
    let name = name.trim();
    if name.is_empty() {
        bail!("Invalid header '{}': empty name", raw);
    }
    Ok((name.to_string(), value.trim().to_string()))
}

/// Reads JSON from the argument itself or, for `@path`, from a file.
pub fn load_json(raw: &str) -> Result<Value> {
    let text = match raw.strip_prefix('@') {
        Some(path) => std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read data file {}", path))?,
        None => raw.to_string(),
    };
    serde_json::from_str(&text).with_context(|| format!("Invalid JSON data: {}", text.trim()))
}

/// Builds the request for `fetchr send`.
pub fn build_send_spec(
    url: &str,
    method: Method,
    headers: &[String],
    data: Option<Data>,
) -> Result<RequestSpec> {
    let mut builder = RequestSpec::builder(method, url);
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        builder = builder.header(name, value);
    }
    builder = match data {
        Some(Data::Json(raw)) => builder.json(load_json(&raw)?),
        Some(Data::Raw(text)) => builder.text(text),
        None => builder,
    };
    builder.build()
}

/// Builds the request for `fetchr graphql`.
pub fn build_graphql_spec(
    url: &str,
    query: &str,
    variables: Option<&str>,
    headers: &[String],
) -> Result<RequestSpec> {
    let variables = variables.map(load_json).transpose()?;
    let mut builder = graphql::builder(url, query, variables)?;
    for raw in headers {
        let (name, value) = parse_header(raw)?;
        builder = builder.header(name, value);
    }
    builder.build()
}

/// Sends `spec` and writes the response to `out`. A failed request is
/// returned as an error.
#[tracing::instrument(skip(client, spec, policy, out))]
pub async fn send<T: Transport>(
    client: &RequestClient<T>,
    spec: RequestSpec,
    policy: &RetryPolicy,
    include_headers: bool,
    out: &mut dyn Write,
) -> Result<()> {
    debug!("Sending {} {}", spec.method(), spec.target());
    let success = send_with_retry(client, &spec, policy)
        .await
        .into_result()?;
    render(&success, include_headers, out)
}

/// Writes a successful response: optional status line and headers, then the body.
pub fn render(success: &Success, include_headers: bool, out: &mut dyn Write) -> Result<()> {
    if include_headers {
        writeln!(out, "HTTP {}", success.status_code)?;
        for (name, value) in success.headers.iter() {
            writeln!(out, "{}: {}", name, value)?;
        }
        writeln!(out)?;
    }

    match &success.body {
        Body::NoContent => {}
        Body::Json(value) => writeln!(out, "{}", serde_json::to_string_pretty(value)?)?,
        Body::Text(text) => {
            write!(out, "{}", text)?;
            if !text.ends_with('\n') {
                writeln!(out)?;
            }
        }
        Body::Bytes(bytes) => out.write_all(bytes)?,
    }
    out.flush()?;
    Ok(())
}
