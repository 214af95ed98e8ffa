//! GraphQL over HTTP: a POST carrying `{"query": ...}` as JSON.
//!
//! Only the request payload is shaped here. The response is an ordinary
//! JSON body and is not interpreted.

use anyhow::{Context, Result, bail};
use serde::Serialize;
use serde_json::Value;

use crate::request::{Method, RequestSpec, RequestSpecBuilder};

/// Wire shape of a GraphQL request.
#[derive(Serialize, Debug)]
struct Payload<'a> {
    query: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    variables: Option<Value>,
}

/// Starts a GraphQL request to `endpoint`. Add headers or a timeout to the
/// returned builder before calling `build`.
pub fn builder(
    endpoint: impl Into<String>,
    query: &str,
    variables: Option<Value>,
) -> Result<RequestSpecBuilder> {
    if query.trim().is_empty() {
        bail!("GraphQL query must not be empty");
    }

    if let Some(variables) = variables.as_ref().filter(|v| !v.is_object()) {
        bail!("GraphQL variables must be a JSON object, got {}", variables);
    }

    let payload = serde_json::to_value(Payload { query, variables })
        .context("Failed to serialize GraphQL payload")?;
    Ok(RequestSpec::builder(Method::Post, endpoint)
        .header("Accept", "application/json")
        .json(payload))
}

/// Builds a GraphQL request to `endpoint`.
pub fn request(
    endpoint: impl Into<String>,
    query: &str,
    variables: Option<Value>,
) -> Result<RequestSpec> {
    builder(endpoint, query, variables)?.build()
}
