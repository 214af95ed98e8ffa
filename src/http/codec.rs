//! Body encoding and decoding driven by the `Content-Type` header.

use anyhow::{Context, Result, bail};
use serde_json::Value;

use crate::request::{Headers, RequestBody};
use crate::response::Body;

pub const JSON: &str = "application/json";
pub const FORM_URLENCODED: &str = "application/x-www-form-urlencoded";
pub const TEXT_UTF8: &str = "text/plain; charset=utf-8";

/// Returns the lower-cased media type without parameters.
pub fn media_type(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

pub fn is_json(content_type: &str) -> bool {
    let media = media_type(content_type);
    media == JSON || media.ends_with("+json")
}

pub fn is_text(content_type: &str) -> bool {
    let media = media_type(content_type);
    media.starts_with("text/")
        || media == "application/xml"
        || media == "application/javascript"
        || media.ends_with("+xml")
        || content_type
            .split(';')
            .skip(1)
            .any(|param| param.trim().to_ascii_lowercase().starts_with("charset="))
}

fn is_form(content_type: &str) -> bool {
    media_type(content_type) == FORM_URLENCODED
}

/// Encodes a request body into wire bytes, filling in a default content type
/// where one is implied.
pub fn encode_body(body: RequestBody, headers: &mut Headers) -> Result<Vec<u8>> {
    match body {
        RequestBody::Bytes(bytes) => Ok(bytes),
        RequestBody::Text(text) => {
            if !headers.contains("content-type") {
                headers.insert("content-type", TEXT_UTF8);
            }
            Ok(text.into_bytes())
        }
        RequestBody::Json(value) => match headers.content_type().map(str::to_string) {
            None => {
                headers.insert("content-type", JSON);
                serde_json::to_vec(&value).context("Failed to serialize JSON body")
            }
            Some(ct) if is_json(&ct) => {
                serde_json::to_vec(&value).context("Failed to serialize JSON body")
            }
            Some(ct) if is_form(&ct) => {
                let Value::Object(fields) = value else {
                    bail!("Form body must be a JSON object, got {}", value);
                };
                // Null fields are omitted from the form.
                let fields: Vec<(String, Value)> =
                    fields.into_iter().filter(|(_, v)| !v.is_null()).collect();
                let encoded = serde_urlencoded::to_string(&fields)
                    .context("Form body must be a flat object of scalar values")?;
                Ok(encoded.into_bytes())
            }
            Some(ct) => match value {
                Value::String(text) => Ok(text.into_bytes()),
                other => bail!(
                    "Cannot encode structured body {} as content type {}",
                    other,
                    ct
                ),
            },
        },
    }
}

/// Decodes a successful response body according to its declared content type.
///
/// The error is a human-readable parse failure.
pub fn decode_body(headers: &Headers, bytes: Vec<u8>) -> Result<Body, String> {
    if bytes.is_empty() {
        return Ok(Body::NoContent);
    }

    let Some(content_type) = headers.content_type() else {
        return Ok(Body::Bytes(bytes));
    };

    if is_json(content_type) {
        serde_json::from_slice(&bytes)
            .map(Body::Json)
            .map_err(|e| format!("Invalid JSON response body: {}", e))
    } else if is_text(content_type) {
        String::from_utf8(bytes)
            .map(Body::Text)
            .map_err(|e| format!("Response declared {} but is not valid UTF-8: {}", content_type, e))
    } else {
        Ok(Body::Bytes(bytes))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn headers_with(content_type: &str) -> Headers {
        [("Content-Type", content_type)].into_iter().collect()
    }

    #[test]
    fn test_media_type() {
        assert_eq!(media_type("Application/JSON; charset=utf-8"), "application/json");
        assert_eq!(media_type("text/html"), "text/html");
    }

    #[test]
    fn test_is_json() {
        assert!(is_json("application/json"));
        assert!(is_json("application/json; charset=utf-8"));
        assert!(is_json("application/problem+json"));
        assert!(!is_json("text/json-ish"));
        assert!(!is_json("text/plain"));
    }

    #[test]
    fn test_is_text() {
        assert!(is_text("text/html"));
        assert!(is_text("application/xml"));
        assert!(is_text("application/atom+xml"));
        assert!(is_text("application/x-custom; charset=latin1"));
        assert!(!is_text("application/octet-stream"));
        assert!(!is_text("image/png"));
    }

    #[test]
    fn test_encode_json_sets_default_content_type() {
        let mut headers = Headers::new();
        let bytes = encode_body(RequestBody::Json(json!({"a": 1})), &mut headers).unwrap();
        assert_eq!(bytes, br#"{"a":1}"#);
        assert_eq!(headers.content_type(), Some(JSON));
    }

    #[test]
    fn test_encode_json_keeps_declared_json_content_type() {
        let mut headers = headers_with("application/vnd.api+json");
        let bytes = encode_body(RequestBody::Json(json!([1, 2])), &mut headers).unwrap();
        assert_eq!(bytes, b"[1,2]");
        assert_eq!(headers.content_type(), Some("application/vnd.api+json"));
    }

    #[test]
    fn test_encode_graphql_payload() {
        let mut headers = Headers::new();
        let bytes = encode_body(
            RequestBody::Json(json!({"query": "{ users { name email } }"})),
            &mut headers,
        )
        .unwrap();
        assert_eq!(bytes, br#"{"query":"{ users { name email } }"}"#);
    }

    #[test]
    fn test_encode_form_rejects_nested_and_non_object() {
        let mut headers = headers_with(FORM_URLENCODED);
        assert!(encode_body(RequestBody::Json(json!({"a": {"b": 1}})), &mut headers).is_err());
        assert!(encode_body(RequestBody::Json(json!([1])), &mut headers).is_err());
    }

    #[test]
    fn test_encode_form_skips_null_fields() {
        let mut headers = headers_with(FORM_URLENCODED);
        let bytes = encode_body(
            RequestBody::Json(json!({"a": 1, "b": true, "c": null})),
            &mut headers,
        )
        .unwrap();
        assert_eq!(bytes, b"a=1&b=true");
    }

    #[test]
    fn test_encode_string_value_as_other_content_type() {
        let mut headers = headers_with("text/csv");
        let bytes =
            encode_body(RequestBody::Json(json!("a,b\n1,2")), &mut headers).unwrap();
        assert_eq!(bytes, b"a,b\n1,2");

        assert!(encode_body(RequestBody::Json(json!({"a": 1})), &mut headers).is_err());
    }

    #[test]
    fn test_encode_text_and_bytes() {
        let mut headers = Headers::new();
        encode_body(RequestBody::Text("hi".into()), &mut headers).unwrap();
        assert_eq!(headers.content_type(), Some(TEXT_UTF8));

        let mut headers = Headers::new();
        let bytes = encode_body(RequestBody::Bytes(vec![0, 159, 146]), &mut headers).unwrap();
        assert_eq!(bytes, vec![0, 159, 146]);
        assert!(headers.content_type().is_none());
    }

    #[test]
    fn test_decode_empty_is_no_content() {
        let body = decode_body(&headers_with(JSON), Vec::new()).unwrap();
        assert_eq!(body, Body::NoContent);
        assert_eq!(decode_body(&Headers::new(), Vec::new()).unwrap(), Body::NoContent);
    }

    #[test]
    fn test_decode_json() {
        let body = decode_body(&headers_with("application/json"), br#"{"ok":true}"#.to_vec())
            .unwrap();
        assert_eq!(body, Body::Json(json!({"ok": true})));
    }

    #[test]
    fn test_decode_malformed_json() {
        let err = decode_body(&headers_with("application/json"), b"{not json".to_vec())
            .unwrap_err();
        assert!(err.contains("Invalid JSON"));
    }

    #[test]
    fn test_decode_text_and_invalid_utf8() {
        let body = decode_body(&headers_with("text/plain"), b"hello".to_vec()).unwrap();
        assert_eq!(body, Body::Text("hello".to_string()));

        assert!(decode_body(&headers_with("text/plain"), vec![0xff, 0xfe]).is_err());
    }

    #[test]
    fn test_decode_unknown_or_missing_type_is_bytes() {
        let body = decode_body(&headers_with("image/png"), vec![1, 2, 3]).unwrap();
        assert_eq!(body, Body::Bytes(vec![1, 2, 3]));

        let body = decode_body(&Headers::new(), b"{}".to_vec()).unwrap();
        assert_eq!(body, Body::Bytes(b"{}".to_vec()));
    }
}
