//! Remote JSON endpoint adapter.
//!
//! The endpoint must return a top-level array of flat objects. Columns are
//! the union of keys in first-seen order; objects missing a key contribute
//! an explicit null.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value as JsonValue;
use std::fmt;

use super::config::IngestConfig;
use super::inference::{parse_number, parse_timestamp};
use crate::error::{DqsError, Result};
use crate::frame::{ColumnKind, ColumnSchema, Frame, SourceKind, Value};

/// HTTP(S) endpoint returning JSON.
#[derive(Clone, PartialEq, Eq)]
pub struct EndpointSource {
    pub url: String,
    /// Extra request headers, sent in order
    pub headers: Vec<(String, String)>,
}

impl fmt::Debug for EndpointSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let header_names: Vec<&str> = self.headers.iter().map(|(k, _)| k.as_str()).collect();
        f.debug_struct("EndpointSource")
            .field("url", &crate::error::redact_database_url(&self.url))
            .field("headers", &header_names)
            .finish()
    }
}

impl EndpointSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            headers: Vec::new(),
        }
    }

    /// Builder method to add a request header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}

/// Fetches the endpoint and flattens its payload into a frame.
pub(crate) async fn load_endpoint(source: &EndpointSource, config: &IngestConfig) -> Result<Frame> {
    let url = url::Url::parse(&source.url)
        .map_err(|e| DqsError::fetch(format!("invalid endpoint URL: {}", e)))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(DqsError::fetch(format!(
            "unsupported URL scheme '{}'",
            url.scheme()
        )));
    }

    let mut headers = HeaderMap::new();
    for (raw_name, raw_value) in &source.headers {
        let name = HeaderName::from_bytes(raw_name.as_bytes()).map_err(|e| {
            DqsError::fetch(format!("invalid header name '{}': {}", raw_name, e))
        })?;
        let value = HeaderValue::from_str(raw_value).map_err(|e| {
            DqsError::fetch(format!("invalid value for header '{}': {}", raw_name, e))
        })?;
        headers.append(name, value);
    }

    let client = reqwest::Client::builder()
        .timeout(config.timeout())
        .default_headers(headers)
        .build()
        .map_err(|e| DqsError::fetch(format!("failed to build HTTP client: {}", e)))?;

    let redacted = crate::error::redact_database_url(&source.url);
    tracing::debug!("Fetching endpoint {}", redacted);

    let mut response = client.get(url).send().await.map_err(|e| {
        if e.is_timeout() {
            DqsError::fetch(format!("request to {} timed out", redacted))
        } else {
            DqsError::fetch(format!("request to {} failed: {}", redacted, e))
        }
    })?;

    let status = response.status();
    if !status.is_success() {
        return Err(DqsError::fetch(format!(
            "{} responded with HTTP {}",
            redacted, status
        )));
    }

    let mut body = Vec::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(|e| DqsError::fetch(format!("failed to read response body: {}", e)))?
    {
        if body.len().saturating_add(chunk.len()) > config.max_response_bytes {
            return Err(DqsError::fetch(format!(
                "response body exceeds {} bytes",
                config.max_response_bytes
            )));
        }
        body.extend_from_slice(&chunk);
    }

    let payload: JsonValue = serde_json::from_slice(&body)
        .map_err(|e| DqsError::shape(format!("response body is not valid JSON: {}", e)))?;

    frame_from_json(&payload, config)
}

/// Flattens a JSON array of flat objects into a frame.
///
/// # Errors
/// Returns `DqsError::Shape` if the payload is not an array, an element is
/// not an object, or a field holds a nested array or object.
pub fn frame_from_json(payload: &JsonValue, config: &IngestConfig) -> Result<Frame> {
    let elements = payload.as_array().ok_or_else(|| {
        DqsError::shape(format!(
            "expected a top-level JSON array, found {}",
            json_type_name(payload)
        ))
    })?;

    let mut names: Vec<String> = Vec::new();
    let mut objects = Vec::with_capacity(elements.len());
    for (index, element) in elements.iter().enumerate() {
        let object = element.as_object().ok_or_else(|| {
            DqsError::shape(format!(
                "element {} is {}, expected an object",
                index,
                json_type_name(element)
            ))
        })?;
        for (key, value) in object {
            if value.is_array() || value.is_object() {
                return Err(DqsError::shape(format!(
                    "element {} field '{}' is a nested {}",
                    index,
                    key,
                    json_type_name(value)
                )));
            }
            if !names.contains(key) {
                names.push(key.clone());
            }
        }
        objects.push(object);
    }

    let window = config.inference_window(objects.len());
    let mut columns = Vec::with_capacity(names.len());
    let mut cells: Vec<Vec<Value>> = vec![Vec::with_capacity(names.len()); objects.len()];

    for name in names {
        let kind = infer_json_kind(
            objects
                .iter()
                .take(window)
                .filter_map(|object| object.get(&name))
                .filter(|value| !value.is_null()),
        );

        let mut rejected = 0_usize;
        for (row, object) in cells.iter_mut().zip(&objects) {
            let value = match object.get(&name) {
                None | Some(JsonValue::Null) => Value::Null,
                Some(raw) => coerce_json(raw, kind).unwrap_or_else(|| {
                    rejected += 1;
                    Value::Null
                }),
            };
            row.push(value);
        }

        columns.push(ColumnSchema::new(name, kind).with_rejected_values(rejected));
    }

    tracing::debug!(
        "Flattened endpoint payload: {} columns, {} rows",
        columns.len(),
        cells.len()
    );

    Frame::new(columns, cells, SourceKind::Endpoint)
}

fn infer_json_kind<'a, I>(samples: I) -> ColumnKind
where
    I: IntoIterator<Item = &'a JsonValue>,
{
    let mut seen: Option<ColumnKind> = None;
    for value in samples {
        let kind = match value {
            JsonValue::Bool(_) => ColumnKind::Boolean,
            JsonValue::Number(_) => ColumnKind::Number,
            JsonValue::String(s) if parse_timestamp(s).is_some() => ColumnKind::Timestamp,
            _ => ColumnKind::String,
        };
        seen = match seen {
            None => Some(kind),
            Some(previous) if previous == kind => Some(previous),
            Some(_) => return ColumnKind::String,
        };
    }
    seen.unwrap_or(ColumnKind::String)
}

fn coerce_json(raw: &JsonValue, kind: ColumnKind) -> Option<Value> {
    match (kind, raw) {
        (ColumnKind::Boolean, JsonValue::Bool(b)) => Some(Value::Boolean(*b)),
        (ColumnKind::Number, JsonValue::Number(n)) => {
            n.as_f64().filter(|n| n.is_finite()).map(Value::Number)
        }
        (ColumnKind::Number, JsonValue::String(s)) => parse_number(s).map(Value::Number),
        (ColumnKind::Timestamp, JsonValue::String(s)) => parse_timestamp(s).map(Value::Timestamp),
        (ColumnKind::String, JsonValue::String(s)) => Some(Value::String(s.clone())),
        (ColumnKind::String, JsonValue::Number(n)) => Some(Value::String(n.to_string())),
        (ColumnKind::String, JsonValue::Bool(b)) => Some(Value::String(b.to_string())),
        _ => None,
    }
}
