//! Captured flow records and their normalization.
//!
//! The capture job writes a JSON array of loosely typed records: any field may be
//! missing, `status` is `null` when no response was recorded, and `timestamp` may be
//! a string or a number. This module resolves all of that once, at the boundary, into
//! [`FlowRecord`] values whose fields are always present.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use log::{debug, info};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::Path;

/// Number of hex characters kept from the flow fingerprint.
pub const STABLE_ID_LEN: usize = 12;

/// A flow record as written by the capture job.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawFlow {
    #[serde(deserialize_with = "lenient_string")]
    pub method: String,
    #[serde(deserialize_with = "lenient_string")]
    pub url: String,
    #[serde(deserialize_with = "lenient_string")]
    pub timestamp: String,
    #[serde(deserialize_with = "lenient_status")]
    pub status: u16,
    #[serde(deserialize_with = "null_as_default")]
    pub request: RawRequest,
    #[serde(deserialize_with = "null_as_default")]
    pub response: RawResponse,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawRequest {
    #[serde(deserialize_with = "lenient_headers")]
    pub headers: IndexMap<String, String>,
    #[serde(deserialize_with = "lenient_length")]
    pub content_length: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawResponse {
    #[serde(deserialize_with = "lenient_status")]
    pub status_code: u16,
    #[serde(deserialize_with = "lenient_string")]
    pub content_type: String,
    #[serde(deserialize_with = "lenient_length")]
    pub content_length: u64,
}

/// A normalized flow with its stable identifier.
///
/// A `status` of `0` means no response was captured.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FlowRecord {
    pub id: String,
    pub method: String,
    pub url: String,
    pub timestamp: String,
    pub status: u16,
    pub request: RequestInfo,
    pub response: ResponseInfo,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RequestInfo {
    pub headers: IndexMap<String, String>,
    pub content_length: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ResponseInfo {
    pub status_code: u16,
    pub content_type: String,
    pub content_length: u64,
}

/// Computes the fingerprint of a flow from its method, URL and timestamp.
///
/// The same triple always yields the same identifier. Truncation to
/// [`STABLE_ID_LEN`] hex characters means distinct triples can collide.
pub fn stable_id(method: &str, url: &str, timestamp: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(method.as_bytes());
    hasher.update(b":");
    hasher.update(url.as_bytes());
    hasher.update(b":");
    hasher.update(timestamp.as_bytes());

    let mut digest = format!("{:x}", hasher.finalize());
    digest.truncate(STABLE_ID_LEN);
    digest
}

impl FlowRecord {
    /// Normalizes a raw record. Never fails: every field already has a default.
    pub fn from_raw(raw: RawFlow) -> Self {
        let id = stable_id(&raw.method, &raw.url, &raw.timestamp);
        Self {
            id,
            method: raw.method,
            url: raw.url,
            timestamp: raw.timestamp,
            status: raw.status,
            request: RequestInfo {
                headers: raw.request.headers,
                content_length: raw.request.content_length,
            },
            response: ResponseInfo {
                status_code: raw.response.status_code,
                content_type: raw.response.content_type,
                content_length: raw.response.content_length,
            },
        }
    }
}

/// Parses a JSON flow document into normalized records, preserving order.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the text is not a JSON array of objects or
/// a field has a type that cannot be coerced.
pub fn parse_flows(json: &str) -> Result<Vec<FlowRecord>> {
    if json.trim().is_empty() {
        debug!("Flow document is blank, treating as empty");
        return Ok(Vec::new());
    }

    let raw: Vec<RawFlow> = serde_json::from_str(json)
        .map_err(|e| Error::malformed(format!("flow document: {}", e)))?;

    Ok(raw.into_iter().map(FlowRecord::from_raw).collect())
}

/// Reads and normalizes the flow source at `path`.
///
/// # Errors
///
/// Returns [`Error::MissingInput`] when the file does not exist, so callers can
/// treat it as an empty capture rather than a failure.
pub fn load_flows(path: &Path) -> Result<Vec<FlowRecord>> {
    if !path.exists() {
        return Err(Error::MissingInput(path.to_path_buf()));
    }

    debug!("Reading flows from {}", path.display());
    let content = fs::read_to_string(path)?;
    let flows = parse_flows(&content)?;
    info!("Loaded {} flows from {}", flows.len(), path.display());
    Ok(flows)
}

fn value_to_string(value: Value) -> Option<String> {
    match value {
        Value::Null => Some(String::new()),
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    value_to_string(value).ok_or_else(|| D::Error::custom("expected a string"))
}

fn lenient_status<'de, D>(deserializer: D) -> std::result::Result<u16, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .and_then(|code| u16::try_from(code).ok())
            .ok_or_else(|| D::Error::custom(format!("invalid status code {}", n))),
        Value::String(s) if s.is_empty() => Ok(0),
        Value::String(s) => s
            .parse()
            .map_err(|_| D::Error::custom(format!("invalid status code {:?}", s))),
        other => Err(D::Error::custom(format!("invalid status code {}", other))),
    }
}

fn lenient_length<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(0),
        Value::Number(n) => n
            .as_u64()
            .ok_or_else(|| D::Error::custom(format!("invalid content length {}", n))),
        other => Err(D::Error::custom(format!("invalid content length {}", other))),
    }
}

fn lenient_headers<'de, D>(
    deserializer: D,
) -> std::result::Result<IndexMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<IndexMap<String, Value>> = Option::deserialize(deserializer)?;
    let mut headers = IndexMap::new();
    for (name, value) in raw.unwrap_or_default() {
        let value = value_to_string(value)
            .ok_or_else(|| D::Error::custom(format!("header {} is not a scalar", name)))?;
        headers.insert(name, value);
    }
    Ok(headers)
}

fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
