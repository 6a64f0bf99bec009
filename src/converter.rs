//! Conversion of an existing OpenAPI document into a Postman collection.
//!
//! The source document is read leniently: only servers, info, and the operations
//! under `paths` are looked at, and unknown keys are ignored.

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::postman::{
    placeholder, Body, CollectionInfo, Header, PostmanCollection, PostmanRequest, PostmanUrl,
    QueryParam, RequestItem, Variable, BASE_URL_VARIABLE,
};
use crate::serializer::parse_document;
use indexmap::IndexMap;
use log::{debug, info};
use serde::Deserialize;
use serde_json::Value;

/// Base URL used when the document declares no server.
pub const FALLBACK_BASE_URL: &str = "http://localhost";

/// Path item keys that are converted; anything else under a path is skipped.
pub const SUPPORTED_METHODS: [&str; 7] = ["get", "post", "put", "delete", "patch", "head", "options"];

/// The parts of an OpenAPI document the converter reads.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct OpenApiSource {
    pub info: Option<SourceInfo>,
    pub servers: Vec<SourceServer>,
    pub paths: IndexMap<String, IndexMap<String, Value>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceInfo {
    pub title: Option<String>,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SourceServer {
    pub url: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SourceOperation {
    summary: Option<String>,
    #[serde(rename = "operationId")]
    operation_id: Option<String>,
    parameters: Vec<SourceParameter>,
    #[serde(rename = "requestBody")]
    request_body: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct SourceParameter {
    name: String,
    #[serde(rename = "in")]
    location: String,
}

impl OpenApiSource {
    /// Reads a JSON or YAML OpenAPI document.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] if the text cannot be parsed or the
    /// `paths` section has the wrong shape.
    pub fn from_text(text: &str) -> Result<Self> {
        parse_document(text)
    }

    /// First declared server URL, or [`FALLBACK_BASE_URL`].
    pub fn base_url(&self) -> &str {
        self.servers
            .first()
            .map(|s| s.url.as_str())
            .filter(|url| !url.is_empty())
            .unwrap_or(FALLBACK_BASE_URL)
    }
}

/// Rewrites OpenAPI `{param}` segments into Postman `:param` segments.
fn postman_segment(segment: &str) -> String {
    match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
        Some(name) => format!(":{}", name),
        None => segment.to_string(),
    }
}

fn parse_parameters(value: Option<&Value>, path: &str) -> Result<Vec<SourceParameter>> {
    match value {
        None => Ok(Vec::new()),
        Some(value) => Vec::<SourceParameter>::deserialize(value).map_err(|e| {
            Error::malformed(format!("parameters of {}: {}", path, e))
        }),
    }
}

fn convert_operation(
    path: &str,
    method: &str,
    operation: SourceOperation,
    shared_parameters: &[SourceParameter],
) -> RequestItem {
    let segments: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(postman_segment)
        .collect();
    let host = placeholder(BASE_URL_VARIABLE);
    let raw = format!("{}/{}", host, segments.join("/"));

    let mut query: Vec<QueryParam> = Vec::new();
    for parameter in shared_parameters.iter().chain(operation.parameters.iter()) {
        if parameter.location != "query" || query.iter().any(|q| q.key == parameter.name) {
            continue;
        }
        query.push(QueryParam {
            key: parameter.name.clone(),
            value: String::new(),
            disabled: Some(true),
        });
    }

    let has_body = matches!(operation.request_body, Some(ref body) if !body.is_null());
    let (header, body) = if has_body {
        (
            vec![Header {
                key: "Content-Type".to_string(),
                value: "application/json".to_string(),
            }],
            Some(Body::empty_json()),
        )
    } else {
        (Vec::new(), None)
    };

    let method = method.to_uppercase();
    let name = operation
        .summary
        .filter(|s| !s.is_empty())
        .or(operation.operation_id.filter(|s| !s.is_empty()))
        .unwrap_or_else(|| format!("{} {}", method, path));

    RequestItem {
        name,
        request: PostmanRequest {
            method,
            header,
            url: PostmanUrl {
                raw,
                host: vec![host],
                path: segments,
                query: if query.is_empty() { None } else { Some(query) },
            },
            body,
        },
        response: Vec::new(),
    }
}

/// Converts an OpenAPI document into a Postman collection with a single `baseUrl` variable.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if an operation or parameter list has the wrong shape.
pub fn convert_openapi(source: &OpenApiSource, clock: &dyn Clock) -> Result<PostmanCollection> {
    let mut item = Vec::new();

    for (path, path_item) in &source.paths {
        let shared_parameters = parse_parameters(path_item.get("parameters"), path)?;

        for (method, operation) in path_item {
            if !SUPPORTED_METHODS.contains(&method.as_str()) {
                debug!("Skipping non-operation key {} under {}", method, path);
                continue;
            }

            let operation = SourceOperation::deserialize(operation)
                .map_err(|e| Error::malformed(format!("{} {}: {}", method, path, e)))?;
            item.push(convert_operation(path, method, operation, &shared_parameters));
        }
    }

    info!("Converted {} operations into Postman requests", item.len());

    let source_info = source.info.clone().unwrap_or_default();
    Ok(PostmanCollection {
        info: CollectionInfo::new(
            source_info.title.unwrap_or_else(|| "Converted API".to_string()),
            source_info
                .description
                .unwrap_or_else(|| "Converted from an OpenAPI document".to_string()),
            clock,
        ),
        item,
        variable: vec![Variable::string(BASE_URL_VARIABLE, source.base_url())],
    })
}
