use crate::error::Result;
use crate::flow::FlowRecord;
use crate::url_parts::ParsedUrl;
use indexmap::IndexMap;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// OpenAPI document builder
///
/// Flows are added one at a time. The first flow seen for a `(path, method)`
/// pair defines the operation; later flows with the same pair only contribute
/// their server.
pub struct OpenApiBuilder {
    /// OpenAPI info section
    info: Info,
    /// Base URLs seen so far, kept sorted
    servers: BTreeSet<String>,
    /// Paths collection (URL path -> PathItem), in first-seen order
    paths: IndexMap<String, PathItem>,
}

/// Operations of a single path, keyed by lowercase HTTP method
pub type PathItem = IndexMap<String, Operation>;

/// OpenAPI Info object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Info {
    /// API title
    pub title: String,
    /// API description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// API version
    pub version: String,
}

/// OpenAPI Server object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    pub url: String,
}

/// OpenAPI Operation object - represents a single API operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Operation {
    /// Operation summary
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    /// Operation description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Query parameters of the defining flow
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Vec<Parameter>>,
    /// Responses keyed by status code
    pub responses: IndexMap<String, Response>,
}

/// OpenAPI Parameter object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Parameter name
    pub name: String,
    /// Parameter location, always `query` for captured flows
    #[serde(rename = "in")]
    pub location: String,
    /// Whether the parameter is required
    pub required: bool,
    /// Parameter schema
    pub schema: Schema,
}

/// Minimal OpenAPI Schema object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    #[serde(rename = "type")]
    pub schema_type: String,
}

/// OpenAPI Response object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Response description
    pub description: String,
}

/// Complete OpenAPI document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OpenApiDocument {
    /// OpenAPI version
    pub openapi: String,
    /// API info
    pub info: Info,
    /// Base URLs, sorted lexicographically
    pub servers: Vec<Server>,
    /// API paths
    pub paths: IndexMap<String, PathItem>,
}

impl OpenApiBuilder {
    /// Create a new OpenApiBuilder with default info
    pub fn new() -> Self {
        debug!("Initializing OpenApiBuilder");
        Self {
            info: Info {
                title: "Captured API".to_string(),
                description: Some("Generated from recorded HTTP traffic".to_string()),
                version: "1.0.0".to_string(),
            },
            servers: BTreeSet::new(),
            paths: IndexMap::new(),
        }
    }

    /// Set custom info for the API
    pub fn with_info(mut self, title: String, version: String, description: Option<String>) -> Self {
        self.info = Info {
            title,
            description,
            version,
        };
        self
    }

    /// Add a flow to the OpenAPI document
    ///
    /// Returns `true` if the flow defined a new operation and `false` if an
    /// operation for its path and method already existed.
    ///
    /// # Errors
    ///
    /// Returns an error if the flow URL is not an absolute URL.
    pub fn add_flow(&mut self, flow: &FlowRecord) -> Result<bool> {
        let url = ParsedUrl::parse(&flow.url)?;
        self.servers.insert(url.host.clone());

        let method = flow.method.to_lowercase();
        let path_item = self.paths.entry(url.path.clone()).or_default();

        if path_item.contains_key(&method) {
            debug!("Skipping duplicate operation: {} {}", flow.method, url.path);
            return Ok(false);
        }

        debug!("Adding operation: {} {}", flow.method, url.path);
        path_item.insert(method, Self::operation_for(flow, &url));
        Ok(true)
    }

    fn operation_for(flow: &FlowRecord, url: &ParsedUrl) -> Operation {
        let parameters: Vec<Parameter> = url
            .query
            .keys()
            .map(|name| Parameter {
                name: name.clone(),
                location: "query".to_string(),
                required: false,
                schema: Schema {
                    schema_type: "string".to_string(),
                },
            })
            .collect();

        let mut responses = IndexMap::new();
        responses.insert(
            "200".to_string(),
            Response {
                description: "Successful response".to_string(),
            },
        );
        if flow.status != 0 && flow.status != 200 {
            responses.insert(
                flow.status.to_string(),
                Response {
                    description: format!("Observed {} response", flow.status),
                },
            );
        }

        Operation {
            summary: Some(format!("{} {}", flow.method, url.path)),
            description: Some(format!("Observed {} {}", flow.method, flow.url)),
            parameters: if parameters.is_empty() {
                None
            } else {
                Some(parameters)
            },
            responses,
        }
    }

    /// Build the final OpenAPI document
    pub fn build(self) -> OpenApiDocument {
        debug!(
            "Building final OpenAPI document: {} paths, {} servers",
            self.paths.len(),
            self.servers.len()
        );

        OpenApiDocument {
            openapi: "3.0.0".to_string(),
            info: self.info,
            servers: self
                .servers
                .into_iter()
                .map(|url| Server { url })
                .collect(),
            paths: self.paths,
        }
    }
}

impl Default for OpenApiBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builds an OpenAPI document from already selected flows.
///
/// # Errors
///
/// Fails as a whole if any flow has a malformed URL; no partial document is returned.
pub fn synthesize_openapi(flows: &[FlowRecord]) -> Result<OpenApiDocument> {
    synthesize_openapi_with(OpenApiBuilder::new(), flows)
}

/// Like [`synthesize_openapi`], starting from a preconfigured builder.
pub fn synthesize_openapi_with(
    mut builder: OpenApiBuilder,
    flows: &[FlowRecord],
) -> Result<OpenApiDocument> {
    for flow in flows {
        builder.add_flow(flow)?;
    }
    Ok(builder.build())
}
