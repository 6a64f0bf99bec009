//! Postman Collection v2.1 model and synthesis from captured flows.
//!
//! Every distinct host in the selected flows becomes a collection variable. Hosts
//! are sorted before naming, so the lexicographically first host is always
//! `baseUrl`, the next `baseUrl2`, and so on, whatever order the flows arrive in.

use crate::clock::{collection_token, Clock};
use crate::error::{Error, Result};
use crate::flow::FlowRecord;
use crate::url_parts::ParsedUrl;
use log::debug;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Schema URL identifying Postman Collection v2.1 documents.
pub const POSTMAN_SCHEMA: &str =
    "https://schema.getpostman.com/json/collection/v2.1.0/collection.json";

/// Captured request headers that are never copied into a collection.
pub const HEADER_DENYLIST: [&str; 4] = ["host", "connection", "accept-encoding", "content-length"];

/// Name of the first host variable.
pub const BASE_URL_VARIABLE: &str = "baseUrl";

/// Complete Postman collection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanCollection {
    pub info: CollectionInfo,
    pub item: Vec<RequestItem>,
    pub variable: Vec<Variable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionInfo {
    #[serde(rename = "_postman_id")]
    pub postman_id: String,
    pub name: String,
    pub description: String,
    pub schema: String,
}

impl CollectionInfo {
    pub fn new(name: impl Into<String>, description: impl Into<String>, clock: &dyn Clock) -> Self {
        Self {
            postman_id: collection_token(clock),
            name: name.into(),
            description: description.into(),
            schema: POSTMAN_SCHEMA.to_string(),
        }
    }
}

/// A single saved request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestItem {
    pub name: String,
    pub request: PostmanRequest,
    /// Saved example responses, always empty
    pub response: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanRequest {
    pub method: String,
    pub header: Vec<Header>,
    pub url: PostmanUrl,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    pub key: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostmanUrl {
    pub raw: String,
    pub host: Vec<String>,
    pub path: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Vec<QueryParam>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryParam {
    pub key: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disabled: Option<bool>,
}

/// Raw request body
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Body {
    pub mode: String,
    pub raw: String,
    pub options: BodyOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BodyOptions {
    pub raw: RawBodyOptions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawBodyOptions {
    pub language: String,
}

impl Body {
    /// An empty JSON object body.
    pub fn empty_json() -> Self {
        Self {
            mode: "raw".to_string(),
            raw: "{}".to_string(),
            options: BodyOptions {
                raw: RawBodyOptions {
                    language: "json".to_string(),
                },
            },
        }
    }
}

/// Collection variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Variable {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub variable_type: String,
}

impl Variable {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            variable_type: "string".to_string(),
        }
    }
}

/// Wraps a variable name in Postman's `{{...}}` placeholder syntax.
pub fn placeholder(name: &str) -> String {
    format!("{{{{{}}}}}", name)
}

/// Host to variable name table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HostVariables {
    names: BTreeMap<String, String>,
}

impl HostVariables {
    /// Assigns `baseUrl`, `baseUrl2`, ... to the distinct hosts in sorted order.
    pub fn from_hosts<I, S>(hosts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut names: BTreeMap<String, String> =
            hosts.into_iter().map(|h| (h.into(), String::new())).collect();

        for (index, name) in names.values_mut().enumerate() {
            *name = if index == 0 {
                BASE_URL_VARIABLE.to_string()
            } else {
                format!("{}{}", BASE_URL_VARIABLE, index + 1)
            };
        }
        Self { names }
    }

    pub fn name_for(&self, host: &str) -> Option<&str> {
        self.names.get(host).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Collection variables in sorted host order.
    pub fn variables(&self) -> Vec<Variable> {
        self.names
            .iter()
            .map(|(host, name)| Variable::string(name.clone(), host.clone()))
            .collect()
    }
}

fn is_denied_header(name: &str) -> bool {
    HEADER_DENYLIST
        .iter()
        .any(|denied| denied.eq_ignore_ascii_case(name))
}

fn request_item(flow: &FlowRecord, url: &ParsedUrl, variable: &str) -> RequestItem {
    let host = placeholder(variable);

    let mut raw = format!("{}{}", host, url.path);
    if let Some(query) = &url.raw_query {
        raw.push('?');
        raw.push_str(query);
    }

    let query: Vec<QueryParam> = url
        .first_values()
        .map(|(key, value)| QueryParam {
            key: key.to_string(),
            value: value.to_string(),
            disabled: None,
        })
        .collect();

    let header = flow
        .request
        .headers
        .iter()
        .filter(|(name, _)| !is_denied_header(name))
        .map(|(name, value)| Header {
            key: name.clone(),
            value: value.clone(),
        })
        .collect();

    RequestItem {
        name: format!("{} {}", flow.method, url.path),
        request: PostmanRequest {
            method: flow.method.clone(),
            header,
            url: PostmanUrl {
                raw,
                host: vec![host],
                path: url.path_segments(),
                query: if query.is_empty() { None } else { Some(query) },
            },
            body: None,
        },
        response: Vec::new(),
    }
}

/// Builds a Postman collection from already selected flows, one item per flow.
///
/// # Errors
///
/// Fails as a whole if any flow has a malformed URL.
pub fn synthesize_postman(flows: &[FlowRecord], clock: &dyn Clock) -> Result<PostmanCollection> {
    let parsed = flows
        .iter()
        .map(|flow| ParsedUrl::parse(&flow.url).map(|url| (flow, url)))
        .collect::<Result<Vec<_>>>()?;

    let hosts = HostVariables::from_hosts(parsed.iter().map(|(_, url)| url.host.clone()));
    debug!("Assigned {} host variables", hosts.len());

    let mut item = Vec::with_capacity(parsed.len());
    for (flow, url) in &parsed {
        let variable = hosts
            .name_for(&url.host)
            .ok_or_else(|| Error::malformed(format!("no variable for host {}", url.host)))?;
        item.push(request_item(flow, url, variable));
    }

    Ok(PostmanCollection {
        info: CollectionInfo::new(
            "Captured API Collection",
            "Requests recorded from HTTP traffic",
            clock,
        ),
        item,
        variable: hosts.variables(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::flow::{RawFlow, RawRequest};
    use indexmap::IndexMap;
    use pretty_assertions::assert_eq;

    fn flow(method: &str, url: &str) -> FlowRecord {
        FlowRecord::from_raw(RawFlow {
            method: method.to_string(),
            url: url.to_string(),
            ..Default::default()
        })
    }

    fn flow_with_headers(url: &str, headers: &[(&str, &str)]) -> FlowRecord {
        let headers: IndexMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        FlowRecord::from_raw(RawFlow {
            method: "GET".to_string(),
            url: url.to_string(),
            request: RawRequest {
                headers,
                content_length: 0,
            },
            ..Default::default()
        })
    }

    #[test]
    fn test_placeholder() {
        assert_eq!(placeholder("baseUrl"), "{{baseUrl}}");
    }

    #[test]
    fn test_host_variables_sorted_not_first_seen() {
        let flows = vec![flow("GET", "http://b.test/x"), flow("GET", "http://a.test/y")];
        let collection = synthesize_postman(&flows, &FixedClock::at_unix(0)).unwrap();

        assert_eq!(
            collection.variable,
            vec![
                Variable::string("baseUrl", "http://a.test"),
                Variable::string("baseUrl2", "http://b.test"),
            ]
        );
        // items keep flow order and point at the sorted names
        assert_eq!(collection.item[0].request.url.host, vec!["{{baseUrl2}}"]);
        assert_eq!(collection.item[1].request.url.host, vec!["{{baseUrl}}"]);
    }

    #[test]
    fn test_shared_host_shares_variable() {
        let flows = vec![
            flow("GET", "http://c.test/1"),
            flow("GET", "http://a.test/2"),
            flow("POST", "http://c.test/3"),
        ];
        let collection = synthesize_postman(&flows, &FixedClock::at_unix(0)).unwrap();

        assert_eq!(collection.variable.len(), 2);
        assert_eq!(collection.item[0].request.url.host, collection.item[2].request.url.host);
        assert_eq!(collection.item[0].request.url.host, vec!["{{baseUrl2}}"]);
    }

    #[test]
    fn test_host_variables_numbering() {
        let hosts = HostVariables::from_hosts(["http://c", "http://a", "http://b", "http://a"]);

        assert_eq!(hosts.len(), 3);
        assert_eq!(hosts.name_for("http://a"), Some("baseUrl"));
        assert_eq!(hosts.name_for("http://b"), Some("baseUrl2"));
        assert_eq!(hosts.name_for("http://c"), Some("baseUrl3"));
        assert_eq!(hosts.name_for("http://d"), None);
    }

    #[test]
    fn test_item_url_fields() {
        let flows = vec![flow("GET", "https://api.test/v1/users?limit=5&tag=a&tag=b")];
        let collection = synthesize_postman(&flows, &FixedClock::at_unix(0)).unwrap();
        let item = &collection.item[0];

        assert_eq!(item.name, "GET /v1/users");
        assert_eq!(item.request.method, "GET");
        assert_eq!(item.request.url.raw, "{{baseUrl}}/v1/users?limit=5&tag=a&tag=b");
        assert_eq!(item.request.url.path, vec!["v1", "users"]);
        assert_eq!(
            item.request.url.query,
            Some(vec![
                QueryParam {
                    key: "limit".to_string(),
                    value: "5".to_string(),
                    disabled: None,
                },
                QueryParam {
                    key: "tag".to_string(),
                    value: "a".to_string(),
                    disabled: None,
                },
            ])
        );
        assert!(item.response.is_empty());
        assert!(item.request.body.is_none());
    }

    #[test]
    fn test_query_omitted_when_absent() {
        let collection =
            synthesize_postman(&[flow("DELETE", "http://api.test")], &FixedClock::at_unix(0))
                .unwrap();
        let item = &collection.item[0];

        assert_eq!(item.name, "DELETE /");
        assert_eq!(item.request.url.raw, "{{baseUrl}}/");
        assert!(item.request.url.path.is_empty());
        assert!(item.request.url.query.is_none());

        let json = serde_json::to_value(item).unwrap();
        assert!(json["request"]["url"].get("query").is_none());
    }

    #[test]
    fn test_denied_headers_dropped_case_insensitively() {
        let flows = vec![flow_with_headers(
            "http://api.test/x",
            &[
                ("Host", "api.test"),
                ("Accept", "application/json"),
                ("CONNECTION", "keep-alive"),
                ("Accept-Encoding", "gzip"),
                ("content-length", "0"),
                ("Authorization", "Bearer t"),
            ],
        )];
        let collection = synthesize_postman(&flows, &FixedClock::at_unix(0)).unwrap();

        let keys: Vec<&str> = collection.item[0]
            .request
            .header
            .iter()
            .map(|h| h.key.as_str())
            .collect();
        assert_eq!(keys, vec!["Accept", "Authorization"]);
    }

    #[test]
    fn test_info_uses_clock() {
        let collection = synthesize_postman(&[], &FixedClock::at_unix(1_700_000_000)).unwrap();

        assert_eq!(collection.info.postman_id, "flowspec-1700000000000");
        assert_eq!(collection.info.schema, POSTMAN_SCHEMA);
        assert!(collection.item.is_empty());
        assert!(collection.variable.is_empty());

        let json = serde_json::to_value(&collection).unwrap();
        assert_eq!(json["info"]["_postman_id"], "flowspec-1700000000000");
    }

    #[test]
    fn test_duplicates_are_not_collapsed() {
        let flows = vec![flow("GET", "http://api.test/x"), flow("GET", "http://api.test/x")];
        let collection = synthesize_postman(&flows, &FixedClock::at_unix(0)).unwrap();
        assert_eq!(collection.item.len(), 2);
    }

    #[test]
    fn test_raw_url_keeps_captured_query() {
        let flows = vec![
            flow("GET", "http://API.test:80/a/../users?q=a b"),
            flow("GET", "http://api.test/users"),
        ];
        let collection = synthesize_postman(&flows, &FixedClock::at_unix(0)).unwrap();

        assert_eq!(collection.item[0].request.url.raw, "{{baseUrl}}/a/../users?q=a b");
        assert_eq!(collection.item[0].request.url.path, vec!["a", "..", "users"]);
        assert_eq!(collection.variable.len(), 2);
    }

    #[test]
    fn test_malformed_url_fails() {
        let flows = vec![flow("GET", "http://api.test/x"), flow("GET", "/relative")];
        let err = synthesize_postman(&flows, &FixedClock::at_unix(0)).unwrap_err();
        assert!(matches!(err, Error::MalformedInput(_)));
    }

    #[test]
    fn test_fixed_clock_gives_identical_bytes() {
        let flows = vec![
            flow("GET", "http://b.test/users?active=true"),
            flow("POST", "http://a.test/orders"),
        ];
        let clock = FixedClock::at_unix(1_700_000_000);

        let first = serde_json::to_string(&synthesize_postman(&flows, &clock).unwrap()).unwrap();
        let second = serde_json::to_string(&synthesize_postman(&flows, &clock).unwrap()).unwrap();
        assert_eq!(first, second);
    }
}
