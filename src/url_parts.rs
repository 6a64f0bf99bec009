//! Decomposition of captured URLs into the pieces both synthesizers group by.

use crate::error::{Error, Result};
use indexmap::IndexMap;
use url::{form_urlencoded, Url};

/// An absolute URL split into server, path and query parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub scheme: String,
    /// `scheme://netloc`, including userinfo and an explicit non-default port
    pub host: String,
    /// Never empty; a bare host maps to `/`
    pub path: String,
    /// Query string without the leading `?`, `None` when absent or empty
    pub raw_query: Option<String>,
    /// Query values grouped by key, keys in first-appearance order
    pub query: IndexMap<String, Vec<String>>,
}

impl ParsedUrl {
    /// Parses an absolute URL.
    ///
    /// The URL is validated with [`Url::parse`], but host, path and query are
    /// taken from the text as captured: host case, explicit default ports and
    /// dot segments are kept, and the query is not re-encoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedInput`] for relative URLs, unparseable text and
    /// URLs without a host.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input)?;
        let text = input.trim();

        let (scheme, rest) = match text.split_once("://") {
            Some((scheme, rest)) if url.has_host() => (scheme, rest),
            _ => return Err(Error::malformed(format!("URL {:?} has no host", input))),
        };

        let netloc_end = rest.find(['/', '?', '#']).unwrap_or(rest.len());
        let (netloc, rest) = rest.split_at(netloc_end);
        if netloc.is_empty() {
            return Err(Error::malformed(format!("URL {:?} has no host", input)));
        }

        let rest = rest.split_once('#').map_or(rest, |(before, _)| before);
        let (path, raw_query) = match rest.split_once('?') {
            Some((path, query)) => (path, Some(query)),
            None => (rest, None),
        };
        let raw_query = raw_query.filter(|q| !q.is_empty()).map(str::to_string);

        let mut query: IndexMap<String, Vec<String>> = IndexMap::new();
        if let Some(raw) = &raw_query {
            for (key, value) in form_urlencoded::parse(raw.as_bytes()) {
                query
                    .entry(key.into_owned())
                    .or_default()
                    .push(value.into_owned());
            }
        }

        let scheme = scheme.to_ascii_lowercase();
        Ok(Self {
            host: format!("{}://{}", scheme, netloc),
            scheme,
            path: if path.is_empty() { "/".to_string() } else { path.to_string() },
            raw_query,
            query,
        })
    }

    /// Non-empty path segments, e.g. `/users//42/` gives `["users", "42"]`.
    pub fn path_segments(&self) -> Vec<String> {
        self.path
            .split('/')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    /// First value seen for each query key.
    pub fn first_values(&self) -> impl Iterator<Item = (&str, &str)> {
        self.query.iter().map(|(key, values)| {
            let first = values.first().map(String::as_str).unwrap_or_default();
            (key.as_str(), first)
        })
    }
}
