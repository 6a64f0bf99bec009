//! Selection of the flows that take part in a generation call.

use crate::flow::FlowRecord;
use clap::ValueEnum;
use log::debug;
use std::collections::HashSet;

/// Markers that flag a URL as a static asset.
///
/// Matched as plain substrings anywhere in the URL, so `/data.jsonx` and
/// `/x.pngx` are excluded too.
pub const STATIC_ASSET_MARKERS: [&str; 10] = [
    ".js", ".css", ".png", ".jpg", ".gif", ".ico", ".svg", ".woff", ".woff2", ".ttf",
];

/// Returns `true` if the URL contains any static asset marker.
pub fn is_static_asset(url: &str) -> bool {
    STATIC_ASSET_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Filters flows by static asset exclusion, then by the ID allow-list.
///
/// An empty `ids` set keeps every non-static flow. Relative order is preserved.
pub fn select(flows: &[FlowRecord], ids: &HashSet<String>) -> Vec<FlowRecord> {
    let selected: Vec<FlowRecord> = flows
        .iter()
        .filter(|flow| !is_static_asset(&flow.url))
        .filter(|flow| ids.is_empty() || ids.contains(&flow.id))
        .cloned()
        .collect();

    debug!(
        "Selected {} of {} flows ({} requested IDs)",
        selected.len(),
        flows.len(),
        ids.len()
    );
    selected
}

/// Response status buckets used when browsing flows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusClass {
    #[value(name = "2xx")]
    Success,
    #[value(name = "3xx")]
    Redirect,
    #[value(name = "4xx")]
    ClientError,
    /// 500 and above
    #[value(name = "5xx")]
    ServerError,
    /// No status was captured
    #[value(name = "none")]
    Missing,
}

impl StatusClass {
    pub fn matches(&self, status: u16) -> bool {
        match self {
            StatusClass::Success => (200..300).contains(&status),
            StatusClass::Redirect => (300..400).contains(&status),
            StatusClass::ClientError => (400..500).contains(&status),
            StatusClass::ServerError => status >= 500,
            StatusClass::Missing => status == 0,
        }
    }
}

/// Narrows a flow listing by method, status class and URL text.
///
/// Unset criteria match everything. The method comparison ignores ASCII case
/// and the search text is a case-insensitive substring of the URL.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlowFilter {
    pub method: Option<String>,
    pub status: Option<StatusClass>,
    pub search: Option<String>,
}

impl FlowFilter {
    pub fn is_empty(&self) -> bool {
        self.method.is_none() && self.status.is_none() && self.search_text().is_none()
    }

    fn search_text(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|q| !q.is_empty())
            .map(str::to_lowercase)
    }

    pub fn matches(&self, flow: &FlowRecord) -> bool {
        let method_ok = self
            .method
            .as_deref()
            .map_or(true, |method| method.eq_ignore_ascii_case(&flow.method));
        let status_ok = self.status.map_or(true, |class| class.matches(flow.status));
        let search_ok = self
            .search_text()
            .map_or(true, |query| flow.url.to_lowercase().contains(&query));

        method_ok && status_ok && search_ok
    }

    /// Keeps the matching flows in their original order.
    pub fn apply(&self, flows: Vec<FlowRecord>) -> Vec<FlowRecord> {
        if self.is_empty() {
            return flows;
        }
        let total = flows.len();
        let kept: Vec<FlowRecord> = flows.into_iter().filter(|f| self.matches(f)).collect();
        debug!("Filter {:?} kept {} of {} flows", self, kept.len(), total);
        kept
    }
}
