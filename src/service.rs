//! Generation calls with I/O at the boundary.
//!
//! A [`Generator`] reads the flow source, runs the pure selection and synthesis
//! steps, and persists the result. Every call reports a [`GenerationOutcome`];
//! nothing is written unless synthesis and serialization both succeeded.

use crate::artifacts::{ArtifactKind, ArtifactStore};
use crate::clock::{Clock, SystemClock};
use crate::converter::{convert_openapi, OpenApiSource};
use crate::error::{Error, Result};
use crate::flow::{load_flows, FlowRecord};
use crate::openapi_builder::{synthesize_openapi_with, OpenApiBuilder};
use crate::postman::synthesize_postman;
use crate::selector::{select, FlowFilter};
use crate::serializer::{serialize_json, OutputFormat};
use log::{info, warn};
use serde::Serialize;
use std::collections::HashSet;
use std::path::PathBuf;

/// Structured result of a generation call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationOutcome {
    pub success: bool,
    pub message: String,
    /// Timestamped artifact name, present on success
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    /// Flows or operations that went into the document
    pub count: usize,
}

impl GenerationOutcome {
    fn succeeded(message: String, file: String, count: usize) -> Self {
        Self {
            success: true,
            message,
            file: Some(file),
            count,
        }
    }

    fn failed(err: &Error) -> Self {
        warn!("Generation failed: {}", err);
        Self {
            success: false,
            message: err.to_string(),
            file: None,
            count: 0,
        }
    }
}

/// Flows available for selection.
#[derive(Debug, Clone, Serialize)]
pub struct FlowListing {
    pub flows: Vec<FlowRecord>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Runs generation calls against one flow source and one artifact store.
pub struct Generator<C: Clock = SystemClock> {
    flows_path: PathBuf,
    store: ArtifactStore,
    clock: C,
    title: Option<String>,
}

impl Generator<SystemClock> {
    pub fn new(flows_path: impl Into<PathBuf>, store: ArtifactStore) -> Self {
        Self::with_clock(flows_path, store, SystemClock)
    }
}

impl<C: Clock> Generator<C> {
    pub fn with_clock(flows_path: impl Into<PathBuf>, store: ArtifactStore, clock: C) -> Self {
        Self {
            flows_path: flows_path.into(),
            store,
            clock,
            title: None,
        }
    }

    /// Overrides the title of generated OpenAPI documents.
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn store(&self) -> &ArtifactStore {
        &self.store
    }

    /// Loads the flow source. A missing source is an empty capture, reported
    /// through the returned note.
    fn load(&self) -> Result<(Vec<FlowRecord>, Option<String>)> {
        match load_flows(&self.flows_path) {
            Ok(flows) => Ok((flows, None)),
            Err(err @ Error::MissingInput(_)) => {
                warn!("{}", err);
                Ok((Vec::new(), Some(format!("{}; nothing captured yet", err))))
            }
            Err(err) => Err(err),
        }
    }

    /// Lists the non-static flows with their stable IDs.
    ///
    /// # Errors
    ///
    /// Fails if the flow source exists but cannot be read or parsed.
    pub fn list_flows(&self) -> Result<FlowListing> {
        self.list_matching(&FlowFilter::default())
    }

    /// Lists the non-static flows that pass `filter`.
    ///
    /// # Errors
    ///
    /// Fails if the flow source exists but cannot be read or parsed.
    pub fn list_matching(&self, filter: &FlowFilter) -> Result<FlowListing> {
        let (flows, message) = self.load()?;
        let flows = filter.apply(select(&flows, &HashSet::new()));
        info!("Listing {} flows", flows.len());
        Ok(FlowListing { flows, message })
    }

    /// Generates and stores an OpenAPI document from the selected flows.
    pub fn generate_openapi(&self, ids: &HashSet<String>, format: OutputFormat) -> GenerationOutcome {
        self.try_generate_openapi(ids, format)
            .unwrap_or_else(|err| GenerationOutcome::failed(&err))
    }

    fn try_generate_openapi(
        &self,
        ids: &HashSet<String>,
        format: OutputFormat,
    ) -> Result<GenerationOutcome> {
        let (flows, note) = self.load()?;
        let selected = select(&flows, ids);

        let mut builder = OpenApiBuilder::new();
        if let Some(title) = &self.title {
            builder = builder.with_info(
                title.clone(),
                "1.0.0".to_string(),
                Some("Generated from recorded HTTP traffic".to_string()),
            );
        }
        let document = synthesize_openapi_with(builder, &selected)?;
        let operations: usize = document.paths.values().map(|item| item.len()).sum();

        let content = format.serialize(&document)?;
        let file = self
            .store
            .persist(ArtifactKind::OpenApi, format, &content, &self.clock)?;

        let message = with_note(
            format!(
                "OpenAPI generated from {} flows ({} operations)",
                selected.len(),
                operations
            ),
            note,
        );
        Ok(GenerationOutcome::succeeded(message, file, selected.len()))
    }

    /// Generates and stores a Postman collection from the selected flows.
    pub fn generate_postman(&self, ids: &HashSet<String>) -> GenerationOutcome {
        self.try_generate_postman(ids)
            .unwrap_or_else(|err| GenerationOutcome::failed(&err))
    }

    fn try_generate_postman(&self, ids: &HashSet<String>) -> Result<GenerationOutcome> {
        let (flows, note) = self.load()?;
        let selected = select(&flows, ids);

        let collection = synthesize_postman(&selected, &self.clock)?;
        let content = serialize_json(&collection)?;
        let file = self
            .store
            .persist(ArtifactKind::Postman, OutputFormat::Json, &content, &self.clock)?;

        let message = with_note(
            format!(
                "Postman collection generated with {} requests across {} hosts",
                collection.item.len(),
                collection.variable.len()
            ),
            note,
        );
        Ok(GenerationOutcome::succeeded(message, file, collection.item.len()))
    }

    /// Converts a JSON or YAML OpenAPI document and stores the Postman collection.
    pub fn convert(&self, document: &str) -> GenerationOutcome {
        self.try_convert(document)
            .unwrap_or_else(|err| GenerationOutcome::failed(&err))
    }

    fn try_convert(&self, document: &str) -> Result<GenerationOutcome> {
        let source = OpenApiSource::from_text(document)?;
        let collection = convert_openapi(&source, &self.clock)?;
        let content = serialize_json(&collection)?;
        let file = self.store.persist(
            ArtifactKind::ConvertedPostman,
            OutputFormat::Json,
            &content,
            &self.clock,
        )?;

        let message = format!(
            "Converted {} operations into a Postman collection",
            collection.item.len()
        );
        Ok(GenerationOutcome::succeeded(message, file, collection.item.len()))
    }

    /// Reads a stored artifact by file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactNotFound`] if no such artifact exists.
    pub fn download(&self, name: &str) -> Result<Vec<u8>> {
        self.store.read(name)
    }
}

fn with_note(message: String, note: Option<String>) -> String {
    match note {
        Some(note) => format!("{} ({})", message, note),
        None => message,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::flow::stable_id;
    use std::fs;
    use tempfile::TempDir;

    const FLOWS: &str = r#"[
        {"method": "GET", "url": "http://b.test/users?active=true", "status": 200, "timestamp": "1"},
        {"method": "GET", "url": "http://b.test/app.js", "status": 200, "timestamp": "2"},
        {"method": "POST", "url": "http://a.test/orders", "status": 201, "timestamp": "3"}
    ]"#;

    fn generator(temp_dir: &TempDir, flows: Option<&str>) -> Generator<FixedClock> {
        let flows_path = temp_dir.path().join("flows.json");
        if let Some(content) = flows {
            fs::write(&flows_path, content).unwrap();
        }
        Generator::with_clock(
            flows_path,
            ArtifactStore::new(temp_dir.path().join("output")),
            FixedClock::at_unix(1_700_000_000),
        )
    }

    #[test]
    fn test_list_flows_skips_static_assets() {
        let temp_dir = TempDir::new().unwrap();
        let listing = generator(&temp_dir, Some(FLOWS)).list_flows().unwrap();

        assert_eq!(listing.flows.len(), 2);
        assert_eq!(
            listing.flows[0].id,
            stable_id("GET", "http://b.test/users?active=true", "1")
        );
        assert!(listing.message.is_none());
    }

    #[test]
    fn test_list_matching_applies_filter() {
        use crate::selector::StatusClass;

        let temp_dir = TempDir::new().unwrap();
        let service = generator(&temp_dir, Some(FLOWS));
        let filter = FlowFilter {
            status: Some(StatusClass::Success),
            search: Some("ORDERS".to_string()),
            ..Default::default()
        };

        let listing = service.list_matching(&filter).unwrap();
        let urls: Vec<&str> = listing.flows.iter().map(|f| f.url.as_str()).collect();
        assert_eq!(urls, vec!["http://a.test/orders"]);
    }

    #[test]
    fn test_missing_source_lists_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let listing = generator(&temp_dir, None).list_flows().unwrap();

        assert!(listing.flows.is_empty());
        assert!(listing.message.unwrap().contains("No flow source found"));
    }

    #[test]
    fn test_generate_openapi_persists() {
        let temp_dir = TempDir::new().unwrap();
        let service = generator(&temp_dir, Some(FLOWS));

        let outcome = service.generate_openapi(&HashSet::new(), OutputFormat::Json);
        assert!(outcome.success, "{}", outcome.message);
        assert_eq!(outcome.count, 2);
        assert_eq!(outcome.file.as_deref(), Some("openapi_20231114_221320.json"));

        let latest = service.download("openapi_latest.json").unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&latest).unwrap();
        assert_eq!(doc["servers"][0]["url"], "http://a.test");
        assert_eq!(doc["servers"][1]["url"], "http://b.test");
    }

    #[test]
    fn test_generate_openapi_with_title_and_yaml() {
        let temp_dir = TempDir::new().unwrap();
        let service = generator(&temp_dir, Some(FLOWS)).with_title("Shop API");

        let outcome = service.generate_openapi(&HashSet::new(), OutputFormat::Yaml);
        assert!(outcome.success);

        let latest = String::from_utf8(service.download("openapi_latest.yaml").unwrap()).unwrap();
        assert!(latest.contains("title: Shop API"));
    }

    #[test]
    fn test_generate_postman_with_selection() {
        let temp_dir = TempDir::new().unwrap();
        let service = generator(&temp_dir, Some(FLOWS));
        let ids: HashSet<String> = [stable_id("POST", "http://a.test/orders", "3")]
            .into_iter()
            .collect();

        let outcome = service.generate_postman(&ids);
        assert!(outcome.success);
        assert_eq!(outcome.count, 1);

        let latest = service.download("postman_collection_latest.json").unwrap();
        let doc: serde_json::Value = serde_json::from_slice(&latest).unwrap();
        assert_eq!(doc["item"][0]["name"], "POST /orders");
        assert_eq!(doc["variable"][0]["value"], "http://a.test");
    }

    #[test]
    fn test_malformed_source_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let service = generator(&temp_dir, Some("{\"not\": \"an array\"}"));

        let outcome = service.generate_openapi(&HashSet::new(), OutputFormat::Json);
        assert!(!outcome.success);
        assert!(outcome.message.starts_with("Malformed input"));
        assert!(outcome.file.is_none());
        assert!(!service.store().dir().exists());
    }

    #[test]
    fn test_failure_keeps_previous_artifacts() {
        let temp_dir = TempDir::new().unwrap();
        let service = generator(&temp_dir, Some(FLOWS));
        assert!(service.generate_postman(&HashSet::new()).success);
        let before = service.download("postman_collection_latest.json").unwrap();

        fs::write(
            temp_dir.path().join("flows.json"),
            r#"[{"method": "GET", "url": "relative/path"}]"#,
        )
        .unwrap();
        let outcome = service.generate_postman(&HashSet::new());

        assert!(!outcome.success);
        assert_eq!(service.download("postman_collection_latest.json").unwrap(), before);
    }

    #[test]
    fn test_missing_source_generates_empty_document() {
        let temp_dir = TempDir::new().unwrap();
        let outcome = generator(&temp_dir, None).generate_openapi(&HashSet::new(), OutputFormat::Json);

        assert!(outcome.success);
        assert_eq!(outcome.count, 0);
        assert!(outcome.message.contains("nothing captured yet"));
    }

    #[test]
    fn test_convert_persists_collection() {
        let temp_dir = TempDir::new().unwrap();
        let service = generator(&temp_dir, None);

        let outcome = service.convert(
            r#"{"servers": [{"url": "http://x"}], "paths": {"/ping": {"get": {"summary": "Ping"}}}}"#,
        );
        assert!(outcome.success);
        assert_eq!(outcome.count, 1);
        assert!(service.download("converted_postman_latest.json").is_ok());

        let outcome = service.convert("paths: [");
        assert!(!outcome.success);
    }

    #[test]
    fn test_outcome_serialization() {
        let outcome = GenerationOutcome::failed(&Error::ArtifactNotFound("x".to_string()));
        let json = serde_json::to_value(&outcome).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["message"], "Artifact not found: x");
        assert!(json.get("file").is_none());
    }
}
