//! Serialization module for converting generated documents to YAML or JSON format.
//!
//! This module provides functions to serialize OpenAPI documents and Postman collections
//! into standard formats, to read documents supplied by users, and to write output to files.

use crate::error::{Error, Result};
use clap::ValueEnum;
use log::debug;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::Path;

/// Output format options
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    /// JSON format
    Json,
    /// YAML format
    Yaml,
}

impl OutputFormat {
    /// File extension for documents written in this format.
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Json => "json",
            OutputFormat::Yaml => "yaml",
        }
    }

    /// Serializes a document in this format.
    pub fn serialize<T: Serialize>(&self, document: &T) -> Result<String> {
        match self {
            OutputFormat::Json => serialize_json(document),
            OutputFormat::Yaml => serialize_yaml(document),
        }
    }
}

/// Serializes a document to YAML format.
///
/// The output is formatted as standard YAML, suitable for use with OpenAPI tools
/// and documentation generators.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use flowspec::openapi_builder::OpenApiBuilder;
/// use flowspec::serializer::serialize_yaml;
///
/// let doc = OpenApiBuilder::new().build();
/// let yaml = serialize_yaml(&doc).unwrap();
/// assert!(yaml.contains("openapi:"));
/// ```
pub fn serialize_yaml<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to YAML");
    Ok(serde_yaml::to_string(doc)?)
}

/// Serializes a document to JSON format with pretty printing.
///
/// The output is formatted with indentation for readability, making it suitable
/// for human review and version control.
///
/// # Errors
///
/// Returns an error if serialization fails.
///
/// # Example
///
/// ```
/// use flowspec::openapi_builder::OpenApiBuilder;
/// use flowspec::serializer::serialize_json;
///
/// let doc = OpenApiBuilder::new().build();
/// let json = serialize_json(&doc).unwrap();
/// assert!(json.contains("\"openapi\": \"3.0.0\""));
/// ```
pub fn serialize_json<T: Serialize>(doc: &T) -> Result<String> {
    debug!("Serializing document to JSON");
    Ok(serde_json::to_string_pretty(doc)?)
}

/// Parses a JSON or YAML document.
///
/// Text starting with `{` or `[` is read as JSON, anything else as YAML.
///
/// # Errors
///
/// Returns [`Error::MalformedInput`] if the text cannot be parsed into `T`.
pub fn parse_document<T: DeserializeOwned>(text: &str) -> Result<T> {
    let trimmed = text.trim_start();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        debug!("Parsing document as JSON");
        serde_json::from_str(trimmed).map_err(|e| Error::malformed(format!("JSON document: {}", e)))
    } else {
        debug!("Parsing document as YAML");
        serde_yaml::from_str(trimmed).map_err(|e| Error::malformed(format!("YAML document: {}", e)))
    }
}

/// Writes string content to a file.
///
/// Creates the file if it doesn't exist, or overwrites it if it does.
/// Parent directories are created as needed.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written to.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(path, content)?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
