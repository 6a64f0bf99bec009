//! On-disk storage of generated documents.
//!
//! Each document is written twice: under a timestamped name, and under a fixed
//! `latest` alias that is overwritten on every generation. Concurrent writers of
//! the same alias are not coordinated; the last one wins.

use crate::clock::{file_stamp, Clock};
use crate::error::{Error, Result};
use crate::serializer::{write_to_file, OutputFormat};
use log::{debug, info, warn};
use std::fs;
use std::path::{Path, PathBuf};

/// The kinds of documents the store holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactKind {
    /// OpenAPI document synthesized from flows
    OpenApi,
    /// Postman collection synthesized from flows
    Postman,
    /// Postman collection converted from a user-supplied OpenAPI document
    ConvertedPostman,
}

impl ArtifactKind {
    pub fn prefix(&self) -> &'static str {
        match self {
            ArtifactKind::OpenApi => "openapi",
            ArtifactKind::Postman => "postman_collection",
            ArtifactKind::ConvertedPostman => "converted_postman",
        }
    }
}

/// Directory-backed artifact store.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Name of the alias that always holds the newest document of a kind.
    pub fn latest_name(kind: ArtifactKind, format: OutputFormat) -> String {
        format!("{}_latest.{}", kind.prefix(), format.extension())
    }

    /// Writes `content` under a timestamped name and the `latest` alias.
    ///
    /// Returns the timestamped file name.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if either file cannot be written. No timestamped
    /// file is left behind when the alias cannot be updated.
    pub fn persist(
        &self,
        kind: ArtifactKind,
        format: OutputFormat,
        content: &str,
        clock: &dyn Clock,
    ) -> Result<String> {
        let name = format!(
            "{}_{}.{}",
            kind.prefix(),
            file_stamp(clock),
            format.extension()
        );

        let stamped = self.dir.join(&name);
        write_to_file(content, &stamped)?;
        if let Err(err) = write_to_file(content, &self.dir.join(Self::latest_name(kind, format))) {
            warn!("Failed to update latest alias, removing {}", stamped.display());
            if let Err(cleanup) = fs::remove_file(&stamped) {
                warn!("Failed to remove {}: {}", stamped.display(), cleanup);
            }
            return Err(err);
        }

        info!("Saved {} to {}", name, self.dir.display());
        Ok(name)
    }

    /// Reads an artifact by file name.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ArtifactNotFound`] for unknown names and for names that
    /// would resolve outside the store directory.
    pub fn read(&self, name: &str) -> Result<Vec<u8>> {
        if name.is_empty() || name.contains(['/', '\\']) || name.contains("..") {
            debug!("Rejecting artifact name {:?}", name);
            return Err(Error::ArtifactNotFound(name.to_string()));
        }

        let path = self.dir.join(name);
        if !path.is_file() {
            return Err(Error::ArtifactNotFound(name.to_string()));
        }

        Ok(fs::read(path)?)
    }
}
