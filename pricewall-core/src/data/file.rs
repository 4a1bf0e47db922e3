//! Snapshot provider backed by a JSON file on disk.
//!
//! The file holds one full snapshot in the wire format. It is re-read on
//! every fetch so edits show up on the next refresh.

use std::path::{Path, PathBuf};

use super::http::parse_body;
use super::provider::{DataError, SnapshotProvider};
use crate::domain::{ScopeKey, Snapshot, SnapshotMeta};

#[derive(Debug, Clone)]
pub struct FileProvider {
    path: PathBuf,
}

impl FileProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Snapshot, DataError> {
        let body = std::fs::read_to_string(&self.path)
            .map_err(|e| DataError::Io(format!("{}: {e}", self.path.display())))?;
        parse_body(&body)
    }
}

impl SnapshotProvider for FileProvider {
    fn name(&self) -> &str {
        "file"
    }

    fn fetch_meta(&self) -> Result<SnapshotMeta, DataError> {
        Ok(self.read()?.to_meta())
    }

    fn fetch_snapshot(&self, scope: &ScopeKey) -> Result<Snapshot, DataError> {
        let snapshot = self.read()?;
        if scope.is_empty() {
            Ok(snapshot)
        } else {
            Ok(snapshot.restricted_to(scope))
        }
    }

    fn is_available(&self) -> bool {
        self.path.is_file()
    }
}
