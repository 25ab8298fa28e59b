//! Host document abstraction
//!
//! The host stores structured metadata as a flat list of XML parts, each
//! with an opaque id. Parts can be listed, added and deleted; there is no
//! in-place update.

use crate::error::{FileError, PersistenceError, PersistenceResult};
use crate::file_handler::{read_file_sync, write_file_atomic_sync};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// One structured-metadata fragment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlPart {
    pub id: String,
    pub xml: String,
}

impl XmlPart {
    /// New part with a fresh GUID-style id
    pub fn new(xml: impl Into<String>) -> Self {
        Self {
            id: format!("{{{}}}", Uuid::new_v4()).to_uppercase(),
            xml: xml.into(),
        }
    }
}

/// Structured-metadata access to a host document
pub trait HostDocument {
    /// All parts currently in the document
    fn parts(&self) -> PersistenceResult<Vec<XmlPart>>;

    /// Insert a part, returning its id
    fn add_part(&mut self, xml: &str) -> PersistenceResult<String>;

    /// Remove a part by id
    fn delete_part(&mut self, id: &str) -> PersistenceResult<()>;

    /// Replace the document's native view with rendered HTML
    ///
    /// Hosts without a native view ignore this.
    fn set_body(&mut self, _html: &str) -> PersistenceResult<()> {
        Ok(())
    }
}

/// Document held entirely in memory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InMemoryDocument {
    parts: Vec<XmlPart>,
}

impl InMemoryDocument {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.parts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parts.is_empty()
    }
}

impl HostDocument for InMemoryDocument {
    fn parts(&self) -> PersistenceResult<Vec<XmlPart>> {
        Ok(self.parts.clone())
    }

    fn add_part(&mut self, xml: &str) -> PersistenceResult<String> {
        let part = XmlPart::new(xml);
        let id = part.id.clone();
        self.parts.push(part);
        Ok(id)
    }

    fn delete_part(&mut self, id: &str) -> PersistenceResult<()> {
        let before = self.parts.len();
        self.parts.retain(|p| p.id != id);
        if self.parts.len() == before {
            return Err(PersistenceError::Host(format!("no part with id {}", id)));
        }
        Ok(())
    }
}

/// On-disk contents of a [`DocumentFile`]
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct DocumentData {
    /// Derived native view (rendered HTML); never read back as source
    #[serde(default)]
    body: String,
    #[serde(default)]
    parts: InMemoryDocument,
}

/// Host document stored as a JSON container file
///
/// Every mutation is flushed immediately, like a live host document.
#[derive(Debug)]
pub struct DocumentFile {
    path: PathBuf,
    data: DocumentData,
}

impl DocumentFile {
    /// Open an existing container or start an empty one at `path`
    pub fn open(path: impl AsRef<Path>) -> PersistenceResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = read_file_sync(&path)?.content;
            serde_json::from_str(&raw).map_err(|e| FileError::InvalidDocument {
                path: path.clone(),
                source: e,
            })?
        } else {
            DocumentData::default()
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Native view of the document
    pub fn body(&self) -> &str {
        &self.data.body
    }

    fn flush(&self) -> PersistenceResult<()> {
        let json = serde_json::to_string_pretty(&self.data).map_err(|e| FileError::InvalidDocument {
            path: self.path.clone(),
            source: e,
        })?;
        write_file_atomic_sync(&self.path, &json)?;
        Ok(())
    }
}

impl HostDocument for DocumentFile {
    fn parts(&self) -> PersistenceResult<Vec<XmlPart>> {
        self.data.parts.parts()
    }

    fn add_part(&mut self, xml: &str) -> PersistenceResult<String> {
        let id = self.data.parts.add_part(xml)?;
        self.flush()?;
        Ok(id)
    }

    fn delete_part(&mut self, id: &str) -> PersistenceResult<()> {
        self.data.parts.delete_part(id)?;
        self.flush()
    }

    fn set_body(&mut self, html: &str) -> PersistenceResult<()> {
        self.data.body = html.to_string();
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_in_memory_add_delete() {
        let mut doc = InMemoryDocument::new();
        let id = doc.add_part("<a/>").unwrap();
        assert_eq!(doc.len(), 1);
        assert!(id.starts_with('{') && id.ends_with('}'));

        doc.delete_part(&id).unwrap();
        assert!(doc.is_empty());
        assert!(matches!(doc.delete_part(&id), Err(PersistenceError::Host(_))));
    }

    #[test]
    fn test_document_file_persists_parts() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.mbdoc");

        let mut doc = DocumentFile::open(&path).unwrap();
        assert!(doc.parts().unwrap().is_empty());
        let id = doc.add_part("<a/>").unwrap();
        doc.set_body("<h1>Hi</h1>").unwrap();

        let reopened = DocumentFile::open(&path).unwrap();
        let parts = reopened.parts().unwrap();
        assert_eq!(parts.len(), 1);
        assert_eq!(parts[0].id, id);
        assert_eq!(reopened.body(), "<h1>Hi</h1>");
    }

    #[test]
    fn test_document_file_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.mbdoc");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            DocumentFile::open(&path),
            Err(PersistenceError::File(FileError::InvalidDocument { .. }))
        ));
    }
}
