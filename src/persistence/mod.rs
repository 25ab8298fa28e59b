//! Persistence of the canonical Markdown inside the host document
//!
//! The Markdown lives in a single namespace-tagged metadata region. Loading
//! never fails: anything unexpected reads as "no Markdown stored". Saving
//! replaces the region outright (delete, then insert). This is not
//! crash-atomic: an interruption between the two leaves the document
//! without a region.

pub mod document;
pub mod region;

pub use document::{DocumentFile, HostDocument, InMemoryDocument, XmlPart};
pub use region::{build_region, escape_cdata, Region};

use crate::config::PersistenceConfig;
use crate::error::PersistenceResult;

/// Reads and writes the persisted region
#[derive(Debug, Clone)]
pub struct PersistenceStore {
    namespace: String,
}

impl PersistenceStore {
    pub fn new(config: &PersistenceConfig) -> Self {
        Self {
            namespace: config.namespace.clone(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// Stored Markdown, or `None` when there is nothing usable
    pub fn load<D: HostDocument + ?Sized>(&self, document: &D) -> Option<String> {
        let parts = match document.parts() {
            Ok(parts) => parts,
            Err(e) => {
                log::warn!("Could not list document metadata: {}", e);
                return None;
            }
        };

        let region = parts
            .iter()
            .filter_map(|part| Region::parse(&part.xml))
            .find(|region| region.is_in(&self.namespace))?;

        if region.content.is_none() {
            log::warn!("Markdown region has no content element");
        }
        region.content
    }

    /// Replace the stored Markdown with `text`
    pub fn save<D: HostDocument + ?Sized>(&self, document: &mut D, text: &str) -> PersistenceResult<()> {
        // Unrepresentable text must fail before the old region is deleted
        let xml = build_region(&self.namespace, text)?;

        for id in self.region_ids(document)? {
            document.delete_part(&id)?;
            log::debug!("Removed Markdown region {}", id);
        }

        let id = document.add_part(&xml)?;
        log::debug!("Stored Markdown region {} ({} bytes)", id, text.len());
        Ok(())
    }

    /// Remove the region entirely; returns whether one existed
    pub fn clear<D: HostDocument + ?Sized>(&self, document: &mut D) -> PersistenceResult<bool> {
        let ids = self.region_ids(document)?;
        for id in &ids {
            document.delete_part(id)?;
        }
        Ok(!ids.is_empty())
    }

    fn region_ids<D: HostDocument + ?Sized>(&self, document: &D) -> PersistenceResult<Vec<String>> {
        Ok(document
            .parts()?
            .into_iter()
            .filter(|part| Region::parse(&part.xml).is_some_and(|r| r.is_in(&self.namespace)))
            .map(|part| part.id)
            .collect())
    }
}

impl Default for PersistenceStore {
    fn default() -> Self {
        Self::new(&PersistenceConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PersistenceError;

    #[test]
    fn test_load_from_empty_document() {
        let doc = InMemoryDocument::new();
        assert_eq!(PersistenceStore::default().load(&doc), None);
    }

    #[test]
    fn test_round_trip() {
        let store = PersistenceStore::default();
        let mut doc = InMemoryDocument::new();
        let text = "# Notes\n\n<b>bold</b> & a < b\r\n日本語 ✓\n";

        store.save(&mut doc, text).unwrap();
        assert_eq!(store.load(&doc).as_deref(), Some(text));
    }

    #[test]
    fn test_cdata_terminator_round_trip() {
        let store = PersistenceStore::default();
        let mut doc = InMemoryDocument::new();
        let text = "before ]]> after ]]]]> end";

        store.save(&mut doc, text).unwrap();
        assert_eq!(store.load(&doc).as_deref(), Some(text));
    }

    #[test]
    fn test_save_supersedes_previous_region() {
        let store = PersistenceStore::default();
        let mut doc = InMemoryDocument::new();

        store.save(&mut doc, "first").unwrap();
        store.save(&mut doc, "second").unwrap();
        assert_eq!(doc.len(), 1);
        assert_eq!(store.load(&doc).as_deref(), Some("second"));
    }

    #[test]
    fn test_other_namespaces_untouched() {
        let store = PersistenceStore::default();
        let mut doc = InMemoryDocument::new();
        doc.add_part("<markdown xmlns=\"urn:markdown-bridge:source-v0\"><content>old</content></markdown>")
            .unwrap();
        doc.add_part("<props xmlns=\"urn:other\"/>").unwrap();
        doc.add_part("this is not xml").unwrap();

        assert_eq!(store.load(&doc), None);
        store.save(&mut doc, "mine").unwrap();
        assert_eq!(doc.len(), 4);
        assert_eq!(store.load(&doc).as_deref(), Some("mine"));
    }

    #[test]
    fn test_case_insensitive_namespace() {
        let store = PersistenceStore::default();
        let mut doc = InMemoryDocument::new();
        doc.add_part("<markdown xmlns=\"URN:MARKDOWN-BRIDGE:SOURCE\"><content>upper</content></markdown>")
            .unwrap();

        assert_eq!(store.load(&doc).as_deref(), Some("upper"));
        store.save(&mut doc, "replaced").unwrap();
        assert_eq!(doc.len(), 1);
    }

    #[test]
    fn test_region_without_content_reads_as_absent() {
        let store = PersistenceStore::default();
        let mut doc = InMemoryDocument::new();
        doc.add_part("<markdown xmlns=\"urn:markdown-bridge:source\"/>").unwrap();
        assert_eq!(store.load(&doc), None);
    }

    #[test]
    fn test_unrepresentable_text_keeps_old_region() {
        let store = PersistenceStore::default();
        let mut doc = InMemoryDocument::new();
        store.save(&mut doc, "safe").unwrap();

        let err = store.save(&mut doc, "nul\u{0}").unwrap_err();
        assert!(matches!(err, PersistenceError::UnrepresentableChar(0)));
        assert_eq!(store.load(&doc).as_deref(), Some("safe"));
    }

    #[test]
    fn test_clear() {
        let store = PersistenceStore::default();
        let mut doc = InMemoryDocument::new();
        assert!(!store.clear(&mut doc).unwrap());
        store.save(&mut doc, "x").unwrap();
        assert!(store.clear(&mut doc).unwrap());
        assert_eq!(store.load(&doc), None);
    }
}
