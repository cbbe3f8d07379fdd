//! Parsed-document cache keyed by canonical path.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace};

use crate::error::ParseError;
use crate::parser::SchemaParser;
use crate::stats::ResolutionStats;
use crate::types::Document;

/// Store of already-parsed documents.
///
/// Owned by a resolver and kept across its resolution passes. Nothing is
/// invalidated automatically: call [`DocumentCache::clear`] to pick up files
/// that changed on disk.
#[derive(Debug, Default)]
pub struct DocumentCache {
    documents: HashMap<PathBuf, Arc<Document>>,
}

impl DocumentCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a document, reusing a cached parse when `enabled`.
    ///
    /// `path` must already be canonical. A cache hit increments
    /// `cached_reuse_count` and does not invoke the parser. Failed parses are
    /// never cached.
    ///
    /// # Errors
    ///
    /// Returns the parser's `ParseError` (`NotFound` for missing files).
    pub fn load<P: SchemaParser>(
        &mut self,
        path: &Path,
        parser: &P,
        enabled: bool,
        stats: &mut ResolutionStats,
    ) -> Result<Arc<Document>, ParseError> {
        if enabled {
            if let Some(cached) = self.documents.get(path) {
                debug!("Cache hit for document: {}", path.display());
                stats.record_cache_hit();
                return Ok(Arc::clone(cached));
            }
        }

        trace!("Cache miss for document: {}", path.display());
        let parsed = parser.parse_file(path)?;
        let document = Arc::new(Document::new(path.to_path_buf(), parsed));

        if enabled {
            self.documents
                .insert(path.to_path_buf(), Arc::clone(&document));
        }

        Ok(document)
    }

    /// Discard all cached documents. Statistics are left untouched.
    pub fn clear(&mut self) {
        debug!("Clearing {} cached documents", self.documents.len());
        self.documents.clear();
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.documents.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Fragment, ParsedFile};
    use std::cell::Cell;

    /// Parser that counts invocations and returns one fragment per file.
    struct CountingParser {
        calls: Cell<usize>,
    }

    impl SchemaParser for CountingParser {
        fn parse_file(&self, path: &Path) -> Result<ParsedFile, ParseError> {
            self.calls.set(self.calls.get() + 1);
            if path.ends_with("missing.xml") {
                return Err(ParseError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Ok(ParsedFile {
                fragments: vec![Fragment::new("Test.Core")],
                references: vec![],
            })
        }
    }

    fn parser() -> CountingParser {
        CountingParser {
            calls: Cell::new(0),
        }
    }

    #[test]
    fn second_load_hits_cache() {
        let parser = parser();
        let mut cache = DocumentCache::new();
        let mut stats = ResolutionStats::default();
        let path = Path::new("/schemas/core.xml");

        let first = cache.load(path, &parser, true, &mut stats).unwrap();
        let second = cache.load(path, &parser, true, &mut stats).unwrap();

        assert_eq!(parser.calls.get(), 1);
        assert_eq!(stats.cached_reuse_count, 1);
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn disabled_cache_reparses() {
        let parser = parser();
        let mut cache = DocumentCache::new();
        let mut stats = ResolutionStats::default();
        let path = Path::new("/schemas/core.xml");

        cache.load(path, &parser, false, &mut stats).unwrap();
        cache.load(path, &parser, false, &mut stats).unwrap();

        assert_eq!(parser.calls.get(), 2);
        assert_eq!(stats.cached_reuse_count, 0);
        assert!(cache.is_empty());
    }

    #[test]
    fn clear_forces_reparse_but_keeps_stats() {
        let parser = parser();
        let mut cache = DocumentCache::new();
        let mut stats = ResolutionStats::default();
        let path = Path::new("/schemas/core.xml");

        cache.load(path, &parser, true, &mut stats).unwrap();
        cache.load(path, &parser, true, &mut stats).unwrap();
        cache.clear();
        assert!(!cache.contains(path));

        cache.load(path, &parser, true, &mut stats).unwrap();
        assert_eq!(parser.calls.get(), 2);
        assert_eq!(stats.cached_reuse_count, 1);
    }

    #[test]
    fn failures_are_not_cached() {
        let parser = parser();
        let mut cache = DocumentCache::new();
        let mut stats = ResolutionStats::default();
        let path = Path::new("/schemas/missing.xml");

        assert!(cache.load(path, &parser, true, &mut stats).is_err());
        assert!(cache.load(path, &parser, true, &mut stats).is_err());
        assert_eq!(parser.calls.get(), 2);
        assert_eq!(cache.len(), 0);
    }
}
