//! Resolver configuration.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::ResolveError;

/// Maps reference URIs starting with `remote_prefix` onto a local directory.
///
/// Example:
/// - `remote_prefix`: `https://oasis-tcs.github.io/odata-vocabularies/vocabularies`
/// - `local_base`: `vocab`
/// - URI: `https://oasis-tcs.github.io/odata-vocabularies/vocabularies/Org.OData.Core.V1.xml`
/// - Result: `vocab/Org.OData.Core.V1.xml`
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UriMapping {
    pub remote_prefix: String,
    pub local_base: PathBuf,
}

/// Options for a resolution pass.
///
/// Built once and handed to the resolver; every `resolve` call reads it at
/// the start of the pass.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Check references against the active path for cycles.
    pub detect_cycles: bool,
    /// Record detected cycles and continue instead of failing.
    pub allow_cycles: bool,
    /// Reuse parsed documents across loads and resolution passes.
    pub enable_caching: bool,
    /// Maximum reference depth below the entry document.
    pub max_depth: usize,
    /// Directories tried, in order, for references not found next to the referrer.
    pub search_paths: Vec<PathBuf>,
    pub uri_mappings: Vec<UriMapping>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            detect_cycles: true,
            allow_cycles: false,
            enable_caching: true,
            max_depth: usize::MAX,
            search_paths: Vec::new(),
            uri_mappings: Vec::new(),
        }
    }
}

impl ResolverConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn detect_cycles(mut self, detect: bool) -> Self {
        self.detect_cycles = detect;
        self
    }

    pub fn allow_cycles(mut self, allow: bool) -> Self {
        self.allow_cycles = allow;
        self
    }

    pub fn caching(mut self, enabled: bool) -> Self {
        self.enable_caching = enabled;
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn search_path(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_paths.push(dir.into());
        self
    }

    pub fn uri_mapping(mut self, remote_prefix: impl Into<String>, local_base: impl Into<PathBuf>) -> Self {
        self.uri_mappings.push(UriMapping {
            remote_prefix: remote_prefix.into(),
            local_base: local_base.into(),
        });
        self
    }

    /// Load configuration from a JSON file. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError::FileNotFound` if the file doesn't exist,
    /// or `ResolveError::InvalidConfig` if it isn't a valid configuration.
    pub fn from_json_file(path: &Path) -> Result<Self, ResolveError> {
        if !path.exists() {
            return Err(ResolveError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|source| ResolveError::ReadError {
            path: path.to_path_buf(),
            source,
        })?;

        serde_json::from_str(&content).map_err(|e| ResolveError::InvalidConfig {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}
