//! Resolution orchestrator: walk, merge, check.

use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, info};

use crate::cache::DocumentCache;
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::integrity;
use crate::merger;
use crate::model::MergedModel;
use crate::parser::{CsdlParser, SchemaParser};
use crate::report::{ErrorKind, Finding, Severity};
use crate::stats::ResolutionStats;
use crate::types::ResolvedReference;
use crate::walker::{WalkOutcome, Walker};

/// Result of one successful resolution pass.
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub model: MergedModel,
    /// Snapshot of the resolver's accumulated statistics after this pass.
    pub stats: ResolutionStats,
    /// Recoverable problems, in discovery order.
    pub findings: Vec<Finding>,
    /// Documents that loaded, in discovery order.
    pub documents: Vec<PathBuf>,
    #[serde(skip)]
    pub references: Vec<ResolvedReference>,
}

impl Resolution {
    /// True if any finding has error severity.
    pub fn has_errors(&self) -> bool {
        self.findings.iter().any(|f| f.severity() == Severity::Error)
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.findings.iter().filter(|f| f.kind == kind).count()
    }
}

/// Resolves entry documents into merged models.
///
/// The resolver owns its document cache and statistics. Both persist across
/// `resolve` calls until cleared; configuration is read at the start of
/// every call.
#[derive(Debug)]
pub struct Resolver<P = CsdlParser> {
    config: ResolverConfig,
    parser: P,
    cache: DocumentCache,
    stats: ResolutionStats,
}

impl Resolver<CsdlParser> {
    pub fn new(config: ResolverConfig) -> Self {
        Self::with_parser(config, CsdlParser::new())
    }
}

impl Default for Resolver<CsdlParser> {
    fn default() -> Self {
        Self::new(ResolverConfig::default())
    }
}

impl<P: SchemaParser> Resolver<P> {
    /// Create a resolver that loads documents through `parser`.
    pub fn with_parser(config: ResolverConfig, parser: P) -> Self {
        Self {
            config,
            parser,
            cache: DocumentCache::new(),
            stats: ResolutionStats::default(),
        }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Replace the configuration. The cache and statistics are kept.
    pub fn with_config(mut self, config: ResolverConfig) -> Self {
        self.config = config;
        self
    }

    pub fn set_config(&mut self, config: ResolverConfig) {
        self.config = config;
    }

    pub fn stats(&self) -> ResolutionStats {
        self.stats
    }

    /// Number of documents currently held in the cache.
    pub fn cached_documents(&self) -> usize {
        self.cache.len()
    }

    /// Drop every cached document so the next pass re-reads files from disk.
    pub fn clear_cache(&mut self) {
        self.cache.clear();
    }

    pub fn reset_statistics(&mut self) {
        self.stats = ResolutionStats::default();
    }

    /// Clear the cache and reset statistics.
    pub fn reset(&mut self) {
        self.clear_cache();
        self.reset_statistics();
    }

    /// Resolve `entry` and every document it transitively references.
    ///
    /// Elapsed time is added to the statistics whether or not the pass
    /// succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ResolveError` if the entry document cannot be found, read or
    /// parsed, if the reference graph is deeper than `max_depth`, if a cycle
    /// is detected while cycles are disallowed, or if two documents define
    /// the same element differently.
    pub fn resolve(&mut self, entry: impl AsRef<Path>) -> Result<Resolution, ResolveError> {
        let entry = entry.as_ref();
        let started = Instant::now();
        let result = self.run(entry);
        self.stats.add_elapsed(started.elapsed());

        let mut resolution = result?;
        resolution.stats = self.stats;
        info!(
            "Resolved {}: {} documents, {} namespaces, {} findings",
            entry.display(),
            resolution.documents.len(),
            resolution.model.schemas.len(),
            resolution.findings.len()
        );
        Ok(resolution)
    }

    fn run(&mut self, entry: &Path) -> Result<Resolution, ResolveError> {
        debug!("Resolving {} with {:?}", entry.display(), self.config);

        let WalkOutcome {
            documents,
            references,
            mut findings,
        } = Walker::new(&self.parser, &mut self.cache, &mut self.stats, &self.config)
            .walk(entry)?;

        let (model, conflicts) = merger::merge(&documents);
        if !conflicts.is_empty() {
            return Err(ResolveError::ConflictingDefinition {
                conflicts: conflicts.into_vec(),
            });
        }

        findings.extend(integrity::check(&model));

        Ok(Resolution {
            model,
            stats: self.stats,
            findings: findings.into_vec(),
            documents: documents.iter().map(|d| d.path.clone()).collect(),
            references,
        })
    }
}

/// Resolve a single entry document with a fresh resolver.
///
/// # Errors
///
/// See [`Resolver::resolve`].
pub fn resolve_file(
    entry: impl AsRef<Path>,
    config: ResolverConfig,
) -> Result<Resolution, ResolveError> {
    Resolver::new(config).resolve(entry)
}
