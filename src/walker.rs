//! Depth-first traversal of the document reference graph.
//!
//! The walk keeps two pieces of state: the *visited* set of documents fully
//! processed, so converging paths load a document once, and the *active*
//! path of documents entered but not finished, which the cycle detector
//! consults. The traversal uses an explicit frame stack, so very deep graphs
//! are bounded only by `max_depth`.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, trace, warn};

use crate::cache::DocumentCache;
use crate::config::ResolverConfig;
use crate::cycle::{CycleCheck, CycleDetector};
use crate::error::{display_cycle, ParseError, ResolveError};
use crate::loader::locate;
use crate::parser::SchemaParser;
use crate::report::{ErrorKind, Finding, Findings};
use crate::stats::ResolutionStats;
use crate::types::{Document, ReferenceLocator, ResolvedReference};

/// Result of walking the graph from one entry document.
#[derive(Debug, Default)]
pub(crate) struct WalkOutcome {
    /// Every reachable document that loaded, in discovery order.
    pub documents: Vec<Arc<Document>>,
    /// Every reference edge that resolved to a file.
    pub references: Vec<ResolvedReference>,
    pub findings: Findings,
}

struct Frame {
    document: Arc<Document>,
    next_reference: usize,
}

/// Graph walker for one resolution pass.
pub(crate) struct Walker<'a, P> {
    parser: &'a P,
    cache: &'a mut DocumentCache,
    stats: &'a mut ResolutionStats,
    config: &'a ResolverConfig,
    cycles: CycleDetector,
    frames: Vec<Frame>,
    active: Vec<PathBuf>,
    visited: HashSet<PathBuf>,
    failed: HashSet<PathBuf>,
    loaded: HashMap<PathBuf, Arc<Document>>,
    outcome: WalkOutcome,
}

impl<'a, P: SchemaParser> Walker<'a, P> {
    pub(crate) fn new(
        parser: &'a P,
        cache: &'a mut DocumentCache,
        stats: &'a mut ResolutionStats,
        config: &'a ResolverConfig,
    ) -> Self {
        Self {
            parser,
            cache,
            stats,
            config,
            cycles: CycleDetector::new(config.detect_cycles, config.allow_cycles),
            frames: Vec::new(),
            active: Vec::new(),
            visited: HashSet::new(),
            failed: HashSet::new(),
            loaded: HashMap::new(),
            outcome: WalkOutcome::default(),
        }
    }

    /// Walk every document reachable from `entry`.
    ///
    /// # Errors
    ///
    /// Fails if the entry document cannot be found, read or parsed, if a
    /// reference lies deeper than `max_depth`, or if a cycle is detected and
    /// cycles are not allowed. Problems with referenced documents are
    /// recorded as findings instead.
    pub(crate) fn walk(mut self, entry: &Path) -> Result<WalkOutcome, ResolveError> {
        let entry = entry.canonicalize().map_err(|source| {
            if entry.exists() {
                ResolveError::ReadError {
                    path: entry.to_path_buf(),
                    source,
                }
            } else {
                ResolveError::FileNotFound {
                    path: entry.to_path_buf(),
                }
            }
        })?;

        let document = self.load(&entry)?;
        self.enter(document, 0);

        while let Some(frame) = self.frames.last_mut() {
            let Some(reference) = frame.document.references.get(frame.next_reference).cloned()
            else {
                self.leave();
                continue;
            };
            frame.next_reference += 1;
            let source = Arc::clone(&frame.document);
            self.follow(&source, &reference)?;
        }

        debug!(
            "Walked {} documents from {}",
            self.outcome.documents.len(),
            entry.display()
        );
        Ok(self.outcome)
    }

    /// Process one declared reference of the document on top of the stack.
    fn follow(
        &mut self,
        source: &Arc<Document>,
        reference: &ReferenceLocator,
    ) -> Result<(), ResolveError> {
        let depth = self.frames.len();

        let target = match locate(&reference.uri, source.base_dir(), self.config) {
            Ok(target) => target,
            Err(e) => {
                warn!("{}: {}", source.path.display(), e);
                self.outcome.findings.push(
                    Finding::new(
                        e.kind(),
                        format!("reference \"{}\" cannot be resolved: {}", reference.uri, e),
                    )
                    .at(source.path.display().to_string()),
                );
                return Ok(());
            }
        };

        trace!(
            "{} -> {} (depth {})",
            source.path.display(),
            target.display(),
            depth
        );
        self.outcome.references.push(ResolvedReference {
            source: source.path.clone(),
            target: target.clone(),
            depth,
        });

        match self.cycles.check(&self.active, &target) {
            CycleCheck::Clear => {}
            CycleCheck::Skip => {
                self.verify_includes(source, reference, &target);
                return Ok(());
            }
            CycleCheck::Recorded(cycle) => {
                self.record_cycle(source, &cycle);
                self.verify_includes(source, reference, &target);
                return Ok(());
            }
            CycleCheck::Fatal(cycle) => {
                self.record_cycle(source, &cycle);
                return Err(ResolveError::CircularDependency { cycle });
            }
        }

        // Every edge is depth-checked, including edges to documents that
        // were already loaded along a shorter path.
        if depth > self.config.max_depth {
            return Err(ResolveError::MaxDepthExceeded {
                path: target,
                depth,
                max_depth: self.config.max_depth,
            });
        }

        if self.visited.contains(&target) {
            trace!("Already processed: {}", target.display());
            self.verify_includes(source, reference, &target);
            return Ok(());
        }

        if self.failed.contains(&target) {
            return Ok(());
        }

        match self.load(&target) {
            Ok(document) => {
                self.enter(document, depth);
                self.verify_includes(source, reference, &target);
            }
            Err(e) => {
                warn!("Skipping {}: {}", target.display(), e);
                self.outcome.findings.push(
                    Finding::new(e.kind(), e.to_string()).at(source.path.display().to_string()),
                );
                self.failed.insert(target);
            }
        }

        Ok(())
    }

    fn load(&mut self, path: &Path) -> Result<Arc<Document>, ParseError> {
        self.cache
            .load(path, self.parser, self.config.enable_caching, self.stats)
    }

    fn enter(&mut self, document: Arc<Document>, depth: usize) {
        trace!("Entering {} at depth {}", document.path.display(), depth);
        self.stats.record_document(depth);
        self.active.push(document.path.clone());
        self.loaded
            .insert(document.path.clone(), Arc::clone(&document));
        self.outcome.documents.push(Arc::clone(&document));
        self.frames.push(Frame {
            document,
            next_reference: 0,
        });
    }

    fn leave(&mut self) {
        if let Some(frame) = self.frames.pop() {
            self.active.pop();
            self.visited.insert(frame.document.path.clone());
        }
    }

    fn record_cycle(&mut self, source: &Document, cycle: &[PathBuf]) {
        warn!("Circular dependency: {}", display_cycle(cycle));
        self.stats.record_cycle();
        self.outcome.findings.push(
            Finding::new(
                ErrorKind::CircularDependency,
                format!("circular dependency: {}", display_cycle(cycle)),
            )
            .at(source.path.display().to_string()),
        );
    }

    /// Check that every namespace named by the reference's includes is
    /// declared by the target document.
    fn verify_includes(&mut self, source: &Document, reference: &ReferenceLocator, target: &Path) {
        let Some(document) = self.loaded.get(target) else {
            return;
        };

        let missing: Vec<&str> = reference
            .includes
            .iter()
            .filter(|include| !document.declares_namespace(&include.namespace))
            .map(|include| include.namespace.as_str())
            .collect();

        for namespace in missing {
            self.outcome.findings.push(
                Finding::new(
                    ErrorKind::SchemaResolutionFailed,
                    format!(
                        "reference \"{}\" includes namespace {} which {} does not declare",
                        reference.uri,
                        namespace,
                        target.display()
                    ),
                )
                .at(source.path.display().to_string()),
            );
        }
    }
}
