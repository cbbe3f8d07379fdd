//! CSDL Resolver
//!
//! Dependency resolution and schema merging for interlinked OData CSDL XML
//! documents.
//!
//! Starting from an entry document, the resolver follows every
//! `edmx:Reference`, loads each reachable document once, merges schema
//! fragments that share a namespace, and reports dangling type and
//! annotation-target references.
//!
//! # Example
//!
//! ```no_run
//! use csdl_resolver::{ErrorKind, Resolver, ResolverConfig};
//!
//! let mut resolver = Resolver::new(ResolverConfig::default().allow_cycles(true));
//! let resolution = resolver.resolve("metadata/service.xml").unwrap();
//!
//! for namespace in resolution.model.namespaces() {
//!     println!("{namespace}");
//! }
//! println!("{} documents", resolution.stats.documents_processed);
//! assert_eq!(resolution.count(ErrorKind::ConflictingDefinition), 0);
//! ```
//!
//! # Failure tiers
//!
//! | Condition | Outcome |
//! |-----------|---------|
//! | Entry document missing, unreadable or malformed | `Err(ResolveError)` |
//! | Reference deeper than `max_depth` | `Err(ResolveError::MaxDepthExceeded)` |
//! | Cycle with `allow_cycles = false` | `Err(ResolveError::CircularDependency)` |
//! | Conflicting redefinition | `Err(ResolveError::ConflictingDefinition)` |
//! | Cycle with `allow_cycles = true` | `CircularDependency` finding |
//! | Missing or malformed referenced document | `FileNotFound` / `ParseError` finding |
//! | Dangling type or annotation target | `MissingTypeReference` / `MissingAnnotationTarget` finding |

mod cache;
mod config;
mod cycle;
mod error;
mod integrity;
mod linter;
mod loader;
mod merger;
mod model;
mod parser;
mod report;
mod resolver;
mod stats;
mod types;
mod walker;

pub use cache::DocumentCache;
pub use config::{ResolverConfig, UriMapping};
pub use error::{LocateError, ParseError, ResolveError};
pub use integrity::check as check_references;
pub use linter::{lint, lint_file, Diagnostic, FileResult, FileStatus, LintResult};
pub use loader::{is_url, locate};
pub use merger::{merge, structurally_identical};
pub use model::{MergedElement, MergedModel, MergedSchema};
pub use parser::{CsdlParser, SchemaParser};
pub use report::{ErrorKind, Finding, Findings, Severity};
pub use resolver::{resolve_file, Resolution, Resolver};
pub use stats::ResolutionStats;
pub use types::{
    Document, ElementKey, ElementKind, Fragment, Include, Member, MemberKind, ParsedFile,
    ReferenceLocator, ResolvedReference, SchemaElement,
};
