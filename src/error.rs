//! Error types for CSDL parsing, reference location and resolution.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::report::{ErrorKind, Finding};

/// Errors from the single-file parser.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("file not found: {}", path.display())]
    NotFound { path: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid XML in {}: {source}", path.display())]
    InvalidXml {
        path: PathBuf,
        #[source]
        source: roxmltree::Error,
    },

    #[error("invalid CSDL in {}: {message}", path.display())]
    InvalidCsdl { path: PathBuf, message: String },
}

impl ParseError {
    /// Path of the file that failed.
    pub fn path(&self) -> &Path {
        match self {
            ParseError::NotFound { path }
            | ParseError::Read { path, .. }
            | ParseError::InvalidXml { path, .. }
            | ParseError::InvalidCsdl { path, .. } => path,
        }
    }

    /// Finding category for a referenced document that failed to load.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::NotFound { .. } | ParseError::Read { .. } => ErrorKind::FileNotFound,
            ParseError::InvalidXml { .. } | ParseError::InvalidCsdl { .. } => {
                ErrorKind::ParseError
            }
        }
    }
}

/// Errors mapping a declared reference to a file on disk.
#[derive(Debug, Error)]
pub enum LocateError {
    #[error("referenced file not found: {}", candidate.display())]
    NotFound { uri: String, candidate: PathBuf },

    #[error("cannot resolve reference \"{uri}\": {message}")]
    Unresolvable { uri: String, message: String },
}

impl LocateError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LocateError::NotFound { .. } => ErrorKind::FileNotFound,
            LocateError::Unresolvable { .. } => ErrorKind::SchemaResolutionFailed,
        }
    }
}

/// Fatal errors that abort a resolution pass.
#[derive(Debug, Error)]
pub enum ResolveError {
    // IO errors (exit code 3)
    #[error("file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("cannot read {}: {source}", path.display())]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Schema errors (exit code 2)
    #[error(transparent)]
    Parse(ParseError),

    #[error("maximum reference depth {max_depth} exceeded at {} (depth {depth})", path.display())]
    MaxDepthExceeded {
        path: PathBuf,
        depth: usize,
        max_depth: usize,
    },

    #[error("circular dependency: {}", display_cycle(cycle))]
    CircularDependency { cycle: Vec<PathBuf> },

    #[error("conflicting definitions: {}", conflicts.iter().map(|c| c.description.as_str()).collect::<Vec<_>>().join("; "))]
    ConflictingDefinition { conflicts: Vec<Finding> },

    #[error("invalid configuration {}: {message}", path.display())]
    InvalidConfig { path: PathBuf, message: String },
}

impl From<ParseError> for ResolveError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::NotFound { path } => ResolveError::FileNotFound { path },
            ParseError::Read { path, source } => ResolveError::ReadError { path, source },
            other => ResolveError::Parse(other),
        }
    }
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => 3,
            _ => 2,
        }
    }

    /// Finding category corresponding to this failure.
    pub fn kind(&self) -> ErrorKind {
        match self {
            ResolveError::FileNotFound { .. } | ResolveError::ReadError { .. } => {
                ErrorKind::FileNotFound
            }
            ResolveError::Parse(_) => ErrorKind::ParseError,
            ResolveError::MaxDepthExceeded { .. } => ErrorKind::MaxDepthExceeded,
            ResolveError::CircularDependency { .. } => ErrorKind::CircularDependency,
            ResolveError::ConflictingDefinition { .. } => ErrorKind::ConflictingDefinition,
            ResolveError::InvalidConfig { .. } => ErrorKind::SchemaResolutionFailed,
        }
    }
}

/// Render a cycle as `a.xml -> b.xml -> a.xml`.
pub(crate) fn display_cycle(cycle: &[PathBuf]) -> String {
    cycle
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}
