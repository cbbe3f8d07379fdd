//! Categorized findings recorded during resolution.

use std::fmt;

use serde::Serialize;

/// Category of a recorded error or warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ErrorKind {
    FileNotFound,
    SchemaResolutionFailed,
    CircularDependency,
    MaxDepthExceeded,
    ConflictingDefinition,
    MissingTypeReference,
    MissingAnnotationTarget,
    ParseError,
}

impl ErrorKind {
    /// Dangling references are tolerated by most consumers and rank as warnings.
    pub fn severity(&self) -> Severity {
        match self {
            ErrorKind::MissingTypeReference | ErrorKind::MissingAnnotationTarget => {
                Severity::Warning
            }
            _ => Severity::Error,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::FileNotFound => "FileNotFound",
            ErrorKind::SchemaResolutionFailed => "SchemaResolutionFailed",
            ErrorKind::CircularDependency => "CircularDependency",
            ErrorKind::MaxDepthExceeded => "MaxDepthExceeded",
            ErrorKind::ConflictingDefinition => "ConflictingDefinition",
            ErrorKind::MissingTypeReference => "MissingTypeReference",
            ErrorKind::MissingAnnotationTarget => "MissingAnnotationTarget",
            ErrorKind::ParseError => "ParseError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Severity level for findings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single recorded error or warning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Finding {
    pub kind: ErrorKind,
    pub description: String,
    /// Source document or element the finding points at.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Finding {
    pub fn new(kind: ErrorKind, description: impl Into<String>) -> Self {
        Self {
            kind,
            description: description.into(),
            location: None,
        }
    }

    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn severity(&self) -> Severity {
        self.kind.severity()
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {} ({})", self.kind, self.description, location),
            None => write!(f, "[{}] {}", self.kind, self.description),
        }
    }
}

/// Ordered, append-only list of findings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Findings {
    items: Vec<Finding>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, finding: Finding) {
        tracing::debug!(kind = %finding.kind, "{}", finding.description);
        self.items.push(finding);
    }

    pub fn extend(&mut self, other: Findings) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Finding> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn count(&self, kind: ErrorKind) -> usize {
        self.items.iter().filter(|f| f.kind == kind).count()
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|f| f.severity() == Severity::Error)
    }

    pub fn into_vec(self) -> Vec<Finding> {
        self.items
    }
}

impl IntoIterator for Findings {
    type Item = Finding;
    type IntoIter = std::vec::IntoIter<Finding>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dangling_references_are_warnings() {
        assert_eq!(
            ErrorKind::MissingTypeReference.severity(),
            Severity::Warning
        );
        assert_eq!(
            ErrorKind::MissingAnnotationTarget.severity(),
            Severity::Warning
        );
        assert_eq!(ErrorKind::FileNotFound.severity(), Severity::Error);
        assert_eq!(ErrorKind::ConflictingDefinition.severity(), Severity::Error);
    }

    #[test]
    fn finding_display() {
        let finding = Finding::new(ErrorKind::FileNotFound, "missing.xml not found").at("a.xml");
        assert_eq!(
            finding.to_string(),
            "[FileNotFound] missing.xml not found (a.xml)"
        );

        let finding = Finding::new(ErrorKind::ParseError, "bad xml");
        assert_eq!(finding.to_string(), "[ParseError] bad xml");
    }

    #[test]
    fn findings_keep_discovery_order() {
        let mut findings = Findings::new();
        findings.push(Finding::new(ErrorKind::ParseError, "first"));
        findings.push(Finding::new(ErrorKind::MissingTypeReference, "second"));
        findings.push(Finding::new(ErrorKind::ParseError, "third"));

        let descriptions: Vec<_> = findings.iter().map(|f| f.description.as_str()).collect();
        assert_eq!(descriptions, ["first", "second", "third"]);
        assert_eq!(findings.count(ErrorKind::ParseError), 2);
        assert!(findings.has_errors());
    }

    #[test]
    fn warnings_only_is_not_an_error() {
        let mut findings = Findings::new();
        findings.push(Finding::new(ErrorKind::MissingTypeReference, "dangling"));
        assert!(!findings.has_errors());
    }

    #[test]
    fn finding_serializes_kind_by_name() {
        let finding = Finding::new(ErrorKind::CircularDependency, "a -> b -> a");
        let json = serde_json::to_value(&finding).unwrap();
        assert_eq!(json["kind"], "CircularDependency");
        assert!(json.get("location").is_none());
    }
}
