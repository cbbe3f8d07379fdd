//! Document linting - static analysis of CSDL files without merging.
//!
//! Checks each file for:
//! - XML and CSDL syntax errors
//! - References whose target cannot be located
//! - Include hints naming namespaces the target does not declare

use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::config::ResolverConfig;
use crate::error::LocateError;
use crate::loader::locate;
use crate::parser::{CsdlParser, SchemaParser};
use crate::report::Severity;
use crate::types::{ParsedFile, ReferenceLocator};

/// A single diagnostic message from linting.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: String,
    pub file: PathBuf,
    /// Location inside the document (e.g., "/Reference[0]")
    pub path: String,
    pub message: String,
}

impl Diagnostic {
    fn error(code: &str, file: &Path, path: impl Into<String>, message: String) -> Self {
        Self {
            severity: Severity::Error,
            code: code.to_string(),
            file: file.to_path_buf(),
            path: path.into(),
            message,
        }
    }

    fn warning(code: &str, file: &Path, path: impl Into<String>, message: String) -> Self {
        Self {
            severity: Severity::Warning,
            ..Self::error(code, file, path, message)
        }
    }
}

/// Result of linting a single file.
#[derive(Debug, Clone, Serialize)]
pub struct FileResult {
    pub file: PathBuf,
    pub status: FileStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub diagnostics: Vec<Diagnostic>,
}

/// Status of a linted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FileStatus {
    Ok,
    Error,
    Warning,
}

/// Result of linting a directory or set of files.
#[derive(Debug, Clone, Serialize)]
pub struct LintResult {
    pub path: PathBuf,
    pub files_checked: usize,
    pub passed: usize,
    pub failed: usize,
    pub errors: usize,
    pub warnings: usize,
    pub results: Vec<FileResult>,
}

impl LintResult {
    /// Returns true if all files passed (no errors).
    pub fn is_ok(&self) -> bool {
        self.errors == 0
    }
}

/// Lint a file or directory.
///
/// If path is a directory, recursively finds all .xml files.
/// If `strict` is true, warnings are treated as errors.
/// `config` supplies the search paths and URI mappings used to locate
/// referenced documents.
pub fn lint(path: &Path, strict: bool, config: &ResolverConfig) -> LintResult {
    let files = collect_schema_files(path);
    let mut results = Vec::new();
    let mut total_errors = 0;
    let mut total_warnings = 0;

    for file in &files {
        let file_result = lint_file(file, path, config);
        total_errors += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Error)
            .count();
        total_warnings += file_result
            .diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .count();
        results.push(file_result);
    }

    let failed = results
        .iter()
        .filter(|r| {
            if strict {
                r.status != FileStatus::Ok
            } else {
                r.status == FileStatus::Error
            }
        })
        .count();

    LintResult {
        path: path.to_path_buf(),
        files_checked: files.len(),
        passed: files.len() - failed,
        failed,
        errors: total_errors,
        warnings: total_warnings,
        results,
    }
}

/// Lint a single CSDL document.
pub fn lint_file(file: &Path, base_path: &Path, config: &ResolverConfig) -> FileResult {
    let parser = CsdlParser::new();
    let mut diagnostics = Vec::new();

    let parsed = match parser.parse_file(file) {
        Ok(parsed) => parsed,
        Err(e) => {
            diagnostics.push(Diagnostic::error(
                "E001",
                file,
                "/",
                format!("parse error: {}", e),
            ));
            return file_result(file, base_path, diagnostics);
        }
    };

    if parsed.fragments.is_empty() {
        diagnostics.push(Diagnostic::warning(
            "W001",
            file,
            "/",
            "document declares no schema".to_string(),
        ));
    }

    let file_dir = file.parent().unwrap_or(Path::new("."));
    for (i, reference) in parsed.references.iter().enumerate() {
        let path = format!("/Reference[{}]", i);
        check_reference(reference, file, file_dir, &path, &parser, config, &mut diagnostics);
    }

    file_result(file, base_path, diagnostics)
}

fn file_result(file: &Path, base_path: &Path, diagnostics: Vec<Diagnostic>) -> FileResult {
    let has_errors = diagnostics.iter().any(|d| d.severity == Severity::Error);
    let has_warnings = diagnostics.iter().any(|d| d.severity == Severity::Warning);

    let status = if has_errors {
        FileStatus::Error
    } else if has_warnings {
        FileStatus::Warning
    } else {
        FileStatus::Ok
    };

    FileResult {
        file: file.strip_prefix(base_path).unwrap_or(file).to_path_buf(),
        status,
        diagnostics,
    }
}

/// Check a single `edmx:Reference`.
fn check_reference(
    reference: &ReferenceLocator,
    file: &Path,
    file_dir: &Path,
    path: &str,
    parser: &CsdlParser,
    config: &ResolverConfig,
    diagnostics: &mut Vec<Diagnostic>,
) {
    if reference.includes.is_empty() {
        diagnostics.push(Diagnostic::warning(
            "W002",
            file,
            path,
            format!("reference to {} has no Include", reference.uri),
        ));
    }

    let target = match locate(&reference.uri, file_dir, config) {
        Ok(target) => target,
        Err(LocateError::NotFound { .. }) => {
            diagnostics.push(Diagnostic::error(
                "E002",
                file,
                path,
                format!("file not found: {}", reference.uri),
            ));
            return;
        }
        Err(e @ LocateError::Unresolvable { .. }) => {
            diagnostics.push(Diagnostic::error("E003", file, path, e.to_string()));
            return;
        }
    };

    // An unparsable target is reported when that file itself is linted
    let Ok(ParsedFile { fragments, .. }) = parser.parse_file(&target) else {
        return;
    };

    for include in &reference.includes {
        if !fragments.iter().any(|f| f.namespace == include.namespace) {
            diagnostics.push(Diagnostic::error(
                "E004",
                file,
                path,
                format!(
                    "namespace {} is not declared by {}",
                    include.namespace, reference.uri
                ),
            ));
        }
    }
}

/// Collect all .xml files in a path (file or directory).
fn collect_schema_files(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        if is_xml(path) {
            return vec![path.to_path_buf()];
        }
        return vec![];
    }

    let mut files = Vec::new();
    collect_files_recursive(path, &mut files);
    files.sort();
    files
}

fn collect_files_recursive(dir: &Path, files: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_files_recursive(&path, files);
        } else if is_xml(&path) {
            files.push(path);
        }
    }
}

fn is_xml(path: &Path) -> bool {
    path.extension().map(|e| e == "xml").unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    const CORE: &str = r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Test.Core"/>
  </edmx:DataServices>
</edmx:Edmx>"#;

    fn service(uri: &str, include: Option<&str>) -> String {
        let include = include
            .map(|ns| format!(r#"<edmx:Include Namespace="{}"/>"#, ns))
            .unwrap_or_default();
        format!(
            r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0">
  <edmx:Reference Uri="{}">{}</edmx:Reference>
  <edmx:DataServices>
    <Schema xmlns="http://docs.oasis-open.org/odata/ns/edm" Namespace="Test.Service"/>
  </edmx:DataServices>
</edmx:Edmx>"#,
            uri, include
        )
    }

    fn lint_one(dir: &Path, name: &str) -> FileResult {
        lint_file(&dir.join(name), dir, &ResolverConfig::default())
    }

    #[test]
    fn lint_valid_document() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("core.xml"), CORE).unwrap();
        std::fs::write(
            dir.path().join("service.xml"),
            service("core.xml", Some("Test.Core")),
        )
        .unwrap();

        let result = lint_one(dir.path(), "service.xml");
        assert_eq!(result.status, FileStatus::Ok);
        assert!(result.diagnostics.is_empty());
        assert_eq!(result.file, PathBuf::from("service.xml"));
    }

    #[test]
    fn lint_invalid_xml() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("bad.xml"), "<edmx:Edmx").unwrap();

        let result = lint_one(dir.path(), "bad.xml");
        assert_eq!(result.status, FileStatus::Error);
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(result.diagnostics[0].code, "E001");
    }

    #[test]
    fn lint_missing_reference_target() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("service.xml"),
            service("missing.xml", Some("Test.Core")),
        )
        .unwrap();

        let result = lint_one(dir.path(), "service.xml");
        assert_eq!(result.status, FileStatus::Error);
        assert!(result.diagnostics.iter().any(|d| d.code == "E002"));
        assert_eq!(result.diagnostics[0].path, "/Reference[0]");
    }

    #[test]
    fn lint_unmapped_url() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("service.xml"),
            service("https://oasis.example/Core.xml", Some("Test.Core")),
        )
        .unwrap();

        let result = lint_one(dir.path(), "service.xml");
        assert!(result.diagnostics.iter().any(|d| d.code == "E003"));

        let config = ResolverConfig::default().uri_mapping("https://oasis.example", dir.path());
        std::fs::write(dir.path().join("Core.xml"), CORE).unwrap();
        let result = lint_file(&dir.path().join("service.xml"), dir.path(), &config);
        assert_eq!(result.status, FileStatus::Ok);
    }

    #[test]
    fn lint_include_not_declared() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("core.xml"), CORE).unwrap();
        std::fs::write(
            dir.path().join("service.xml"),
            service("core.xml", Some("Test.Other")),
        )
        .unwrap();

        let result = lint_one(dir.path(), "service.xml");
        assert_eq!(result.status, FileStatus::Error);
        assert!(result.diagnostics.iter().any(|d| d.code == "E004"));
    }

    #[test]
    fn lint_reference_without_include_warns() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("core.xml"), CORE).unwrap();
        std::fs::write(dir.path().join("service.xml"), service("core.xml", None)).unwrap();

        let result = lint_one(dir.path(), "service.xml");
        assert_eq!(result.status, FileStatus::Warning);
        assert!(result.diagnostics.iter().any(|d| d.code == "W002"));
    }

    #[test]
    fn lint_empty_document_warns() {
        let dir = tempdir().unwrap();
        std::fs::write(
            dir.path().join("empty.xml"),
            r#"<edmx:Edmx xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx" Version="4.0"/>"#,
        )
        .unwrap();

        let result = lint_one(dir.path(), "empty.xml");
        assert_eq!(result.status, FileStatus::Warning);
        assert_eq!(result.diagnostics[0].code, "W001");
    }

    #[test]
    fn lint_directory() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("core.xml"), CORE).unwrap();
        std::fs::write(dir.path().join("invalid.xml"), "<not closed").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let result = lint(dir.path(), false, &ResolverConfig::default());
        assert_eq!(result.files_checked, 2);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 1);
        assert!(!result.is_ok());
    }

    #[test]
    fn lint_strict_mode() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("core.xml"), CORE).unwrap();
        let file_path = dir.path().join("service.xml");
        // Warning only (reference without include)
        std::fs::write(&file_path, service("core.xml", None)).unwrap();

        let result = lint(&file_path, false, &ResolverConfig::default());
        assert_eq!(result.files_checked, 1);
        assert_eq!(result.passed, 1);
        assert_eq!(result.failed, 0);

        let result = lint(&file_path, true, &ResolverConfig::default());
        assert_eq!(result.passed, 0);
        assert_eq!(result.failed, 1);
    }
}
