//! Reference locator resolution.
//!
//! Maps the `Uri` of an `edmx:Reference` to a canonical file path. Relative
//! paths resolve against the referring document's directory, then the
//! configured search paths. HTTP URIs are never fetched: they resolve only
//! through a configured URI mapping or by file name in a search path.

use std::path::{Path, PathBuf};

use crate::config::{ResolverConfig, UriMapping};
use crate::error::LocateError;

/// Check if a string looks like a URL (starts with http:// or https://).
pub fn is_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Resolve a declared reference to a canonical file path.
///
/// # Errors
///
/// Returns `LocateError::NotFound` if a filesystem path was derived but no
/// file exists there, or `LocateError::Unresolvable` if the URI cannot be
/// mapped to a local file at all.
pub fn locate(
    uri: &str,
    referring_dir: &Path,
    config: &ResolverConfig,
) -> Result<PathBuf, LocateError> {
    let target = match uri.find('#') {
        Some(idx) => &uri[..idx],
        None => uri,
    };

    if target.is_empty() {
        return Err(LocateError::Unresolvable {
            uri: uri.to_string(),
            message: "empty reference URI".to_string(),
        });
    }

    if let Some(file_path) = target.strip_prefix("file://") {
        return existing(uri, vec![PathBuf::from(file_path)]);
    }

    if is_url(target) {
        return locate_url(uri, target, config);
    }

    let path = Path::new(target);
    let candidates = if path.is_absolute() {
        vec![path.to_path_buf()]
    } else {
        std::iter::once(referring_dir.join(path))
            .chain(config.search_paths.iter().map(|dir| dir.join(path)))
            .collect()
    };
    existing(uri, candidates)
}

fn locate_url(uri: &str, target: &str, config: &ResolverConfig) -> Result<PathBuf, LocateError> {
    if let Some(mapped) = map_url(target, &config.uri_mappings) {
        return existing(uri, vec![mapped]);
    }

    // Logical identifier: look the file name up in the search paths
    let file_name = target.rsplit('/').next().unwrap_or_default();
    if !file_name.is_empty() {
        for dir in &config.search_paths {
            let candidate = dir.join(file_name);
            if candidate.is_file() {
                return canonical(uri, &candidate);
            }
        }
    }

    Err(LocateError::Unresolvable {
        uri: uri.to_string(),
        message: "no URI mapping or search path provides this document".to_string(),
    })
}

/// Map a URL onto a local path using the first mapping whose prefix matches.
///
/// The matched prefix is stripped and the remainder joined to the mapping's
/// local base, with any leading slash trimmed.
fn map_url(url: &str, mappings: &[UriMapping]) -> Option<PathBuf> {
    mappings.iter().find_map(|mapping| {
        url.strip_prefix(mapping.remote_prefix.as_str())
            .map(|remainder| mapping.local_base.join(remainder.trim_start_matches('/')))
    })
}

fn existing(uri: &str, candidates: Vec<PathBuf>) -> Result<PathBuf, LocateError> {
    if let Some(found) = candidates.iter().find(|c| c.is_file()) {
        return canonical(uri, found);
    }

    Err(LocateError::NotFound {
        uri: uri.to_string(),
        candidate: candidates.into_iter().next().unwrap_or_default(),
    })
}

fn canonical(uri: &str, path: &Path) -> Result<PathBuf, LocateError> {
    path.canonicalize().map_err(|_| LocateError::NotFound {
        uri: uri.to_string(),
        candidate: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn touch(path: &Path) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(path, "<Edmx/>").unwrap();
    }

    #[test]
    fn is_url_detection() {
        assert!(is_url("https://example.com/core.xml"));
        assert!(is_url("http://example.com/core.xml"));
        assert!(!is_url("/schemas/core.xml"));
        assert!(!is_url("core.xml"));
    }

    #[test]
    fn relative_reference_resolves_next_to_referrer() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("types/core.xml"));

        let located = locate("types/core.xml", dir.path(), &ResolverConfig::default()).unwrap();
        assert_eq!(
            located,
            dir.path().join("types/core.xml").canonicalize().unwrap()
        );
    }

    #[test]
    fn fragment_is_stripped() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("core.xml"));

        let located = locate("core.xml#Test.Core", dir.path(), &ResolverConfig::default());
        assert!(located.is_ok());
    }

    #[test]
    fn relative_reference_falls_back_to_search_path() {
        let dir = tempdir().unwrap();
        let vocab = dir.path().join("vocab");
        touch(&vocab.join("Core.xml"));

        let config = ResolverConfig::default().search_path(&vocab);
        let located = locate("Core.xml", &dir.path().join("elsewhere"), &config).unwrap();
        assert_eq!(located, vocab.join("Core.xml").canonicalize().unwrap());
    }

    #[test]
    fn missing_relative_file_is_not_found() {
        let dir = tempdir().unwrap();
        let result = locate("missing.xml", dir.path(), &ResolverConfig::default());
        match result {
            Err(LocateError::NotFound { candidate, .. }) => {
                assert_eq!(candidate, dir.path().join("missing.xml"));
            }
            other => panic!("expected NotFound, got {:?}", other),
        }
    }

    #[test]
    fn file_uri_resolves() {
        let dir = tempdir().unwrap();
        let core = dir.path().join("core.xml");
        touch(&core);

        let uri = format!("file://{}", core.display());
        let located = locate(&uri, Path::new("/"), &ResolverConfig::default()).unwrap();
        assert_eq!(located, core.canonicalize().unwrap());
    }

    #[test]
    fn url_uses_mapping() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("vocabularies/Org.OData.Core.V1.xml"));

        let config = ResolverConfig::default().uri_mapping("https://oasis.example/odata", dir.path());
        let located = locate(
            "https://oasis.example/odata/vocabularies/Org.OData.Core.V1.xml",
            Path::new("/"),
            &config,
        )
        .unwrap();
        assert!(located.ends_with("vocabularies/Org.OData.Core.V1.xml"));
    }

    #[test]
    fn url_falls_back_to_search_path_by_file_name() {
        let dir = tempdir().unwrap();
        touch(&dir.path().join("Org.OData.Core.V1.xml"));

        let config = ResolverConfig::default().search_path(dir.path());
        let located = locate(
            "https://oasis.example/vocabularies/Org.OData.Core.V1.xml",
            Path::new("/"),
            &config,
        );
        assert!(located.is_ok());
    }

    #[test]
    fn unmapped_url_is_unresolvable() {
        let result = locate(
            "https://oasis.example/vocabularies/Org.OData.Core.V1.xml",
            Path::new("/"),
            &ResolverConfig::default(),
        );
        assert!(matches!(result, Err(LocateError::Unresolvable { .. })));
    }

    #[test]
    fn empty_uri_is_unresolvable() {
        let result = locate("#only-fragment", Path::new("/"), &ResolverConfig::default());
        assert!(matches!(result, Err(LocateError::Unresolvable { .. })));
    }

    #[test]
    fn map_url_strips_leading_slash() {
        let mappings = vec![UriMapping {
            remote_prefix: "https://oasis.example/odata".into(),
            local_base: PathBuf::from("/local"),
        }];
        assert_eq!(
            map_url("https://oasis.example/odata/Core.xml", &mappings),
            Some(PathBuf::from("/local/Core.xml"))
        );
        assert_eq!(map_url("https://other.example/Core.xml", &mappings), None);
    }
}
