//! The merged, read-only model handed to downstream consumers.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

use serde::{Serialize, Serializer};

use crate::types::{ElementKey, ElementKind, SchemaElement};

/// An element in a merged schema together with the document that declared
/// it first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedElement {
    #[serde(flatten)]
    pub element: SchemaElement,
    pub source: PathBuf,
    /// Other documents declaring a structurally identical element, in
    /// discovery order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub redeclared_in: Vec<PathBuf>,
}

impl MergedElement {
    /// Every document that declares this element, starting with `source`.
    pub fn declared_in(&self) -> impl Iterator<Item = &Path> {
        std::iter::once(self.source.as_path()).chain(self.redeclared_in.iter().map(PathBuf::as_path))
    }
}

/// Union of every fragment sharing one namespace.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MergedSchema {
    pub namespace: String,
    #[serde(skip_serializing_if = "BTreeSet::is_empty")]
    pub aliases: BTreeSet<String>,
    /// Contributing documents in discovery order.
    pub sources: Vec<PathBuf>,
    #[serde(serialize_with = "elements_as_list")]
    pub elements: BTreeMap<ElementKey, MergedElement>,
}

impl MergedSchema {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            aliases: BTreeSet::new(),
            sources: Vec::new(),
            elements: BTreeMap::new(),
        }
    }

    /// Find elements by simple name, optionally restricted to one kind.
    ///
    /// Several elements can share a name (function overloads, annotation
    /// blocks with different qualifiers).
    pub fn find<'a>(
        &'a self,
        name: &str,
        kind: Option<ElementKind>,
    ) -> impl Iterator<Item = &'a MergedElement> + 'a {
        let name = name.to_string();
        self.elements
            .iter()
            .filter(move |(key, _)| key.name == name && kind.map_or(true, |k| key.kind == k))
            .map(|(_, element)| element)
    }

    pub fn contains(&self, name: &str, kind: Option<ElementKind>) -> bool {
        self.find(name, kind).next().is_some()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

fn elements_as_list<S: Serializer>(
    elements: &BTreeMap<ElementKey, MergedElement>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    serializer.collect_seq(elements.values())
}

/// Map from namespace to merged schema, plus the alias tables needed to
/// interpret qualified names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedModel {
    pub schemas: BTreeMap<String, MergedSchema>,
    /// Aliases declared on `Schema` elements, valid everywhere.
    pub aliases: BTreeMap<String, String>,
    /// Aliases declared on `edmx:Include`, valid only in the declaring document.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub document_aliases: BTreeMap<PathBuf, BTreeMap<String, String>>,
}

impl MergedModel {
    pub fn schema(&self, namespace: &str) -> Option<&MergedSchema> {
        self.schemas.get(namespace)
    }

    pub fn namespaces(&self) -> impl Iterator<Item = &str> {
        self.schemas.keys().map(String::as_str)
    }

    /// Total number of merged elements across all namespaces.
    pub fn element_count(&self) -> usize {
        self.schemas.values().map(MergedSchema::len).sum()
    }

    /// Map a namespace or alias qualifier to a namespace, as seen from
    /// `source`.
    pub fn namespace_for<'a>(&'a self, qualifier: &'a str, source: &Path) -> Option<&'a str> {
        if self.schemas.contains_key(qualifier) {
            return Some(qualifier);
        }
        if let Some(namespace) = self.aliases.get(qualifier) {
            return Some(namespace);
        }
        self.document_aliases
            .get(source)
            .and_then(|aliases| aliases.get(qualifier))
            .map(String::as_str)
    }

    /// Look up a qualified name (`Namespace.Name` or `Alias.Name`).
    pub fn lookup(
        &self,
        qualified: &str,
        kind: Option<ElementKind>,
        source: &Path,
    ) -> Option<&MergedElement> {
        let (qualifier, name) = qualified.rsplit_once('.')?;
        let namespace = self.namespace_for(qualifier, source)?;
        self.schemas.get(namespace)?.find(name, kind).next()
    }
}
