//! Core types for parsed CSDL documents.

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

/// Kind tag of a named element declared inside a schema fragment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementKind {
    /// `EntityType`, `ComplexType`, `EnumType` or `TypeDefinition`.
    Type,
    /// `EntityContainer`.
    Container,
    Action,
    Function,
    Term,
    /// An `Annotations` block, named by its target path.
    AnnotationTarget,
}

impl ElementKind {
    /// Map a CSDL element tag to its kind.
    ///
    /// Returns `None` for tags that are not schema-level declarations.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "EntityType" | "ComplexType" | "EnumType" | "TypeDefinition" => Some(ElementKind::Type),
            "EntityContainer" => Some(ElementKind::Container),
            "Action" => Some(ElementKind::Action),
            "Function" => Some(ElementKind::Function),
            "Term" => Some(ElementKind::Term),
            "Annotations" => Some(ElementKind::AnnotationTarget),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ElementKind::Type => "type",
            ElementKind::Container => "container",
            ElementKind::Action => "action",
            ElementKind::Function => "function",
            ElementKind::Term => "term",
            ElementKind::AnnotationTarget => "annotation target",
        }
    }
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kind tag of a member nested inside an element.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MemberKind {
    Property,
    NavigationProperty,
    Parameter,
    EnumMember,
    EntitySet,
    Singleton,
    ActionImport,
    FunctionImport,
    Annotation,
}

impl MemberKind {
    /// Map a CSDL child tag to its member kind.
    pub fn from_tag(tag: &str) -> Option<Self> {
        match tag {
            "Property" => Some(MemberKind::Property),
            "NavigationProperty" => Some(MemberKind::NavigationProperty),
            "Parameter" => Some(MemberKind::Parameter),
            "Member" => Some(MemberKind::EnumMember),
            "EntitySet" => Some(MemberKind::EntitySet),
            "Singleton" => Some(MemberKind::Singleton),
            "ActionImport" => Some(MemberKind::ActionImport),
            "FunctionImport" => Some(MemberKind::FunctionImport),
            "Annotation" => Some(MemberKind::Annotation),
            _ => None,
        }
    }

    /// Attribute holding the name this member refers to, if any.
    pub fn reference_attribute(&self) -> Option<&'static str> {
        match self {
            MemberKind::Property
            | MemberKind::NavigationProperty
            | MemberKind::Parameter
            | MemberKind::Singleton => Some("Type"),
            MemberKind::EntitySet => Some("EntityType"),
            MemberKind::ActionImport => Some("Action"),
            MemberKind::FunctionImport => Some("Function"),
            MemberKind::Annotation => Some("Term"),
            MemberKind::EnumMember => None,
        }
    }
}

/// A member of an element: property, parameter, container child, annotation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct Member {
    pub kind: MemberKind,
    pub name: String,
    /// Referenced type, term, action or function name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<String>,
    /// Remaining attributes (`Nullable`, `MaxLength`, `Partner`, ...).
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub facets: BTreeMap<String, String>,
    /// Terms of annotations applied inline to this member.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub annotations: Vec<String>,
}

impl Member {
    pub fn new(kind: MemberKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            type_ref: None,
            facets: BTreeMap::new(),
            annotations: Vec::new(),
        }
    }

    pub fn with_type(mut self, type_ref: impl Into<String>) -> Self {
        self.type_ref = Some(type_ref.into());
        self
    }

    pub fn with_facet(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.facets.insert(key.into(), value.into());
        self
    }
}

/// Stable identity of an element within a namespace.
///
/// `signature` distinguishes action/function overloads (parameter types)
/// and qualified annotation blocks (the qualifier). It is empty otherwise.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ElementKey {
    pub kind: ElementKind,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub signature: Vec<String>,
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            _ if self.signature.is_empty() => f.write_str(&self.name),
            ElementKind::AnnotationTarget => write!(f, "{}#{}", self.name, self.signature[0]),
            _ => write!(f, "{}({})", self.name, self.signature.join(",")),
        }
    }
}

/// A named declaration inside a schema fragment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SchemaElement {
    pub kind: ElementKind,
    /// Original CSDL tag, e.g. `EntityType` or `EnumType`.
    pub tag: String,
    /// Element name, or the target path for annotation blocks.
    pub name: String,
    /// `BaseType`, `UnderlyingType`, or the `Type` of a term.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub type_ref: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub return_type: Option<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub facets: BTreeMap<String, String>,
    pub members: Vec<Member>,
}

impl SchemaElement {
    pub fn new(kind: ElementKind, tag: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind,
            tag: tag.into(),
            name: name.into(),
            type_ref: None,
            return_type: None,
            facets: BTreeMap::new(),
            members: Vec::new(),
        }
    }

    pub fn with_type(mut self, type_ref: impl Into<String>) -> Self {
        self.type_ref = Some(type_ref.into());
        self
    }

    pub fn with_member(mut self, member: Member) -> Self {
        self.members.push(member);
        self
    }

    pub fn key(&self) -> ElementKey {
        let signature = match self.kind {
            ElementKind::Action | ElementKind::Function => self
                .members
                .iter()
                .filter(|m| m.kind == MemberKind::Parameter)
                .map(|m| m.type_ref.clone().unwrap_or_default())
                .collect(),
            ElementKind::AnnotationTarget => {
                self.facets.get("Qualifier").cloned().into_iter().collect()
            }
            _ => Vec::new(),
        };
        ElementKey {
            kind: self.kind,
            name: self.name.clone(),
            signature,
        }
    }

    /// Find a non-annotation member by name.
    pub fn member(&self, name: &str) -> Option<&Member> {
        self.members
            .iter()
            .find(|m| m.kind != MemberKind::Annotation && m.name == name)
    }
}

/// One `Schema` block: a namespace-scoped unit of declarations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Fragment {
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    pub elements: Vec<SchemaElement>,
}

impl Fragment {
    pub fn new(namespace: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            alias: None,
            elements: Vec::new(),
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.alias = Some(alias.into());
        self
    }

    pub fn with_element(mut self, element: SchemaElement) -> Self {
        self.elements.push(element);
        self
    }
}

/// An `edmx:Include` namespace hint on a reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Include {
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
}

/// A declared cross-file reference (`edmx:Reference`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReferenceLocator {
    pub uri: String,
    pub includes: Vec<Include>,
}

impl ReferenceLocator {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            includes: Vec::new(),
        }
    }

    pub fn include(mut self, namespace: impl Into<String>, alias: Option<&str>) -> Self {
        self.includes.push(Include {
            namespace: namespace.into(),
            alias: alias.map(str::to_string),
        });
        self
    }
}

/// Output of the single-file parser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedFile {
    pub fragments: Vec<Fragment>,
    pub references: Vec<ReferenceLocator>,
}

/// One physical schema file and its parsed contents. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub path: PathBuf,
    pub fragments: Vec<Fragment>,
    pub references: Vec<ReferenceLocator>,
}

impl Document {
    pub fn new(path: PathBuf, parsed: ParsedFile) -> Self {
        Self {
            path,
            fragments: parsed.fragments,
            references: parsed.references,
        }
    }

    /// Directory that relative references are resolved against.
    pub fn base_dir(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    pub fn declares_namespace(&self, namespace: &str) -> bool {
        self.fragments.iter().any(|f| f.namespace == namespace)
    }
}

/// An edge between two loaded documents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedReference {
    pub source: PathBuf,
    pub target: PathBuf,
    /// Depth of the target, counted in reference hops from the entry document.
    pub depth: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn element_kind_from_tag() {
        assert_eq!(ElementKind::from_tag("EntityType"), Some(ElementKind::Type));
        assert_eq!(ElementKind::from_tag("EnumType"), Some(ElementKind::Type));
        assert_eq!(
            ElementKind::from_tag("EntityContainer"),
            Some(ElementKind::Container)
        );
        assert_eq!(
            ElementKind::from_tag("Annotations"),
            Some(ElementKind::AnnotationTarget)
        );
        assert_eq!(ElementKind::from_tag("Property"), None);
    }

    #[test]
    fn overloads_have_distinct_keys() {
        let by_id = SchemaElement::new(ElementKind::Function, "Function", "Find")
            .with_member(Member::new(MemberKind::Parameter, "id").with_type("Edm.Int32"));
        let by_name = SchemaElement::new(ElementKind::Function, "Function", "Find")
            .with_member(Member::new(MemberKind::Parameter, "name").with_type("Edm.String"));

        assert_ne!(by_id.key(), by_name.key());
        assert_eq!(by_id.key().to_string(), "Find(Edm.Int32)");
    }

    #[test]
    fn plain_type_key_has_no_signature() {
        let widget = SchemaElement::new(ElementKind::Type, "EntityType", "Widget")
            .with_member(Member::new(MemberKind::Property, "id").with_type("Edm.Int32"));
        let key = widget.key();
        assert!(key.signature.is_empty());
        assert_eq!(key.to_string(), "Widget");
    }

    #[test]
    fn member_lookup_skips_annotations() {
        let widget = SchemaElement::new(ElementKind::Type, "EntityType", "Widget")
            .with_member(Member::new(MemberKind::Annotation, "Core.Description"))
            .with_member(Member::new(MemberKind::Property, "Name").with_type("Edm.String"));

        assert!(widget.member("Name").is_some());
        assert!(widget.member("Core.Description").is_none());
    }

    #[test]
    fn document_declares_namespace() {
        let doc = Document::new(
            PathBuf::from("/schemas/core.xml"),
            ParsedFile {
                fragments: vec![Fragment::new("Test.Core")],
                references: vec![],
            },
        );
        assert!(doc.declares_namespace("Test.Core"));
        assert!(!doc.declares_namespace("Test.Other"));
        assert_eq!(doc.base_dir(), Path::new("/schemas"));
    }
}
