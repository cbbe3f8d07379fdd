//! Single-file CSDL XML parsing.
//!
//! Turns one `edmx:Edmx` document into its schema fragments plus the
//! cross-file references it declares. Element and attribute names are
//! matched by local name, so CSDL 4.0 and 4.01 namespaces (and the older
//! 1.0-3.0 edmx namespaces) parse the same way.

use std::collections::BTreeMap;
use std::path::Path;

use roxmltree::{Node, ParsingOptions};

use crate::error::ParseError;
use crate::types::{
    ElementKind, Fragment, Include, Member, MemberKind, ParsedFile, ReferenceLocator,
    SchemaElement,
};

/// Upper bound on a single document's size.
const MAX_DOCUMENT_SIZE: usize = 64 * 1024 * 1024;

/// Parser that turns one file into fragments and declared references.
///
/// The resolver treats implementations as a black box.
pub trait SchemaParser {
    fn parse_file(&self, path: &Path) -> Result<ParsedFile, ParseError>;
}

/// `roxmltree`-backed CSDL parser.
#[derive(Debug, Clone, Copy, Default)]
pub struct CsdlParser;

impl CsdlParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse CSDL from a string. `path` is only used in error messages.
    pub fn parse_str(&self, content: &str, path: &Path) -> Result<ParsedFile, ParseError> {
        if content.len() > MAX_DOCUMENT_SIZE {
            return Err(too_large(path, content.len() as u64));
        }

        let options = ParsingOptions {
            allow_dtd: true,
            ..Default::default()
        };
        let doc = roxmltree::Document::parse_with_options(content, options).map_err(|source| {
            ParseError::InvalidXml {
                path: path.to_path_buf(),
                source,
            }
        })?;
        let root = doc.root_element();

        match root.tag_name().name() {
            "Edmx" => parse_edmx(root, path),
            "Schema" => Ok(ParsedFile {
                fragments: vec![parse_schema(root, path)?],
                references: Vec::new(),
            }),
            other => Err(invalid(
                path,
                format!("expected Edmx or Schema root element, found {}", other),
            )),
        }
    }
}

impl SchemaParser for CsdlParser {
    fn parse_file(&self, path: &Path) -> Result<ParsedFile, ParseError> {
        if !path.exists() {
            return Err(ParseError::NotFound {
                path: path.to_path_buf(),
            });
        }

        let size = std::fs::metadata(path)
            .map_err(|source| ParseError::Read {
                path: path.to_path_buf(),
                source,
            })?
            .len();
        if size > MAX_DOCUMENT_SIZE as u64 {
            return Err(too_large(path, size));
        }

        let content = std::fs::read_to_string(path).map_err(|source| ParseError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        self.parse_str(&content, path)
    }
}

fn too_large(path: &Path, size: u64) -> ParseError {
    invalid(
        path,
        format!(
            "document too large: {} bytes (max {} bytes)",
            size, MAX_DOCUMENT_SIZE
        ),
    )
}

fn invalid(path: &Path, message: impl Into<String>) -> ParseError {
    ParseError::InvalidCsdl {
        path: path.to_path_buf(),
        message: message.into(),
    }
}

fn child_elements<'a, 'input: 'a>(
    node: Node<'a, 'input>,
) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

fn required_attr<'a>(node: Node<'a, '_>, name: &str, path: &Path) -> Result<&'a str, ParseError> {
    node.attribute(name).ok_or_else(|| {
        invalid(
            path,
            format!(
                "{} element missing {} attribute",
                node.tag_name().name(),
                name
            ),
        )
    })
}

/// Collect attributes other than the ones consumed explicitly.
fn facets(node: Node<'_, '_>, consumed: &[&str]) -> BTreeMap<String, String> {
    node.attributes()
        .filter(|a| a.namespace().is_none() && !consumed.contains(&a.name()))
        .map(|a| (a.name().to_string(), a.value().to_string()))
        .collect()
}

fn parse_edmx(root: Node<'_, '_>, path: &Path) -> Result<ParsedFile, ParseError> {
    let mut parsed = ParsedFile::default();

    for child in child_elements(root) {
        match child.tag_name().name() {
            "Reference" => parsed.references.push(parse_reference(child, path)?),
            "DataServices" => {
                for schema in child_elements(child).filter(|n| n.tag_name().name() == "Schema") {
                    parsed.fragments.push(parse_schema(schema, path)?);
                }
            }
            _ => {}
        }
    }

    Ok(parsed)
}

fn parse_reference(node: Node<'_, '_>, path: &Path) -> Result<ReferenceLocator, ParseError> {
    let uri = required_attr(node, "Uri", path)?;

    let includes = child_elements(node)
        .filter(|n| n.tag_name().name() == "Include")
        .map(|include| {
            Ok(Include {
                namespace: required_attr(include, "Namespace", path)?.to_string(),
                alias: include.attribute("Alias").map(str::to_string),
            })
        })
        .collect::<Result<Vec<_>, ParseError>>()?;

    Ok(ReferenceLocator {
        uri: uri.to_string(),
        includes,
    })
}

fn parse_schema(node: Node<'_, '_>, path: &Path) -> Result<Fragment, ParseError> {
    let mut fragment = Fragment::new(required_attr(node, "Namespace", path)?);
    fragment.alias = node.attribute("Alias").map(str::to_string);

    for child in child_elements(node) {
        let tag = child.tag_name().name();
        if let Some(kind) = ElementKind::from_tag(tag) {
            fragment.elements.push(parse_element(child, kind, path)?);
        }
    }

    Ok(fragment)
}

fn parse_element(
    node: Node<'_, '_>,
    kind: ElementKind,
    path: &Path,
) -> Result<SchemaElement, ParseError> {
    let tag = node.tag_name().name();

    let (name, consumed): (&str, &[&str]) = match kind {
        ElementKind::AnnotationTarget => (required_attr(node, "Target", path)?, &["Target"][..]),
        ElementKind::Type => (
            required_attr(node, "Name", path)?,
            &["Name", "BaseType", "UnderlyingType"][..],
        ),
        ElementKind::Term => (required_attr(node, "Name", path)?, &["Name", "Type"][..]),
        _ => (required_attr(node, "Name", path)?, &["Name"][..]),
    };

    let mut element = SchemaElement::new(kind, tag, name);
    element.type_ref = match kind {
        ElementKind::Type => node
            .attribute("BaseType")
            .or_else(|| node.attribute("UnderlyingType")),
        ElementKind::Term => node.attribute("Type"),
        _ => None,
    }
    .map(str::to_string);
    element.facets = facets(node, consumed);

    for child in child_elements(node) {
        let child_tag = child.tag_name().name();
        match child_tag {
            "ReturnType" => {
                element.return_type = child.attribute("Type").map(str::to_string);
            }
            "Key" => {
                let keys: Vec<&str> = child_elements(child)
                    .filter_map(|r| r.attribute("Name"))
                    .collect();
                element.facets.insert("Key".to_string(), keys.join(","));
            }
            _ => {
                if let Some(member_kind) = MemberKind::from_tag(child_tag) {
                    element.members.push(parse_member(child, member_kind, path)?);
                }
            }
        }
    }

    Ok(element)
}

fn parse_member(node: Node<'_, '_>, kind: MemberKind, path: &Path) -> Result<Member, ParseError> {
    let name = match kind {
        MemberKind::Annotation => {
            let term = required_attr(node, "Term", path)?;
            match node.attribute("Qualifier") {
                Some(qualifier) => format!("{}#{}", term, qualifier),
                None => term.to_string(),
            }
        }
        _ => required_attr(node, "Name", path)?.to_string(),
    };

    let reference_attr = kind.reference_attribute();
    let mut consumed = vec!["Name"];
    consumed.extend(reference_attr);

    let mut member = Member::new(kind, name);
    member.type_ref = reference_attr
        .and_then(|attr| node.attribute(attr))
        .map(str::to_string);
    member.facets = facets(node, &consumed);
    member.annotations = child_elements(node)
        .filter(|n| n.tag_name().name() == "Annotation")
        .filter_map(|n| n.attribute("Term"))
        .map(str::to_string)
        .collect();

    Ok(member)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const SERVICE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<edmx:Edmx Version="4.0" xmlns:edmx="http://docs.oasis-open.org/odata/ns/edmx">
  <edmx:Reference Uri="core.xml">
    <edmx:Include Namespace="Test.Core" Alias="Core"/>
  </edmx:Reference>
  <edmx:DataServices>
    <Schema Namespace="Test.Service" Alias="Svc" xmlns="http://docs.oasis-open.org/odata/ns/edm">
      <EntityType Name="Order" BaseType="Core.Base">
        <Key><PropertyRef Name="ID"/></Key>
        <Property Name="ID" Type="Edm.Int32" Nullable="false"/>
        <NavigationProperty Name="Items" Type="Collection(Core.Widget)"/>
      </EntityType>
      <Function Name="Top" IsBound="false">
        <Parameter Name="count" Type="Edm.Int32"/>
        <ReturnType Type="Collection(Test.Service.Order)"/>
      </Function>
      <EntityContainer Name="Container">
        <EntitySet Name="Orders" EntityType="Test.Service.Order"/>
        <FunctionImport Name="Top" Function="Test.Service.Top"/>
      </EntityContainer>
      <Annotations Target="Test.Service.Order/ID" Qualifier="Tablet">
        <Annotation Term="Core.Description" String="Order id"/>
      </Annotations>
    </Schema>
  </edmx:DataServices>
</edmx:Edmx>"#;

    fn parse(content: &str) -> Result<ParsedFile, ParseError> {
        CsdlParser::new().parse_str(content, Path::new("test.xml"))
    }

    #[test]
    fn parses_references_and_includes() {
        let parsed = parse(SERVICE).unwrap();
        assert_eq!(parsed.references.len(), 1);
        let reference = &parsed.references[0];
        assert_eq!(reference.uri, "core.xml");
        assert_eq!(reference.includes[0].namespace, "Test.Core");
        assert_eq!(reference.includes[0].alias.as_deref(), Some("Core"));
    }

    #[test]
    fn parses_schema_elements() {
        let parsed = parse(SERVICE).unwrap();
        let fragment = &parsed.fragments[0];
        assert_eq!(fragment.namespace, "Test.Service");
        assert_eq!(fragment.alias.as_deref(), Some("Svc"));

        let kinds: Vec<ElementKind> = fragment.elements.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            [
                ElementKind::Type,
                ElementKind::Function,
                ElementKind::Container,
                ElementKind::AnnotationTarget
            ]
        );

        let order = &fragment.elements[0];
        assert_eq!(order.type_ref.as_deref(), Some("Core.Base"));
        assert_eq!(order.facets.get("Key").map(String::as_str), Some("ID"));
        let id = order.member("ID").unwrap();
        assert_eq!(id.type_ref.as_deref(), Some("Edm.Int32"));
        assert_eq!(id.facets.get("Nullable").map(String::as_str), Some("false"));
        let items = order.member("Items").unwrap();
        assert_eq!(items.kind, MemberKind::NavigationProperty);
        assert_eq!(items.type_ref.as_deref(), Some("Collection(Core.Widget)"));
    }

    #[test]
    fn parses_function_signature_and_return_type() {
        let parsed = parse(SERVICE).unwrap();
        let top = &parsed.fragments[0].elements[1];
        assert_eq!(
            top.return_type.as_deref(),
            Some("Collection(Test.Service.Order)")
        );
        assert_eq!(top.key().signature, vec!["Edm.Int32".to_string()]);
    }

    #[test]
    fn parses_container_children() {
        let parsed = parse(SERVICE).unwrap();
        let container = &parsed.fragments[0].elements[2];
        let orders = container.member("Orders").unwrap();
        assert_eq!(orders.kind, MemberKind::EntitySet);
        assert_eq!(orders.type_ref.as_deref(), Some("Test.Service.Order"));
        let import = container.member("Top").unwrap();
        assert_eq!(import.type_ref.as_deref(), Some("Test.Service.Top"));
    }

    #[test]
    fn parses_annotation_block() {
        let parsed = parse(SERVICE).unwrap();
        let block = &parsed.fragments[0].elements[3];
        assert_eq!(block.name, "Test.Service.Order/ID");
        assert_eq!(block.key().signature, vec!["Tablet".to_string()]);
        let annotation = &block.members[0];
        assert_eq!(annotation.kind, MemberKind::Annotation);
        assert_eq!(annotation.type_ref.as_deref(), Some("Core.Description"));
        assert_eq!(
            annotation.facets.get("String").map(String::as_str),
            Some("Order id")
        );
    }

    #[test]
    fn accepts_bare_schema_root() {
        let parsed = parse(
            r#"<Schema Namespace="Bare" xmlns="http://docs.oasis-open.org/odata/ns/edm">
                 <ComplexType Name="Point"/>
               </Schema>"#,
        )
        .unwrap();
        assert!(parsed.references.is_empty());
        assert_eq!(parsed.fragments[0].namespace, "Bare");
    }

    #[test]
    fn rejects_unknown_root() {
        let result = parse("<root/>");
        assert!(matches!(result, Err(ParseError::InvalidCsdl { .. })));
    }

    #[test]
    fn rejects_malformed_xml() {
        let result = parse("<edmx:Edmx");
        assert!(matches!(result, Err(ParseError::InvalidXml { .. })));
    }

    #[test]
    fn rejects_schema_without_namespace() {
        let result = parse(
            r#"<Edmx><DataServices><Schema><EntityType Name="T"/></Schema></DataServices></Edmx>"#,
        );
        let err = result.unwrap_err();
        assert!(err.to_string().contains("Namespace"));
    }

    #[test]
    fn rejects_reference_without_uri() {
        let result = parse(r#"<Edmx><Reference/></Edmx>"#);
        assert!(matches!(result, Err(ParseError::InvalidCsdl { .. })));
    }

    #[test]
    fn parse_file_not_found() {
        let result = CsdlParser::new().parse_file(Path::new("/nonexistent/service.xml"));
        assert!(matches!(result, Err(ParseError::NotFound { .. })));
    }

    #[test]
    fn parse_file_reads_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", SERVICE).unwrap();

        let parsed = CsdlParser::new().parse_file(file.path()).unwrap();
        assert_eq!(parsed.fragments.len(), 1);
    }

    #[test]
    fn oversized_file_is_rejected_before_reading() {
        let file = NamedTempFile::new().unwrap();
        // Sparse, so nothing is actually written
        file.as_file()
            .set_len(MAX_DOCUMENT_SIZE as u64 + 1)
            .unwrap();

        match CsdlParser::new().parse_file(file.path()) {
            Err(ParseError::InvalidCsdl { message, .. }) => {
                assert!(message.contains("too large"), "{}", message);
            }
            other => panic!("expected InvalidCsdl, got {:?}", other),
        }
    }
}
