//! Dangling-reference detection over a merged model.
//!
//! Every name an element refers to (property and parameter types, base
//! types, import targets, annotation terms and annotation targets) is looked
//! up in the merged model. Unresolved names become warnings; the model is
//! never modified.

use std::path::Path;

use crate::model::{MergedElement, MergedModel};
use crate::report::{ErrorKind, Finding, Findings};
use crate::types::{ElementKind, Member, MemberKind};

/// Base-type chains longer than this are treated as broken.
const MAX_BASE_TYPE_HOPS: usize = 32;

/// Built-in `Edm` types that are never declared in a document.
const EDM_TYPES: &[&str] = &[
    "Binary",
    "Boolean",
    "Byte",
    "Date",
    "DateTime",
    "DateTimeOffset",
    "Decimal",
    "Double",
    "Duration",
    "Guid",
    "Int16",
    "Int32",
    "Int64",
    "SByte",
    "Single",
    "Stream",
    "String",
    "Time",
    "TimeOfDay",
    "Untyped",
    "PrimitiveType",
    "ComplexType",
    "EntityType",
    "AnnotationPath",
    "AnyPropertyPath",
    "ModelElementPath",
    "NavigationPropertyPath",
    "PropertyPath",
    "Geography",
    "GeographyPoint",
    "GeographyLineString",
    "GeographyPolygon",
    "GeographyMultiPoint",
    "GeographyMultiLineString",
    "GeographyMultiPolygon",
    "GeographyCollection",
    "Geometry",
    "GeometryPoint",
    "GeometryLineString",
    "GeometryPolygon",
    "GeometryMultiPoint",
    "GeometryMultiLineString",
    "GeometryMultiPolygon",
    "GeometryCollection",
];

/// Check every reference in `model` and return one finding per dangling name.
///
/// Findings follow namespace, element and member order, so the same model
/// always yields the same list.
pub fn check(model: &MergedModel) -> Findings {
    let mut checker = Checker {
        model,
        findings: Findings::new(),
    };

    for schema in model.schemas.values() {
        for (key, merged) in &schema.elements {
            let identity = format!("{}.{}", schema.namespace, key);
            checker.check_element(&identity, merged);
        }
    }

    checker.findings
}

struct Checker<'a> {
    model: &'a MergedModel,
    findings: Findings,
}

impl<'a> Checker<'a> {
    fn check_element(&mut self, identity: &str, merged: &MergedElement) {
        let element = &merged.element;
        // Include aliases of every declaring document apply
        let scopes: Vec<&Path> = merged.declared_in().collect();
        let scopes = scopes.as_slice();

        if element.kind == ElementKind::AnnotationTarget {
            self.check_target(identity, &element.name, scopes);
        }

        if let Some(type_ref) = &element.type_ref {
            // TypeDefinition and EnumType carry a primitive underlying type
            self.check_name(identity, type_ref, ElementKind::Type, scopes);
        }
        if let Some(return_type) = &element.return_type {
            self.check_name(identity, return_type, ElementKind::Type, scopes);
        }

        for member in &element.members {
            let referrer = if member.kind == MemberKind::Annotation {
                identity.to_string()
            } else {
                format!("{}/{}", identity, member.name)
            };
            if let (Some(target), Some(expected)) = (&member.type_ref, expected_kind(member)) {
                self.check_name(&referrer, target, expected, scopes);
            }
            for term in &member.annotations {
                self.check_name(&referrer, term, ElementKind::Term, scopes);
            }
        }
    }

    fn check_name(
        &mut self,
        referrer: &str,
        name: &str,
        expected: ElementKind,
        scopes: &[&Path],
    ) {
        let name = unwrap_collection(name);
        if is_builtin(name) || self.find(name, Some(expected), scopes).is_some() {
            return;
        }

        self.findings.push(
            Finding::new(
                ErrorKind::MissingTypeReference,
                format!("{} references undefined {} {}", referrer, expected, name),
            )
            .at(referrer),
        );
    }

    fn check_target(&mut self, identity: &str, target: &str, scopes: &[&Path]) {
        if self.target_exists(target, scopes) {
            return;
        }

        self.findings.push(
            Finding::new(
                ErrorKind::MissingAnnotationTarget,
                format!("annotation target {} does not exist", target),
            )
            .at(identity),
        );
    }

    fn target_exists(&self, target: &str, scopes: &[&Path]) -> bool {
        let (head, rest) = split_target(target);
        let head = strip_signature(head);

        let names_namespace = scopes
            .iter()
            .any(|scope| self.model.namespace_for(head, scope).is_some());
        if names_namespace && rest.is_none() {
            return true;
        }

        let Some(merged) = self.find(head, None, scopes) else {
            return false;
        };

        let Some(segment) = rest.and_then(|r| r.split('/').next()) else {
            return true;
        };
        // Type casts and term casts are not followed
        if segment.is_empty() || segment.contains('.') || segment.starts_with('@') {
            return true;
        }

        match merged.element.kind {
            ElementKind::Type => self.type_has_member(merged, segment),
            ElementKind::Container => merged.element.member(segment).is_some(),
            _ => true,
        }
    }

    /// Look for a member on a type or any of its base types.
    fn type_has_member(&self, start: &MergedElement, name: &str) -> bool {
        let mut current = start;
        for _ in 0..MAX_BASE_TYPE_HOPS {
            if current.element.member(name).is_some() {
                return true;
            }
            let Some(base) = &current.element.type_ref else {
                return false;
            };
            let scopes: Vec<&Path> = current.declared_in().collect();
            match self.find(base, Some(ElementKind::Type), &scopes) {
                Some(next) => current = next,
                None => return false,
            }
        }
        false
    }

    /// Find a declaration by qualified name, as seen from any of `scopes`.
    /// Annotation blocks are not declarations and never match.
    fn find(
        &self,
        qualified: &str,
        kind: Option<ElementKind>,
        scopes: &[&Path],
    ) -> Option<&'a MergedElement> {
        let model: &'a MergedModel = self.model;
        let (qualifier, name) = qualified.rsplit_once('.')?;
        scopes.iter().find_map(|scope| {
            let namespace = model.namespace_for(qualifier, scope)?;
            model
                .schema(namespace)?
                .find(name, kind)
                .find(|merged| merged.element.kind != ElementKind::AnnotationTarget)
        })
    }
}

/// Kind of declaration a member's reference must point at.
fn expected_kind(member: &Member) -> Option<ElementKind> {
    match member.kind {
        MemberKind::Property
        | MemberKind::NavigationProperty
        | MemberKind::Parameter
        | MemberKind::EntitySet
        | MemberKind::Singleton => Some(ElementKind::Type),
        MemberKind::ActionImport => Some(ElementKind::Action),
        MemberKind::FunctionImport => Some(ElementKind::Function),
        MemberKind::Annotation => Some(ElementKind::Term),
        MemberKind::EnumMember => None,
    }
}

fn unwrap_collection(name: &str) -> &str {
    name.strip_prefix("Collection(")
        .and_then(|inner| inner.strip_suffix(')'))
        .unwrap_or(name)
        .trim()
}

fn is_builtin(name: &str) -> bool {
    name.strip_prefix("Edm.")
        .is_some_and(|simple| EDM_TYPES.contains(&simple))
}

/// Split a target path at the first `/` outside parentheses.
fn split_target(target: &str) -> (&str, Option<&str>) {
    let mut depth = 0usize;
    for (i, c) in target.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            '/' if depth == 0 => return (&target[..i], Some(&target[i + 1..])),
            _ => {}
        }
    }
    (target, None)
}

/// `NS.Find(Edm.Int32)` -> `NS.Find`
fn strip_signature(head: &str) -> &str {
    head.find('(').map_or(head, |i| &head[..i])
}
