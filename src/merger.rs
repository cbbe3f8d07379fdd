//! Namespace merging of loaded documents.
//!
//! Fragments are grouped by namespace and their elements keyed by
//! (kind, name, signature). The merged maps are ordered, so the result does
//! not depend on the order independent branches of the graph were walked;
//! discovery order only decides which of two identical declarations is kept
//! (the first seen).

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::{debug, trace};

use crate::model::{MergedElement, MergedModel, MergedSchema};
use crate::report::{ErrorKind, Finding, Findings};
use crate::types::{Document, ElementKey, ElementKind, Fragment, SchemaElement};

/// Merge every fragment of every document into one model.
///
/// Conflicting redefinitions are returned as `ConflictingDefinition`
/// findings, one per distinct definition; the first declaration stays in
/// the model.
pub fn merge(documents: &[Arc<Document>]) -> (MergedModel, Findings) {
    let mut merger = Merger::default();
    for document in documents {
        merger.add_document(document);
    }
    debug!(
        "Merged {} documents into {} namespaces ({} conflicts)",
        documents.len(),
        merger.model.schemas.len(),
        merger.findings.len()
    );
    (merger.model, merger.findings)
}

#[derive(Default)]
struct Merger {
    model: MergedModel,
    findings: Findings,
    /// Distinct definitions that lost to the kept one, per namespace and key.
    rejected: BTreeMap<(String, ElementKey), Vec<SchemaElement>>,
}

impl Merger {
    fn add_document(&mut self, document: &Document) {
        for fragment in &document.fragments {
            self.add_fragment(document, fragment);
        }

        for include in document.references.iter().flat_map(|r| &r.includes) {
            let Some(alias) = &include.alias else {
                continue;
            };
            let aliases = self
                .model
                .document_aliases
                .entry(document.path.clone())
                .or_default();
            match aliases.get(alias) {
                Some(bound) if bound != &include.namespace => {
                    self.findings.push(
                        Finding::new(
                            ErrorKind::ConflictingDefinition,
                            format!(
                                "alias {} is bound to both {} and {}",
                                alias, bound, include.namespace
                            ),
                        )
                        .at(document.path.display().to_string()),
                    );
                }
                Some(_) => {}
                None => {
                    aliases.insert(alias.clone(), include.namespace.clone());
                }
            }
        }
    }

    fn add_fragment(&mut self, document: &Document, fragment: &Fragment) {
        let namespace = &fragment.namespace;
        trace!("Merging {} from {}", namespace, document.path.display());

        if let Some(alias) = &fragment.alias {
            self.bind_alias(document, alias, namespace);
        }

        let schema = self
            .model
            .schemas
            .entry(namespace.clone())
            .or_insert_with(|| MergedSchema::new(namespace.clone()));
        if !schema.sources.contains(&document.path) {
            schema.sources.push(document.path.clone());
        }
        if let Some(alias) = &fragment.alias {
            schema.aliases.insert(alias.clone());
        }

        for element in &fragment.elements {
            match schema.elements.entry(element.key()) {
                Entry::Vacant(slot) => {
                    slot.insert(MergedElement {
                        element: element.clone(),
                        source: document.path.clone(),
                        redeclared_in: Vec::new(),
                    });
                }
                Entry::Occupied(existing) => {
                    let existing = existing.into_mut();
                    if structurally_identical(&existing.element, element) {
                        debug!(
                            "Identical redeclaration of {}.{} in {}",
                            namespace,
                            existing.element.name,
                            document.path.display()
                        );
                        if existing.source != document.path
                            && !existing.redeclared_in.contains(&document.path)
                        {
                            existing.redeclared_in.push(document.path.clone());
                        }
                        continue;
                    }

                    // One finding per distinct definition, however often it recurs
                    let rejected = self
                        .rejected
                        .entry((namespace.clone(), element.key()))
                        .or_default();
                    if rejected.iter().any(|seen| structurally_identical(seen, element)) {
                        continue;
                    }
                    rejected.push(element.clone());

                    let qualified = format!("{}.{}", namespace, element.key());
                    self.findings.push(
                        Finding::new(
                            ErrorKind::ConflictingDefinition,
                            format!(
                                "{} is defined differently in {} and {}",
                                qualified,
                                existing.source.display(),
                                document.path.display()
                            ),
                        )
                        .at(qualified),
                    );
                }
            }
        }
    }

    fn bind_alias(&mut self, document: &Document, alias: &str, namespace: &str) {
        match self.model.aliases.get(alias) {
            Some(bound) if bound != namespace => {
                self.findings.push(
                    Finding::new(
                        ErrorKind::ConflictingDefinition,
                        format!("alias {} is bound to both {} and {}", alias, bound, namespace),
                    )
                    .at(document.path.display().to_string()),
                );
            }
            Some(_) => {}
            None => {
                self.model
                    .aliases
                    .insert(alias.to_string(), namespace.to_string());
            }
        }
    }
}

/// Whether two declarations are harmless duplicates of each other.
///
/// Member order matters for types, actions and functions (property and
/// parameter order is significant) but not for containers or annotation
/// blocks.
pub fn structurally_identical(a: &SchemaElement, b: &SchemaElement) -> bool {
    if a.kind != b.kind
        || a.tag != b.tag
        || a.name != b.name
        || a.type_ref != b.type_ref
        || a.return_type != b.return_type
        || a.facets != b.facets
        || a.members.len() != b.members.len()
    {
        return false;
    }

    match a.kind {
        ElementKind::Container | ElementKind::AnnotationTarget => {
            let mut left = a.members.clone();
            let mut right = b.members.clone();
            left.sort();
            right.sort();
            left == right
        }
        _ => a.members == b.members,
    }
}
