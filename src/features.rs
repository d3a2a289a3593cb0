//! Class feature resolution and ancestor field collection.

use std::collections::{HashSet, VecDeque};

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::EngineError;
use crate::index::{lookup_for, Indices, RecordLookup};
use crate::types::{DeriveOptions, Inheritance, Record, Relation, VocabularyGraph};

/// What a class brings to a schema: its record, its own fields and its parents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectFeatures<'g> {
    pub base_item: &'g Record,
    /// Property records whose `domainIncludes` names this class.
    pub fields: Vec<&'g Record>,
    /// Parent class ids from `subClassOf`, in source order.
    pub sub_classes: Vec<&'g str>,
}

/// Resolve the features of a class by name.
///
/// `name` is prefixed with `options.prefix` unless it already carries one.
/// Uses the indices when given, otherwise scans the graph.
///
/// # Errors
///
/// Returns `EngineError::NotFound` if no record has the class id, or
/// `EngineError::MalformedRelationship` if its `subClassOf` is malformed.
pub fn resolve_object_features<'g>(
    name: &str,
    graph: &'g VocabularyGraph,
    options: &DeriveOptions,
    indices: Option<&'g Indices>,
) -> Result<ObjectFeatures<'g>, EngineError> {
    let lookup = lookup_for(graph, indices);
    features_of(lookup.as_ref(), &options.class_id(name))
}

/// Resolve the features of a class by id through `lookup`.
pub(crate) fn features_of<'g>(
    lookup: &dyn RecordLookup<'g>,
    class_id: &str,
) -> Result<ObjectFeatures<'g>, EngineError> {
    let base_item = lookup.record(class_id).ok_or_else(|| EngineError::NotFound {
        id: class_id.to_string(),
    })?;

    Ok(ObjectFeatures {
        base_item,
        fields: lookup.fields_of(class_id),
        sub_classes: base_item.references(Relation::SubClassOf)?,
    })
}

/// Own fields of every ancestor visited, keyed by ancestor id in visit order.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AncestorFields<'g>(IndexMap<&'g str, Vec<&'g Record>>);

impl<'g> AncestorFields<'g> {
    /// Own fields of `ancestor_id`, if it was visited.
    pub fn get(&self, ancestor_id: &str) -> Option<&[&'g Record]> {
        self.0.get(ancestor_id).map(Vec::as_slice)
    }

    pub fn contains(&self, ancestor_id: &str) -> bool {
        self.0.contains_key(ancestor_id)
    }

    /// Visited ancestor ids, in visit order.
    pub fn ids(&self) -> impl Iterator<Item = &'g str> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'g str, &[&'g Record])> + '_ {
        self.0.iter().map(|(id, fields)| (*id, fields.as_slice()))
    }

    /// Ancestor id -> ids of its own fields, in visit order.
    pub fn field_ids(&self) -> IndexMap<&'g str, Vec<&'g str>> {
        self.0
            .iter()
            .map(|(id, fields)| (*id, fields.iter().map(|f| f.id.as_str()).collect()))
            .collect()
    }

    /// Fields of the whole ancestor chain, concatenated in visit order.
    pub fn flattened(&self) -> Vec<&'g Record> {
        self.0.values().flatten().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Collect the own fields of every ancestor of `class_id`.
///
/// The class itself is not included. Each ancestor is visited once even
/// when the `subClassOf` graph has cycles or diamonds. Parents outside the
/// graph (such as `rdfs:Class`) contribute no fields and are skipped.
///
/// # Errors
///
/// Returns `EngineError::NotFound` if `class_id` is missing from the graph,
/// or `EngineError::MalformedRelationship` for a malformed `subClassOf`.
pub fn collect_ancestor_fields<'g>(
    lookup: &dyn RecordLookup<'g>,
    class_id: &str,
    inheritance: Inheritance,
) -> Result<AncestorFields<'g>, EngineError> {
    let start = features_of(lookup, class_id)?;

    let mut ancestors = AncestorFields::default();
    let mut visited: HashSet<&str> = HashSet::new();
    visited.insert(start.base_item.id.as_str());

    let mut queue: VecDeque<&'g str> = VecDeque::new();
    enqueue_parents(&mut queue, &start.sub_classes, inheritance);

    while let Some(ancestor_id) = queue.pop_front() {
        if !visited.insert(ancestor_id) {
            tracing::debug!(class = class_id, ancestor = ancestor_id, "ancestor already visited");
            continue;
        }

        if lookup.record(ancestor_id).is_none() {
            tracing::debug!(class = class_id, ancestor = ancestor_id, "ancestor not in graph");
            continue;
        }

        let features = features_of(lookup, ancestor_id)?;
        enqueue_parents(&mut queue, &features.sub_classes, inheritance);
        ancestors.0.insert(features.base_item.id.as_str(), features.fields);
    }

    tracing::debug!(class = class_id, ancestors = ancestors.len(), "collected ancestor fields");
    Ok(ancestors)
}

fn enqueue_parents<'g>(
    queue: &mut VecDeque<&'g str>,
    parents: &[&'g str],
    inheritance: Inheritance,
) {
    match inheritance {
        Inheritance::AllParents => queue.extend(parents.iter().copied()),
        Inheritance::FirstParent => queue.extend(parents.first().copied()),
    }
}
