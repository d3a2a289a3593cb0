//! Lookup structures over a vocabulary graph.
//!
//! [`build_indices`] computes the id and field indices once per graph. The
//! resolver reads records through [`RecordLookup`], which is either backed by
//! those indices or by a linear scan of the graph.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::EngineError;
use crate::matcher::{has_id, match_any};
use crate::types::{Record, Relation, VocabularyGraph};

/// Derived lookup tables for one graph snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Indices {
    /// Record id -> position in the graph.
    pub id_index: HashMap<String, usize>,
    /// Class id -> ids of properties whose `domainIncludes` names it,
    /// in graph order.
    pub field_index: HashMap<String, Vec<String>>,
}

impl Indices {
    pub fn position(&self, id: &str) -> Option<usize> {
        self.id_index.get(id).copied()
    }

    /// Property ids declaring `class_id` as a domain.
    pub fn fields_of(&self, class_id: &str) -> &[String] {
        self.field_index
            .get(class_id)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

/// Build the id and field indices for a graph.
///
/// # Errors
///
/// Returns `EngineError::MalformedRelationship` if any record's
/// `domainIncludes` has an item without an `@id`.
pub fn build_indices(graph: &VocabularyGraph) -> Result<Indices, EngineError> {
    let mut id_index = HashMap::with_capacity(graph.len());
    let mut field_index: HashMap<String, Vec<String>> = HashMap::with_capacity(graph.len());

    for (position, record) in graph.iter().enumerate() {
        id_index.insert(record.id.clone(), position);
        field_index.insert(record.id.clone(), Vec::new());
    }

    let mut declarations = 0usize;
    for record in graph.iter() {
        for domain in record.references(Relation::DomainIncludes)? {
            if !id_index.contains_key(domain) {
                tracing::warn!(property = %record.id, domain, "domain class not in graph");
            }
            field_index
                .entry(domain.to_string())
                .or_default()
                .push(record.id.clone());
            declarations += 1;
        }
    }

    tracing::debug!(
        records = graph.len(),
        declarations,
        "built vocabulary indices"
    );

    Ok(Indices {
        id_index,
        field_index,
    })
}

/// Read access to records, by id and by domain class.
pub trait RecordLookup<'g> {
    /// The graph this lookup reads from.
    fn graph(&self) -> &'g VocabularyGraph;

    /// Record with the given id.
    fn record(&self, id: &str) -> Option<&'g Record>;

    /// Property records whose `domainIncludes` contains `class_id`,
    /// in graph order.
    fn fields_of(&self, class_id: &str) -> Vec<&'g Record>;
}

/// Lookup backed by precomputed [`Indices`].
#[derive(Debug, Clone, Copy)]
pub struct IndexedLookup<'g> {
    graph: &'g VocabularyGraph,
    indices: &'g Indices,
}

impl<'g> IndexedLookup<'g> {
    pub fn new(graph: &'g VocabularyGraph, indices: &'g Indices) -> Self {
        Self { graph, indices }
    }
}

impl<'g> RecordLookup<'g> for IndexedLookup<'g> {
    fn graph(&self) -> &'g VocabularyGraph {
        self.graph
    }

    fn record(&self, id: &str) -> Option<&'g Record> {
        self.indices
            .position(id)
            .and_then(|position| self.graph.get(position))
    }

    fn fields_of(&self, class_id: &str) -> Vec<&'g Record> {
        self.indices
            .fields_of(class_id)
            .iter()
            .filter_map(|field_id| self.record(field_id))
            .collect()
    }
}

/// Lookup that scans the whole graph on every call.
#[derive(Debug, Clone, Copy)]
pub struct ScanLookup<'g> {
    graph: &'g VocabularyGraph,
}

impl<'g> ScanLookup<'g> {
    pub fn new(graph: &'g VocabularyGraph) -> Self {
        Self { graph }
    }
}

impl<'g> RecordLookup<'g> for ScanLookup<'g> {
    fn graph(&self) -> &'g VocabularyGraph {
        self.graph
    }

    fn record(&self, id: &str) -> Option<&'g Record> {
        self.graph.iter().find(|record| record.id == id)
    }

    fn fields_of(&self, class_id: &str) -> Vec<&'g Record> {
        self.graph
            .iter()
            .filter(|record| {
                let items = record.relation(Relation::DomainIncludes);
                if items.is_empty() {
                    return false;
                }
                if let Err(e) = record.references(Relation::DomainIncludes) {
                    tracing::warn!(error = %e, "skipping malformed record");
                    return false;
                }
                items
                    .iter()
                    .any(|item| match_any(Some(item), has_id(class_id)))
            })
            .collect()
    }
}

/// Pick the lookup strategy once: indexed when indices are available.
pub fn lookup_for<'g>(
    graph: &'g VocabularyGraph,
    indices: Option<&'g Indices>,
) -> Box<dyn RecordLookup<'g> + 'g> {
    match indices {
        Some(indices) => Box::new(IndexedLookup::new(graph, indices)),
        None => Box::new(ScanLookup::new(graph)),
    }
}

/// A loaded vocabulary: the graph together with its indices.
///
/// Built once per document and read-only afterwards, so one instance can
/// serve any number of derivations.
#[derive(Debug, Clone)]
pub struct Vocabulary {
    graph: VocabularyGraph,
    indices: Indices,
}

impl Vocabulary {
    /// Index `graph` eagerly.
    ///
    /// # Errors
    ///
    /// Returns an error if the graph contains a malformed `domainIncludes`.
    pub fn new(graph: VocabularyGraph) -> Result<Self, EngineError> {
        let indices = build_indices(&graph)?;
        Ok(Self { graph, indices })
    }

    pub fn graph(&self) -> &VocabularyGraph {
        &self.graph
    }

    pub fn indices(&self) -> &Indices {
        &self.indices
    }

    pub fn lookup(&self) -> IndexedLookup<'_> {
        IndexedLookup::new(&self.graph, &self.indices)
    }
}
