//! Core types for the vocabulary graph and derivation options.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{EngineError, LoadError};

/// Default prefix used to turn a bare class name into an identifier.
pub const DEFAULT_PREFIX: &str = "schema";

/// JSON-LD keys read from vocabulary records.
pub mod keys {
    pub const ID: &str = "@id";
    pub const TYPE: &str = "@type";
    pub const GRAPH: &str = "@graph";
    pub const SUB_CLASS_OF: &str = "rdfs:subClassOf";
    pub const DOMAIN_INCLUDES: &str = "schema:domainIncludes";
    pub const RANGE_INCLUDES: &str = "schema:rangeIncludes";
    pub const COMMENT: &str = "rdfs:comment";
    pub const LABEL: &str = "rdfs:label";
    pub const VALUE: &str = "@value";
}

/// Returns the JSON type name for error messages.
pub fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// Local part of a prefixed identifier (`"schema:Thing"` -> `"Thing"`).
///
/// Identifiers without a prefix are returned unchanged.
pub fn local_name(id: &str) -> &str {
    match id.split_once(':') {
        Some((_, rest)) => rest,
        None => id,
    }
}

/// Identifier for a class name under `prefix`.
///
/// Names that already carry a prefix are taken verbatim.
pub fn class_id(name: &str, prefix: &str) -> String {
    if name.contains(':') {
        name.to_string()
    } else {
        format!("{}:{}", prefix, name)
    }
}

/// A JSON-LD field that may be serialized as a single value or an array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    Many(Vec<T>),
    One(T),
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::Many(Vec::new())
    }
}

impl<T> OneOrMany<T> {
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::Many(items) => items,
            OneOrMany::One(item) => std::slice::from_ref(item),
        }
    }

    pub fn first(&self) -> Option<&T> {
        self.as_slice().first()
    }

    pub fn len(&self) -> usize {
        self.as_slice().len()
    }

    pub fn is_empty(&self) -> bool {
        self.as_slice().is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.as_slice().iter()
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(items: Vec<T>) -> Self {
        OneOrMany::Many(items)
    }
}

/// Relationship fields that hold identifier references.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    SubClassOf,
    DomainIncludes,
    RangeIncludes,
}

impl Relation {
    /// Source key of this relationship in a record.
    pub fn key(&self) -> &'static str {
        match self {
            Relation::SubClassOf => keys::SUB_CLASS_OF,
            Relation::DomainIncludes => keys::DOMAIN_INCLUDES,
            Relation::RangeIncludes => keys::RANGE_INCLUDES,
        }
    }
}

impl std::fmt::Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.key())
    }
}

/// A single record of the vocabulary graph.
///
/// Relationship fields keep their one-or-many shape; identifiers are
/// extracted on demand through [`Record::references`] so a malformed item
/// only affects the derivations that read it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    #[serde(rename = "@id")]
    pub id: String,

    #[serde(rename = "@type", default, skip_serializing_if = "OneOrMany::is_empty")]
    pub types: OneOrMany<String>,

    #[serde(
        rename = "rdfs:subClassOf",
        default,
        skip_serializing_if = "OneOrMany::is_empty"
    )]
    pub sub_class_of: OneOrMany<Value>,

    #[serde(
        rename = "schema:domainIncludes",
        default,
        skip_serializing_if = "OneOrMany::is_empty"
    )]
    pub domain_includes: OneOrMany<Value>,

    #[serde(
        rename = "schema:rangeIncludes",
        default,
        skip_serializing_if = "OneOrMany::is_empty"
    )]
    pub range_includes: OneOrMany<Value>,

    #[serde(rename = "rdfs:comment", default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<Value>,

    #[serde(rename = "rdfs:label", default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Value>,

    /// Every other key of the source record.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record {
    /// Raw items of a relationship field.
    pub fn relation(&self, relation: Relation) -> &[Value] {
        match relation {
            Relation::SubClassOf => self.sub_class_of.as_slice(),
            Relation::DomainIncludes => self.domain_includes.as_slice(),
            Relation::RangeIncludes => self.range_includes.as_slice(),
        }
    }

    /// Identifiers referenced by a relationship field, in source order.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::MalformedRelationship` if an item is not an
    /// object with a string `@id`.
    pub fn references(&self, relation: Relation) -> Result<Vec<&str>, EngineError> {
        self.relation(relation)
            .iter()
            .map(|item| {
                item.get(keys::ID)
                    .and_then(Value::as_str)
                    .ok_or_else(|| EngineError::MalformedRelationship {
                        record: self.id.clone(),
                        relation,
                        found: json_type_name(item).to_string(),
                    })
            })
            .collect()
    }

    /// True if any `@type` tag has the given local name.
    pub fn has_type(&self, type_name: &str) -> bool {
        self.types.iter().any(|t| local_name(t) == type_name)
    }

    /// The record's label as plain text (`"Text"` or `{"@value": "Text"}`).
    pub fn label_text(&self) -> Option<&str> {
        match self.label.as_ref()? {
            Value::String(s) => Some(s),
            Value::Object(map) => map.get(keys::VALUE).and_then(Value::as_str),
            _ => None,
        }
    }

    /// The record's comment when it is a plain string.
    pub fn plain_comment(&self) -> Option<&str> {
        self.comment.as_ref().and_then(Value::as_str)
    }
}

/// Human-readable text of a comment value.
///
/// Strings are returned verbatim; structured values are JSON-stringified.
pub fn comment_text(comment: &Value) -> String {
    match comment {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Ordered sequence of vocabulary records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VocabularyGraph {
    records: Vec<Record>,
}

impl VocabularyGraph {
    pub fn new(records: Vec<Record>) -> Self {
        Self { records }
    }

    /// Build a graph from a JSON-LD document with a `@graph` array.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::MissingGraph` if the document has no `@graph` array,
    /// or `LoadError::InvalidRecord` if an entry isn't a record with an `@id`.
    pub fn from_document(document: &Value) -> Result<Self, LoadError> {
        let entries = document
            .get(keys::GRAPH)
            .and_then(Value::as_array)
            .ok_or(LoadError::MissingGraph)?;

        let records = entries
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                Record::deserialize(entry).map_err(|source| LoadError::InvalidRecord { index, source })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self { records })
    }

    pub fn get(&self, position: usize) -> Option<&Record> {
        self.records.get(position)
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Record> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// How the ancestor walk treats classes with several parents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Inheritance {
    /// Breadth-first over every listed parent.
    #[default]
    AllParents,
    /// Follow only the first listed parent at each step.
    FirstParent,
}

/// What the transformer does when a range class is already being expanded
/// on the current recursion path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Keep expanding; only the depth cutoff bounds recursion.
    #[default]
    Expand,
    /// Emit a placeholder instead of re-entering the class.
    Truncate,
    /// Abort the derivation with `EngineError::Cycle`.
    Fail,
}

impl CyclePolicy {
    /// Parse a policy name.
    ///
    /// Returns `None` for unknown values (caller should error).
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expand" => Some(CyclePolicy::Expand),
            "truncate" => Some(CyclePolicy::Truncate),
            "fail" => Some(CyclePolicy::Fail),
            _ => None,
        }
    }
}

/// Options for schema derivation.
#[derive(Debug, Clone)]
pub struct DeriveOptions {
    /// Attach range comments as property descriptions.
    pub show_descriptions: bool,
    /// Ancestor ids whose own fields are merged in, in selection order.
    pub subclass_selections: Vec<String>,
    /// How many levels of object-typed fields are expanded.
    pub recursion_levels: usize,
    pub inheritance: Inheritance,
    pub cycles: CyclePolicy,
    /// Prefix for bare class names.
    pub prefix: String,
}

impl Default for DeriveOptions {
    fn default() -> Self {
        Self {
            show_descriptions: false,
            subclass_selections: Vec::new(),
            recursion_levels: 0,
            inheritance: Inheritance::default(),
            cycles: CyclePolicy::default(),
            prefix: DEFAULT_PREFIX.to_string(),
        }
    }
}

impl DeriveOptions {
    /// Options with descriptions off, no selections and no expansion.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show_descriptions(mut self, show: bool) -> Self {
        self.show_descriptions = show;
        self
    }

    pub fn recursion_levels(mut self, levels: usize) -> Self {
        self.recursion_levels = levels;
        self
    }

    pub fn inheritance(mut self, inheritance: Inheritance) -> Self {
        self.inheritance = inheritance;
        self
    }

    pub fn cycles(mut self, cycles: CyclePolicy) -> Self {
        self.cycles = cycles;
        self
    }

    pub fn prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Select an ancestor whose own fields are merged into the schema.
    ///
    /// Selecting the same ancestor twice keeps its first position.
    pub fn select(mut self, ancestor_id: impl Into<String>) -> Self {
        let id = ancestor_id.into();
        if !self.subclass_selections.contains(&id) {
            self.subclass_selections.push(id);
        }
        self
    }

    /// Take selections from a `{ancestorId: bool}` map, in map order.
    ///
    /// Only entries set to `true` are selected.
    pub fn from_selection_map(mut self, selections: &Map<String, Value>) -> Self {
        for (id, selected) in selections {
            if selected.as_bool() == Some(true) {
                self = self.select(id.clone());
            }
        }
        self
    }

    /// Identifier for a class name under the configured prefix.
    pub fn class_id(&self, name: &str) -> String {
        class_id(name, &self.prefix)
    }
}
