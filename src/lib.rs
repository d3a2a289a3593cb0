//! Azulejo
//!
//! Derives JSON Schema documents from the schema.org JSON-LD vocabulary.
//!
//! The vocabulary is a `@graph` of class, property and datatype records. For a
//! requested class this library collects the properties whose
//! `schema:domainIncludes` names it, walks `rdfs:subClassOf` to offer the
//! fields of its ancestors, maps datatype ranges to JSON Schema types, and
//! expands object-typed fields up to a configurable depth.
//!
//! # Example
//!
//! ```
//! use azulejo::{derive_schema, DeriveOptions, VocabularyGraph};
//! use serde_json::json;
//!
//! let document = json!({
//!     "@graph": [
//!         { "@id": "schema:Thing", "@type": "rdfs:Class", "rdfs:comment": "Root" },
//!         {
//!             "@id": "schema:name",
//!             "@type": "rdf:Property",
//!             "schema:domainIncludes": { "@id": "schema:Thing" },
//!             "schema:rangeIncludes": { "@id": "schema:Text" }
//!         },
//!         { "@id": "schema:Text", "@type": "schema:DataType", "rdfs:label": "Text" }
//!     ]
//! });
//!
//! let graph = VocabularyGraph::from_document(&document).unwrap();
//! let options = DeriveOptions::new().show_descriptions(true);
//! let schema = derive_schema("Thing", &graph, &options, None).unwrap();
//!
//! assert_eq!(schema.title, "Thing");
//! assert_eq!(schema.description.as_deref(), Some("Root"));
//! assert_eq!(
//!     serde_json::to_value(&schema.properties).unwrap(),
//!     json!({ "name": { "type": "string" } })
//! );
//! ```
//!
//! # Datatype Mapping
//!
//! | Range datatype label | JSON Schema `type` | `format` |
//! |----------------------|--------------------|----------|
//! | `Text` | `"string"` | |
//! | `Date` | `"string"` | `"date"` |
//! | `Time` | `"string"` | `"time"` |
//! | `DateTime` | `"string"` | `"date-time"` |
//! | anything else, including classes | `"object"` | |
//!
//! # Recursion
//!
//! With `recursion_levels(n)`, object-typed fields are expanded `n` levels
//! deep. Beyond that a field keeps its range class id as a placeholder:
//!
//! ```json
//! { "address": { "type": "object", "properties": "schema:PostalAddress" } }
//! ```

mod error;
mod features;
mod index;
mod loader;
mod matcher;
mod search;
mod transform;
mod types;
mod validator;

pub use error::{EngineError, LoadError, SchemaError, ValidateError};
pub use features::{collect_ancestor_fields, resolve_object_features, AncestorFields, ObjectFeatures};
pub use index::{
    build_indices, lookup_for, IndexedLookup, Indices, RecordLookup, ScanLookup, Vocabulary,
};
pub use loader::{
    is_url, load_document, load_document_auto, load_document_str, load_vocabulary,
    vocabulary_from_document, SCHEMA_ORG_URL,
};
pub use matcher::{has_id, match_any};
pub use search::{find_by_type, search};
pub use transform::{
    derive, derive_schema, map_datatype, Derivation, Expansion, Format, JsonType, Properties,
    PropertySchema, SchemaNode, SchemaTransformer, TransformContext, JSON_SCHEMA_DIALECT,
};
pub use types::{
    class_id, comment_text, keys, local_name, CyclePolicy, DeriveOptions, Inheritance, OneOrMany,
    Record, Relation, VocabularyGraph, DEFAULT_PREFIX,
};
pub use validator::{validate, validate_class};

#[cfg(feature = "remote")]
pub use loader::load_document_url;
