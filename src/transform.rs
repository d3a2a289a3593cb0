//! Schema derivation - turns a vocabulary class into a JSON Schema tree.
//!
//! A class's schema holds its own fields plus the own fields of any selected
//! ancestors. Object-typed fields are expanded into nested `properties` until
//! the configured recursion depth; past it they carry their range class id as
//! a placeholder.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::EngineError;
use crate::features::{collect_ancestor_fields, features_of, AncestorFields};
use crate::index::{lookup_for, Indices, RecordLookup, Vocabulary};
use crate::types::{
    comment_text, local_name, CyclePolicy, DeriveOptions, Record, Relation, VocabularyGraph,
};

/// `$schema` value of every derived document.
pub const JSON_SCHEMA_DIALECT: &str = "http://json-schema.org/draft-07/schema#";

/// JSON Schema primitive types produced by the datatype table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    String,
    Object,
}

impl JsonType {
    pub fn as_str(&self) -> &'static str {
        match self {
            JsonType::String => "string",
            JsonType::Object => "object",
        }
    }
}

/// JSON Schema string formats produced by the datatype table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Format {
    Date,
    Time,
    DateTime,
}

impl Format {
    pub fn as_str(&self) -> &'static str {
        match self {
            Format::Date => "date",
            Format::Time => "time",
            Format::DateTime => "date-time",
        }
    }
}

/// Map a datatype label to its JSON Schema type and format.
///
/// | label | type | format |
/// |-------|------|--------|
/// | `Text` | `string` | |
/// | `Date` | `string` | `date` |
/// | `Time` | `string` | `time` |
/// | `DateTime` | `string` | `date-time` |
/// | anything else | `object` | |
///
/// Labels are compared case-insensitively.
pub fn map_datatype(label: &str) -> (JsonType, Option<Format>) {
    match label.to_ascii_lowercase().as_str() {
        "text" => (JsonType::String, None),
        "date" => (JsonType::String, Some(Format::Date)),
        "time" => (JsonType::String, Some(Format::Time)),
        "datetime" => (JsonType::String, Some(Format::DateTime)),
        _ => (JsonType::Object, None),
    }
}

/// Nested content of an object-typed property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Expansion {
    /// The range class's properties, expanded in place.
    Expanded(Properties),
    /// Range class id of a property that was not expanded.
    Placeholder(String),
}

/// Schema of a single property.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PropertySchema {
    #[serde(rename = "type")]
    pub json_type: JsonType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<Expansion>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<Format>,
}

impl PropertySchema {
    fn new(json_type: JsonType, format: Option<Format>) -> Self {
        Self {
            json_type,
            properties: None,
            description: None,
            format,
        }
    }

    /// Expanded nested properties, if any.
    pub fn expanded(&self) -> Option<&Properties> {
        match &self.properties {
            Some(Expansion::Expanded(props)) => Some(props),
            _ => None,
        }
    }

    /// Placeholder range id, if the property was cut off.
    pub fn placeholder(&self) -> Option<&str> {
        match &self.properties {
            Some(Expansion::Placeholder(id)) => Some(id),
            _ => None,
        }
    }

    fn to_validation_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("type".to_string(), json!(self.json_type.as_str()));
        if let Some(props) = self.expanded() {
            map.insert("properties".to_string(), props.to_validation_value());
        }
        if let Some(description) = &self.description {
            map.insert("description".to_string(), json!(description));
        }
        if let Some(format) = self.format {
            map.insert("format".to_string(), json!(format.as_str()));
        }
        Value::Object(map)
    }
}

/// Insertion-ordered map of property name to schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Properties(IndexMap<String, PropertySchema>);

impl Properties {
    /// Insert a property, replacing any existing one of the same name in place.
    pub fn insert(&mut self, name: impl Into<String>, schema: PropertySchema) {
        self.0.insert(name.into(), schema);
    }

    pub fn get(&self, name: &str) -> Option<&PropertySchema> {
        self.0.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertySchema)> {
        self.0.iter().map(|(name, schema)| (name.as_str(), schema))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn to_validation_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(name, schema)| (name.clone(), schema.to_validation_value()))
                .collect(),
        )
    }
}

/// Derived JSON Schema document for one class.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SchemaNode {
    #[serde(rename = "$schema")]
    pub schema: &'static str,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub json_type: JsonType,
    pub properties: Properties,
    pub definitions: Map<String, Value>,
}

impl SchemaNode {
    fn new(title: impl Into<String>, description: Option<String>) -> Self {
        Self {
            schema: JSON_SCHEMA_DIALECT,
            title: title.into(),
            description,
            json_type: JsonType::Object,
            properties: Properties::default(),
            definitions: Map::new(),
        }
    }

    /// The schema as a JSON value, ready for validators.
    ///
    /// Placeholder `properties` strings are dropped, so cut-off objects
    /// accept any object.
    pub fn to_validation_schema(&self) -> Value {
        let mut map = Map::new();
        map.insert("$schema".to_string(), json!(self.schema));
        map.insert("title".to_string(), json!(self.title));
        if let Some(description) = &self.description {
            map.insert("description".to_string(), json!(description));
        }
        map.insert("type".to_string(), json!(self.json_type.as_str()));
        map.insert("properties".to_string(), self.properties.to_validation_value());
        map.insert("definitions".to_string(), Value::Object(self.definitions.clone()));
        Value::Object(map)
    }
}

/// A derived schema plus the own fields of every ancestor of its class.
///
/// `ancestors` lists the choices a caller can pass back through
/// [`DeriveOptions::select`].
#[derive(Debug, Clone, PartialEq)]
pub struct Derivation<'g> {
    pub schema: SchemaNode,
    pub ancestors: AncestorFields<'g>,
}

/// Per-derivation recursion state.
///
/// Created fresh for every top-level derivation and never shared.
#[derive(Debug, Clone, Default)]
pub struct TransformContext {
    /// Current recursion depth (0 for the requested class).
    pub depth: usize,
    /// Class ids being expanded on the current path, outermost first.
    pub path: Vec<String>,
}

/// Derives schemas for classes read through a [`RecordLookup`].
pub struct SchemaTransformer<'a, 'g> {
    lookup: &'a dyn RecordLookup<'g>,
    options: &'a DeriveOptions,
}

impl<'a, 'g> SchemaTransformer<'a, 'g> {
    pub fn new(lookup: &'a dyn RecordLookup<'g>, options: &'a DeriveOptions) -> Self {
        Self { lookup, options }
    }

    /// Derive the schema of `class_id`.
    ///
    /// # Errors
    ///
    /// Returns `EngineError::NotFound` if the class or a referenced range or
    /// ancestor is missing, `EngineError::MalformedRelationship` for a
    /// malformed reference on a record read along the way, and
    /// `EngineError::Cycle` when the cycle policy is `Fail` and a range class
    /// re-enters its own expansion.
    pub fn derive(&self, class_id: &str) -> Result<Derivation<'g>, EngineError> {
        let mut context = TransformContext {
            depth: 0,
            path: vec![class_id.to_string()],
        };
        self.derive_class(class_id, &mut context)
    }

    fn derive_class(
        &self,
        class_id: &str,
        context: &mut TransformContext,
    ) -> Result<Derivation<'g>, EngineError> {
        let features = features_of(self.lookup, class_id)?;

        let ancestors = if features.sub_classes.is_empty() {
            AncestorFields::default()
        } else {
            collect_ancestor_fields(self.lookup, class_id, self.options.inheritance)?
        };

        let mut fields = features.fields;
        for selected in &self.options.subclass_selections {
            if let Some(ancestor_fields) = ancestors.get(selected) {
                fields.extend_from_slice(ancestor_fields);
            }
        }

        let base = features.base_item;
        let mut schema = SchemaNode::new(
            local_name(&base.id),
            base.comment.as_ref().map(comment_text),
        );

        for field in fields {
            let property = self.derive_property(field, context)?;
            schema.properties.insert(local_name(&field.id), property);
        }

        Ok(Derivation { schema, ancestors })
    }

    fn derive_property(
        &self,
        field: &'g Record,
        context: &mut TransformContext,
    ) -> Result<PropertySchema, EngineError> {
        let ranges = field.references(Relation::RangeIncludes)?;
        let Some(&range_id) = ranges.first() else {
            return Ok(PropertySchema::new(JsonType::Object, None));
        };

        let range = self.lookup.record(range_id).ok_or_else(|| EngineError::NotFound {
            id: range_id.to_string(),
        })?;

        let (json_type, format) = if range.has_type("DataType") {
            map_datatype(range.label_text().unwrap_or_default())
        } else {
            (JsonType::Object, None)
        };

        let mut property = PropertySchema::new(json_type, format);

        if json_type == JsonType::Object {
            property.properties = Some(self.expand(range_id, context)?);
        }

        if self.options.show_descriptions {
            property.description = range.plain_comment().map(str::to_string);
        }

        Ok(property)
    }

    fn expand(
        &self,
        range_id: &str,
        context: &mut TransformContext,
    ) -> Result<Expansion, EngineError> {
        let placeholder = Expansion::Placeholder(range_id.to_string());

        if context.depth >= self.options.recursion_levels {
            return Ok(placeholder);
        }

        if context.path.iter().any(|id| id == range_id) {
            match self.options.cycles {
                CyclePolicy::Expand => {}
                CyclePolicy::Truncate => {
                    tracing::debug!(range = range_id, depth = context.depth, "truncating cycle");
                    return Ok(placeholder);
                }
                CyclePolicy::Fail => {
                    let mut path = context.path.clone();
                    path.push(range_id.to_string());
                    return Err(EngineError::Cycle { path });
                }
            }
        }

        context.depth += 1;
        context.path.push(range_id.to_string());
        let nested = self.derive_class(range_id, context);
        context.path.pop();
        context.depth -= 1;

        Ok(Expansion::Expanded(nested?.schema.properties))
    }
}

/// Derive the schema of a class by name, along with its ancestor fields.
///
/// `name` is prefixed with `options.prefix` unless it already carries one.
/// Uses the indices when given, otherwise scans the graph.
///
/// # Errors
///
/// See [`SchemaTransformer::derive`].
pub fn derive<'g>(
    name: &str,
    graph: &'g VocabularyGraph,
    options: &DeriveOptions,
    indices: Option<&'g Indices>,
) -> Result<Derivation<'g>, EngineError> {
    let lookup = lookup_for(graph, indices);
    SchemaTransformer::new(lookup.as_ref(), options).derive(&options.class_id(name))
}

/// Derive the schema of a class by name.
///
/// # Errors
///
/// See [`SchemaTransformer::derive`].
pub fn derive_schema(
    name: &str,
    graph: &VocabularyGraph,
    options: &DeriveOptions,
    indices: Option<&Indices>,
) -> Result<SchemaNode, EngineError> {
    derive(name, graph, options, indices).map(|derivation| derivation.schema)
}

impl Vocabulary {
    /// Derive the schema of a class by name through the indices.
    ///
    /// # Errors
    ///
    /// See [`SchemaTransformer::derive`].
    pub fn derive(&self, name: &str, options: &DeriveOptions) -> Result<Derivation<'_>, EngineError> {
        derive(name, self.graph(), options, Some(self.indices()))
    }
}
