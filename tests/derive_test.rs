//! Integration tests for schema derivation.

use std::path::Path;

use azulejo::{
    build_indices, derive, derive_schema, find_by_type, load_vocabulary, resolve_object_features,
    CyclePolicy, DeriveOptions, EngineError, Inheritance, Properties, VocabularyGraph,
};
use serde_json::{json, Value};

fn fixture_path() -> String {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/vocab.jsonld")
        .to_string_lossy()
        .into_owned()
}

fn fixture() -> VocabularyGraph {
    load_vocabulary(&fixture_path()).unwrap().graph().clone()
}

/// Deepest chain of expanded `properties` maps below `props`.
fn expansion_depth(props: &Properties) -> usize {
    props
        .iter()
        .filter_map(|(_, schema)| schema.expanded())
        .map(|nested| 1 + expansion_depth(nested))
        .max()
        .unwrap_or(0)
}

// === Index Equivalence Tests ===

mod index_equivalence {
    use super::*;

    #[test]
    fn indexed_and_scan_fields_match_for_every_class() {
        let graph = fixture();
        let indices = build_indices(&graph).unwrap();
        let options = DeriveOptions::new();

        for class in find_by_type("Class", &graph) {
            let indexed =
                resolve_object_features(&class.id, &graph, &options, Some(&indices)).unwrap();
            let scanned = resolve_object_features(&class.id, &graph, &options, None).unwrap();

            let mut a: Vec<&str> = indexed.fields.iter().map(|r| r.id.as_str()).collect();
            let mut b: Vec<&str> = scanned.fields.iter().map(|r| r.id.as_str()).collect();
            a.sort_unstable();
            b.sort_unstable();
            assert_eq!(a, b, "field sets differ for {}", class.id);
        }
    }

    #[test]
    fn indexed_and_scan_schemas_match() {
        let graph = fixture();
        let indices = build_indices(&graph).unwrap();
        let options = DeriveOptions::new()
            .recursion_levels(2)
            .show_descriptions(true)
            .select("schema:Thing");

        for class in ["Person", "Organization", "CreativeWork", "LocalBusiness"] {
            let indexed = derive_schema(class, &graph, &options, Some(&indices)).unwrap();
            let scanned = derive_schema(class, &graph, &options, None).unwrap();
            assert_eq!(indexed, scanned, "schemas differ for {}", class);
            assert_eq!(
                indexed.properties.names().collect::<Vec<_>>(),
                scanned.properties.names().collect::<Vec<_>>(),
                "property order differs for {}",
                class
            );
        }
    }
}

// === Recursion Depth Tests ===

mod recursion_depth {
    use super::*;

    #[test]
    fn depth_zero_never_expands() {
        let graph = fixture();
        let options = DeriveOptions::new().select("schema:Thing");

        for class in find_by_type("Class", &graph) {
            let schema = derive_schema(&class.id, &graph, &options, None).unwrap();
            for (name, property) in schema.properties.iter() {
                assert!(
                    property.expanded().is_none(),
                    "{}.{} was expanded at depth 0",
                    class.id,
                    name
                );
            }
        }
    }

    #[test]
    fn depth_zero_object_fields_are_placeholders() {
        let graph = fixture();
        let schema = derive_schema("Person", &graph, &DeriveOptions::new(), None).unwrap();
        let value = serde_json::to_value(&schema).unwrap();

        assert_eq!(
            value["properties"]["address"],
            json!({"type": "object", "properties": "schema:PostalAddress"})
        );
        assert_eq!(
            value["properties"]["knows"],
            json!({"type": "object", "properties": "schema:Person"})
        );
    }

    #[test]
    fn depth_is_bounded_on_cyclic_ranges() {
        let graph = fixture();
        for levels in 0..5 {
            let options = DeriveOptions::new().recursion_levels(levels);
            let schema = derive_schema("Person", &graph, &options, None).unwrap();
            assert_eq!(expansion_depth(&schema.properties), levels);
        }
    }

    #[test]
    fn depth_is_bounded_on_cyclic_hierarchy() {
        let graph = VocabularyGraph::from_document(&json!({
            "@graph": [
                {"@id": "ex:A", "rdfs:subClassOf": {"@id": "ex:B"}},
                {"@id": "ex:B", "rdfs:subClassOf": {"@id": "ex:A"}},
                {"@id": "ex:toB", "schema:domainIncludes": {"@id": "ex:A"},
                 "schema:rangeIncludes": {"@id": "ex:B"}},
                {"@id": "ex:toA", "schema:domainIncludes": {"@id": "ex:B"},
                 "schema:rangeIncludes": {"@id": "ex:A"}}
            ]
        }))
        .unwrap();

        let options = DeriveOptions::new()
            .recursion_levels(3)
            .select("ex:B")
            .select("ex:A");
        let schema = derive_schema("ex:A", &graph, &options, None).unwrap();
        assert_eq!(expansion_depth(&schema.properties), 3);
    }

    #[test]
    fn nested_expansion_uses_range_class_fields() {
        let graph = fixture();
        let options = DeriveOptions::new().recursion_levels(1);
        let schema = derive_schema("Person", &graph, &options, None).unwrap();

        let address = schema.properties.get("address").unwrap().expanded().unwrap();
        assert_eq!(address.names().collect::<Vec<_>>(), vec!["streetAddress"]);
        assert_eq!(
            serde_json::to_value(address.get("streetAddress").unwrap()).unwrap(),
            json!({"type": "string"})
        );
    }

    #[test]
    fn truncate_policy_keeps_other_expansions() {
        let graph = fixture();
        let options = DeriveOptions::new()
            .recursion_levels(3)
            .cycles(CyclePolicy::Truncate);
        let schema = derive_schema("Person", &graph, &options, None).unwrap();

        assert_eq!(
            schema.properties.get("knows").unwrap().placeholder(),
            Some("schema:Person")
        );
        assert!(schema.properties.get("address").unwrap().expanded().is_some());
    }

    #[test]
    fn fail_policy_errors_on_cycle() {
        let graph = fixture();
        let options = DeriveOptions::new()
            .recursion_levels(3)
            .cycles(CyclePolicy::Fail);
        let err = derive_schema("Organization", &graph, &options, None).unwrap_err();
        assert!(matches!(
            err,
            EngineError::Cycle { ref path }
                if path == &["schema:Organization", "schema:Person", "schema:Person"]
        ));
    }
}

// === Datatype Mapping Tests ===

mod datatype_mapping {
    use super::*;

    fn property(class: &str, name: &str) -> Value {
        let graph = fixture();
        let schema = derive_schema(class, &graph, &DeriveOptions::new(), None).unwrap();
        serde_json::to_value(schema.properties.get(name).unwrap()).unwrap()
    }

    #[test]
    fn text_is_string() {
        assert_eq!(property("Thing", "name"), json!({"type": "string"}));
    }

    #[test]
    fn date_has_date_format() {
        assert_eq!(
            property("Person", "birthDate"),
            json!({"type": "string", "format": "date"})
        );
    }

    #[test]
    fn first_range_wins() {
        assert_eq!(
            property("CreativeWork", "dateCreated"),
            json!({"type": "string", "format": "date-time"})
        );
    }

    #[test]
    fn time_has_time_format() {
        assert_eq!(
            property("CreativeWork", "doorTime"),
            json!({"type": "string", "format": "time"})
        );
    }

    #[test]
    fn unmapped_datatype_is_object() {
        assert_eq!(
            property("CreativeWork", "wordCount"),
            json!({"type": "object", "properties": "schema:Number"})
        );
    }

    #[test]
    fn class_range_that_is_not_a_datatype_is_object() {
        assert_eq!(
            property("Thing", "url"),
            json!({"type": "object", "properties": "schema:URL"})
        );
    }
}

// === Scenario Tests ===

mod scenarios {
    use super::*;

    #[test]
    fn minimal_thing() {
        let graph = VocabularyGraph::from_document(&json!({
            "@graph": [
                {"@id": "schema:Thing", "@type": "Class", "rdfs:comment": "Root"},
                {"@id": "schema:name", "@type": "Property",
                 "schema:domainIncludes": {"@id": "schema:Thing"},
                 "schema:rangeIncludes": {"@id": "schema:Text"}},
                {"@id": "schema:Text", "@type": "DataType", "rdfs:label": "Text"}
            ]
        }))
        .unwrap();

        let options = DeriveOptions::new().show_descriptions(true);
        let schema = derive_schema("Thing", &graph, &options, None).unwrap();
        let value = serde_json::to_value(&schema).unwrap();

        assert_eq!(value["title"], "Thing");
        assert_eq!(value["description"], "Root");
        assert_eq!(value["type"], "object");
        assert_eq!(value["properties"], json!({"name": {"type": "string"}}));
        assert_eq!(value["$schema"], "http://json-schema.org/draft-07/schema#");
    }

    #[test]
    fn class_without_fields_has_empty_properties() {
        let graph = fixture();
        let schema = derive_schema("StructuredValue", &graph, &DeriveOptions::new(), None).unwrap();
        assert_eq!(schema.title, "StructuredValue");
        assert!(schema.properties.is_empty());
        assert_eq!(serde_json::to_value(&schema).unwrap()["properties"], json!({}));
    }

    #[test]
    fn bare_and_array_parents_collect_the_same() {
        let single = VocabularyGraph::from_document(&json!({
            "@graph": [
                {"@id": "schema:Thing"},
                {"@id": "schema:Person", "rdfs:subClassOf": {"@id": "schema:Thing"}},
                {"@id": "schema:name", "schema:domainIncludes": {"@id": "schema:Thing"}}
            ]
        }))
        .unwrap();
        let array = VocabularyGraph::from_document(&json!({
            "@graph": [
                {"@id": "schema:Thing"},
                {"@id": "schema:Person", "rdfs:subClassOf": [{"@id": "schema:Thing"}]},
                {"@id": "schema:name", "schema:domainIncludes": {"@id": "schema:Thing"}}
            ]
        }))
        .unwrap();

        let options = DeriveOptions::new().select("schema:Thing");
        let a = derive("Person", &single, &options, None).unwrap();
        let b = derive("Person", &array, &options, None).unwrap();
        assert_eq!(a.schema, b.schema);
        assert_eq!(a.ancestors.field_ids(), b.ancestors.field_ids());
    }

    #[test]
    fn selecting_an_ancestor_merges_only_its_own_fields() {
        let graph = fixture();
        let options = DeriveOptions::new().select("schema:StructuredValue");
        let schema = derive_schema("PostalAddress", &graph, &options, None).unwrap();
        assert_eq!(schema.properties.names().collect::<Vec<_>>(), vec!["streetAddress"]);

        let options = DeriveOptions::new().select("schema:Thing");
        let schema = derive_schema("PostalAddress", &graph, &options, None).unwrap();
        assert_eq!(
            schema.properties.names().collect::<Vec<_>>(),
            vec!["streetAddress", "name", "url"]
        );
    }

    #[test]
    fn selections_merge_in_selection_order() {
        let graph = fixture();
        let options = DeriveOptions::new()
            .select("schema:Place")
            .select("schema:Organization");
        let schema = derive_schema("LocalBusiness", &graph, &options, None).unwrap();
        assert_eq!(
            schema.properties.names().collect::<Vec<_>>(),
            vec!["openingHours", "address", "founder"]
        );
    }

    #[test]
    fn first_parent_hides_later_parents() {
        let graph = fixture();
        let options = DeriveOptions::new()
            .inheritance(Inheritance::FirstParent)
            .select("schema:Place");
        let derivation = derive("LocalBusiness", &graph, &options, None).unwrap();

        assert!(!derivation.ancestors.contains("schema:Place"));
        assert_eq!(
            derivation.schema.properties.names().collect::<Vec<_>>(),
            vec!["openingHours"]
        );
    }

    #[test]
    fn ancestors_are_offered_for_selection() {
        let graph = fixture();
        let derivation = derive("LocalBusiness", &graph, &DeriveOptions::new(), None).unwrap();
        assert_eq!(
            serde_json::to_value(derivation.ancestors.field_ids()).unwrap(),
            json!({
                "schema:Organization": ["schema:address", "schema:founder"],
                "schema:Place": ["schema:address"],
                "schema:Thing": ["schema:name", "schema:url"]
            })
        );
    }

    #[test]
    fn descriptions_only_when_requested() {
        let graph = fixture();
        let schema = derive_schema("Person", &graph, &DeriveOptions::new(), None).unwrap();
        assert!(schema
            .properties
            .iter()
            .all(|(_, property)| property.description.is_none()));

        let options = DeriveOptions::new().show_descriptions(true);
        let schema = derive_schema("Person", &graph, &options, None).unwrap();
        assert_eq!(
            schema.properties.get("birthDate").unwrap().description.as_deref(),
            Some("A date value in ISO 8601 date format.")
        );
    }

    #[test]
    fn structured_class_comment_is_stringified() {
        let graph = fixture();
        let schema = derive_schema("Place", &graph, &DeriveOptions::new(), None).unwrap();
        let description = schema.description.unwrap();
        assert!(description.starts_with('{'));
        assert!(description.contains("physical extension"));
    }

    #[test]
    fn repeated_derivations_are_independent() {
        let graph = fixture();
        let indices = build_indices(&graph).unwrap();
        let options = DeriveOptions::new().select("schema:Thing");

        let person = derive_schema("Person", &graph, &options, Some(&indices)).unwrap();
        let work = derive_schema("CreativeWork", &graph, &options, Some(&indices)).unwrap();
        let person_again = derive_schema("Person", &graph, &options, Some(&indices)).unwrap();

        assert_eq!(person, person_again);
        assert_eq!(work.title, "CreativeWork");
        assert!(work.properties.get("birthDate").is_none());
    }
}

// === Error Handling Tests ===

mod error_handling {
    use super::*;

    #[test]
    fn unknown_class_is_not_found() {
        let graph = fixture();
        let err = derive_schema("Unicorn", &graph, &DeriveOptions::new(), None).unwrap_err();
        assert!(matches!(err, EngineError::NotFound { ref id } if id == "schema:Unicorn"));
    }

    #[test]
    fn malformed_range_fails_only_its_class() {
        let graph = VocabularyGraph::from_document(&json!({
            "@graph": [
                {"@id": "schema:Thing"},
                {"@id": "schema:Person"},
                {"@id": "schema:Text", "@type": "schema:DataType", "rdfs:label": "Text"},
                {"@id": "schema:broken", "schema:domainIncludes": {"@id": "schema:Thing"},
                 "schema:rangeIncludes": "schema:Text"},
                {"@id": "schema:name", "schema:domainIncludes": {"@id": "schema:Person"},
                 "schema:rangeIncludes": {"@id": "schema:Text"}}
            ]
        }))
        .unwrap();
        let indices = build_indices(&graph).unwrap();

        let err = derive_schema("Thing", &graph, &DeriveOptions::new(), Some(&indices)).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRelationship { ref record, .. } if record == "schema:broken"));

        let person = derive_schema("Person", &graph, &DeriveOptions::new(), Some(&indices)).unwrap();
        assert_eq!(person.properties.names().collect::<Vec<_>>(), vec!["name"]);
    }

    #[test]
    fn malformed_parent_is_reported() {
        let graph = VocabularyGraph::from_document(&json!({
            "@graph": [{"@id": "schema:Person", "rdfs:subClassOf": ["schema:Thing"]}]
        }))
        .unwrap();
        let err = derive_schema("Person", &graph, &DeriveOptions::new(), None).unwrap_err();
        assert!(matches!(err, EngineError::MalformedRelationship { .. }));
    }
}
