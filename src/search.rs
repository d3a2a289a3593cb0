//! Record search by `@type` tag and free text.

use serde_json::Value;

use crate::matcher::match_any;
use crate::types::{keys, Record, VocabularyGraph};

/// Records with an `@type` tag whose local name is `type_name`.
///
/// `"Class"` matches `rdfs:Class`; `"DataType"` matches `schema:DataType`.
pub fn find_by_type<'g>(type_name: &str, graph: &'g VocabularyGraph) -> Vec<&'g Record> {
    graph
        .iter()
        .filter(|record| record.has_type(type_name))
        .collect()
}

/// Keep the records whose id or comment contains `query`, ignoring case.
///
/// Comments may be plain strings or language-tagged `{"@value": ..}`
/// objects; both are searched. An empty query keeps everything.
pub fn search<'g>(records: &[&'g Record], query: &str) -> Vec<&'g Record> {
    if query.is_empty() {
        return records.to_vec();
    }

    let query = query.to_lowercase();
    records
        .iter()
        .copied()
        .filter(|record| {
            record.id.to_lowercase().contains(&query)
                || match_any(record.comment.as_ref(), text_contains(&query))
        })
        .collect()
}

/// Predicate over comment values; `query` must already be lowercase.
fn text_contains(query: &str) -> impl Fn(&Value) -> bool + '_ {
    move |value| match value {
        Value::String(s) => s.to_lowercase().contains(query),
        Value::Object(map) => map
            .get(keys::VALUE)
            .and_then(Value::as_str)
            .map_or(false, |s| s.to_lowercase().contains(query)),
        _ => false,
    }
}
