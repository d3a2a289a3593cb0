//! Predicate matching over JSON-LD values that may be one item or many.
//!
//! ```json
//! "schema:domainIncludes": { "@id": "schema:MenuItem" }
//!
//! "schema:domainIncludes": [
//!     { "@id": "schema:SizeSpecification" },
//!     { "@id": "schema:MenuItem" }
//! ]
//! ```

use serde_json::Value;

/// Returns true if `predicate` holds for any item of `value`.
///
/// - Arrays: the predicate is tried on each element.
/// - Objects: the predicate is applied to the whole object, but only when it
///   has at least one string-valued member.
/// - Strings, numbers and booleans: the predicate is applied directly.
/// - `null` or an absent value never matches.
pub fn match_any<F>(value: Option<&Value>, mut predicate: F) -> bool
where
    F: FnMut(&Value) -> bool,
{
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Array(items)) => items.iter().any(predicate),
        Some(obj @ Value::Object(map)) => {
            map.values().any(Value::is_string) && predicate(obj)
        }
        Some(scalar) => predicate(scalar),
    }
}

/// Predicate matching an item whose `@id` equals `id`.
pub fn has_id(id: &str) -> impl Fn(&Value) -> bool + '_ {
    move |item| item.get("@id").and_then(Value::as_str) == Some(id)
}
