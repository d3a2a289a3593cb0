//! Payload validation against derived schemas.

use serde_json::Value;

use crate::error::{SchemaError, ValidateError};
use crate::index::Vocabulary;
use crate::transform::SchemaNode;
use crate::types::DeriveOptions;

/// Validate a payload against the schema derived for a class.
///
/// Derives the schema of `class_name` with `options`, then validates the
/// payload against it.
///
/// # Errors
///
/// Returns `ValidateError::Engine` if derivation fails, or
/// `ValidateError::Invalid` if the payload doesn't match the schema.
pub fn validate_class(
    vocabulary: &Vocabulary,
    class_name: &str,
    payload: &Value,
    options: &DeriveOptions,
) -> Result<(), ValidateError> {
    let derivation = vocabulary.derive(class_name, options)?;
    validate(&derivation.schema, payload)
}

/// Validate a payload against an already-derived schema.
///
/// Use this when you've already derived the schema and want to validate
/// multiple payloads against it.
pub fn validate(schema: &SchemaNode, payload: &Value) -> Result<(), ValidateError> {
    let document = schema.to_validation_schema();
    let validator =
        jsonschema::validator_for(&document).map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })?;

    let errors: Vec<SchemaError> = validator
        .iter_errors(payload)
        .map(|e| SchemaError {
            path: e.instance_path.to_string(),
            message: e.to_string(),
        })
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        tracing::debug!(class = %schema.title, errors = errors.len(), "payload rejected");
        Err(ValidateError::Invalid { errors })
    }
}
