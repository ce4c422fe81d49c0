use jsonschema::Validator;
use serde_json::Value;

use crate::error::{Result, SchemaError};

/// Decide whether `document` conforms to every constraint in `schema`.
///
/// Pure over its inputs. Structural mismatches never error, they return
/// `false`; a schema that cannot be compiled is also reported as `false`.
pub fn validate(document: &Value, schema: &Value) -> bool {
    match jsonschema::validator_for(schema) {
        Ok(validator) => validator.is_valid(document),
        Err(err) => {
            tracing::warn!(error = %err, "schema failed to compile, rejecting document");
            false
        }
    }
}

/// The first violated constraint, if any.
pub fn first_violation(document: &Value, schema: &Value) -> Option<String> {
    match jsonschema::validator_for(schema) {
        Ok(validator) => validator
            .iter_errors(document)
            .next()
            .map(|err| err.to_string()),
        Err(err) => Some(format!("schema failed to compile: {err}")),
    }
}

pub(crate) fn check_document(operation: &str, document: &Value, validator: &Validator) -> Result<()> {
    let mut errors = validator.iter_errors(document);
    if let Some(first) = errors.next() {
        let mut message = first.to_string();
        for err in errors.take(3) {
            message.push_str("; ");
            message.push_str(&err.to_string());
        }
        return Err(SchemaError::ValidationFailed {
            operation: operation.to_string(),
            message,
        });
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "partyReference": {
                    "type": "object",
                    "properties": {
                        "referenceId": { "type": "string" },
                        "contactPoint": {
                            "type": "array",
                            "minItems": 3,
                            "maxItems": 3,
                            "items": {
                                "type": "object",
                                "properties": { "contactPointType": { "type": "string" } },
                                "required": ["contactPointType"]
                            }
                        }
                    },
                    "required": ["referenceId", "contactPoint"]
                }
            },
            "required": ["partyReference"]
        })
    }

    fn contact(kind: &str) -> Value {
        json!({ "contactPointType": kind })
    }

    #[test]
    fn conforming_document_is_valid() {
        let doc = json!({
            "partyReference": {
                "referenceId": "4d69",
                "contactPoint": [contact("cellphone"), contact("email"), contact("home")]
            }
        });
        assert!(validate(&doc, &contact_schema()));
        assert!(first_violation(&doc, &contact_schema()).is_none());
    }

    #[test]
    fn missing_nested_required_key_is_invalid() {
        let doc = json!({ "partyReference": { "referenceId": "4d69" } });
        assert!(!validate(&doc, &contact_schema()));
        assert!(first_violation(&doc, &contact_schema()).is_some());
    }

    #[test]
    fn cardinality_bounds_are_exact() {
        let two = json!({
            "partyReference": {
                "referenceId": "4d69",
                "contactPoint": [contact("cellphone"), contact("email")]
            }
        });
        let four = json!({
            "partyReference": {
                "referenceId": "4d69",
                "contactPoint": [contact("a"), contact("b"), contact("c"), contact("d")]
            }
        });
        assert!(!validate(&two, &contact_schema()));
        assert!(!validate(&four, &contact_schema()));
    }

    #[test]
    fn type_mismatch_is_invalid() {
        let doc = json!({
            "partyReference": {
                "referenceId": 7,
                "contactPoint": [contact("a"), contact("b"), contact("c")]
            }
        });
        assert!(!validate(&doc, &contact_schema()));
    }

    #[test]
    fn required_item_field_is_checked_in_every_element() {
        let doc = json!({
            "partyReference": {
                "referenceId": "4d69",
                "contactPoint": [contact("a"), {}, contact("c")]
            }
        });
        assert!(!validate(&doc, &contact_schema()));
    }

    #[test]
    fn uncompilable_schema_rejects() {
        let schema = json!({ "type": 12 });
        assert!(!validate(&json!({}), &schema));
        assert!(first_violation(&json!({}), &schema).is_some());
    }
}
