//! Payload validation against a resolved schema.
//!
//! Violations carry the dotted rule key that governs the failing value, so
//! they can be matched against the output of [`crate::translate`].

use serde_json::Value;

use crate::error::{SchemaViolation, ValidateError};

/// Validate `payload` against an already-resolved schema.
///
/// Resolve the schema first (see [`crate::SchemaResolver::resolve`]) so that
/// no external reference is left for the validator to chase.
///
/// # Errors
///
/// `ValidateError::InvalidSchema` if the schema itself is rejected, or
/// `ValidateError::Invalid` listing every violation.
pub fn validate_payload(schema: &Value, payload: &Value) -> Result<(), ValidateError> {
    let validator =
        jsonschema::validator_for(schema).map_err(|e| ValidateError::InvalidSchema {
            message: e.to_string(),
        })?;

    let violations: Vec<SchemaViolation> = validator
        .iter_errors(payload)
        .map(|e| {
            let path = e.instance_path.to_string();
            SchemaViolation {
                rule_key: rule_key_for_pointer(&path),
                path,
                message: e.to_string(),
            }
        })
        .collect();

    if violations.is_empty() {
        Ok(())
    } else {
        Err(ValidateError::Invalid { violations })
    }
}

/// Convert a payload JSON pointer into the rule key that governs it.
///
/// Array indices become `$`; a trailing index is dropped because arrays of
/// scalars are governed by the array's own rule.
pub fn rule_key_for_pointer(pointer: &str) -> String {
    let mut segments: Vec<String> = pointer
        .split('/')
        .skip(1)
        .map(|segment| {
            if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
                "$".to_string()
            } else {
                segment.replace("~1", "/").replace("~0", "~")
            }
        })
        .collect();
    while segments.last().is_some_and(|s| s == "$") {
        segments.pop();
    }
    segments.join(".")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn product_schema() -> Value {
        json!({
            "type": "object",
            "required": ["name"],
            "properties": {
                "name": { "type": "string" },
                "price": { "type": "number", "minimum": 0 },
                "tags": { "type": "array", "items": { "type": "string" } },
                "variants": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": { "sku": { "type": "string" } }
                    }
                }
            }
        })
    }

    #[test]
    fn valid_payload() {
        let payload = json!({ "name": "Widget", "price": 2.5, "tags": ["a"] });
        assert!(validate_payload(&product_schema(), &payload).is_ok());
    }

    #[test]
    fn violations_carry_rule_keys() {
        let payload = json!({
            "name": "Widget",
            "tags": ["ok", 7],
            "variants": [{ "sku": 12 }]
        });
        let result = validate_payload(&product_schema(), &payload);
        match result {
            Err(ValidateError::Invalid { violations }) => {
                let keys: Vec<&str> = violations.iter().map(|v| v.rule_key.as_str()).collect();
                assert!(keys.contains(&"tags"));
                assert!(keys.contains(&"variants.$.sku"));
                assert_eq!(violations.len(), 2);
            }
            other => panic!("expected violations, got {:?}", other),
        }
    }

    #[test]
    fn missing_required_field() {
        let payload = json!({ "price": 1 });
        let result = validate_payload(&product_schema(), &payload);
        assert!(matches!(
            result,
            Err(ValidateError::Invalid { violations }) if violations.len() == 1
        ));
    }

    #[test]
    fn pointer_to_rule_key() {
        assert_eq!(rule_key_for_pointer(""), "");
        assert_eq!(rule_key_for_pointer("/name"), "name");
        assert_eq!(rule_key_for_pointer("/tags/3"), "tags");
        assert_eq!(rule_key_for_pointer("/variants/0/sku"), "variants.$.sku");
        assert_eq!(rule_key_for_pointer("/a~1b/c~0d"), "a/b.c~d");
    }
}
