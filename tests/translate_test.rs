//! Translation tests: resolved schema documents to rule maps.

use schema_rules::{translate, RegexKind, RuleMap, RuleType, ScalarType, TranslateError};
use serde_json::{json, Value};

fn product_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "title": "Product",
        "description": "A product from Acme's catalog",
        "type": "object",
        "properties": {
            "id": {
                "description": "The unique identifier for a product",
                "type": "integer"
            },
            "name": {
                "description": "Name of the product",
                "type": "string"
            },
            "price": {
                "type": "number",
                "minimum": "0",
                "exclusiveMinimum": 1
            },
            "tags": {
                "type": "array",
                "items": { "type": "string" },
                "minItems": 1,
                "uniqueItems": true
            },
            "arrayOfObjects": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": { "foo": { "type": "string" } }
                }
            },
            "objectWithAdditionalProps": {
                "type": "object",
                "properties": { "blah": { "type": "string" } },
                "additionalProperties": true
            },
            "arrayWithAdditionalProperties": {
                "type": "array",
                "items": {
                    "type": "object",
                    "additionalProperties": true,
                    "properties": { "test": { "type": "string" } }
                }
            },
            "color": {
                "type": "string",
                "enum": ["red", "orange", "yellow", "green", "blue", "indigo", "violet", null]
            },
            "emailAddress": {
                "type": "string",
                "format": "email"
            }
        },
        "required": ["id", "name", "price"],
        "additionalProperties": true
    })
}

fn internal_ref_schema() -> Value {
    json!({
        "$schema": "http://json-schema.org/draft-04/schema#",
        "title": "Thing",
        "type": "object",
        "properties": {
            "prop": { "$ref": "#/definitions/definitionWithSpecialChars~0~1%25" },
            "prop2": { "$ref": "#/definitions/arrayOfDefs/1" },
            "prop3": { "$ref": "#" },
            "refItems": {
                "type": "array",
                "items": { "$ref": "#/definitions/arrayOfDefs/1" }
            }
        },
        "definitions": {
            "definitionWithSpecialChars~/%": { "type": "string", "format": "email" },
            "arrayOfDefs": [
                { "type": "string" },
                { "type": "number" }
            ]
        }
    })
}

fn compile(schema: &Value) -> RuleMap {
    translate(schema).expect("schema translates")
}

mod product {
    use super::*;

    #[test]
    fn required_list_sets_optional() {
        let rules = compile(&product_schema());

        assert_eq!(rules["id"].rule_type, RuleType::Scalar(ScalarType::Number));
        assert!(!rules["id"].optional);
        assert_eq!(rules["name"].rule_type, RuleType::Scalar(ScalarType::String));
        assert!(!rules["name"].optional);
        assert!(rules["tags"].optional);
        assert!(rules["emailAddress"].optional);
    }

    #[test]
    fn price_constraints() {
        let rules = compile(&product_schema());
        let price = &rules["price"];

        assert_eq!(price.rule_type, RuleType::Scalar(ScalarType::Number));
        assert!(!price.optional);
        assert_eq!(price.min, Some(0.0));
        assert_eq!(price.exclusive_min, Some(true));
        assert_eq!(price.decimal, Some(true));
    }

    #[test]
    fn scalar_array() {
        let rules = compile(&product_schema());

        assert_eq!(rules["tags"].rule_type, RuleType::ArrayOf(ScalarType::String));
        assert_eq!(rules["tags"].min_count, Some(1));
        assert!(!rules.contains_key("tags.$"));
    }

    #[test]
    fn array_of_objects_expands() {
        let rules = compile(&product_schema());

        assert_eq!(
            rules["arrayOfObjects"].rule_type,
            RuleType::ArrayOf(ScalarType::Object)
        );
        assert_eq!(
            rules["arrayOfObjects.$.foo"].rule_type,
            RuleType::Scalar(ScalarType::String)
        );
    }

    #[test]
    fn open_nodes_are_blackbox() {
        let rules = compile(&product_schema());

        assert!(rules["objectWithAdditionalProps"].is_blackbox());
        assert!(!rules.contains_key("objectWithAdditionalProps.blah"));

        let open_array = &rules["arrayWithAdditionalProperties"];
        assert_eq!(open_array.rule_type, RuleType::ArrayOf(ScalarType::Object));
        assert!(open_array.is_blackbox());
        assert!(!rules.contains_key("arrayWithAdditionalProperties.$.test"));
    }

    #[test]
    fn enum_drops_null_sentinel() {
        let rules = compile(&product_schema());
        let color = &rules["color"];

        assert_eq!(color.allowed_values.as_ref().map(Vec::len), Some(7));
        assert!(color.optional);
        let hints = color.ui_hints.as_ref().expect("hints");
        assert_eq!(hints.first_option.as_deref(), Some("(None)"));
    }

    #[test]
    fn email_format() {
        let rules = compile(&product_schema());
        let regex = rules["emailAddress"].regex.as_ref().expect("regex");

        assert_eq!(regex.kind(), RegexKind::Email);
        assert!(regex.is_match("someone@example.org"));
        assert!(!regex.is_match("not an email"));
    }

    #[test]
    fn descriptions_become_hint_titles() {
        let rules = compile(&product_schema());
        let hints = rules["name"].ui_hints.as_ref().expect("hints");
        assert_eq!(hints.title.as_deref(), Some("Name of the product"));
    }

    #[test]
    fn root_additional_properties_ignored() {
        let rules = compile(&product_schema());
        assert_eq!(
            rules.keys().collect::<Vec<_>>(),
            [
                "arrayOfObjects",
                "arrayOfObjects.$.foo",
                "arrayWithAdditionalProperties",
                "color",
                "emailAddress",
                "id",
                "name",
                "objectWithAdditionalProps",
                "price",
                "tags",
            ]
        );
    }

    #[test]
    fn serialized_shape() {
        let rules = compile(&product_schema());
        let out = serde_json::to_value(&rules).unwrap();

        assert_eq!(out["price"]["type"], "number");
        assert_eq!(out["price"]["exclusiveMin"], true);
        assert_eq!(out["tags"]["type"], json!(["string"]));
        assert_eq!(out["tags"]["minCount"], 1);
        assert_eq!(out["objectWithAdditionalProps"]["blackbox"], true);
        assert!(out["emailAddress"]["regEx"].is_string());
        assert!(out["name"].get("min").is_none());
    }
}

mod internal_references {
    use super::*;

    #[test]
    fn escaped_pointer() {
        let rules = compile(&internal_ref_schema());
        let prop = &rules["prop"];

        assert_eq!(prop.rule_type, RuleType::Scalar(ScalarType::String));
        assert_eq!(prop.regex.as_ref().map(|r| r.kind()), Some(RegexKind::Email));
    }

    #[test]
    fn array_index_pointer() {
        let rules = compile(&internal_ref_schema());
        assert_eq!(rules["prop2"].rule_type, RuleType::Scalar(ScalarType::Number));
    }

    #[test]
    fn self_reference_terminates() {
        let rules = compile(&internal_ref_schema());

        assert_eq!(rules["prop3"].rule_type, RuleType::Scalar(ScalarType::Object));
        assert!(!rules.keys().any(|k| k.starts_with("prop3.")));
    }

    #[test]
    fn items_reference() {
        let rules = compile(&internal_ref_schema());

        assert_eq!(rules["refItems"].rule_type, RuleType::ArrayOf(ScalarType::Number));
        assert!(!rules.contains_key("refItems.$"));
    }

    #[test]
    fn missing_target() {
        let schema = json!({
            "properties": { "a": { "$ref": "#/definitions/nope" } },
            "definitions": {}
        });
        assert!(matches!(
            translate(&schema),
            Err(TranslateError::Resolve(
                schema_rules::ResolveError::PointerNotFound { .. }
            ))
        ));
    }

    #[test]
    fn unresolved_external_reference() {
        let schema = json!({
            "properties": { "a": { "$ref": "https://example.org/other.json" } }
        });
        assert!(matches!(
            translate(&schema),
            Err(TranslateError::Resolve(
                schema_rules::ResolveError::UncaughtExternalReference { .. }
            ))
        ));
    }
}

mod properties {
    use super::*;

    fn container_keys_have_children(rules: &RuleMap) {
        for (key, rule) in rules {
            if rule.rule_type.scalar() != ScalarType::Object || rule.is_blackbox() {
                continue;
            }
            let prefix = if rule.rule_type.is_array() {
                format!("{}.$.", key)
            } else {
                format!("{}.", key)
            };
            assert!(
                rules.keys().any(|k| k.starts_with(&prefix)),
                "container {} has no sub-keys",
                key
            );
        }
    }

    #[test]
    fn one_entry_per_leaf() {
        let schema = json!({
            "type": "object",
            "properties": {
                "title": { "type": "string" },
                "owner": {
                    "type": "object",
                    "properties": {
                        "name": { "type": "string" },
                        "contact": {
                            "type": "object",
                            "properties": { "phone": { "type": "string" } }
                        }
                    }
                },
                "lines": {
                    "type": "array",
                    "items": {
                        "type": "object",
                        "properties": {
                            "qty": { "type": "integer" },
                            "when": { "type": "string", "format": "date-time" }
                        }
                    }
                }
            }
        });
        let rules = compile(&schema);

        let leaves: Vec<&str> = rules
            .iter()
            .filter(|(_, r)| r.rule_type.scalar() != ScalarType::Object)
            .map(|(k, _)| k.as_str())
            .collect();
        assert_eq!(
            leaves,
            ["lines.$.qty", "lines.$.when", "owner.contact.phone", "owner.name", "title"]
        );
        container_keys_have_children(&rules);
    }

    #[test]
    fn date_time_format() {
        let schema = json!({
            "properties": { "when": { "type": "string", "format": "date-time" } }
        });
        let rules = compile(&schema);

        assert_eq!(rules["when"].rule_type, RuleType::Scalar(ScalarType::Date));
        let hints = rules["when"].ui_hints.as_ref().expect("hints");
        assert_eq!(hints.input_type.as_deref(), Some("datetime"));
    }

    #[test]
    fn pattern_wins_over_format() {
        let schema = json!({
            "properties": {
                "handle": { "type": "string", "pattern": "^[a-z]+$", "format": "email" }
            }
        });
        let rules = compile(&schema);
        let regex = rules["handle"].regex.as_ref().expect("regex");

        assert_eq!(regex.kind(), RegexKind::Pattern);
        assert_eq!(regex.as_str(), "^[a-z]+$");
    }

    #[test]
    fn enum_sentinel_leaves_optional_alone() {
        let schema = json!({
            "required": ["color"],
            "properties": {
                "color": { "type": "string", "enum": ["red", "green", null] }
            }
        });
        let rules = compile(&schema);
        let color = &rules["color"];

        assert_eq!(color.allowed_values, Some(vec![json!("red"), json!("green")]));
        assert!(!color.optional);
        assert_eq!(
            color.ui_hints.as_ref().and_then(|h| h.first_option.as_deref()),
            Some("(None)")
        );
    }

    #[test]
    fn invalid_pattern() {
        let schema = json!({ "properties": { "a": { "type": "string", "pattern": "(" } } });
        assert!(matches!(
            translate(&schema),
            Err(TranslateError::InvalidPattern { path, .. }) if path == "a"
        ));
    }

    #[test]
    fn uncoercible_constraint() {
        let schema = json!({
            "properties": {
                "box": {
                    "type": "object",
                    "properties": { "n": { "type": "number", "minimum": "lots" } }
                }
            }
        });
        assert!(matches!(
            translate(&schema),
            Err(TranslateError::InvalidKeyword { path, keyword: "minimum", .. }) if path == "box.n"
        ));
    }
}
