//! Property translation: a dereferenced schema to a flat [`RuleMap`].
//!
//! Keys are dotted paths. Sub-properties of an object `x` appear as `x.y`;
//! sub-properties of the elements of an array of objects appear as `x.$.y`.
//! Arrays of scalars get a single `x` rule and no element entry. Open
//! objects (truthy `additionalProperties`) become blackbox rules and their
//! declared sub-properties are dropped.

use serde_json::{Map, Value};
use tracing::trace;

use crate::error::{ResolveError, TranslateError};
use crate::reference::{display_values, resolve_traced, with_display};
use crate::rules::map_rule;
use crate::types::{NodeKind, RuleMap};

/// Translate a resolved schema document into rules.
///
/// Reads `document.properties` (or the document itself when it has none)
/// and the root `required` list. Root-level `additionalProperties` is ignored.
///
/// # Errors
///
/// Any reference that cannot be dereferenced within `document`, and any
/// constraint the rule mapper rejects.
pub fn translate(document: &Value) -> Result<RuleMap, TranslateError> {
    let required = required_list(document);
    match document
        .get("properties")
        .and_then(Value::as_object)
        .or_else(|| document.as_object())
    {
        Some(properties) => translate_properties(properties, &required, document),
        None => Ok(RuleMap::new()),
    }
}

/// Translate one `properties` map; pointers resolve against `root`.
pub fn translate_properties(
    properties: &Map<String, Value>,
    required: &[&str],
    root: &Value,
) -> Result<RuleMap, TranslateError> {
    let mut rules = RuleMap::new();
    let mut active = Vec::new();
    translate_into(&mut rules, "", properties, required, root, &mut active)?;
    Ok(rules)
}

fn required_list(node: &Value) -> Vec<&str> {
    node.get("required")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default()
}

// `active` holds the pointers being expanded on the current descent path;
// meeting one again means the schema recurses through its properties.
fn translate_into(
    rules: &mut RuleMap,
    prefix: &str,
    properties: &Map<String, Value>,
    required: &[&str],
    root: &Value,
    active: &mut Vec<String>,
) -> Result<(), TranslateError> {
    for (key, node) in properties {
        let path = format!("{}{}", prefix, key);

        let (resolved, followed) = resolve_traced(node, root)?;
        if let Some(reference) = followed.iter().find(|r| active.contains(*r)) {
            return Err(ResolveError::CircularReference {
                reference: reference.clone(),
            }
            .into());
        }
        let resolved = with_display(resolved, display_values(node));

        let kind = NodeKind::classify(&resolved);
        let open = kind.is_open();
        let rule = map_rule(&path, &resolved, required.contains(&key.as_str()), open)?;
        trace!(
            path = %path,
            rule_type = ?rule.rule_type,
            optional = rule.optional,
            "translated property"
        );
        rules.insert(path.clone(), rule);

        if open {
            continue;
        }
        if let Some((sub_properties, sub_required)) = kind.sub_properties() {
            let separator = if kind.is_array() { ".$." } else { "." };
            let depth = active.len();
            active.extend(followed);
            translate_into(
                rules,
                &format!("{}{}", path, separator),
                sub_properties,
                sub_required,
                root,
                active,
            )?;
            active.truncate(depth);
        }
    }
    Ok(())
}
