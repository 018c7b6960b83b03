//! Internal reference resolution: `#` and `#/json/pointer` within one document.

use serde_json::{Map, Value};

use crate::error::ResolveError;

/// Keys that carry display text and survive reference replacement.
pub const DISPLAY_FIELDS: &[&str] = &["title", "description"];

/// Keywords whose values are data or unused definitions rather than live schemas.
const NON_SCHEMA_KEYS: &[&str] = &["definitions", "$defs", "enum", "default", "examples", "const"];

/// Keywords whose values map property names (not keywords) to schemas.
const PROPERTY_MAP_KEYS: &[&str] = &["properties", "patternProperties"];

/// Replace a `$ref` on `node` (or on its `items`) with the referenced schema.
///
/// Follows chains of pointers. `$ref: "#"` becomes `{ "type": <root type> }`
/// and is never expanded, so a self-referencing schema terminates.
///
/// # Errors
///
/// `UncaughtExternalReference` for any reference that is not internal,
/// `PointerNotFound` for a dangling pointer, `CircularReference` for a
/// pointer chain that loops.
pub fn resolve_internal(node: &Value, root: &Value) -> Result<Value, ResolveError> {
    resolve_traced(node, root).map(|(resolved, _)| resolved)
}

/// Like [`resolve_internal`], also returning every pointer that was followed.
pub fn resolve_traced(node: &Value, root: &Value) -> Result<(Value, Vec<String>), ResolveError> {
    let mut followed = Vec::new();
    let resolved = resolve_chain(node, root, &mut followed)?;
    Ok((resolved, followed))
}

/// Resolve a property and keep the `title`/`description` it was declared with.
pub fn dereference_property(node: &Value, root: &Value) -> Result<Value, ResolveError> {
    let resolved = resolve_internal(node, root)?;
    Ok(with_display(resolved, display_values(node)))
}

fn resolve_chain(
    node: &Value,
    root: &Value,
    followed: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    match node.get("$ref") {
        Some(Value::String(reference)) => {
            if reference == "#" {
                return Ok(self_reference(root));
            }
            if !reference.starts_with("#/") {
                return Err(ResolveError::UncaughtExternalReference {
                    reference: reference.clone(),
                });
            }
            if followed.contains(reference) {
                return Err(ResolveError::CircularReference {
                    reference: reference.clone(),
                });
            }
            followed.push(reference.clone());
            let target = resolve_pointer(root, reference)?;
            resolve_chain(target, root, followed)
        }
        Some(other) => Err(ResolveError::UnsupportedReference {
            reference: other.to_string(),
            message: "$ref must be a string".to_string(),
        }),
        None => match (node.as_object(), node.get("items")) {
            (Some(map), Some(items)) if items.get("$ref").is_some() => {
                let resolved = resolve_chain(items, root, followed)?;
                let mut merged = items.as_object().cloned().unwrap_or_default();
                merged.remove("$ref");
                if let Value::Object(resolved) = resolved {
                    merged.extend(resolved);
                }
                let mut out = map.clone();
                out.insert("items".to_string(), Value::Object(merged));
                Ok(Value::Object(out))
            }
            _ => Ok(node.clone()),
        },
    }
}

/// Stand-in for `$ref: "#"`.
fn self_reference(root: &Value) -> Value {
    let root_type = root
        .get("type")
        .cloned()
        .unwrap_or_else(|| Value::String("object".to_string()));
    let mut out = Map::new();
    out.insert("type".to_string(), root_type);
    Value::Object(out)
}

/// Navigate a JSON Pointer (`#/a/b`, `/a/b` or `#`) within `root`.
///
/// Each segment is percent-decoded, then `~1` and `~0` are unescaped.
/// Arrays are indexed numerically.
pub fn resolve_pointer<'a>(root: &'a Value, pointer: &str) -> Result<&'a Value, ResolveError> {
    let path = pointer.strip_prefix('#').unwrap_or(pointer);
    if path.is_empty() {
        return Ok(root);
    }
    let Some(path) = path.strip_prefix('/') else {
        return Err(ResolveError::UnsupportedReference {
            reference: pointer.to_string(),
            message: "fragment is not a JSON pointer".to_string(),
        });
    };

    let mut current = root;
    for raw in path.split('/') {
        let segment = decode_segment(raw).ok_or_else(|| ResolveError::UnsupportedReference {
            reference: pointer.to_string(),
            message: format!("segment '{}' is not valid percent-encoded UTF-8", raw),
        })?;
        let next = match current {
            Value::Array(arr) => segment.parse::<usize>().ok().and_then(|i| arr.get(i)),
            Value::Object(map) => map.get(&segment),
            _ => None,
        };
        current = next.ok_or_else(|| ResolveError::PointerNotFound {
            reference: pointer.to_string(),
            segment: segment.clone(),
        })?;
    }
    Ok(current)
}

fn decode_segment(raw: &str) -> Option<String> {
    let decoded = urlencoding::decode(raw).ok()?;
    Some(decoded.replace("~1", "/").replace("~0", "~"))
}

/// Resolve every internal reference inside `subtree` against `root`.
///
/// Used when a fragment of one document is spliced into another, where its
/// pointers would otherwise be read against the wrong root. Definition
/// blocks and data keywords are copied untouched.
pub fn inline_internal_refs(subtree: &Value, root: &Value) -> Result<Value, ResolveError> {
    inline(subtree, root, &mut Vec::new())
}

fn inline(value: &Value, root: &Value, active: &mut Vec<String>) -> Result<Value, ResolveError> {
    match value {
        Value::Object(map) => {
            if let Some(reference) = map.get("$ref").and_then(Value::as_str) {
                if reference == "#" {
                    return Ok(with_display(self_reference(root), display_values(value)));
                }
                if reference.starts_with("#/") {
                    if active.iter().any(|r| r == reference) {
                        return Err(ResolveError::CircularReference {
                            reference: reference.to_string(),
                        });
                    }
                    let target = resolve_pointer(root, reference)?;
                    active.push(reference.to_string());
                    let resolved = inline(target, root, active)?;
                    active.pop();
                    return Ok(with_display(resolved, display_values(value)));
                }
            }

            let mut out = Map::new();
            for (key, child) in map {
                let child = match (key.as_str(), child) {
                    (k, _) if NON_SCHEMA_KEYS.contains(&k) => child.clone(),
                    (k, Value::Object(props)) if PROPERTY_MAP_KEYS.contains(&k) => {
                        inline_property_map(props, root, active)?
                    }
                    _ => inline(child, root, active)?,
                };
                out.insert(key.clone(), child);
            }
            Ok(Value::Object(out))
        }
        Value::Array(arr) => arr
            .iter()
            .map(|item| inline(item, root, active))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        other => Ok(other.clone()),
    }
}

// Property names are arbitrary; `default` here is a field, not a keyword.
fn inline_property_map(
    props: &Map<String, Value>,
    root: &Value,
    active: &mut Vec<String>,
) -> Result<Value, ResolveError> {
    let mut out = Map::new();
    for (name, schema) in props {
        out.insert(name.clone(), inline(schema, root, active)?);
    }
    Ok(Value::Object(out))
}

/// `title` and `description` of a node, when set.
pub fn display_values(node: &Value) -> Map<String, Value> {
    let mut out = Map::new();
    for field in DISPLAY_FIELDS {
        match node.get(*field) {
            None | Some(Value::Null) | Some(Value::Bool(false)) => {}
            Some(Value::String(s)) if s.is_empty() => {}
            Some(v) => {
                out.insert(field.to_string(), v.clone());
            }
        }
    }
    out
}

/// Overlay display fields onto `target`; display fields win.
pub fn with_display(mut target: Value, display: Map<String, Value>) -> Value {
    if let Value::Object(map) = &mut target {
        map.extend(display);
    }
    target
}
