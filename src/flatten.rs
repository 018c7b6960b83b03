//! Path flattening: nested document to a single level of dotted paths.
//!
//! Only used to locate `$ref` entries and ancestor `id` keys. The flattened
//! keys are not an addressing scheme for rules; the translator builds its own.

use serde_json::{Map, Value};

/// Options controlling how deep and how far the flattener walks.
#[derive(Debug, Clone)]
pub struct FlattenOptions {
    /// Separator placed between path segments.
    pub delimiter: String,
    /// Maximum number of segments in a key. `None` walks to the leaves.
    pub max_depth: Option<usize>,
    /// When true, arrays are never descended into and become leaves.
    pub safe: bool,
}

impl Default for FlattenOptions {
    fn default() -> Self {
        Self {
            delimiter: ".".to_string(),
            max_depth: None,
            safe: false,
        }
    }
}

impl FlattenOptions {
    pub fn delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = delimiter.into();
        self
    }

    pub fn max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = Some(max_depth);
        self
    }

    pub fn safe(mut self, safe: bool) -> Self {
        self.safe = safe;
        self
    }
}

/// One leaf of a flattened document, with its raw path segments.
#[derive(Debug, Clone, PartialEq)]
pub struct FlatEntry<'a> {
    pub path: Vec<String>,
    pub value: &'a Value,
}

impl FlatEntry<'_> {
    /// The entry's key joined with `delimiter`.
    pub fn key(&self, delimiter: &str) -> String {
        self.path.join(delimiter)
    }

    /// Last path segment, or "" for the root.
    pub fn last_segment(&self) -> &str {
        self.path.last().map(String::as_str).unwrap_or("")
    }
}

/// Flatten `document` into `dotted.path -> leaf value`.
pub fn flatten(document: &Value, options: &FlattenOptions) -> Map<String, Value> {
    flatten_paths(document, options)
        .into_iter()
        .map(|entry| (entry.key(&options.delimiter), entry.value.clone()))
        .collect()
}

/// Flatten `document`, keeping each leaf's path as separate segments.
///
/// Leaves come out in document order. A scalar root yields no entries.
pub fn flatten_paths<'a>(document: &'a Value, options: &FlattenOptions) -> Vec<FlatEntry<'a>> {
    let mut out = Vec::new();
    let mut path = Vec::new();
    step(document, &mut path, options, &mut out);
    out
}

fn step<'a>(
    value: &'a Value,
    path: &mut Vec<String>,
    options: &FlattenOptions,
    out: &mut Vec<FlatEntry<'a>>,
) {
    let children: Vec<(String, &'a Value)> = match value {
        Value::Object(map) => map.iter().map(|(k, v)| (k.clone(), v)).collect(),
        Value::Array(arr) => arr
            .iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        _ => return,
    };

    for (key, child) in children {
        path.push(key);
        if descends(child, path.len(), options) {
            step(child, path, options, out);
        } else {
            out.push(FlatEntry {
                path: path.clone(),
                value: child,
            });
        }
        path.pop();
    }
}

fn descends(value: &Value, depth: usize, options: &FlattenOptions) -> bool {
    if options.max_depth.is_some_and(|max| depth >= max) {
        return false;
    }
    match value {
        Value::Object(map) => !map.is_empty(),
        Value::Array(arr) => !options.safe && !arr.is_empty(),
        _ => false,
    }
}
