//! Core types: rules, rule maps, and the normalized shape of a schema node.

use std::collections::BTreeMap;

use regex::Regex;
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Flat rule table keyed by dotted property path (`address.city`, `tags.$.name`).
pub type RuleMap = BTreeMap<String, Rule>;

/// Scalar value kind a rule accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ScalarType {
    String,
    Number,
    Boolean,
    Object,
    Date,
}

impl ScalarType {
    /// Infer the scalar kind from a JSON Schema `type` and `format`.
    ///
    /// Anything that is not numeric, boolean or object falls back to a
    /// string, unless the format names a date.
    pub fn infer(type_name: Option<&str>, format: Option<&str>) -> Self {
        match type_name {
            Some("integer") | Some("number") => ScalarType::Number,
            Some("boolean") => ScalarType::Boolean,
            Some("object") => ScalarType::Object,
            _ => match format {
                Some("date") | Some("date-time") => ScalarType::Date,
                _ => ScalarType::String,
            },
        }
    }
}

/// Rule type: a scalar or an array of scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RuleType {
    Scalar(ScalarType),
    ArrayOf(ScalarType),
}

impl RuleType {
    /// The scalar kind, or the element kind for arrays.
    pub fn scalar(&self) -> ScalarType {
        match self {
            RuleType::Scalar(s) | RuleType::ArrayOf(s) => *s,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, RuleType::ArrayOf(_))
    }
}

// Arrays serialize as a one-element list: "string" vs ["string"].
impl Serialize for RuleType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RuleType::Scalar(s) => s.serialize(serializer),
            RuleType::ArrayOf(s) => [s].serialize(serializer),
        }
    }
}

/// Where a rule's regular expression came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RegexKind {
    /// Explicit `pattern` keyword.
    Pattern,
    Email,
    Hostname,
    Ipv4,
    Ipv6,
}

/// Compiled regular expression attached to a rule.
#[derive(Debug, Clone)]
pub struct RuleRegex {
    kind: RegexKind,
    regex: Regex,
}

impl RuleRegex {
    pub fn new(kind: RegexKind, regex: Regex) -> Self {
        Self { kind, regex }
    }

    pub fn kind(&self) -> RegexKind {
        self.kind
    }

    /// The source text of the expression.
    pub fn as_str(&self) -> &str {
        self.regex.as_str()
    }

    pub fn is_match(&self, text: &str) -> bool {
        self.regex.is_match(text)
    }

    pub fn regex(&self) -> &Regex {
        &self.regex
    }
}

impl PartialEq for RuleRegex {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.as_str() == other.as_str()
    }
}

impl Serialize for RuleRegex {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Opaque form-rendering hints. Attached to rules, never interpreted here.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldHints {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_option: Option<String>,
}

impl FieldHints {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.input_type.is_none() && self.first_option.is_none()
    }
}

/// One validation rule for one dotted path.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    #[serde(rename = "type")]
    pub rule_type: RuleType,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_min: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub exclusive_max: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_count: Option<u64>,
    #[serde(rename = "regEx", skip_serializing_if = "Option::is_none")]
    pub regex: Option<RuleRegex>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub allowed_values: Option<Vec<Value>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub decimal: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub blackbox: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ui_hints: Option<FieldHints>,
}

impl Rule {
    /// A rule with only a type and optionality set.
    pub fn new(rule_type: RuleType, optional: bool) -> Self {
        Self {
            rule_type,
            optional,
            min: None,
            max: None,
            exclusive_min: None,
            exclusive_max: None,
            min_count: None,
            max_count: None,
            regex: None,
            allowed_values: None,
            decimal: None,
            blackbox: None,
            default_value: None,
            label: None,
            ui_hints: None,
        }
    }

    pub fn is_blackbox(&self) -> bool {
        self.blackbox == Some(true)
    }
}

/// Normalized shape of one schema node.
///
/// Computed once per node so the translator and the rule mapper dispatch on a
/// variant instead of probing for `$ref`, `items` and `properties` keys.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind<'a> {
    Reference(&'a str),
    Scalar(ScalarType),
    Object {
        properties: Option<&'a Map<String, Value>>,
        required: Vec<&'a str>,
        open: bool,
    },
    Array {
        element: Box<NodeKind<'a>>,
    },
}

impl<'a> NodeKind<'a> {
    pub fn classify(node: &'a Value) -> Self {
        if let Some(reference) = node.get("$ref").and_then(Value::as_str) {
            return NodeKind::Reference(reference);
        }

        let format = node.get("format").and_then(Value::as_str);
        match declared_type(node) {
            Some("object") => {
                let properties = node.get("properties").and_then(Value::as_object);
                let required = match properties {
                    Some(_) => node
                        .get("required")
                        .and_then(Value::as_array)
                        .map(|arr| arr.iter().filter_map(Value::as_str).collect())
                        .unwrap_or_default(),
                    None => Vec::new(),
                };
                NodeKind::Object {
                    properties,
                    required,
                    open: node.get("additionalProperties").is_some_and(is_truthy),
                }
            }
            Some("array") => {
                let element = match node.get("items") {
                    Some(items) if items.is_object() => match NodeKind::classify(items) {
                        // Fall back to the array's own format for date elements.
                        NodeKind::Scalar(ScalarType::String) => NodeKind::Scalar(
                            ScalarType::infer(items.get("type").and_then(Value::as_str), format),
                        ),
                        other => other,
                    },
                    _ => NodeKind::Scalar(ScalarType::infer(None, format)),
                };
                NodeKind::Array {
                    element: Box::new(element),
                }
            }
            other => NodeKind::Scalar(ScalarType::infer(other, format)),
        }
    }

    /// Scalar kind of this node when used as a rule type or array element.
    pub fn scalar(&self) -> ScalarType {
        match self {
            NodeKind::Scalar(s) => *s,
            NodeKind::Object { .. } => ScalarType::Object,
            NodeKind::Reference(_) | NodeKind::Array { .. } => ScalarType::String,
        }
    }

    pub fn rule_type(&self) -> RuleType {
        match self {
            NodeKind::Array { element } => RuleType::ArrayOf(element.scalar()),
            other => RuleType::Scalar(other.scalar()),
        }
    }

    /// True for open objects and arrays of open objects.
    pub fn is_open(&self) -> bool {
        match self {
            NodeKind::Object { open, .. } => *open,
            NodeKind::Array { element } => {
                matches!(element.as_ref(), NodeKind::Object { open: true, .. })
            }
            _ => false,
        }
    }

    /// Declared sub-properties and their required list, for objects and
    /// arrays of objects.
    pub fn sub_properties(&self) -> Option<(&'a Map<String, Value>, &[&'a str])> {
        match self {
            NodeKind::Object {
                properties: Some(props),
                required,
                ..
            } => Some((props, required.as_slice())),
            NodeKind::Array { element } => element.sub_properties(),
            _ => None,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, NodeKind::Array { .. })
    }
}

/// The `type` keyword, taking the first non-null entry of a type list.
pub fn declared_type(node: &Value) -> Option<&str> {
    match node.get("type")? {
        Value::String(s) => Some(s.as_str()),
        Value::Array(types) => types
            .iter()
            .filter_map(Value::as_str)
            .find(|t| *t != "null"),
        _ => None,
    }
}

/// JavaScript-style truthiness, used for `additionalProperties`.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0 && !f.is_nan()),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
