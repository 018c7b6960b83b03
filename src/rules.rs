//! Rule mapping: one schema node to one [`Rule`].

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use crate::error::TranslateError;
use crate::types::{declared_type, FieldHints, NodeKind, RegexKind, Rule, RuleRegex};

pub const EMAIL_PATTERN: &str = r"^[a-zA-Z0-9.!#$%&'*+/=?^_`{|}~-]+@[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?(?:\.[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?)*$";

pub const HOSTNAME_PATTERN: &str = r"^(?:[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?\.)*[a-zA-Z0-9](?:[a-zA-Z0-9-]{0,61}[a-zA-Z0-9])?$";

pub const IPV4_PATTERN: &str = r"^(?:(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])\.){3}(?:25[0-5]|2[0-4][0-9]|1[0-9]{2}|[1-9]?[0-9])$";

pub const IPV6_PATTERN: &str = r"^(?:(?:[0-9A-Fa-f]{1,4}:){7}[0-9A-Fa-f]{1,4}|(?:[0-9A-Fa-f]{1,4}:){1,7}:|(?:[0-9A-Fa-f]{1,4}:){1,6}:[0-9A-Fa-f]{1,4}|(?:[0-9A-Fa-f]{1,4}:){1,5}(?::[0-9A-Fa-f]{1,4}){1,2}|(?:[0-9A-Fa-f]{1,4}:){1,4}(?::[0-9A-Fa-f]{1,4}){1,3}|(?:[0-9A-Fa-f]{1,4}:){1,3}(?::[0-9A-Fa-f]{1,4}){1,4}|(?:[0-9A-Fa-f]{1,4}:){1,2}(?::[0-9A-Fa-f]{1,4}){1,5}|[0-9A-Fa-f]{1,4}:(?::[0-9A-Fa-f]{1,4}){1,6}|:(?:(?::[0-9A-Fa-f]{1,4}){1,7}|:))$";

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(EMAIL_PATTERN).expect("email pattern compiles"));
static HOSTNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(HOSTNAME_PATTERN).expect("hostname pattern compiles"));
static IPV4: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IPV4_PATTERN).expect("ipv4 pattern compiles"));
static IPV6: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(IPV6_PATTERN).expect("ipv6 pattern compiles"));

/// Hint value for enums that allow "no selection".
pub const FIRST_OPTION_NONE: &str = "(None)";

/// Rule field a schema keyword is copied into. The field fixes the coercion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Target {
    Label,
    Min,
    Max,
    ExclusiveMin,
    ExclusiveMax,
    MinCount,
    MaxCount,
    DefaultValue,
}

#[derive(Debug, Clone, Copy)]
struct KeywordRule {
    keyword: &'static str,
    target: Target,
}

/// Keyword copy table, applied in order (so `minLength` overrides `minimum`).
const KEYWORD_TABLE: &[KeywordRule] = &[
    KeywordRule {
        keyword: "title",
        target: Target::Label,
    },
    KeywordRule {
        keyword: "minimum",
        target: Target::Min,
    },
    KeywordRule {
        keyword: "maximum",
        target: Target::Max,
    },
    KeywordRule {
        keyword: "exclusiveMinimum",
        target: Target::ExclusiveMin,
    },
    KeywordRule {
        keyword: "exclusiveMaximum",
        target: Target::ExclusiveMax,
    },
    KeywordRule {
        keyword: "minLength",
        target: Target::Min,
    },
    KeywordRule {
        keyword: "maxLength",
        target: Target::Max,
    },
    KeywordRule {
        keyword: "minItems",
        target: Target::MinCount,
    },
    KeywordRule {
        keyword: "maxItems",
        target: Target::MaxCount,
    },
    KeywordRule {
        keyword: "default",
        target: Target::DefaultValue,
    },
];

impl KeywordRule {
    fn apply(&self, rule: &mut Rule, value: &Value, path: &str) -> Result<(), TranslateError> {
        let invalid = || TranslateError::InvalidKeyword {
            path: path.to_string(),
            keyword: self.keyword,
            value: value.to_string(),
        };
        match self.target {
            Target::Label => {
                rule.label = Some(match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
            }
            Target::Min => rule.min = Some(coerce_number(value).ok_or_else(invalid)?),
            Target::Max => rule.max = Some(coerce_number(value).ok_or_else(invalid)?),
            Target::ExclusiveMin => {
                rule.exclusive_min = Some(coerce_bool(value).ok_or_else(invalid)?)
            }
            Target::ExclusiveMax => {
                rule.exclusive_max = Some(coerce_bool(value).ok_or_else(invalid)?)
            }
            Target::MinCount => rule.min_count = Some(coerce_count(value).ok_or_else(invalid)?),
            Target::MaxCount => rule.max_count = Some(coerce_count(value).ok_or_else(invalid)?),
            Target::DefaultValue => rule.default_value = Some(value.clone()),
        }
        Ok(())
    }
}

/// Numbers, or strings that parse as numbers.
fn coerce_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|f| f.is_finite()),
        _ => None,
    }
}

/// Booleans, numbers (non-zero is true), and "true"/"false" or numeric strings.
fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        Value::String(s) => match s.trim() {
            "true" => Some(true),
            "false" => Some(false),
            other => other.parse::<f64>().ok().map(|f| f != 0.0),
        },
        _ => None,
    }
}

fn coerce_count(value: &Value) -> Option<u64> {
    let n = coerce_number(value)?;
    (n >= 0.0 && n.fract() == 0.0 && n <= u64::MAX as f64).then_some(n as u64)
}

/// Build the rule for one dereferenced schema node.
///
/// `path` is the node's dotted key, used in error messages.
///
/// # Errors
///
/// `InvalidKeyword` when a constraint cannot be coerced, `InvalidPattern`
/// when `pattern` is not a valid regular expression.
pub fn map_rule(
    path: &str,
    node: &Value,
    is_required: bool,
    is_blackbox: bool,
) -> Result<Rule, TranslateError> {
    let kind = NodeKind::classify(node);
    let mut rule = Rule::new(kind.rule_type(), !is_required);

    for entry in KEYWORD_TABLE {
        if let Some(value) = node.get(entry.keyword) {
            entry.apply(&mut rule, value, path)?;
        }
    }

    if is_blackbox {
        rule.blackbox = Some(true);
    }

    let pattern = node.get("pattern");
    if let Some(pattern) = pattern {
        let source = pattern
            .as_str()
            .ok_or_else(|| TranslateError::InvalidKeyword {
                path: path.to_string(),
                keyword: "pattern",
                value: pattern.to_string(),
            })?;
        let regex = Regex::new(source).map_err(|source| TranslateError::InvalidPattern {
            path: path.to_string(),
            source,
        })?;
        rule.regex = Some(RuleRegex::new(RegexKind::Pattern, regex));
    }

    let mut allows_none = false;
    if let Some(values) = node.get("enum") {
        let values = values
            .as_array()
            .ok_or_else(|| TranslateError::InvalidKeyword {
                path: path.to_string(),
                keyword: "enum",
                value: values.to_string(),
            })?;
        allows_none = values.iter().any(Value::is_null);
        rule.allowed_values = Some(values.iter().filter(|v| !v.is_null()).cloned().collect());
    }

    let format = node.get("format").and_then(Value::as_str);
    if pattern.is_none() {
        match format {
            Some("email") => rule.regex = Some(builtin(RegexKind::Email, &EMAIL)),
            Some("host-name") | Some("hostname") => {
                rule.regex = Some(builtin(RegexKind::Hostname, &HOSTNAME))
            }
            Some("ipv4") => rule.regex = Some(builtin(RegexKind::Ipv4, &IPV4)),
            Some("ipv6") => rule.regex = Some(builtin(RegexKind::Ipv6, &IPV6)),
            _ if is_decimal(node, &kind) => rule.decimal = Some(true),
            _ => {}
        }
    }

    let hints = FieldHints {
        title: node
            .get("description")
            .and_then(Value::as_str)
            .filter(|d| !d.is_empty())
            .map(String::from),
        input_type: (format == Some("date-time")).then(|| "datetime".to_string()),
        first_option: allows_none.then(|| FIRST_OPTION_NONE.to_string()),
    };
    if !hints.is_empty() {
        rule.ui_hints = Some(hints);
    }

    Ok(rule)
}

fn builtin(kind: RegexKind, regex: &LazyLock<Regex>) -> RuleRegex {
    RuleRegex::new(kind, Regex::clone(regex))
}

/// `number` (not `integer`) scalars and arrays of `number`.
fn is_decimal(node: &Value, kind: &NodeKind) -> bool {
    let type_name = if kind.is_array() {
        node.get("items").and_then(declared_type)
    } else {
        declared_type(node)
    };
    type_name == Some("number")
}
