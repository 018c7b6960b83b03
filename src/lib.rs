//! Schema Rules
//!
//! Compiles a JSON Schema into a flat map of validation rules keyed by dotted
//! property path.
//!
//! Compilation runs in two stages. [`SchemaResolver::resolve`] fetches every
//! external `$ref` (concurrently, through a shared [`ReferenceCache`]) and
//! splices the targets into the document. [`translate`] then walks the
//! resolved document and emits one [`Rule`] per property.
//!
//! # Example
//!
//! ```
//! use schema_rules::{translate, RuleType, ScalarType};
//! use serde_json::json;
//!
//! let schema = json!({
//!     "type": "object",
//!     "required": ["name"],
//!     "properties": {
//!         "name": { "type": "string", "maxLength": 40 },
//!         "tags": {
//!             "type": "array",
//!             "items": {
//!                 "type": "object",
//!                 "properties": { "label": { "type": "string" } }
//!             }
//!         }
//!     }
//! });
//!
//! let rules = translate(&schema).unwrap();
//!
//! assert!(!rules["name"].optional);
//! assert_eq!(rules["name"].max, Some(40.0));
//! assert_eq!(rules["tags"].rule_type, RuleType::ArrayOf(ScalarType::Object));
//! assert!(rules.contains_key("tags.$.label"));
//! ```
//!
//! # Rule keys
//!
//! | Schema shape | Keys emitted |
//! |--------------|--------------|
//! | object `a` with property `b` | `a`, `a.b` |
//! | array `a` of objects with property `b` | `a`, `a.$.b` |
//! | array `a` of scalars | `a` |
//! | object `a` with truthy `additionalProperties` | `a` (blackbox) |
//!
//! Fetching over HTTP needs the `remote` feature (on by default), which
//! provides [`HttpFetcher`]. Any other transport can implement [`Fetch`].

mod cache;
mod error;
mod flatten;
mod loader;
mod reference;
mod resolver;
mod rules;
mod translator;
mod types;
mod validator;

pub use cache::ReferenceCache;
pub use error::{CompileError, ResolveError, SchemaViolation, TranslateError, ValidateError};
pub use flatten::{flatten, flatten_paths, FlatEntry, FlattenOptions};
pub use loader::{is_absolute_url, is_url, load_schema, load_schema_str, Fetch};
pub use reference::{
    dereference_property, inline_internal_refs, resolve_internal, resolve_pointer, DISPLAY_FIELDS,
};
pub use resolver::{external_references, ReferenceItem, SchemaResolver, SchemaSource};
pub use rules::{map_rule, FIRST_OPTION_NONE};
pub use translator::{translate, translate_properties};
pub use types::{FieldHints, NodeKind, RegexKind, Rule, RuleMap, RuleRegex, RuleType, ScalarType};
pub use validator::{rule_key_for_pointer, validate_payload};

#[cfg(feature = "remote")]
pub use loader::{HttpFetcher, HTTP_TIMEOUT};
