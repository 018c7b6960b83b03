//! Error types for schema resolution, rule translation and payload validation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors while loading a schema and dereferencing its `$ref` entries.
#[derive(Debug, Error)]
pub enum ResolveError {
    // Configuration errors (exit code 2)
    #[error("schema source must contain a document or a url")]
    MissingSource,

    #[error("unable to construct URL for external reference {reference}")]
    UnresolvableBase { reference: String },

    #[error("invalid URL '{url}': {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    // IO errors (exit code 3)
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("cannot read {path}: {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[cfg(feature = "remote")]
    #[error("failed to fetch {url}: {source}")]
    NetworkError {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to fetch {url}: {message}")]
    Fetch { url: String, message: String },

    // Parse errors (exit code 2)
    #[error("invalid JSON in {origin}: {source}")]
    InvalidJson {
        origin: String,
        #[source]
        source: serde_json::Error,
    },

    // Reference errors (exit code 2)
    #[error("uncaught external reference {reference}")]
    UncaughtExternalReference { reference: String },

    #[error("unsupported reference {reference}: {message}")]
    UnsupportedReference { reference: String, message: String },

    #[error("reference {reference} not found: no segment '{segment}'")]
    PointerNotFound { reference: String, segment: String },

    #[error("circular reference detected: {reference}")]
    CircularReference { reference: String },
}

impl ResolveError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ResolveError::FileNotFound { .. }
            | ResolveError::ReadError { .. }
            | ResolveError::Fetch { .. } => 3,
            #[cfg(feature = "remote")]
            ResolveError::NetworkError { .. } => 3,
            _ => 2,
        }
    }
}

/// Errors while turning a dereferenced schema into rules.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("invalid value for '{keyword}' at {path}: {value}")]
    InvalidKeyword {
        path: String,
        keyword: &'static str,
        value: String,
    },

    #[error("invalid pattern at {path}: {source}")]
    InvalidPattern {
        path: String,
        #[source]
        source: regex::Error,
    },
}

impl TranslateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            TranslateError::Resolve(e) => e.exit_code(),
            _ => 2,
        }
    }
}

/// Errors from the resolve-then-translate pipeline.
#[derive(Debug, Error)]
pub enum CompileError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Translate(#[from] TranslateError),
}

impl CompileError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Resolve(e) => e.exit_code(),
            CompileError::Translate(e) => e.exit_code(),
        }
    }
}

/// Errors during payload validation.
#[derive(Debug, Error)]
pub enum ValidateError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error("invalid schema: {message}")]
    InvalidSchema { message: String },

    #[error("validation failed with {} error(s)", violations.len())]
    Invalid { violations: Vec<SchemaViolation> },
}

impl ValidateError {
    /// Returns the exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            ValidateError::Resolve(e) => e.exit_code(),
            ValidateError::InvalidSchema { .. } => 2,
            ValidateError::Invalid { .. } => 1,
        }
    }
}

/// Single payload violation, located both in the payload and in the rule map.
#[derive(Debug, Clone, serde::Serialize)]
pub struct SchemaViolation {
    /// JSON Pointer (RFC 6901) to the invalid value in the payload.
    pub path: String,
    /// Dotted rule key governing the value (`tags.$.name`).
    pub rule_key: String,
    /// Human-readable error message.
    pub message: String,
}

impl std::fmt::Display for SchemaViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.rule_key.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "{}: {}", self.rule_key, self.message)
        }
    }
}
