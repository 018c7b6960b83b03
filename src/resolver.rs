//! External reference resolution and the resolve/compile entry points.
//!
//! External `$ref` entries are located by flattening the document, given an
//! absolute URL (from the reference itself, an ancestor's absolute `id`, or
//! the document's own URL), resolved through the [`ReferenceCache`] and the
//! [`Fetch`] collaborator, and spliced in where they were referenced.

use futures::future::{try_join_all, BoxFuture, FutureExt};
use serde_json::{Map, Value};
use tracing::{debug, info};
use url::Url;

use crate::cache::ReferenceCache;
use crate::error::{CompileError, ResolveError};
use crate::flatten::{flatten_paths, FlattenOptions};
use crate::loader::{is_absolute_url, is_url, load_schema_str, Fetch};
use crate::reference::{
    dereference_property, display_values, inline_internal_refs, resolve_pointer, with_display,
};
use crate::translator::translate;
use crate::types::RuleMap;

/// Keys checked on ancestors for a base URL, in order.
const ID_KEYS: &[&str] = &["id", "$id"];

/// What to resolve: an inline document (or its text), a URL, or both.
///
/// With both, the inline document is used and the URL serves as its base
/// and cache key.
#[derive(Debug, Clone, Default)]
pub struct SchemaSource {
    pub document: Option<Value>,
    pub text: Option<String>,
    pub url: Option<String>,
}

impl SchemaSource {
    pub fn from_document(document: Value) -> Self {
        Self {
            document: Some(document),
            ..Self::default()
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn from_url(url: impl Into<String>) -> Self {
        Self {
            url: Some(url.into()),
            ..Self::default()
        }
    }

    /// Set the URL the document was (or would be) fetched from.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }
}

/// One external reference found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReferenceItem {
    /// Absolute URL of the referenced document.
    pub url: String,
    /// Pointer inside that document (the part after `#`), if any.
    pub relative_path: Option<String>,
    /// Dotted location of the `$ref` in the host document.
    pub key: String,
    /// Location of the `$ref` as raw segments (last segment is `$ref`).
    pub path: Vec<String>,
}

impl ReferenceItem {
    /// Segments of the node that carries the `$ref`.
    pub fn node_path(&self) -> &[String] {
        &self.path[..self.path.len().saturating_sub(1)]
    }
}

/// Find every external `$ref` in `document` and compute its absolute URL.
///
/// # Errors
///
/// `UnresolvableBase` when a relative reference has no absolute `id` on any
/// ancestor and no `source_url` was given; `UnsupportedReference` for
/// anything that does not end up as an http(s) URL.
pub fn external_references(
    document: &Value,
    source_url: Option<&str>,
) -> Result<Vec<ReferenceItem>, ResolveError> {
    let options = FlattenOptions::default();
    let entries = flatten_paths(document, &options);

    let mut items = Vec::new();
    for entry in &entries {
        if entry.last_segment() != "$ref" {
            continue;
        }
        let Some(reference) = entry.value.as_str() else {
            continue;
        };
        if reference.starts_with('#') {
            continue;
        }

        let (external, fragment) = match reference.split_once('#') {
            Some((external, fragment)) => (external, Some(fragment)),
            None => (reference, None),
        };

        let url = if is_absolute_url(external) && !external.starts_with("//") {
            external.to_string()
        } else {
            let base = base_url(document, &entry.path, source_url, reference)?;
            base.join(external)
                .map_err(|source| ResolveError::InvalidUrl {
                    url: external.to_string(),
                    source,
                })?
                .to_string()
        };
        if !is_url(&url) {
            return Err(ResolveError::UnsupportedReference {
                reference: reference.to_string(),
                message: "only http and https references can be fetched".to_string(),
            });
        }

        items.push(ReferenceItem {
            url,
            relative_path: fragment.filter(|f| !f.is_empty()).map(String::from),
            key: entry.key(&options.delimiter),
            path: entry.path.clone(),
        });
    }
    Ok(items)
}

/// The base URL governing the `$ref` at `ref_path`.
///
/// Walks from the referencing node up to the root; the first node with an
/// absolute `id` wins, otherwise the document's own URL.
fn base_url(
    document: &Value,
    ref_path: &[String],
    source_url: Option<&str>,
    reference: &str,
) -> Result<Url, ResolveError> {
    for depth in (0..ref_path.len()).rev() {
        let Some(node) = node_at(document, &ref_path[..depth]) else {
            continue;
        };
        let id = ID_KEYS
            .iter()
            .filter_map(|key| node.get(*key).and_then(Value::as_str))
            .find(|id| is_absolute_url(id) && !id.starts_with("//"));
        if let Some(id) = id {
            return parse_url(id);
        }
    }

    match source_url {
        Some(url) => parse_url(url),
        None => Err(ResolveError::UnresolvableBase {
            reference: reference.to_string(),
        }),
    }
}

fn parse_url(url: &str) -> Result<Url, ResolveError> {
    Url::parse(url).map_err(|source| ResolveError::InvalidUrl {
        url: url.to_string(),
        source,
    })
}

fn node_at<'a>(document: &'a Value, path: &[String]) -> Option<&'a Value> {
    path.iter().try_fold(document, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(arr) => segment.parse::<usize>().ok().and_then(|i| arr.get(i)),
        _ => None,
    })
}

fn node_at_mut<'a>(document: &'a mut Value, path: &[String]) -> Option<&'a mut Value> {
    path.iter().try_fold(document, |node, segment| match node {
        Value::Object(map) => map.get_mut(segment),
        Value::Array(arr) => segment.parse::<usize>().ok().and_then(|i| arr.get_mut(i)),
        _ => None,
    })
}

/// Resolves schema documents, following internal and external references.
///
/// Resolved remote documents are kept in a [`ReferenceCache`] shared by
/// every call on this resolver (and by any resolver given the same cache).
pub struct SchemaResolver<F> {
    fetcher: F,
    cache: ReferenceCache,
}

impl<F: Fetch> SchemaResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self {
            fetcher,
            cache: ReferenceCache::new(),
        }
    }

    /// Use `cache` instead of a private one.
    pub fn with_cache(mut self, cache: ReferenceCache) -> Self {
        self.cache = cache;
        self
    }

    pub fn cache(&self) -> &ReferenceCache {
        &self.cache
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Forget every resolved document.
    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    /// Resolve a schema so that no external reference remains and the
    /// top-level properties are dereferenced.
    ///
    /// # Errors
    ///
    /// `MissingSource` when `source` holds neither a document nor a URL;
    /// otherwise the first configuration, parse, reference or fetch error
    /// hit anywhere in the reference graph. No partial result is returned.
    pub async fn resolve(&self, source: SchemaSource) -> Result<Value, ResolveError> {
        let SchemaSource {
            document,
            text,
            url,
        } = source;

        if let Some(url) = &url {
            parse_url(url)?;
            if let Some(document) = self.cache.get(url) {
                debug!(url = %url, "schema cache hit");
                return Ok(document);
            }
        }

        let document = match (document, text) {
            (Some(document), _) => Some(document),
            (None, Some(text)) => Some(load_schema_str(
                &text,
                url.as_deref().unwrap_or("<inline>"),
            )?),
            (None, None) => None,
        };

        match (document, url) {
            (Some(document), url) => {
                let chain: Vec<String> = url.iter().cloned().collect();
                let resolved = self
                    .resolve_document(document, url.as_deref(), &chain)
                    .await?;
                if let Some(url) = url {
                    self.cache.insert(&url, resolved.clone());
                }
                Ok(resolved)
            }
            (None, Some(url)) => self.resolve_url(url, Vec::new()).await,
            (None, None) => Err(ResolveError::MissingSource),
        }
    }

    /// Resolve then translate.
    pub async fn compile(&self, source: SchemaSource) -> Result<RuleMap, CompileError> {
        let resolved = self.resolve(source).await?;
        Ok(translate(&resolved)?)
    }

    /// Fetch (or reuse) the resolved document at `url`.
    ///
    /// `chain` lists the documents whose resolution led here; meeting one of
    /// them again is a cycle.
    fn resolve_url(
        &self,
        url: String,
        chain: Vec<String>,
    ) -> BoxFuture<'_, Result<Value, ResolveError>> {
        async move {
            if chain.contains(&url) {
                return Err(ResolveError::CircularReference { reference: url });
            }
            if let Some(document) = self.cache.get(&url) {
                debug!(url = %url, "schema cache hit");
                return Ok(document);
            }

            debug!(url = %url, "fetching schema");
            let text = self.fetcher.fetch(&url).await?;
            let document = load_schema_str(&text, &url)?;

            let mut chain = chain;
            chain.push(url.clone());
            let resolved = self.resolve_document(document, Some(&url), &chain).await?;

            if !self.cache.insert(&url, resolved.clone()) {
                debug!(url = %url, "schema already cached by a concurrent resolution");
            }
            Ok(resolved)
        }
        .boxed()
    }

    async fn resolve_document(
        &self,
        mut document: Value,
        source_url: Option<&str>,
        chain: &[String],
    ) -> Result<Value, ResolveError> {
        let (own, items): (Vec<ReferenceItem>, Vec<ReferenceItem>) =
            external_references(&document, source_url)?
                .into_iter()
                .partition(|item| Some(item.url.as_str()) == source_url);

        // A reference back to this document's own URL is an internal pointer;
        // it then sees the document after the external splices below.
        for item in &own {
            if let Some(slot) = node_at_mut(&mut document, &item.path) {
                let fragment = item.relative_path.as_deref().unwrap_or("");
                *slot = Value::String(format!("#{}", fragment));
            }
        }

        if !items.is_empty() {
            let mut urls: Vec<String> = Vec::new();
            for item in &items {
                if !urls.contains(&item.url) {
                    urls.push(item.url.clone());
                }
            }
            info!(
                references = items.len(),
                documents = urls.len(),
                "resolving external references"
            );

            let targets = try_join_all(
                urls.iter()
                    .map(|url| self.resolve_url(url.clone(), chain.to_vec())),
            )
            .await?;

            for item in &items {
                let Some(target) = urls
                    .iter()
                    .position(|url| url == &item.url)
                    .and_then(|i| targets.get(i))
                else {
                    continue;
                };
                let fragment = match &item.relative_path {
                    Some(pointer) => resolve_pointer(target, &format!("#{}", pointer))?,
                    None => target,
                };
                let replacement = inline_internal_refs(fragment, target)?;
                splice(&mut document, item, replacement);
            }
        }

        dereference_properties(&mut document)?;
        Ok(document)
    }
}

/// Replace the node carrying `item`'s `$ref` with `replacement`, keeping the
/// node's display fields.
fn splice(document: &mut Value, item: &ReferenceItem, replacement: Value) {
    match node_at_mut(document, item.node_path()) {
        Some(slot) => {
            let display = display_values(slot);
            *slot = with_display(replacement, display);
            debug!(key = %item.key, url = %item.url, "spliced external schema");
        }
        // An earlier splice replaced an ancestor of this reference.
        None => debug!(key = %item.key, "reference location no longer present"),
    }
}

/// Dereference each top-level property against the host document.
fn dereference_properties(document: &mut Value) -> Result<(), ResolveError> {
    let Some(properties) = document.get("properties").and_then(Value::as_object) else {
        return Ok(());
    };

    let mut resolved = Map::new();
    for (key, property) in properties {
        resolved.insert(key.clone(), dereference_property(property, document)?);
    }

    if let Some(map) = document.as_object_mut() {
        map.insert("properties".to_string(), Value::Object(resolved));
    }
    Ok(())
}
