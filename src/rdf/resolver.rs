use std::{
    path::{Path, PathBuf},
    sync::Arc,
};

use dashmap::DashMap;
use oxrdf::Graph;

use super::format::parse_path;
use crate::{config::LoaderSettings, skos::Iri, Result};

/// Supplies descriptions of resources referenced but not described by a document.
pub trait GraphResolver: Send + Sync {
    /// Returns a graph describing `iri`, or `None` when it is unknown.
    fn resolve(&self, iri: &Iri) -> Result<Option<Arc<Graph>>>;
}

/// Resolver that never finds anything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopResolver;

impl GraphResolver for NoopResolver {
    fn resolve(&self, _iri: &Iri) -> Result<Option<Arc<Graph>>> {
        Ok(None)
    }
}

/// Resolves IRIs through local documents registered per IRI prefix.
///
/// The longest matching prefix wins. Each document is parsed once.
#[derive(Debug, Default)]
pub struct DocumentResolver {
    documents: Vec<(String, PathBuf)>,
    cache: DashMap<PathBuf, Arc<Graph>>,
}

impl DocumentResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the documents listed in the loader settings.
    #[must_use]
    pub fn from_settings(settings: &LoaderSettings) -> Self {
        settings
            .documents
            .iter()
            .fold(Self::new(), |resolver, (prefix, path)| {
                resolver.with_document(prefix.clone(), path.clone())
            })
    }

    /// Serves IRIs starting with `prefix` from the document at `path`.
    #[must_use]
    pub fn with_document(mut self, prefix: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        self.documents.push((prefix.into(), path.into()));
        self.documents
            .sort_by(|(left, _), (right, _)| right.len().cmp(&left.len()).then(left.cmp(right)));
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    fn document_for(&self, iri: &Iri) -> Option<&Path> {
        self.documents
            .iter()
            .find(|(prefix, _)| iri.as_str().starts_with(prefix.as_str()))
            .map(|(_, path)| path.as_path())
    }
}

impl GraphResolver for DocumentResolver {
    fn resolve(&self, iri: &Iri) -> Result<Option<Arc<Graph>>> {
        let Some(path) = self.document_for(iri) else {
            return Ok(None);
        };
        if let Some(cached) = self.cache.get(path) {
            return Ok(Some(Arc::clone(cached.value())));
        }

        tracing::debug!(%iri, path = %path.display(), "resolving external resource");
        let graph = Arc::new(parse_path(path, None)?);
        self.cache.insert(path.to_path_buf(), Arc::clone(&graph));
        Ok(Some(graph))
    }
}

#[cfg(test)]
mod tests {
    use std::{path::PathBuf, sync::Arc};

    use super::{DocumentResolver, GraphResolver, NoopResolver};
    use crate::skos::Iri;

    #[test]
    fn longest_prefix_wins() {
        let resolver = DocumentResolver::new()
            .with_document("http://example.org/", "general.ttl")
            .with_document("http://example.org/animals/", "animals.ttl");
        let iri = Iri::new("http://example.org/animals/cat").expect("iri");
        assert_eq!(
            resolver.document_for(&iri).map(|path| path.to_string_lossy().into_owned()),
            Some("animals.ttl".to_string())
        );
        let other = Iri::new("http://elsewhere.org/x").expect("iri");
        assert!(resolver.resolve(&other).expect("resolve").is_none());
    }

    #[test]
    fn missing_document_is_an_error() {
        let resolver =
            DocumentResolver::new().with_document("http://example.org/", "does/not/exist.ttl");
        let iri = Iri::new("http://example.org/cat").expect("iri");
        assert!(resolver.resolve(&iri).is_err());
        assert!(NoopResolver.resolve(&iri).expect("noop").is_none());
    }

    #[test]
    fn documents_are_parsed_once() {
        let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/external.ttl");
        let resolver = DocumentResolver::new().with_document("http://example.org/external/", path);
        let feline = Iri::new("http://example.org/external/feline").expect("iri");
        let carnivore = Iri::new("http://example.org/external/carnivore").expect("iri");

        let first = resolver.resolve(&feline).expect("resolve").expect("graph");
        let second = resolver.resolve(&carnivore).expect("resolve").expect("graph");
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(resolver.cache.len(), 1);
    }
}
