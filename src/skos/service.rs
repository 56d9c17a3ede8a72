use std::{
    collections::BTreeSet,
    io::Write,
    path::Path,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use async_trait::async_trait;
use serde::Serialize;

use crate::{
    config::{Config, LoaderSettings, StoreBackend},
    rdf::{write_vocabulary, RdfLoader, SourceFormat},
    skos::{
        entities::LabelKind,
        repositories::{ConceptSnapshot, SkosRepository},
        value_objects::Iri,
        vocabulary::{Vocabulary, VocabularySummary},
    },
    Error, Result,
};

/// Type alias simplifying repository trait object usage inside the service.
pub type RepositoryHandle = dyn SkosRepository<Error = Error> + Send + Sync + 'static;

/// A concept and the concepts below it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    pub concept: Iri,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub children: Vec<HierarchyNode>,
}

/// High level service wiring the RDF loader and a repository together.
#[derive(Clone)]
pub struct SkosService {
    repository: Arc<RepositoryHandle>,
    loader: RdfLoader,
}

impl SkosService {
    pub fn new(repository: Arc<RepositoryHandle>, loader: LoaderSettings) -> Self {
        Self {
            repository,
            loader: RdfLoader::new(loader),
        }
    }

    /// Builds a service instance from configuration settings.
    ///
    /// # Errors
    ///
    /// Fails when the database cannot be reached or migrated, or when the
    /// database backend is selected in a build without `with-db`.
    pub async fn from_config(config: &Config) -> Result<Self> {
        let repository: Arc<RepositoryHandle> = match config.store.backend {
            StoreBackend::InMemory => Arc::new(InMemorySkosRepository::default()),
            #[cfg(feature = "with-db")]
            StoreBackend::Database => {
                let db = crate::db::connect(&config.store.database).await?;
                Arc::new(crate::db::SeaOrmSkosRepository::new(db))
            }
            #[cfg(not(feature = "with-db"))]
            StoreBackend::Database => return Err(Error::BackendUnavailable("database")),
        };
        tracing::debug!(backend = ?config.store.backend, "skos service ready");
        Ok(Self::new(repository, config.loader.clone()))
    }

    /// Returns a clone of the repository handle.
    pub fn repository(&self) -> Arc<RepositoryHandle> {
        Arc::clone(&self.repository)
    }

    #[must_use]
    pub fn loader(&self) -> &RdfLoader {
        &self.loader
    }

    /// Parses a document without storing it.
    pub fn load_path(&self, path: &Path) -> Result<Vocabulary> {
        self.loader.load_path(path)
    }

    /// Parses a document and stores every resource it describes.
    pub async fn import_path(&self, path: &Path) -> Result<VocabularySummary> {
        let vocabulary = self.loader.load_path(path)?;
        self.repository.save(&vocabulary).await?;
        let summary = vocabulary.summary();
        tracing::info!(
            path = %path.display(),
            concepts = summary.concept_count,
            schemes = summary.scheme_count,
            collections = summary.collection_count,
            "vocabulary imported"
        );
        Ok(summary)
    }

    /// Serializes everything stored.
    pub async fn export<W: Write>(&self, writer: W, format: SourceFormat) -> Result<W> {
        let vocabulary = self.repository.load().await?;
        write_vocabulary(&vocabulary, writer, format)
    }

    pub async fn concept(&self, iri: &Iri) -> Result<ConceptSnapshot> {
        self.repository
            .concept(iri)
            .await?
            .ok_or_else(|| Error::NotFound(iri.clone()))
    }

    /// Builds the concept tree of a scheme, or of the whole store.
    ///
    /// Without a scheme, concepts with no broader concept are the roots.
    /// A concept already on the current path is not expanded again.
    pub async fn hierarchy(&self, scheme: Option<&Iri>) -> Result<Vec<HierarchyNode>> {
        let vocabulary = self.repository.load().await?;
        let roots = match scheme {
            Some(scheme) => vocabulary.top_concepts(scheme)?,
            None => vocabulary.roots(),
        };
        let language = self.loader.settings().language.as_deref();
        let mut path = BTreeSet::new();
        Ok(roots
            .iter()
            .map(|root| build_node(&vocabulary, root, language, &mut path))
            .collect())
    }

    pub async fn ancestors(&self, iri: &Iri) -> Result<Vec<Iri>> {
        let vocabulary = self.repository.load().await?;
        Ok(vocabulary.ancestors(iri)?)
    }

    pub async fn descendants(&self, iri: &Iri) -> Result<Vec<Iri>> {
        let vocabulary = self.repository.load().await?;
        Ok(vocabulary.descendants(iri)?)
    }
}

fn build_node(
    vocabulary: &Vocabulary,
    id: &Iri,
    language: Option<&str>,
    path: &mut BTreeSet<Iri>,
) -> HierarchyNode {
    let concept = vocabulary.concept(id);
    let label = concept
        .and_then(|concept| concept.pref_label(language))
        .map(|label| label.value().to_owned());
    let mut node = HierarchyNode {
        concept: id.clone(),
        label,
        children: Vec::new(),
    };
    let Some(concept) = concept else {
        return node;
    };
    if !path.insert(id.clone()) {
        return node;
    }
    for child in concept.narrower() {
        if !path.contains(child) {
            node.children.push(build_node(vocabulary, child, language, path));
        }
    }
    path.remove(id);
    node
}

/// Keeps everything in a single [`Vocabulary`] guarded by a mutex.
#[derive(Debug, Default)]
pub struct InMemorySkosRepository {
    vocabulary: Mutex<Vocabulary>,
}

impl InMemorySkosRepository {
    #[must_use]
    pub fn new(vocabulary: Vocabulary) -> Self {
        Self {
            vocabulary: Mutex::new(vocabulary),
        }
    }

    fn guard(&self) -> MutexGuard<'_, Vocabulary> {
        self.vocabulary.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl SkosRepository for InMemorySkosRepository {
    type Error = Error;

    async fn save(&self, vocabulary: &Vocabulary) -> Result<()> {
        let mut guard = self.guard();
        let mut merged = guard.clone();
        merged.merge(vocabulary)?;
        *guard = merged;
        Ok(())
    }

    async fn load(&self) -> Result<Vocabulary> {
        Ok(self.guard().clone())
    }

    async fn concept(&self, iri: &Iri) -> Result<Option<ConceptSnapshot>> {
        let guard = self.guard();
        Ok(guard.concept(iri).map(|concept| ConceptSnapshot {
            concept: concept.clone(),
            schemes: guard.schemes_of(iri),
            collections: guard.collections_of(iri),
        }))
    }

    async fn delete_concept(&self, iri: &Iri) -> Result<()> {
        let mut guard = self.guard();
        if guard.concept(iri).is_none() {
            return Err(Error::NotFound(iri.clone()));
        }
        guard.remove_concept(iri)?;
        Ok(())
    }

    async fn search(&self, text: &str, language: Option<&str>) -> Result<Vec<Iri>> {
        let needle = text.to_lowercase();
        let guard = self.guard();
        Ok(guard
            .concepts()
            .filter(|concept| {
                LabelKind::ALL.into_iter().any(|kind| {
                    concept.labels(kind).any(|label| {
                        language.map_or(true, |wanted| label.matches_language(Some(wanted)))
                            && label.value().to_lowercase().contains(&needle)
                    })
                })
            })
            .map(|concept| concept.id().clone())
            .collect())
    }

    async fn summary(&self) -> Result<VocabularySummary> {
        Ok(self.guard().summary())
    }

    async fn clear(&self) -> Result<()> {
        *self.guard() = Vocabulary::new();
        Ok(())
    }
}
