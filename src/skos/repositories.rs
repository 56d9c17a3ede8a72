use async_trait::async_trait;
use serde::Serialize;

use super::entities::Concept;
use super::value_objects::Iri;
use super::vocabulary::{Vocabulary, VocabularySummary};

/// A stored concept together with the containers that list it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ConceptSnapshot {
    /// Concept with labels, notes and links in both directions.
    pub concept: Concept,
    /// Concept schemes the concept belongs to.
    pub schemes: Vec<Iri>,
    /// Collections listing the concept directly.
    pub collections: Vec<Iri>,
}

/// Contract describing persistence responsibilities for SKOS vocabularies.
#[async_trait]
pub trait SkosRepository {
    /// Associated error type allowing infrastructure specific failures.
    type Error;

    /// Stores every resource of the vocabulary.
    ///
    /// Resources already stored under the same IRI are replaced; others are
    /// left untouched. Implementors must apply the whole vocabulary
    /// atomically.
    async fn save(&self, vocabulary: &Vocabulary) -> Result<(), Self::Error>;

    /// Reassembles everything stored into a single vocabulary.
    async fn load(&self) -> Result<Vocabulary, Self::Error>;

    /// Retrieves a stored concept by identifier.
    ///
    /// Implementors must return `Ok(None)` when the concept is missing.
    async fn concept(&self, iri: &Iri) -> Result<Option<ConceptSnapshot>, Self::Error>;

    /// Deletes a concept and every link or membership pointing to it.
    async fn delete_concept(&self, iri: &Iri) -> Result<(), Self::Error>;

    /// Returns concepts with a label containing `text`, ignoring case.
    async fn search(&self, text: &str, language: Option<&str>) -> Result<Vec<Iri>, Self::Error>;

    /// Counts stored resources without loading them.
    async fn summary(&self) -> Result<VocabularySummary, Self::Error>;

    /// Removes everything.
    async fn clear(&self) -> Result<(), Self::Error>;
}
