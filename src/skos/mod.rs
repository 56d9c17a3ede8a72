//! Core SKOS domain primitives and contracts.
//!
//! Concepts, concept schemes and collections are plain domain types held by
//! the [`Vocabulary`] aggregate, independently from RDF syntax or storage.
//! Persistence is described by the [`SkosRepository`] trait and wired
//! together by [`SkosService`].

pub mod entities;
pub mod repositories;
pub mod service;
pub mod value_objects;
pub mod vocab;
pub mod vocabulary;

pub use entities::{
    Collection, Concept, ConceptScheme, LabelKind, MappingRelation, SemanticRelation,
};
pub use repositories::{ConceptSnapshot, SkosRepository};
pub use service::{HierarchyNode, InMemorySkosRepository, SkosService};
pub use value_objects::{Iri, IriError, Label};
pub use vocabulary::{IntegrityViolation, ResourceKind, Vocabulary, VocabularyError, VocabularySummary};
