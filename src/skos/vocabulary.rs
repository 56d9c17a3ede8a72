use std::collections::{BTreeMap, BTreeSet, VecDeque};

use serde::Serialize;
use thiserror::Error;

use super::entities::{Collection, Concept, ConceptScheme, LabelKind, MappingRelation, SemanticRelation};
use super::value_objects::{Iri, Label};

/// Kind of resource an identifier is bound to inside a [`Vocabulary`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    Concept,
    ConceptScheme,
    Collection,
}

/// Aggregates concepts, concept schemes and collections.
///
/// Semantic relations are kept inverse-consistent: linking `a` broader `b`
/// records `b` narrower `a` as well.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Vocabulary {
    concepts: BTreeMap<Iri, Concept>,
    schemes: BTreeMap<Iri, ConceptScheme>,
    collections: BTreeMap<Iri, Collection>,
}

impl Vocabulary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the kind of resource bound to `id`.
    #[must_use]
    pub fn kind_of(&self, id: &Iri) -> Option<ResourceKind> {
        if self.concepts.contains_key(id) {
            Some(ResourceKind::Concept)
        } else if self.schemes.contains_key(id) {
            Some(ResourceKind::ConceptScheme)
        } else if self.collections.contains_key(id) {
            Some(ResourceKind::Collection)
        } else {
            None
        }
    }

    fn ensure_unbound(&self, id: &Iri) -> Result<(), VocabularyError> {
        match self.kind_of(id) {
            Some(existing) => Err(VocabularyError::Duplicate {
                id: id.clone(),
                existing,
            }),
            None => Ok(()),
        }
    }

    /// Adds a concept, enforcing unique identifiers.
    ///
    /// Relations carried by the concept are ignored: links are established
    /// through [`Vocabulary::relate`] so both ends stay consistent.
    pub fn add_concept(&mut self, mut concept: Concept) -> Result<(), VocabularyError> {
        let id = concept.id().clone();
        self.ensure_unbound(&id)?;
        for relation in SemanticRelation::ALL {
            let targets: Vec<Iri> = concept.relations(relation).iter().cloned().collect();
            for target in targets {
                concept.unlink(relation, &target);
            }
        }
        self.concepts.insert(id, concept);
        Ok(())
    }

    /// Adds a concept scheme, enforcing unique identifiers.
    ///
    /// Members already listed on the scheme must be known concepts.
    pub fn add_scheme(&mut self, scheme: ConceptScheme) -> Result<(), VocabularyError> {
        let id = scheme.id().clone();
        self.ensure_unbound(&id)?;
        for concept in scheme.concepts() {
            self.require_concept(concept)?;
        }
        self.schemes.insert(id, scheme);
        Ok(())
    }

    /// Adds a collection, enforcing unique identifiers.
    pub fn add_collection(&mut self, collection: Collection) -> Result<(), VocabularyError> {
        let id = collection.id().clone();
        self.ensure_unbound(&id)?;
        let members = collection.members().to_vec();
        let mut collection = collection;
        collection.replace_members(Vec::new());
        self.collections.insert(id.clone(), collection);
        for member in members {
            if let Err(err) = self.add_member(&id, member) {
                self.collections.remove(&id);
                return Err(err);
            }
        }
        Ok(())
    }

    fn require_concept(&self, id: &Iri) -> Result<&Concept, VocabularyError> {
        self.concepts
            .get(id)
            .ok_or_else(|| VocabularyError::MissingConcept(id.clone()))
    }

    #[must_use]
    pub fn concept(&self, id: &Iri) -> Option<&Concept> {
        self.concepts.get(id)
    }

    /// Mutable access for attribute updates; links go through [`Vocabulary::relate`].
    pub fn concept_mut(&mut self, id: &Iri) -> Option<&mut Concept> {
        self.concepts.get_mut(id)
    }

    #[must_use]
    pub fn scheme(&self, id: &Iri) -> Option<&ConceptScheme> {
        self.schemes.get(id)
    }

    #[must_use]
    pub fn collection(&self, id: &Iri) -> Option<&Collection> {
        self.collections.get(id)
    }

    /// Returns all concepts ordered by identifier.
    pub fn concepts(&self) -> impl Iterator<Item = &Concept> {
        self.concepts.values()
    }

    /// Returns all concept schemes ordered by identifier.
    pub fn schemes(&self) -> impl Iterator<Item = &ConceptScheme> {
        self.schemes.values()
    }

    /// Returns all collections ordered by identifier.
    pub fn collections(&self) -> impl Iterator<Item = &Collection> {
        self.collections.values()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.concepts.is_empty() && self.schemes.is_empty() && self.collections.is_empty()
    }

    /// Links two concepts and records the inverse link.
    ///
    /// Returns `false` when the link already existed.
    pub fn relate(
        &mut self,
        subject: &Iri,
        relation: SemanticRelation,
        object: &Iri,
    ) -> Result<bool, VocabularyError> {
        if subject == object {
            return Err(VocabularyError::SelfRelation {
                concept: subject.clone(),
                relation,
            });
        }
        self.require_concept(subject)?;
        self.require_concept(object)?;

        let mut changed = false;
        if let Some(concept) = self.concepts.get_mut(subject) {
            changed |= concept.link(relation, object.clone());
        }
        if let Some(concept) = self.concepts.get_mut(object) {
            changed |= concept.link(relation.inverse(), subject.clone());
        }
        Ok(changed)
    }

    /// Removes a link in both directions.
    pub fn unrelate(
        &mut self,
        subject: &Iri,
        relation: SemanticRelation,
        object: &Iri,
    ) -> Result<bool, VocabularyError> {
        self.require_concept(subject)?;
        self.require_concept(object)?;

        let mut changed = false;
        if let Some(concept) = self.concepts.get_mut(subject) {
            changed |= concept.unlink(relation, object);
        }
        if let Some(concept) = self.concepts.get_mut(object) {
            changed |= concept.unlink(relation.inverse(), subject);
        }
        Ok(changed)
    }

    /// Records a mapping to a concept that may live outside this vocabulary.
    pub fn add_mapping(
        &mut self,
        concept: &Iri,
        relation: MappingRelation,
        target: Iri,
    ) -> Result<bool, VocabularyError> {
        if *concept == target {
            return Err(VocabularyError::SelfMapping {
                concept: concept.clone(),
                relation,
            });
        }
        let Some(existing) = self.concepts.get_mut(concept) else {
            return Err(VocabularyError::MissingConcept(concept.clone()));
        };
        Ok(existing.map(relation, target))
    }

    /// Attaches a label to a concept.
    ///
    /// Preferred labels replace the one in the same language. A label may
    /// not be both preferred and alternative or hidden.
    pub fn add_label(
        &mut self,
        concept: &Iri,
        kind: LabelKind,
        label: Label,
    ) -> Result<bool, VocabularyError> {
        let Some(existing) = self.concepts.get_mut(concept) else {
            return Err(VocabularyError::MissingConcept(concept.clone()));
        };
        match existing.label_kind(&label) {
            Some(current) if current == kind => return Ok(false),
            Some(current) if current == LabelKind::Preferred || kind == LabelKind::Preferred => {
                return Err(VocabularyError::LabelClash {
                    concept: concept.clone(),
                    label,
                });
            }
            _ => {}
        }
        if kind == LabelKind::Preferred {
            existing.set_pref_label(label);
            return Ok(true);
        }
        Ok(existing.insert_label(kind, label))
    }

    /// Adds a concept to a scheme, optionally as a top concept.
    pub fn add_to_scheme(
        &mut self,
        scheme: &Iri,
        concept: &Iri,
        top: bool,
    ) -> Result<bool, VocabularyError> {
        self.require_concept(concept)?;
        let Some(existing) = self.schemes.get_mut(scheme) else {
            return Err(VocabularyError::MissingScheme(scheme.clone()));
        };
        Ok(existing.include(concept.clone(), top))
    }

    /// Appends a concept or nested collection to a collection.
    pub fn add_member(&mut self, collection: &Iri, member: Iri) -> Result<bool, VocabularyError> {
        if !self.collections.contains_key(collection) {
            return Err(VocabularyError::MissingCollection(collection.clone()));
        }
        match self.kind_of(&member) {
            Some(ResourceKind::Concept) => {}
            Some(ResourceKind::Collection) => {
                if member == *collection || self.nested_collections(&member).contains(collection) {
                    return Err(VocabularyError::CollectionCycle {
                        collection: collection.clone(),
                        member,
                    });
                }
            }
            _ => return Err(VocabularyError::InvalidMember { collection: collection.clone(), member }),
        }
        Ok(self
            .collections
            .get_mut(collection)
            .is_some_and(|existing| existing.push(member)))
    }

    fn nested_collections(&self, start: &Iri) -> BTreeSet<Iri> {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::from([start.clone()]);
        while let Some(current) = queue.pop_front() {
            let Some(collection) = self.collections.get(&current) else {
                continue;
            };
            for member in collection.members() {
                if self.collections.contains_key(member) && visited.insert(member.clone()) {
                    queue.push_back(member.clone());
                }
            }
        }
        visited
    }

    /// Removes a concept and every reference to it.
    pub fn remove_concept(&mut self, id: &Iri) -> Result<Concept, VocabularyError> {
        let removed = self
            .concepts
            .remove(id)
            .ok_or_else(|| VocabularyError::MissingConcept(id.clone()))?;
        for concept in self.concepts.values_mut() {
            concept.unlink_everywhere(id);
        }
        for scheme in self.schemes.values_mut() {
            scheme.exclude(id);
        }
        for collection in self.collections.values_mut() {
            collection.remove(id);
        }
        Ok(removed)
    }

    fn closure(&self, start: &Iri, relation: SemanticRelation) -> Result<Vec<Iri>, VocabularyError> {
        let concept = self.require_concept(start)?;
        let mut visited = BTreeSet::from([start.clone()]);
        let mut to_visit: VecDeque<Iri> = concept.relations(relation).iter().cloned().collect();
        let mut result = Vec::new();

        while let Some(current) = to_visit.pop_front() {
            if visited.insert(current.clone()) {
                result.push(current.clone());
                if let Some(next) = self.concepts.get(&current) {
                    to_visit.extend(next.relations(relation).iter().cloned());
                }
            }
        }
        Ok(result)
    }

    /// Transitive closure of broader concepts in breadth-first order.
    pub fn ancestors(&self, concept: &Iri) -> Result<Vec<Iri>, VocabularyError> {
        self.closure(concept, SemanticRelation::Broader)
    }

    /// Transitive closure of narrower concepts in breadth-first order.
    pub fn descendants(&self, concept: &Iri) -> Result<Vec<Iri>, VocabularyError> {
        self.closure(concept, SemanticRelation::Narrower)
    }

    /// Entry points of a scheme's hierarchy.
    ///
    /// When the scheme declares no top concepts, members without a broader
    /// concept inside the scheme are used instead.
    pub fn top_concepts(&self, scheme: &Iri) -> Result<Vec<Iri>, VocabularyError> {
        let scheme = self
            .schemes
            .get(scheme)
            .ok_or_else(|| VocabularyError::MissingScheme(scheme.clone()))?;
        if !scheme.declared_top_concepts().is_empty() {
            return Ok(scheme.declared_top_concepts().iter().cloned().collect());
        }
        Ok(scheme
            .concepts()
            .iter()
            .filter(|id| {
                self.concepts.get(*id).is_some_and(|concept| {
                    !concept
                        .broader()
                        .iter()
                        .any(|parent| scheme.concepts().contains(parent))
                })
            })
            .cloned()
            .collect())
    }

    /// Concepts without any broader concept.
    #[must_use]
    pub fn roots(&self) -> Vec<Iri> {
        self.concepts
            .values()
            .filter(|concept| concept.broader().is_empty())
            .map(|concept| concept.id().clone())
            .collect()
    }

    /// Schemes listing the concept as a member.
    #[must_use]
    pub fn schemes_of(&self, concept: &Iri) -> Vec<Iri> {
        self.schemes
            .values()
            .filter(|scheme| scheme.concepts().contains(concept))
            .map(|scheme| scheme.id().clone())
            .collect()
    }

    /// Collections listing the concept as a direct member.
    #[must_use]
    pub fn collections_of(&self, concept: &Iri) -> Vec<Iri> {
        self.collections
            .values()
            .filter(|collection| collection.contains(concept))
            .map(|collection| collection.id().clone())
            .collect()
    }

    /// Concepts contained in a collection, expanding nested collections.
    pub fn flattened_members(&self, collection: &Iri) -> Result<Vec<Iri>, VocabularyError> {
        let start = self
            .collections
            .get(collection)
            .ok_or_else(|| VocabularyError::MissingCollection(collection.clone()))?;
        let mut seen_collections = BTreeSet::from([collection.clone()]);
        let mut result = Vec::new();
        let mut stack: Vec<&Iri> = start.members().iter().rev().collect();
        while let Some(member) = stack.pop() {
            if let Some(nested) = self.collections.get(member) {
                if seen_collections.insert(member.clone()) {
                    stack.extend(nested.members().iter().rev());
                }
            } else if !result.contains(member) {
                result.push(member.clone());
            }
        }
        Ok(result)
    }

    /// Replaces nested collection members by the concepts they contain.
    pub fn flatten_collections(&mut self) -> Result<(), VocabularyError> {
        let ids: Vec<Iri> = self.collections.keys().cloned().collect();
        let mut flattened = Vec::with_capacity(ids.len());
        for id in ids {
            let members = self.flattened_members(&id)?;
            flattened.push((id, members));
        }
        for (id, members) in flattened {
            if let Some(collection) = self.collections.get_mut(&id) {
                collection.replace_members(members);
            }
        }
        Ok(())
    }

    /// Case-insensitive label lookup over every label kind.
    ///
    /// `language` restricts matching to labels in that language.
    #[must_use]
    pub fn find_by_label(&self, text: &str, language: Option<&str>) -> Vec<&Concept> {
        let needle = text.to_lowercase();
        self.concepts
            .values()
            .filter(|concept| {
                LabelKind::ALL.into_iter().any(|kind| {
                    concept.labels(kind).any(|label| {
                        language.map_or(true, |wanted| label.matches_language(Some(wanted)))
                            && label.value().to_lowercase() == needle
                    })
                })
            })
            .collect()
    }

    /// Checks the integrity conditions the aggregate cannot enforce on insert.
    #[must_use]
    pub fn validate(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();
        for concept in self.concepts.values() {
            let Ok(ancestors) = self.ancestors(concept.id()) else {
                continue;
            };
            if concept
                .broader()
                .iter()
                .any(|parent| parent == concept.id() || self.ancestors(parent).is_ok_and(|up| up.contains(concept.id())))
            {
                violations.push(IntegrityViolation::HierarchyCycle {
                    concept: concept.id().clone(),
                });
            }
            for related in concept.related() {
                if ancestors.contains(related) {
                    violations.push(IntegrityViolation::RelatedToAncestor {
                        concept: concept.id().clone(),
                        ancestor: related.clone(),
                    });
                }
            }
        }
        for concept in self.concepts.values() {
            for label in concept.labels(LabelKind::Preferred) {
                let clashes = [LabelKind::Alternative, LabelKind::Hidden]
                    .into_iter()
                    .any(|kind| concept.labels(kind).any(|other| other == label));
                if clashes {
                    violations.push(IntegrityViolation::LabelClash {
                        concept: concept.id().clone(),
                        label: label.clone(),
                    });
                }
            }
        }
        violations
    }

    /// Folds `other` into this vocabulary.
    ///
    /// Resources of `other` replace the ones stored under the same IRI,
    /// together with their outgoing links. Links held by resources that are
    /// not replaced survive. An IRI may not change kind.
    pub fn merge(&mut self, other: &Vocabulary) -> Result<(), VocabularyError> {
        let incoming_ids = other
            .concepts
            .keys()
            .chain(other.schemes.keys())
            .chain(other.collections.keys());
        for id in incoming_ids {
            if let (Some(existing), Some(incoming)) = (self.kind_of(id), other.kind_of(id)) {
                if existing != incoming {
                    return Err(VocabularyError::Duplicate {
                        id: id.clone(),
                        existing,
                    });
                }
            }
        }

        let kept_concepts = self
            .concepts
            .values()
            .filter(|concept| !other.concepts.contains_key(concept.id()));
        let concepts: Vec<&Concept> = kept_concepts.chain(other.concepts.values()).collect();

        let mut merged = Vocabulary::new();
        let mut links = Vec::new();
        for concept in &concepts {
            for relation in SemanticRelation::ALL {
                for target in concept.relations(relation) {
                    links.push((concept.id().clone(), relation, target.clone()));
                }
            }
            merged.add_concept((*concept).clone())?;
        }
        for (subject, relation, object) in links {
            if merged.concepts.contains_key(&object) {
                merged.relate(&subject, relation, &object)?;
            }
        }

        let schemes = self
            .schemes
            .values()
            .filter(|scheme| !other.schemes.contains_key(scheme.id()))
            .chain(other.schemes.values());
        for scheme in schemes {
            merged.add_scheme(scheme.clone())?;
        }

        let collections: Vec<&Collection> = self
            .collections
            .values()
            .filter(|collection| !other.collections.contains_key(collection.id()))
            .chain(other.collections.values())
            .collect();
        for collection in &collections {
            let mut empty = (*collection).clone();
            empty.replace_members(Vec::new());
            merged.collections.insert(collection.id().clone(), empty);
        }
        for collection in collections {
            for member in collection.members() {
                merged.add_member(collection.id(), member.clone())?;
            }
        }

        *self = merged;
        Ok(())
    }

    /// Counts of each resource kind.
    #[must_use]
    pub fn summary(&self) -> VocabularySummary {
        VocabularySummary {
            concept_count: self.concepts.len(),
            scheme_count: self.schemes.len(),
            collection_count: self.collections.len(),
        }
    }
}

/// Counts of resources held by a vocabulary or a repository.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct VocabularySummary {
    pub concept_count: usize,
    pub scheme_count: usize,
    pub collection_count: usize,
}

/// Problems reported by [`Vocabulary::validate`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum IntegrityViolation {
    /// The concept is (transitively) broader than itself.
    HierarchyCycle { concept: Iri },
    /// `skos:related` links the concept to one of its ancestors.
    RelatedToAncestor { concept: Iri, ancestor: Iri },
    /// A preferred label is also an alternative or hidden label.
    LabelClash { concept: Iri, label: Label },
}

impl std::fmt::Display for IntegrityViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HierarchyCycle { concept } => {
                write!(f, "concept `{concept}` is part of a broader cycle")
            }
            Self::RelatedToAncestor { concept, ancestor } => {
                write!(f, "concept `{concept}` is related to its ancestor `{ancestor}`")
            }
            Self::LabelClash { concept, label } => {
                write!(f, "label {label} of `{concept}` is both preferred and alternative or hidden")
            }
        }
    }
}

/// Errors raised when manipulating a vocabulary aggregate.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VocabularyError {
    /// Attempted to add a resource with an identifier already in use.
    #[error("`{id}` is already used by a {existing:?}")]
    Duplicate { id: Iri, existing: ResourceKind },
    #[error("concept `{0}` does not exist")]
    MissingConcept(Iri),
    #[error("concept scheme `{0}` does not exist")]
    MissingScheme(Iri),
    #[error("collection `{0}` does not exist")]
    MissingCollection(Iri),
    #[error("concept `{concept}` cannot be {relation} to itself")]
    SelfRelation {
        concept: Iri,
        relation: SemanticRelation,
    },
    #[error("concept `{concept}` cannot declare {relation} to itself")]
    SelfMapping {
        concept: Iri,
        relation: MappingRelation,
    },
    /// A label was used both as preferred and as alternative or hidden.
    #[error("label {label} clashes with an existing label of `{concept}`")]
    LabelClash { concept: Iri, label: Label },
    /// Members must be concepts or collections of the same vocabulary.
    #[error("`{member}` cannot be a member of collection `{collection}`")]
    InvalidMember { collection: Iri, member: Iri },
    #[error("adding `{member}` to `{collection}` would make the collection contain itself")]
    CollectionCycle { collection: Iri, member: Iri },
}
