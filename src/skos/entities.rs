use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use oxrdf::NamedNodeRef;
use serde::{Deserialize, Serialize};

use super::value_objects::{Iri, Label};
use super::vocab::skos;

/// Hierarchical and associative links between concepts of a vocabulary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticRelation {
    Broader,
    Narrower,
    Related,
}

impl SemanticRelation {
    pub const ALL: [Self; 3] = [Self::Broader, Self::Narrower, Self::Related];

    /// Returns the relation recorded on the other end of a link.
    #[must_use]
    pub fn inverse(self) -> Self {
        match self {
            Self::Broader => Self::Narrower,
            Self::Narrower => Self::Broader,
            Self::Related => Self::Related,
        }
    }

    #[must_use]
    pub fn predicate(self) -> NamedNodeRef<'static> {
        match self {
            Self::Broader => skos::BROADER,
            Self::Narrower => skos::NARROWER,
            Self::Related => skos::RELATED,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Broader => "broader",
            Self::Narrower => "narrower",
            Self::Related => "related",
        }
    }
}

impl fmt::Display for SemanticRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for SemanticRelation {
    type Err = UnknownRelation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "broader" => Ok(Self::Broader),
            "narrower" => Ok(Self::Narrower),
            "related" => Ok(Self::Related),
            other => Err(UnknownRelation(other.to_owned())),
        }
    }
}

/// Links from a concept to concepts of (usually) another vocabulary.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MappingRelation {
    ExactMatch,
    CloseMatch,
    BroadMatch,
    NarrowMatch,
    RelatedMatch,
}

impl MappingRelation {
    pub const ALL: [Self; 5] = [
        Self::ExactMatch,
        Self::CloseMatch,
        Self::BroadMatch,
        Self::NarrowMatch,
        Self::RelatedMatch,
    ];

    /// Exact and close matches are treated as synonyms.
    #[must_use]
    pub fn is_synonym(self) -> bool {
        matches!(self, Self::ExactMatch | Self::CloseMatch)
    }

    #[must_use]
    pub fn predicate(self) -> NamedNodeRef<'static> {
        match self {
            Self::ExactMatch => skos::EXACT_MATCH,
            Self::CloseMatch => skos::CLOSE_MATCH,
            Self::BroadMatch => skos::BROAD_MATCH,
            Self::NarrowMatch => skos::NARROW_MATCH,
            Self::RelatedMatch => skos::RELATED_MATCH,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::ExactMatch => "exactMatch",
            Self::CloseMatch => "closeMatch",
            Self::BroadMatch => "broadMatch",
            Self::NarrowMatch => "narrowMatch",
            Self::RelatedMatch => "relatedMatch",
        }
    }
}

impl fmt::Display for MappingRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MappingRelation {
    type Err = UnknownRelation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|relation| relation.name() == s)
            .ok_or_else(|| UnknownRelation(s.to_owned()))
    }
}

/// Raised when a stored relation name matches no known relation.
#[derive(Clone, Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown relation `{0}`")]
pub struct UnknownRelation(pub String);

/// Role a label plays on a concept.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelKind {
    Preferred,
    Alternative,
    Hidden,
}

impl LabelKind {
    pub const ALL: [Self; 3] = [Self::Preferred, Self::Alternative, Self::Hidden];

    #[must_use]
    pub fn predicate(self) -> NamedNodeRef<'static> {
        match self {
            Self::Preferred => skos::PREF_LABEL,
            Self::Alternative => skos::ALT_LABEL,
            Self::Hidden => skos::HIDDEN_LABEL,
        }
    }

    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Preferred => "pref",
            Self::Alternative => "alt",
            Self::Hidden => "hidden",
        }
    }
}

impl FromStr for LabelKind {
    type Err = UnknownRelation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name() == s)
            .ok_or_else(|| UnknownRelation(s.to_owned()))
    }
}

/// A unit of thought in a knowledge organization system.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Concept {
    id: Iri,
    labels: BTreeMap<LabelKind, BTreeSet<Label>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    notation: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    definition: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    scope_note: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    modified: Option<DateTime<Utc>>,
    relations: BTreeMap<SemanticRelation, BTreeSet<Iri>>,
    mappings: BTreeMap<MappingRelation, BTreeSet<Iri>>,
}

impl Concept {
    /// Creates a new concept without labels or relations.
    #[must_use]
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            labels: BTreeMap::new(),
            notation: None,
            definition: None,
            scope_note: None,
            modified: None,
            relations: BTreeMap::new(),
            mappings: BTreeMap::new(),
        }
    }

    /// Sets the preferred label, replacing any previous one in the same language.
    #[must_use]
    pub fn with_pref_label(mut self, label: Label) -> Self {
        self.set_pref_label(label);
        self
    }

    #[must_use]
    pub fn with_notation(mut self, notation: impl Into<String>) -> Self {
        self.notation = Some(notation.into());
        self
    }

    #[must_use]
    pub fn with_definition(mut self, definition: impl Into<String>) -> Self {
        self.definition = Some(definition.into());
        self
    }

    #[must_use]
    pub fn with_scope_note(mut self, note: impl Into<String>) -> Self {
        self.scope_note = Some(note.into());
        self
    }

    #[must_use]
    pub fn with_modified(mut self, modified: DateTime<Utc>) -> Self {
        self.modified = Some(modified);
        self
    }

    /// Sets the preferred label for the label's language.
    ///
    /// Returns the label it replaced, if any. Clashes with alternative or
    /// hidden labels are checked by [`crate::skos::Vocabulary::add_label`].
    pub(crate) fn set_pref_label(&mut self, label: Label) -> Option<Label> {
        let preferred = self.labels.entry(LabelKind::Preferred).or_default();
        let previous = preferred
            .iter()
            .find(|existing| existing.matches_language(label.language()))
            .cloned();
        if let Some(previous) = &previous {
            preferred.remove(previous);
        }
        preferred.insert(label);
        previous
    }

    pub(crate) fn insert_label(&mut self, kind: LabelKind, label: Label) -> bool {
        self.labels.entry(kind).or_default().insert(label)
    }

    /// Returns the identifier of the concept.
    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    /// Picks the preferred label for `language`.
    ///
    /// Falls back to the untagged label, then to the first preferred label.
    #[must_use]
    pub fn pref_label(&self, language: Option<&str>) -> Option<&Label> {
        let preferred = self.labels.get(&LabelKind::Preferred)?;
        language
            .and_then(|wanted| {
                preferred
                    .iter()
                    .find(|label| label.matches_language(Some(wanted)))
            })
            .or_else(|| preferred.iter().find(|label| label.language().is_none()))
            .or_else(|| preferred.iter().next())
    }

    /// Returns labels of the requested kind in lexical order.
    pub fn labels(&self, kind: LabelKind) -> impl Iterator<Item = &Label> {
        self.labels.get(&kind).into_iter().flatten()
    }

    /// Returns the role the label plays on this concept, if any.
    #[must_use]
    pub fn label_kind(&self, label: &Label) -> Option<LabelKind> {
        self.labels
            .iter()
            .find(|(_, labels)| labels.contains(label))
            .map(|(kind, _)| *kind)
    }

    #[must_use]
    pub fn notation(&self) -> Option<&str> {
        self.notation.as_deref()
    }

    #[must_use]
    pub fn definition(&self) -> Option<&str> {
        self.definition.as_deref()
    }

    #[must_use]
    pub fn scope_note(&self) -> Option<&str> {
        self.scope_note.as_deref()
    }

    #[must_use]
    pub fn modified(&self) -> Option<DateTime<Utc>> {
        self.modified
    }

    /// Returns the concepts linked through `relation`.
    #[must_use]
    pub fn relations(&self, relation: SemanticRelation) -> &BTreeSet<Iri> {
        static EMPTY: BTreeSet<Iri> = BTreeSet::new();
        self.relations.get(&relation).unwrap_or(&EMPTY)
    }

    #[must_use]
    pub fn broader(&self) -> &BTreeSet<Iri> {
        self.relations(SemanticRelation::Broader)
    }

    #[must_use]
    pub fn narrower(&self) -> &BTreeSet<Iri> {
        self.relations(SemanticRelation::Narrower)
    }

    #[must_use]
    pub fn related(&self) -> &BTreeSet<Iri> {
        self.relations(SemanticRelation::Related)
    }

    /// Returns the external concepts linked through `relation`.
    #[must_use]
    pub fn mappings(&self, relation: MappingRelation) -> &BTreeSet<Iri> {
        static EMPTY: BTreeSet<Iri> = BTreeSet::new();
        self.mappings.get(&relation).unwrap_or(&EMPTY)
    }

    /// Returns exact and close matches in lexical order.
    #[must_use]
    pub fn synonyms(&self) -> BTreeSet<&Iri> {
        MappingRelation::ALL
            .into_iter()
            .filter(|relation| relation.is_synonym())
            .flat_map(|relation| self.mappings(relation))
            .collect()
    }

    pub(crate) fn link(&mut self, relation: SemanticRelation, target: Iri) -> bool {
        self.relations.entry(relation).or_default().insert(target)
    }

    pub(crate) fn unlink(&mut self, relation: SemanticRelation, target: &Iri) -> bool {
        self.relations
            .get_mut(&relation)
            .is_some_and(|targets| targets.remove(target))
    }

    pub(crate) fn unlink_everywhere(&mut self, target: &Iri) {
        for targets in self.relations.values_mut() {
            targets.remove(target);
        }
    }

    pub(crate) fn map(&mut self, relation: MappingRelation, target: Iri) -> bool {
        self.mappings.entry(relation).or_default().insert(target)
    }
}

/// A set of concepts, optionally organised around top concepts.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptScheme {
    id: Iri,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created: Option<DateTime<Utc>>,
    concepts: BTreeSet<Iri>,
    top_concepts: BTreeSet<Iri>,
}

impl ConceptScheme {
    #[must_use]
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            title: None,
            description: None,
            created: None,
            concepts: BTreeSet::new(),
            top_concepts: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Label) -> Self {
        self.title = Some(title);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_created(mut self, created: DateTime<Utc>) -> Self {
        self.created = Some(created);
        self
    }

    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> Option<&Label> {
        self.title.as_ref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    /// Member concepts, top concepts included.
    #[must_use]
    pub fn concepts(&self) -> &BTreeSet<Iri> {
        &self.concepts
    }

    /// Concepts explicitly declared as entry points of the hierarchy.
    #[must_use]
    pub fn declared_top_concepts(&self) -> &BTreeSet<Iri> {
        &self.top_concepts
    }

    pub(crate) fn include(&mut self, concept: Iri, top: bool) -> bool {
        let mut changed = false;
        if top {
            changed |= self.top_concepts.insert(concept.clone());
        }
        changed | self.concepts.insert(concept)
    }

    pub(crate) fn exclude(&mut self, concept: &Iri) {
        self.concepts.remove(concept);
        self.top_concepts.remove(concept);
    }
}

/// A labelled group of concepts, possibly nested and ordered.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    id: Iri,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    title: Option<Label>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    date: Option<DateTime<Utc>>,
    #[serde(default)]
    ordered: bool,
    members: Vec<Iri>,
}

impl Collection {
    #[must_use]
    pub fn new(id: Iri) -> Self {
        Self {
            id,
            title: None,
            description: None,
            date: None,
            ordered: false,
            members: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_title(mut self, title: Label) -> Self {
        self.title = Some(title);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_date(mut self, date: DateTime<Utc>) -> Self {
        self.date = Some(date);
        self
    }

    /// Marks the collection as a `skos:OrderedCollection`.
    #[must_use]
    pub fn ordered(mut self) -> Self {
        self.ordered = true;
        self
    }

    #[must_use]
    pub fn id(&self) -> &Iri {
        &self.id
    }

    #[must_use]
    pub fn title(&self) -> Option<&Label> {
        self.title.as_ref()
    }

    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    #[must_use]
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.date
    }

    #[must_use]
    pub fn is_ordered(&self) -> bool {
        self.ordered
    }

    /// Members in insertion order.
    #[must_use]
    pub fn members(&self) -> &[Iri] {
        &self.members
    }

    #[must_use]
    pub fn contains(&self, member: &Iri) -> bool {
        self.members.contains(member)
    }

    pub(crate) fn push(&mut self, member: Iri) -> bool {
        if self.contains(&member) {
            return false;
        }
        self.members.push(member);
        true
    }

    pub(crate) fn remove(&mut self, member: &Iri) {
        self.members.retain(|existing| existing != member);
    }

    pub(crate) fn replace_members(&mut self, members: Vec<Iri>) {
        self.members.clear();
        for member in members {
            self.push(member);
        }
    }
}
