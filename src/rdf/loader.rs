//! Turns RDF graphs into [`Vocabulary`] aggregates.
//!
//! Resources are recognised by their `rdf:type`: `skos:Concept`,
//! `skos:ConceptScheme`, `skos:Collection` and `skos:OrderedCollection`.
//! Blank-node resources cannot be identified and are skipped.

use std::{
    collections::{BTreeMap, HashSet},
    io::Read,
    path::Path,
    sync::Arc,
};

use chrono::{DateTime, Utc};
use oxrdf::{Graph, NamedNode, NamedNodeRef, NamedOrBlankNodeRef, Term, TermRef};

use super::{
    format::{parse_graph, parse_path, SourceFormat},
    resolver::{DocumentResolver, GraphResolver, NoopResolver},
};
use crate::{
    config::LoaderSettings,
    dates,
    skos::{
        vocab::{dc, dct, rdf, rdfs, skos},
        Collection, Concept, ConceptScheme, Iri, Label, LabelKind, MappingRelation,
        SemanticRelation, Vocabulary, VocabularyError,
    },
    Result,
};

/// Predicates whose targets are worth resolving when the document does not
/// describe them.
const RESOLVABLE_PREDICATES: [NamedNodeRef<'static>; 7] = [
    skos::BROADER,
    skos::NARROWER,
    skos::RELATED,
    skos::EXACT_MATCH,
    skos::CLOSE_MATCH,
    skos::IN_SCHEME,
    skos::MEMBER,
];

const TITLE_PREDICATES: [NamedNodeRef<'static>; 4] =
    [dct::TITLE, dc::TITLE, skos::PREF_LABEL, rdfs::LABEL];
const DESCRIPTION_PREDICATES: [NamedNodeRef<'static>; 3] =
    [dct::DESCRIPTION, dc::DESCRIPTION, skos::DEFINITION];
const COLLECTION_DATE_PREDICATES: [NamedNodeRef<'static>; 3] = [dc::DATE, dct::DATE, dct::CREATED];

/// Builds vocabularies from RDF documents.
#[derive(Clone)]
pub struct RdfLoader {
    settings: LoaderSettings,
    resolver: Arc<dyn GraphResolver>,
}

impl RdfLoader {
    /// Creates a loader resolving external resources through the documents
    /// listed in `settings`.
    #[must_use]
    pub fn new(settings: LoaderSettings) -> Self {
        let resolver: Arc<dyn GraphResolver> = if settings.documents.is_empty() {
            Arc::new(NoopResolver)
        } else {
            Arc::new(DocumentResolver::from_settings(&settings))
        };
        Self { settings, resolver }
    }

    /// Replaces the resolver used for external resources.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn GraphResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    #[must_use]
    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// Loads a file, guessing its syntax from the extension.
    pub fn load_path(&self, path: &Path) -> Result<Vocabulary> {
        tracing::info!(path = %path.display(), "loading vocabulary");
        self.load_graph(parse_path(path, None)?)
    }

    pub fn load_reader(
        &self,
        reader: impl Read,
        format: SourceFormat,
        base_iri: Option<&str>,
    ) -> Result<Vocabulary> {
        self.load_graph(parse_graph(reader, format, base_iri)?)
    }

    pub fn load_str(&self, content: &str, format: SourceFormat) -> Result<Vocabulary> {
        self.load_reader(content.as_bytes(), format, None)
    }

    /// Resolves external resources, then extracts every SKOS resource.
    pub fn load_graph(&self, graph: Graph) -> Result<Vocabulary> {
        let graph = self.resolve_external(graph)?;
        let view = GraphView {
            graph: &graph,
            settings: &self.settings,
        };
        let mut vocabulary = Vocabulary::new();
        let mut skipped_links = 0usize;

        let concepts = view.resources(&[skos::CONCEPT])?;
        for (id, nodes) in &concepts {
            view.add_concept(&mut vocabulary, id, nodes)?;
        }

        let schemes = view.resources(&[skos::CONCEPT_SCHEME])?;
        for (id, nodes) in &schemes {
            if let Some(kind) = vocabulary.kind_of(id) {
                tracing::warn!(%id, ?kind, "resource typed twice, keeping the first kind");
                continue;
            }
            let node = nodes[0].as_ref();
            let mut scheme = ConceptScheme::new(id.clone());
            if let Some(title) = view.preferred_label(nodes, &TITLE_PREDICATES) {
                scheme = scheme.with_title(title);
            }
            if let Some(description) = view.preferred_label(nodes, &DESCRIPTION_PREDICATES) {
                scheme = scheme.with_description(description.value());
            }
            if let Some(created) = view.date(node, &[dct::CREATED]) {
                scheme = scheme.with_created(created);
            }
            vocabulary.add_scheme(scheme)?;
        }

        let collections = view.resources(&[skos::COLLECTION, skos::ORDERED_COLLECTION])?;
        for (id, nodes) in &collections {
            if let Some(kind) = vocabulary.kind_of(id) {
                tracing::warn!(%id, ?kind, "resource typed twice, keeping the first kind");
                continue;
            }
            let mut collection = Collection::new(id.clone());
            if nodes
                .iter()
                .any(|node| view.has_type(node.as_ref(), skos::ORDERED_COLLECTION))
            {
                collection = collection.ordered();
            }
            if let Some(title) = view.preferred_label(nodes, &TITLE_PREDICATES) {
                collection = collection.with_title(title);
            }
            if let Some(description) = view.preferred_label(nodes, &DESCRIPTION_PREDICATES) {
                collection = collection.with_description(description.value());
            }
            if let Some(date) = view.date(nodes[0].as_ref(), &COLLECTION_DATE_PREDICATES) {
                collection = collection.with_date(date);
            }
            vocabulary.add_collection(collection)?;
        }

        for (id, nodes) in &concepts {
            for node in nodes {
                skipped_links += view.link_concept(&mut vocabulary, id, node.as_ref())?;
            }
        }
        for (id, nodes) in &schemes {
            if vocabulary.scheme(id).is_none() {
                continue;
            }
            for node in nodes {
                for concept in view.iris(node.as_ref(), skos::HAS_TOP_CONCEPT)? {
                    if vocabulary.concept(&concept).is_some() {
                        vocabulary.add_to_scheme(id, &concept, true)?;
                    } else {
                        skipped_links += 1;
                    }
                }
            }
        }
        for (id, nodes) in &collections {
            if vocabulary.collection(id).is_none() {
                continue;
            }
            for node in nodes {
                skipped_links += view.fill_collection(&mut vocabulary, id, node.as_ref())?;
            }
        }

        if self.settings.flat {
            vocabulary.flatten_collections()?;
        }

        let summary = vocabulary.summary();
        tracing::info!(
            concepts = summary.concept_count,
            schemes = summary.scheme_count,
            collections = summary.collection_count,
            skipped_links,
            "vocabulary loaded"
        );
        Ok(vocabulary)
    }

    fn resolve_external(&self, mut graph: Graph) -> Result<Graph> {
        let mut attempted = HashSet::new();
        for depth in 0..self.settings.max_depth {
            let pending: Vec<NamedNode> = dangling_references(&graph)
                .into_iter()
                .filter(|node| attempted.insert(node.as_str().to_owned()))
                .collect();
            if pending.is_empty() {
                break;
            }

            let mut added = 0usize;
            for node in &pending {
                let iri = Iri::from(node.as_ref());
                match self.resolver.resolve(&iri)? {
                    Some(description) => {
                        for triple in description.iter() {
                            if graph.insert(triple) {
                                added += 1;
                            }
                        }
                    }
                    None => tracing::debug!(%iri, "external resource left unresolved"),
                }
            }
            tracing::debug!(depth, requested = pending.len(), added, "resolution round done");
        }
        Ok(graph)
    }
}

/// Named nodes used as targets of resolvable predicates without any `rdf:type`.
fn dangling_references(graph: &Graph) -> Vec<NamedNode> {
    let mut seen = HashSet::new();
    let mut dangling = Vec::new();
    for predicate in RESOLVABLE_PREDICATES {
        for triple in graph.triples_for_predicate(predicate) {
            let TermRef::NamedNode(target) = triple.object else {
                continue;
            };
            if graph
                .objects_for_subject_predicate(target, rdf::TYPE)
                .next()
                .is_none()
                && seen.insert(target.as_str().to_owned())
            {
                dangling.push(target.into_owned());
            }
        }
    }
    dangling
}

struct GraphView<'a> {
    graph: &'a Graph,
    settings: &'a LoaderSettings,
}

impl GraphView<'_> {
    fn identify(&self, node: NamedNodeRef<'_>) -> Result<Iri> {
        Ok(Iri::new(self.settings.normalisation.apply(node.as_str()))?)
    }

    /// Resources typed with any of `classes`, grouped by normalised identifier.
    fn resources(&self, classes: &[NamedNodeRef<'_>]) -> Result<BTreeMap<Iri, Vec<NamedNode>>> {
        let mut resources: BTreeMap<Iri, Vec<NamedNode>> = BTreeMap::new();
        let mut blank = 0usize;
        for class in classes {
            for subject in self.graph.subjects_for_predicate_object(rdf::TYPE, *class) {
                match subject {
                    NamedOrBlankNodeRef::NamedNode(node) => {
                        let nodes = resources.entry(self.identify(node)?).or_default();
                        if !nodes.iter().any(|known| known.as_ref() == node) {
                            nodes.push(node.into_owned());
                        }
                    }
                    NamedOrBlankNodeRef::BlankNode(_) => blank += 1,
                }
            }
        }
        if blank > 0 {
            tracing::debug!(blank, "skipped resources without an IRI");
        }
        Ok(resources)
    }

    fn has_type(&self, node: NamedNodeRef<'_>, class: NamedNodeRef<'_>) -> bool {
        self.graph
            .objects_for_subject_predicate(node, rdf::TYPE)
            .any(|object| object == TermRef::NamedNode(class))
    }

    fn objects(&self, node: NamedNodeRef<'_>, predicate: NamedNodeRef<'_>) -> Vec<Term> {
        self.graph
            .objects_for_subject_predicate(node, predicate)
            .map(TermRef::into_owned)
            .collect()
    }

    fn first_object<'b>(
        &self,
        node: impl Into<NamedOrBlankNodeRef<'b>>,
        predicate: NamedNodeRef<'b>,
    ) -> Option<Term> {
        self.graph
            .object_for_subject_predicate(node, predicate)
            .map(TermRef::into_owned)
    }

    /// IRI objects of `predicate`, sorted.
    fn iris(&self, node: NamedNodeRef<'_>, predicate: NamedNodeRef<'_>) -> Result<Vec<Iri>> {
        let mut iris = self
            .objects(node, predicate)
            .iter()
            .filter_map(|object| match object {
                Term::NamedNode(target) => Some(self.identify(target.as_ref())),
                _ => None,
            })
            .collect::<Result<Vec<_>>>()?;
        iris.sort();
        Ok(iris)
    }

    fn labels(&self, node: NamedNodeRef<'_>, predicate: NamedNodeRef<'_>) -> Vec<Label> {
        self.objects(node, predicate)
            .into_iter()
            .filter_map(|object| match object {
                Term::Literal(literal) => {
                    match Label::from_parts(literal.value(), literal.language()) {
                        Ok(label) => Some(label),
                        Err(err) => {
                            tracing::warn!(node = node.as_str(), %err, "ignoring label");
                            None
                        }
                    }
                }
                _ => None,
            })
            .collect()
    }

    /// Narrows labels to the configured language when any label uses it.
    fn in_language(&self, labels: Vec<Label>) -> Vec<Label> {
        let Some(language) = self.settings.language.as_deref() else {
            return labels;
        };
        if labels
            .iter()
            .any(|label| label.matches_language(Some(language)))
        {
            labels
                .into_iter()
                .filter(|label| label.matches_language(Some(language)))
                .collect()
        } else {
            labels
        }
    }

    /// First value of the first predicate that has any, preferring the
    /// configured language, then untagged values.
    fn preferred_label(&self, nodes: &[NamedNode], predicates: &[NamedNodeRef<'_>]) -> Option<Label> {
        for predicate in predicates {
            let mut labels: Vec<Label> = nodes
                .iter()
                .flat_map(|node| self.labels(node.as_ref(), *predicate))
                .collect();
            if labels.is_empty() {
                continue;
            }
            labels.sort();
            let labels = self.in_language(labels);
            let index = self
                .settings
                .language
                .as_deref()
                .and_then(|language| {
                    labels
                        .iter()
                        .position(|label| label.matches_language(Some(language)))
                })
                .or_else(|| labels.iter().position(|label| label.language().is_none()))
                .unwrap_or(0);
            return labels.into_iter().nth(index);
        }
        None
    }

    fn date(&self, node: NamedNodeRef<'_>, predicates: &[NamedNodeRef<'_>]) -> Option<DateTime<Utc>> {
        for predicate in predicates {
            for object in self.objects(node, *predicate) {
                let Term::Literal(literal) = object else {
                    continue;
                };
                match dates::parse_datetime(literal.value()) {
                    Ok(date) => return Some(date),
                    Err(err) => tracing::warn!(
                        node = node.as_str(),
                        predicate = predicate.as_str(),
                        %err,
                        "ignoring date"
                    ),
                }
            }
        }
        None
    }

    fn add_concept(&self, vocabulary: &mut Vocabulary, id: &Iri, nodes: &[NamedNode]) -> Result<()> {
        let first = nodes[0].as_ref();
        let mut concept = Concept::new(id.clone());
        if let Some(notation) = self.labels(first, skos::NOTATION).into_iter().next() {
            concept = concept.with_notation(notation.value());
        }
        if let Some(definition) = self.preferred_label(nodes, &[skos::DEFINITION]) {
            concept = concept.with_definition(definition.value());
        }
        if let Some(note) = self.preferred_label(nodes, &[skos::SCOPE_NOTE]) {
            concept = concept.with_scope_note(note.value());
        }
        if let Some(modified) = self.date(first, &[dct::MODIFIED]) {
            concept = concept.with_modified(modified);
        }
        vocabulary.add_concept(concept)?;

        for kind in LabelKind::ALL {
            let mut labels: Vec<Label> = nodes
                .iter()
                .flat_map(|node| self.labels(node.as_ref(), kind.predicate()))
                .collect();
            labels.sort();
            for label in self.in_language(labels) {
                match vocabulary.add_label(id, kind, label) {
                    Ok(_) => {}
                    Err(err @ VocabularyError::LabelClash { .. }) => {
                        tracing::warn!(%err, "ignoring label");
                    }
                    Err(err) => return Err(err.into()),
                }
            }
        }
        Ok(())
    }

    /// Establishes links declared on a concept node; returns how many were skipped.
    fn link_concept(&self, vocabulary: &mut Vocabulary, id: &Iri, node: NamedNodeRef<'_>) -> Result<usize> {
        let mut skipped = 0;
        for relation in SemanticRelation::ALL {
            for target in self.iris(node, relation.predicate())? {
                if target == *id || vocabulary.concept(&target).is_none() {
                    tracing::debug!(%id, %relation, %target, "skipping link to unknown concept");
                    skipped += 1;
                    continue;
                }
                vocabulary.relate(id, relation, &target)?;
            }
        }
        for relation in MappingRelation::ALL {
            for target in self.iris(node, relation.predicate())? {
                if target == *id {
                    skipped += 1;
                    continue;
                }
                vocabulary.add_mapping(id, relation, target)?;
            }
        }
        for (predicate, top) in [(skos::IN_SCHEME, false), (skos::TOP_CONCEPT_OF, true)] {
            for scheme in self.iris(node, predicate)? {
                if vocabulary.scheme(&scheme).is_some() {
                    vocabulary.add_to_scheme(&scheme, id, top)?;
                } else {
                    tracing::debug!(%id, %scheme, "skipping unknown concept scheme");
                    skipped += 1;
                }
            }
        }
        Ok(skipped)
    }

    fn fill_collection(&self, vocabulary: &mut Vocabulary, id: &Iri, node: NamedNodeRef<'_>) -> Result<usize> {
        let mut members = Vec::new();
        for head in self.objects(node, skos::MEMBER_LIST) {
            members.extend(self.list_items(head)?);
        }
        members.extend(self.iris(node, skos::MEMBER)?);

        let mut skipped = 0;
        for member in members {
            match vocabulary.add_member(id, member) {
                Ok(_) => {}
                Err(
                    err @ (VocabularyError::InvalidMember { .. }
                    | VocabularyError::CollectionCycle { .. }),
                ) => {
                    tracing::debug!(%err, "skipping collection member");
                    skipped += 1;
                }
                Err(err) => return Err(err.into()),
            }
        }
        Ok(skipped)
    }

    /// Walks an RDF list, keeping the IRI items.
    fn list_items(&self, head: Term) -> Result<Vec<Iri>> {
        let mut items = Vec::new();
        let mut visited = HashSet::new();
        let mut current = head;
        loop {
            let (first, rest) = match &current {
                Term::NamedNode(node) if node.as_ref() == rdf::NIL => break,
                Term::NamedNode(node) => (
                    self.first_object(node.as_ref(), rdf::FIRST),
                    self.first_object(node.as_ref(), rdf::REST),
                ),
                Term::BlankNode(node) => (
                    self.first_object(node.as_ref(), rdf::FIRST),
                    self.first_object(node.as_ref(), rdf::REST),
                ),
                _ => break,
            };
            if !visited.insert(current.to_string()) {
                tracing::warn!("cyclic rdf list in skos:memberList");
                break;
            }
            if let Some(Term::NamedNode(item)) = first {
                items.push(self.identify(item.as_ref())?);
            }
            match rest {
                Some(next) => current = next,
                None => break,
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use oxrdf::Graph;

    use super::RdfLoader;
    use crate::{
        config::LoaderSettings,
        rdf::{parse_graph, GraphResolver, SourceFormat},
        skos::{Iri, Label},
        Result,
    };

    /// Serves fixed descriptions and records every IRI asked for.
    #[derive(Default)]
    struct RecordingResolver {
        descriptions: Vec<(Iri, Arc<Graph>)>,
        requests: Mutex<Vec<Iri>>,
    }

    impl RecordingResolver {
        fn describe(mut self, iri: Iri, turtle: &str) -> Self {
            let graph = parse_graph(
                format!("{PREFIXES}{turtle}").as_bytes(),
                SourceFormat::Turtle,
                None,
            )
            .expect("description");
            self.descriptions.push((iri, Arc::new(graph)));
            self
        }

        fn requests(&self) -> Vec<Iri> {
            self.requests.lock().expect("lock").clone()
        }
    }

    impl GraphResolver for RecordingResolver {
        fn resolve(&self, iri: &Iri) -> Result<Option<Arc<Graph>>> {
            self.requests.lock().expect("lock").push(iri.clone());
            Ok(self
                .descriptions
                .iter()
                .find(|(known, _)| known == iri)
                .map(|(_, graph)| Arc::clone(graph)))
        }
    }

    const PREFIXES: &str = "@prefix skos: <http://www.w3.org/2004/02/skos/core#> .\n\
                            @prefix ex: <http://example.org/> .\n";

    fn load(body: &str, settings: LoaderSettings) -> crate::skos::Vocabulary {
        RdfLoader::new(settings)
            .load_str(&format!("{PREFIXES}{body}"), SourceFormat::Turtle)
            .expect("vocabulary")
    }

    fn iri(name: &str) -> Iri {
        Iri::new(format!("http://example.org/{name}")).expect("iri")
    }

    #[test]
    fn blank_node_concepts_are_skipped() {
        let vocabulary = load(
            "[] a skos:Concept ; skos:prefLabel \"anonymous\" .\n\
             ex:cat a skos:Concept .",
            LoaderSettings::default(),
        );
        assert_eq!(vocabulary.summary().concept_count, 1);
    }

    #[test]
    fn language_setting_narrows_labels() {
        let settings = LoaderSettings {
            language: Some("fr".into()),
            ..LoaderSettings::default()
        };
        let vocabulary = load(
            "ex:cat a skos:Concept ;\n\
               skos:prefLabel \"cat\"@en, \"chat\"@fr ;\n\
               skos:altLabel \"kitty\"@en ;\n\
               skos:definition \"A small feline\"@en, \"Un petit félin\"@fr .",
            settings,
        );
        let cat = vocabulary.concept(&iri("cat")).expect("cat");
        let preferred: Vec<&Label> = cat.labels(crate::skos::LabelKind::Preferred).collect();
        assert_eq!(preferred.len(), 1);
        assert_eq!(preferred[0].value(), "chat");
        // No French alternative label: keep what is there.
        assert_eq!(cat.labels(crate::skos::LabelKind::Alternative).count(), 1);
        assert_eq!(cat.definition(), Some("Un petit félin"));
    }

    #[test]
    fn trailing_slashes_are_normalised_when_asked() {
        let settings = LoaderSettings {
            normalisation: crate::config::UriNormalisation::TrimTrailingSlash,
            ..LoaderSettings::default()
        };
        let vocabulary = load(
            "<http://example.org/cat/> a skos:Concept ; skos:broader <http://example.org/animal> .\n\
             <http://example.org/animal/> a skos:Concept .",
            settings,
        );
        let cat = vocabulary.concept(&iri("cat")).expect("cat");
        assert!(cat.broader().contains(&iri("animal")));
    }

    #[test]
    fn member_lists_keep_their_order() {
        let vocabulary = load(
            "ex:b a skos:Concept . ex:a a skos:Concept . ex:c a skos:Concept .\n\
             ex:letters a skos:OrderedCollection ; skos:memberList ( ex:c ex:a ex:b ex:missing ) .",
            LoaderSettings::default(),
        );
        let letters = vocabulary.collection(&iri("letters")).expect("collection");
        assert!(letters.is_ordered());
        assert_eq!(letters.members(), &[iri("c"), iri("a"), iri("b")]);
    }

    #[test]
    fn each_external_iri_is_requested_once() {
        let resolver = Arc::new(
            RecordingResolver::default()
                .describe(iri("feline"), "ex:feline skos:broader ex:carnivore .")
                .describe(iri("carnivore"), "ex:carnivore a skos:Concept ."),
        );
        let settings = LoaderSettings {
            max_depth: 2,
            ..LoaderSettings::default()
        };
        let vocabulary = RdfLoader::new(settings)
            .with_resolver(resolver.clone())
            .load_str(
                &format!("{PREFIXES}ex:cat a skos:Concept ; skos:broader ex:feline ."),
                SourceFormat::Turtle,
            )
            .expect("vocabulary");

        assert_eq!(resolver.requests(), vec![iri("feline"), iri("carnivore")]);
        assert!(vocabulary.concept(&iri("carnivore")).is_some());
        assert!(vocabulary.concept(&iri("feline")).is_none());
    }

    #[test]
    fn titles_and_descriptions_fall_back_in_order() {
        let vocabulary = load(
            "@prefix dct: <http://purl.org/dc/terms/> .\n\
             @prefix rdfs: <http://www.w3.org/2000/01/rdf-schema#> .\n\
             ex:terms a skos:ConceptScheme ;\n\
               rdfs:label \"label\" ; skos:prefLabel \"preferred\" ;\n\
               skos:definition \"defined\" .\n\
             ex:shelf a skos:Collection ;\n\
               rdfs:label \"label\" ; dct:title \"titled\" ;\n\
               skos:definition \"defined\" ; dct:description \"described\" .",
            LoaderSettings::default(),
        );
        let scheme = vocabulary.scheme(&iri("terms")).expect("scheme");
        assert_eq!(scheme.title().map(Label::value), Some("preferred"));
        assert_eq!(scheme.description(), Some("defined"));
        let shelf = vocabulary.collection(&iri("shelf")).expect("collection");
        assert_eq!(shelf.title().map(Label::value), Some("titled"));
        assert_eq!(shelf.description(), Some("described"));
    }
}
