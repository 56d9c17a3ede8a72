use std::io::Write;

use chrono::{DateTime, SecondsFormat, Utc};
use oxrdf::{vocab::xsd, BlankNode, Literal, NamedNode, NamedOrBlankNode, Term, Triple};
use oxrdfio::{RdfFormat, RdfSerializer};

use super::format::SourceFormat;
use crate::{
    skos::{
        vocab::{dct, rdf, skos},
        Iri, Label, LabelKind, MappingRelation, SemanticRelation, Vocabulary,
    },
    Error, Result,
};

fn node(iri: &Iri) -> NamedNode {
    iri.as_named_node().into_owned()
}

fn literal(label: &Label) -> Literal {
    match label.language() {
        Some(language) => Literal::new_language_tagged_literal_unchecked(label.value(), language),
        None => Literal::new_simple_literal(label.value()),
    }
}

fn timestamp(date: DateTime<Utc>) -> Literal {
    Literal::new_typed_literal(date.to_rfc3339_opts(SecondsFormat::AutoSi, true), xsd::DATE_TIME)
}

struct Triples {
    triples: Vec<Triple>,
    lists: usize,
}

impl Triples {
    fn push(
        &mut self,
        subject: impl Into<NamedOrBlankNode>,
        predicate: oxrdf::NamedNodeRef<'_>,
        object: impl Into<Term>,
    ) {
        self.triples
            .push(Triple::new(subject, predicate.into_owned(), object));
    }

    fn list(&mut self, items: &[Iri]) -> Term {
        let mut rest: Term = rdf::NIL.into_owned().into();
        for item in items.iter().rev() {
            let cell = BlankNode::new_unchecked(format!("list{}", self.lists));
            self.lists += 1;
            self.push(cell.clone(), rdf::FIRST, node(item));
            self.push(cell.clone(), rdf::REST, rest);
            rest = cell.into();
        }
        rest
    }
}

/// Describes a vocabulary as RDF triples.
///
/// The output is deterministic: resources come in identifier order and both
/// ends of every semantic link are written.
#[must_use]
pub fn to_triples(vocabulary: &Vocabulary) -> Vec<Triple> {
    let mut out = Triples {
        triples: Vec::new(),
        lists: 0,
    };

    for scheme in vocabulary.schemes() {
        let id = node(scheme.id());
        out.push(id.clone(), rdf::TYPE, skos::CONCEPT_SCHEME.into_owned());
        if let Some(title) = scheme.title() {
            out.push(id.clone(), dct::TITLE, literal(title));
        }
        if let Some(description) = scheme.description() {
            out.push(id.clone(), dct::DESCRIPTION, Literal::new_simple_literal(description));
        }
        if let Some(created) = scheme.created() {
            out.push(id.clone(), dct::CREATED, timestamp(created));
        }
        for top in scheme.declared_top_concepts() {
            out.push(id.clone(), skos::HAS_TOP_CONCEPT, node(top));
        }
    }

    for concept in vocabulary.concepts() {
        let id = node(concept.id());
        out.push(id.clone(), rdf::TYPE, skos::CONCEPT.into_owned());
        for kind in LabelKind::ALL {
            for label in concept.labels(kind) {
                out.push(id.clone(), kind.predicate(), literal(label));
            }
        }
        if let Some(notation) = concept.notation() {
            out.push(id.clone(), skos::NOTATION, Literal::new_simple_literal(notation));
        }
        if let Some(definition) = concept.definition() {
            out.push(id.clone(), skos::DEFINITION, Literal::new_simple_literal(definition));
        }
        if let Some(note) = concept.scope_note() {
            out.push(id.clone(), skos::SCOPE_NOTE, Literal::new_simple_literal(note));
        }
        if let Some(modified) = concept.modified() {
            out.push(id.clone(), dct::MODIFIED, timestamp(modified));
        }
        for relation in SemanticRelation::ALL {
            for target in concept.relations(relation) {
                out.push(id.clone(), relation.predicate(), node(target));
            }
        }
        for relation in MappingRelation::ALL {
            for target in concept.mappings(relation) {
                out.push(id.clone(), relation.predicate(), node(target));
            }
        }
        for scheme in vocabulary.schemes_of(concept.id()) {
            let top = vocabulary
                .scheme(&scheme)
                .is_some_and(|found| found.declared_top_concepts().contains(concept.id()));
            out.push(id.clone(), skos::IN_SCHEME, node(&scheme));
            if top {
                out.push(id.clone(), skos::TOP_CONCEPT_OF, node(&scheme));
            }
        }
    }

    for collection in vocabulary.collections() {
        let id = node(collection.id());
        let class = if collection.is_ordered() {
            skos::ORDERED_COLLECTION
        } else {
            skos::COLLECTION
        };
        out.push(id.clone(), rdf::TYPE, class.into_owned());
        if let Some(title) = collection.title() {
            out.push(id.clone(), dct::TITLE, literal(title));
        }
        if let Some(description) = collection.description() {
            out.push(id.clone(), dct::DESCRIPTION, Literal::new_simple_literal(description));
        }
        if let Some(date) = collection.date() {
            out.push(id.clone(), dct::DATE, timestamp(date));
        }
        for member in collection.members() {
            out.push(id.clone(), skos::MEMBER, node(member));
        }
        if collection.is_ordered() {
            let head = out.list(collection.members());
            out.push(id.clone(), skos::MEMBER_LIST, head);
        }
    }

    out.triples
}

/// Serializes a vocabulary and hands the writer back.
///
/// N3 output is written with the Turtle subset of the syntax.
pub fn write_vocabulary<W: Write>(vocabulary: &Vocabulary, writer: W, format: SourceFormat) -> Result<W> {
    let rdf_format = match format {
        SourceFormat::N3 => RdfFormat::Turtle,
        other => other.as_rdf_format(),
    };
    let mut serializer = RdfSerializer::from_format(rdf_format);
    for (prefix, namespace) in [
        ("skos", skos::NAMESPACE),
        ("dct", dct::NAMESPACE),
        ("rdf", "http://www.w3.org/1999/02/22-rdf-syntax-ns#"),
    ] {
        serializer = serializer
            .with_prefix(prefix, namespace)
            .map_err(|err| Error::RdfSerialize(err.to_string()))?;
    }

    let triples = to_triples(vocabulary);
    let mut sink = serializer.for_writer(writer);
    for triple in &triples {
        sink.serialize_triple(triple)
            .map_err(|err| Error::RdfSerialize(err.to_string()))?;
    }
    let writer = sink
        .finish()
        .map_err(|err| Error::RdfSerialize(err.to_string()))?;
    tracing::debug!(%format, triples = triples.len(), "vocabulary serialized");
    Ok(writer)
}

#[cfg(test)]
mod tests {
    use chrono::{DateTime, Utc};

    use super::{to_triples, write_vocabulary};
    use crate::{
        config::LoaderSettings,
        rdf::{RdfLoader, SourceFormat},
        skos::{vocab::skos, Collection, Concept, Iri, Label, SemanticRelation, Vocabulary},
    };

    fn iri(name: &str) -> Iri {
        Iri::new(format!("http://example.org/{name}")).expect("iri")
    }

    fn sample() -> Vocabulary {
        let mut vocabulary = Vocabulary::new();
        for name in ["animal", "cat", "dog"] {
            vocabulary
                .add_concept(Concept::new(iri(name)).with_pref_label(Label::new(name)))
                .expect("concept");
        }
        vocabulary
            .add_concept(
                Concept::new(iri("bird")).with_modified(
                    "2012-03-04T05:06:07.250Z"
                        .parse::<DateTime<Utc>>()
                        .expect("timestamp"),
                ),
            )
            .expect("bird");
        for name in ["cat", "dog"] {
            vocabulary
                .relate(&iri(name), SemanticRelation::Broader, &iri("animal"))
                .expect("link");
        }
        vocabulary
            .add_collection(Collection::new(iri("pets")).ordered())
            .expect("collection");
        vocabulary.add_member(&iri("pets"), iri("dog")).expect("dog");
        vocabulary.add_member(&iri("pets"), iri("cat")).expect("cat");
        vocabulary
    }

    #[test]
    fn both_link_directions_are_written() {
        let triples = to_triples(&sample());
        let narrower = triples
            .iter()
            .filter(|triple| triple.predicate.as_ref() == skos::NARROWER)
            .count();
        assert_eq!(narrower, 2);
        assert_eq!(to_triples(&sample()), triples);
    }

    #[test]
    fn written_turtle_loads_back() {
        let original = sample();
        let bytes = write_vocabulary(&original, Vec::new(), SourceFormat::Turtle).expect("turtle");
        let text = String::from_utf8(bytes).expect("utf-8");
        assert!(text.contains("@prefix skos:"));

        let reloaded = RdfLoader::new(LoaderSettings::default())
            .load_str(&text, SourceFormat::Turtle)
            .expect("reload");
        assert_eq!(reloaded, original);
        assert_eq!(
            reloaded.collection(&iri("pets")).expect("pets").members(),
            &[iri("dog"), iri("cat")]
        );
        assert_eq!(
            reloaded.concept(&iri("bird")).and_then(Concept::modified),
            original.concept(&iri("bird")).and_then(Concept::modified)
        );
    }
}
