use std::{collections::BTreeSet, path::PathBuf};

use chrono::{DateTime, TimeZone, Utc};
use rstest::{fixture, rstest};
use skos_rs::{
    config::{LoaderSettings, UriNormalisation},
    rdf::{write_vocabulary, RdfLoader, SourceFormat},
    skos::{Iri, IntegrityViolation, Label, LabelKind, MappingRelation, Vocabulary},
};

fn fixture_path(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn animal(name: &str) -> Iri {
    Iri::new(format!("http://example.org/animals/{name}")).expect("animal iri")
}

fn load(settings: LoaderSettings) -> Vocabulary {
    RdfLoader::new(settings)
        .load_path(&fixture_path("animals.ttl"))
        .expect("animals.ttl loads")
}

#[fixture]
fn animals() -> Vocabulary {
    load(LoaderSettings::default())
}

#[rstest]
fn loads_every_typed_resource(animals: Vocabulary) {
    let summary = animals.summary();
    assert_eq!(summary.concept_count, 6);
    assert_eq!(summary.scheme_count, 1);
    assert_eq!(summary.collection_count, 3);
    assert!(animals.validate().is_empty());
}

#[rstest]
fn links_are_recorded_in_both_directions(animals: Vocabulary) {
    let mammal = animals.concept(&animal("mammal")).expect("mammal");
    assert!(mammal.broader().contains(&animal("animal")));
    assert_eq!(
        mammal.narrower().iter().cloned().collect::<Vec<_>>(),
        vec![animal("cat"), animal("dog")]
    );
    let dog = animals.concept(&animal("dog")).expect("dog");
    assert!(dog.related().contains(&animal("cat")));
}

#[rstest]
fn links_to_unknown_concepts_are_skipped(animals: Vocabulary) {
    let cat = animals.concept(&animal("cat")).expect("cat");
    assert_eq!(cat.broader().len(), 1);
    let parrot = animals.concept(&animal("parrot")).expect("parrot");
    assert_eq!(
        parrot.broader().iter().cloned().collect::<Vec<_>>(),
        vec![animal("bird")]
    );
}

#[rstest]
fn concept_attributes_are_read(animals: Vocabulary) {
    let cat = animals.concept(&animal("cat")).expect("cat");
    assert_eq!(cat.pref_label(Some("fr")).map(Label::value), Some("chat"));
    assert_eq!(cat.labels(LabelKind::Alternative).count(), 2);
    assert_eq!(cat.labels(LabelKind::Hidden).count(), 1);
    assert_eq!(cat.scope_note(), Some("Domestic cats only."));
    assert_eq!(
        cat.modified(),
        Some("2012-03-04T10:20:30.250Z".parse::<DateTime<Utc>>().unwrap())
    );
    assert_eq!(cat.synonyms().len(), 2);
    assert_eq!(cat.mappings(MappingRelation::ExactMatch).len(), 1);

    let dog = animals.concept(&animal("dog")).expect("dog");
    assert!(dog.modified().is_none(), "unparsable dates are ignored");
    assert_eq!(dog.mappings(MappingRelation::BroadMatch).len(), 1);

    let root = animals.concept(&animal("animal")).expect("animal");
    assert_eq!(root.notation(), Some("A"));
    assert!(root.definition().is_some());
}

#[rstest]
fn scheme_membership_and_top_concepts(animals: Vocabulary) {
    let scheme = animals.scheme(&animal("scheme")).expect("scheme");
    assert_eq!(scheme.title().map(Label::value), Some("Animals"));
    assert_eq!(scheme.description(), Some("A small zoological thesaurus"));
    assert_eq!(
        scheme.created(),
        Some(Utc.with_ymd_and_hms(2011, 5, 1, 0, 0, 0).unwrap())
    );
    assert_eq!(scheme.concepts().len(), 6);
    assert_eq!(
        animals.top_concepts(&animal("scheme")).expect("top concepts"),
        vec![animal("animal"), animal("dog")]
    );
}

#[rstest]
fn collections_keep_nesting_and_order(animals: Vocabulary) {
    let ordered = animals.collection(&animal("by-size")).expect("by-size");
    assert!(ordered.is_ordered());
    assert_eq!(
        ordered.members(),
        &[animal("cat"), animal("dog"), animal("parrot")]
    );

    let companions = animals.collection(&animal("companions")).expect("companions");
    assert_eq!(companions.title().map(Label::value), Some("Companions"));
    assert_eq!(
        companions.date(),
        Some(Utc.with_ymd_and_hms(2019, 1, 1, 0, 0, 0).unwrap())
    );
    let members: BTreeSet<&Iri> = companions.members().iter().collect();
    assert_eq!(members, BTreeSet::from([&animal("pets"), &animal("parrot")]));
}

#[test]
fn flat_loading_expands_nested_collections() {
    let vocabulary = load(LoaderSettings {
        flat: true,
        ..LoaderSettings::default()
    });
    let companions = vocabulary.collection(&animal("companions")).expect("companions");
    let members: BTreeSet<&Iri> = companions.members().iter().collect();
    assert_eq!(
        members,
        BTreeSet::from([&animal("cat"), &animal("dog"), &animal("parrot")])
    );
}

#[rstest]
#[case(None, "cat", "Animals")]
#[case(Some("fr"), "chat", "Animaux")]
#[case(Some("de"), "cat", "Animals")]
fn language_preference(#[case] language: Option<&str>, #[case] cat: &str, #[case] title: &str) {
    let vocabulary = load(LoaderSettings {
        language: language.map(str::to_owned),
        ..LoaderSettings::default()
    });
    let concept = vocabulary.concept(&animal("cat")).expect("cat");
    assert_eq!(concept.pref_label(language).map(Label::value), Some(cat));
    let scheme = vocabulary.scheme(&animal("scheme")).expect("scheme");
    assert_eq!(scheme.title().map(Label::value), Some(title));
}

#[rstest]
#[case(0, 6)]
#[case(1, 8)]
fn external_resources_are_resolved_up_to_max_depth(#[case] max_depth: usize, #[case] concepts: usize) {
    let mut settings = LoaderSettings {
        max_depth,
        ..LoaderSettings::default()
    };
    settings.documents.insert(
        "http://example.org/external/".to_string(),
        fixture_path("external.ttl"),
    );
    let vocabulary = load(settings);
    assert_eq!(vocabulary.summary().concept_count, concepts);

    let feline = Iri::new("http://example.org/external/feline").expect("iri");
    let cat = vocabulary.concept(&animal("cat")).expect("cat");
    assert_eq!(cat.broader().contains(&feline), max_depth > 0);
}

#[rstest]
#[case(UriNormalisation::Exact, 1, false)]
#[case(UriNormalisation::TrimTrailingSlash, 2, true)]
fn rdf_xml_documents_load(
    #[case] normalisation: UriNormalisation,
    #[case] broader_links: usize,
    #[case] bird_is_top: bool,
) {
    let vocabulary = RdfLoader::new(LoaderSettings {
        normalisation,
        ..LoaderSettings::default()
    })
    .load_path(&fixture_path("birds.rdf"))
    .expect("birds.rdf loads");

    let bird = Iri::new("http://example.org/birds/bird").expect("iri");
    let scheme = Iri::new("http://example.org/birds/scheme").expect("iri");
    let broader_count: usize = vocabulary
        .concepts()
        .map(|concept| concept.broader().len())
        .sum();
    assert_eq!(broader_count, broader_links);
    assert_eq!(
        vocabulary
            .scheme(&scheme)
            .expect("scheme")
            .declared_top_concepts()
            .contains(&bird),
        bird_is_top
    );

    let owl = Iri::new("http://example.org/birds/owl").expect("iri");
    let raptor = Iri::new("http://example.org/birds/raptor").expect("iri");
    assert!(vocabulary
        .validate()
        .contains(&IntegrityViolation::RelatedToAncestor {
            concept: owl,
            ancestor: raptor,
        }));
}

#[rstest]
#[case(SourceFormat::Turtle)]
#[case(SourceFormat::NTriples)]
#[case(SourceFormat::RdfXml)]
fn exported_documents_load_back(animals: Vocabulary, #[case] format: SourceFormat) {
    let bytes = write_vocabulary(&animals, Vec::new(), format).expect("export");
    let reloaded = RdfLoader::new(LoaderSettings::default())
        .load_reader(bytes.as_slice(), format, None)
        .expect("reload");
    assert_eq!(reloaded, animals);
}
