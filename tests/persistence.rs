#![cfg(feature = "with-db")]

use std::path::PathBuf;

use rstest::rstest;
use sea_orm::{ActiveModelTrait, ActiveValue::Set};
use skos_rs::{
    config::{DatabaseSettings, LoaderSettings},
    db::{self, entities::labels, SeaOrmSkosRepository},
    rdf::RdfLoader,
    skos::{
        Collection, Concept, ConceptScheme, InMemorySkosRepository, Iri, Label, LabelKind,
        ResourceKind, SemanticRelation, SkosRepository, Vocabulary, VocabularyError,
    },
    Error,
};

fn animals() -> Vocabulary {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/animals.ttl");
    RdfLoader::new(LoaderSettings::default())
        .load_path(&path)
        .expect("animals.ttl loads")
}

fn animal(name: &str) -> Iri {
    Iri::new(format!("http://example.org/animals/{name}")).expect("animal iri")
}

async fn database() -> SeaOrmSkosRepository {
    let db = db::connect(&DatabaseSettings::default())
        .await
        .expect("sqlite in memory");
    SeaOrmSkosRepository::new(db)
}

async fn repositories() -> Vec<Box<dyn SkosRepository<Error = Error> + Send + Sync>> {
    vec![
        Box::new(InMemorySkosRepository::default()),
        Box::new(database().await),
    ]
}

#[tokio::test]
async fn saved_vocabulary_loads_back_unchanged() {
    let vocabulary = animals();
    for repository in repositories().await {
        repository.save(&vocabulary).await.expect("save");
        let loaded = repository.load().await.expect("load");
        assert_eq!(loaded, vocabulary);
        assert_eq!(
            repository.summary().await.expect("summary"),
            vocabulary.summary()
        );
    }
}

#[tokio::test]
async fn concept_snapshot_includes_derived_links_and_containers() {
    let repository = database().await;
    repository.save(&animals()).await.expect("save");

    let snapshot = repository
        .concept(&animal("mammal"))
        .await
        .expect("lookup")
        .expect("mammal stored");
    assert_eq!(
        snapshot.concept.narrower().iter().cloned().collect::<Vec<_>>(),
        vec![animal("cat"), animal("dog")]
    );
    assert_eq!(snapshot.schemes, vec![animal("scheme")]);
    assert!(snapshot.collections.is_empty());

    let cat = repository
        .concept(&animal("cat"))
        .await
        .expect("lookup")
        .expect("cat stored");
    assert_eq!(cat.concept.labels(LabelKind::Alternative).count(), 2);
    assert_eq!(cat.concept.synonyms().len(), 2);
    assert_eq!(
        cat.collections,
        vec![animal("by-size"), animal("pets")]
    );

    assert!(repository
        .concept(&animal("unicorn"))
        .await
        .expect("lookup")
        .is_none());
}

#[rstest]
#[case("CAT", None, vec!["cat"])]
#[case("at", Some("en"), vec!["cat"])]
#[case("ch", Some("fr"), vec!["cat", "dog"])]
#[case("ch", Some("en"), vec![])]
#[case("mam", None, vec!["mammal"])]
#[tokio::test]
async fn search_is_case_insensitive_substring(
    #[case] text: &str,
    #[case] language: Option<&str>,
    #[case] expected: Vec<&str>,
) {
    let expected: Vec<Iri> = expected.into_iter().map(animal).collect();
    for repository in repositories().await {
        repository.save(&animals()).await.expect("save");
        assert_eq!(
            repository.search(text, language).await.expect("search"),
            expected
        );
    }
}

#[rstest]
#[case("école", vec!["school"])]
#[case("ÉCOLE", vec!["school"])]
#[case("%", vec!["sale"])]
#[case("_", vec![])]
#[case("\\", vec![])]
#[tokio::test]
async fn search_matches_text_literally(#[case] text: &str, #[case] expected: Vec<&str>) {
    let mut vocabulary = Vocabulary::new();
    for (name, label) in [("school", "École"), ("cat", "cat"), ("sale", "50% off")] {
        vocabulary
            .add_concept(Concept::new(animal(name)).with_pref_label(Label::new(label)))
            .expect("concept");
    }
    let expected: Vec<Iri> = expected.into_iter().map(animal).collect();
    for repository in repositories().await {
        repository.save(&vocabulary).await.expect("save");
        assert_eq!(
            repository.search(text, None).await.expect("search"),
            expected
        );
    }
}

#[tokio::test]
async fn clashing_label_rows_are_skipped_on_load() {
    let repository = database().await;
    repository.save(&animals()).await.expect("save");
    labels::ActiveModel {
        concept_iri: Set(animal("cat").as_str().to_owned()),
        kind: Set(LabelKind::Alternative.name().to_owned()),
        value: Set("cat".to_owned()),
        folded: Set("cat".to_owned()),
        language: Set(Some("en".to_owned())),
        ..Default::default()
    }
    .insert(repository.connection())
    .await
    .expect("insert clashing label");

    let loaded = repository.load().await.expect("load");
    let cat = loaded.concept(&animal("cat")).expect("cat");
    assert_eq!(cat.pref_label(Some("en")).map(Label::value), Some("cat"));
    assert!(cat.labels(LabelKind::Alternative).all(|label| label.value() != "cat"));
    assert!(loaded.validate().is_empty());
}

#[tokio::test]
async fn delete_concept_cascades() {
    for repository in repositories().await {
        repository.save(&animals()).await.expect("save");
        repository
            .delete_concept(&animal("cat"))
            .await
            .expect("delete");

        let loaded = repository.load().await.expect("load");
        assert!(loaded.concept(&animal("cat")).is_none());
        let mammal = loaded.concept(&animal("mammal")).expect("mammal");
        assert_eq!(
            mammal.narrower().iter().cloned().collect::<Vec<_>>(),
            vec![animal("dog")]
        );
        assert!(loaded.concept(&animal("dog")).expect("dog").related().is_empty());
        assert_eq!(
            loaded.collection(&animal("by-size")).expect("by-size").members(),
            &[animal("dog"), animal("parrot")]
        );

        assert!(matches!(
            repository.delete_concept(&animal("cat")).await,
            Err(Error::NotFound(_))
        ));
    }
}

#[tokio::test]
async fn saving_replaces_resources_and_keeps_others() {
    for repository in repositories().await {
        repository.save(&animals()).await.expect("save");

        let mut update = Vocabulary::new();
        update
            .add_concept(
                Concept::new(animal("cat"))
                    .with_pref_label(Label::with_language("tomcat", "en").expect("label")),
            )
            .expect("cat");
        update
            .add_concept(Concept::new(animal("lion")).with_pref_label(Label::new("lion")))
            .expect("lion");
        update
            .relate(&animal("lion"), SemanticRelation::Related, &animal("cat"))
            .expect("related");
        update
            .add_collection(Collection::new(animal("pets")))
            .expect("pets");
        update.add_member(&animal("pets"), animal("lion")).expect("member");
        repository.save(&update).await.expect("save update");

        let loaded = repository.load().await.expect("load");
        assert_eq!(loaded.summary().concept_count, 7);
        let cat = loaded.concept(&animal("cat")).expect("cat");
        assert_eq!(cat.pref_label(Some("en")).map(Label::value), Some("tomcat"));
        assert_eq!(cat.labels(LabelKind::Alternative).count(), 0);
        // Links declared by mammal and dog survive the replacement of cat.
        assert!(cat.broader().contains(&animal("mammal")));
        assert!(cat.related().contains(&animal("dog")));
        assert!(cat.related().contains(&animal("lion")));
        assert_eq!(
            loaded.collection(&animal("pets")).expect("pets").members(),
            &[animal("lion")]
        );
        assert!(loaded
            .scheme(&animal("scheme"))
            .expect("scheme")
            .concepts()
            .contains(&animal("cat")));
    }
}

#[tokio::test]
async fn identifiers_cannot_change_kind() {
    for repository in repositories().await {
        repository.save(&animals()).await.expect("save");
        let mut conflicting = Vocabulary::new();
        conflicting
            .add_scheme(ConceptScheme::new(animal("cat")))
            .expect("scheme");

        let err = repository.save(&conflicting).await.expect_err("kind change");
        assert!(matches!(
            err,
            Error::Vocabulary(VocabularyError::Duplicate {
                existing: ResourceKind::Concept,
                ..
            })
        ));
        assert_eq!(repository.summary().await.expect("summary").scheme_count, 1);
    }
}

#[tokio::test]
async fn clear_removes_everything() {
    for repository in repositories().await {
        repository.save(&animals()).await.expect("save");
        repository.clear().await.expect("clear");
        assert!(repository.load().await.expect("load").is_empty());
    }
}

#[tokio::test]
async fn migrations_can_run_twice() {
    let repository = database().await;
    db::migrate(repository.connection()).await.expect("no pending migrations");
}
