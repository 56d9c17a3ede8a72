use std::path::PathBuf;

use skos_rs::{
    config::Config,
    rdf::{RdfLoader, SourceFormat},
    skos::{HierarchyNode, Iri, SkosService},
    Error,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn animal(name: &str) -> Iri {
    Iri::new(format!("http://example.org/animals/{name}")).expect("animal iri")
}

fn concepts(nodes: &[HierarchyNode]) -> Vec<&Iri> {
    nodes.iter().map(|node| &node.concept).collect()
}

async fn service() -> SkosService {
    let config = Config::from_yaml("").expect("default configuration");
    let service = SkosService::from_config(&config).await.expect("service");
    let summary = service
        .import_path(&fixture("animals.ttl"))
        .await
        .expect("import");
    assert_eq!(summary.concept_count, 6);
    service
}

#[tokio::test]
async fn scheme_hierarchy_starts_at_top_concepts() {
    let service = service().await;
    let tree = service
        .hierarchy(Some(&animal("scheme")))
        .await
        .expect("hierarchy");
    assert_eq!(concepts(&tree), vec![&animal("animal"), &animal("dog")]);

    let root = &tree[0];
    assert_eq!(root.label.as_deref(), Some("animal"));
    assert_eq!(concepts(&root.children), vec![&animal("bird"), &animal("mammal")]);
    let mammal = &root.children[1];
    assert_eq!(concepts(&mammal.children), vec![&animal("cat"), &animal("dog")]);
    assert!(tree[1].children.is_empty());

    assert!(matches!(
        service.hierarchy(Some(&animal("nowhere"))).await,
        Err(Error::Vocabulary(_))
    ));
}

#[tokio::test]
async fn closures_follow_the_hierarchy() {
    let service = service().await;
    assert_eq!(
        service.ancestors(&animal("cat")).await.expect("ancestors"),
        vec![animal("mammal"), animal("animal")]
    );
    assert_eq!(
        service.descendants(&animal("animal")).await.expect("descendants"),
        vec![
            animal("bird"),
            animal("mammal"),
            animal("parrot"),
            animal("cat"),
            animal("dog"),
        ]
    );
}

#[tokio::test]
async fn missing_concepts_are_not_found() {
    let service = service().await;
    let snapshot = service.concept(&animal("dog")).await.expect("dog");
    assert_eq!(snapshot.schemes, vec![animal("scheme")]);
    assert!(matches!(
        service.concept(&animal("unicorn")).await,
        Err(Error::NotFound(iri)) if iri == animal("unicorn")
    ));
}

#[tokio::test]
async fn exported_store_matches_the_imported_document() {
    let service = service().await;
    let turtle = service
        .export(Vec::new(), SourceFormat::Turtle)
        .await
        .expect("export");
    let text = String::from_utf8(turtle).expect("utf8");
    assert!(text.contains("@prefix skos:"));

    let reloaded = RdfLoader::new(service.loader().settings().clone())
        .load_str(&text, SourceFormat::Turtle)
        .expect("reload");
    let stored = service.repository().load().await.expect("load");
    assert_eq!(reloaded, stored);
}
