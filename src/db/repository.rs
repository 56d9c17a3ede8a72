use std::collections::BTreeSet;

use async_trait::async_trait;
use sea_orm::{
    sea_query::LikeExpr,
    ActiveModelTrait,
    ActiveValue::Set,
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, TransactionTrait,
};

use super::entities::{collections, concepts, labels, links, memberships, schemes};
use crate::{
    skos::{
        Collection, Concept, ConceptScheme, ConceptSnapshot, Iri, Label, LabelKind,
        MappingRelation, ResourceKind, SemanticRelation, SkosRepository, Vocabulary,
        VocabularyError, VocabularySummary,
    },
    Error, Result,
};

/// Keeps `IN (...)` lists and multi-row inserts under the bind parameter
/// limit of sqlite.
const CHUNK: usize = 100;

/// Stores vocabularies in a relational database through `SeaORM`.
#[derive(Clone, Debug)]
pub struct SeaOrmSkosRepository {
    db: DatabaseConnection,
}

impl SeaOrmSkosRepository {
    #[must_use]
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    #[must_use]
    pub fn connection(&self) -> &DatabaseConnection {
        &self.db
    }
}

fn strings<'a>(ids: impl Iterator<Item = &'a Iri>) -> Vec<String> {
    ids.map(|id| id.as_str().to_owned()).collect()
}

/// Makes `text` match literally inside a `LIKE` pattern escaped with `\`.
fn escape_like(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn to_count(count: u64) -> usize {
    usize::try_from(count).unwrap_or(usize::MAX)
}

async fn insert_all<A, C>(db: &C, models: Vec<A>) -> Result<()>
where
    A: ActiveModelTrait + Clone + Send,
    <A::Entity as EntityTrait>::Model: IntoActiveModel<A>,
    C: ConnectionTrait,
{
    for chunk in models.chunks(CHUNK) {
        <A::Entity as EntityTrait>::insert_many(chunk.to_vec())
            .exec_without_returning(db)
            .await?;
    }
    Ok(())
}

/// First of `ids` already stored in the table of `E`.
async fn first_stored<E, C>(db: &C, column: E::Column, ids: &[String]) -> Result<Option<String>>
where
    E: EntityTrait,
    C: ConnectionTrait,
{
    for chunk in ids.chunks(CHUNK) {
        let found: Option<String> = E::find()
            .select_only()
            .column(column)
            .filter(column.is_in(chunk.iter().cloned()))
            .into_tuple()
            .one(db)
            .await?;
        if found.is_some() {
            return Ok(found);
        }
    }
    Ok(None)
}

fn duplicate(id: String, existing: ResourceKind) -> Result<()> {
    Err(VocabularyError::Duplicate {
        id: Iri::new(id)?,
        existing,
    }
    .into())
}

fn title(value: Option<String>, language: Option<String>) -> Result<Option<Label>> {
    value
        .map(|value| Label::from_parts(value, language.as_deref()))
        .transpose()
        .map_err(Error::from)
}

fn concept_from_row(row: concepts::Model) -> Result<Concept> {
    let mut concept = Concept::new(Iri::new(row.iri)?);
    if let Some(notation) = row.notation {
        concept = concept.with_notation(notation);
    }
    if let Some(definition) = row.definition {
        concept = concept.with_definition(definition);
    }
    if let Some(note) = row.scope_note {
        concept = concept.with_scope_note(note);
    }
    if let Some(modified) = row.modified {
        concept = concept.with_modified(modified);
    }
    Ok(concept)
}

fn concept_rows(concept: &Concept) -> (concepts::ActiveModel, Vec<labels::ActiveModel>, Vec<links::ActiveModel>) {
    let iri = concept.id().as_str().to_owned();
    let row = concepts::ActiveModel {
        iri: Set(iri.clone()),
        notation: Set(concept.notation().map(str::to_owned)),
        definition: Set(concept.definition().map(str::to_owned)),
        scope_note: Set(concept.scope_note().map(str::to_owned)),
        modified: Set(concept.modified()),
    };

    let mut label_rows = Vec::new();
    for kind in LabelKind::ALL {
        for label in concept.labels(kind) {
            label_rows.push(labels::ActiveModel {
                concept_iri: Set(iri.clone()),
                kind: Set(kind.name().to_owned()),
                value: Set(label.value().to_owned()),
                folded: Set(label.value().to_lowercase()),
                language: Set(label.language().map(str::to_owned)),
                ..Default::default()
            });
        }
    }

    let link = |relation: &str, target: &Iri| links::ActiveModel {
        subject: Set(iri.clone()),
        relation: Set(relation.to_owned()),
        object: Set(target.as_str().to_owned()),
        ..Default::default()
    };
    let mut link_rows = Vec::new();
    for relation in SemanticRelation::ALL {
        for target in concept.relations(relation) {
            link_rows.push(link(relation.name(), target));
        }
    }
    for relation in MappingRelation::ALL {
        for target in concept.mappings(relation) {
            link_rows.push(link(relation.name(), target));
        }
    }
    (row, label_rows, link_rows)
}

fn membership(container: &Iri, kind: &str, member: &Iri, top: bool, position: usize) -> memberships::ActiveModel {
    memberships::ActiveModel {
        container: Set(container.as_str().to_owned()),
        container_kind: Set(kind.to_owned()),
        member: Set(member.as_str().to_owned()),
        top: Set(top),
        position: Set(i32::try_from(position).unwrap_or(i32::MAX)),
        ..Default::default()
    }
}

#[async_trait]
impl SkosRepository for SeaOrmSkosRepository {
    type Error = Error;

    async fn save(&self, vocabulary: &Vocabulary) -> Result<()> {
        let concept_ids = strings(vocabulary.concepts().map(Concept::id));
        let scheme_ids = strings(vocabulary.schemes().map(ConceptScheme::id));
        let collection_ids = strings(vocabulary.collections().map(Collection::id));

        let txn = self.db.begin().await?;

        for (ids, bound) in [(&concept_ids, ResourceKind::ConceptScheme), (&collection_ids, ResourceKind::ConceptScheme)] {
            if let Some(id) = first_stored::<schemes::Entity, _>(&txn, schemes::Column::Iri, ids).await? {
                return duplicate(id, bound);
            }
        }
        for (ids, bound) in [(&scheme_ids, ResourceKind::Concept), (&collection_ids, ResourceKind::Concept)] {
            if let Some(id) = first_stored::<concepts::Entity, _>(&txn, concepts::Column::Iri, ids).await? {
                return duplicate(id, bound);
            }
        }
        for (ids, bound) in [(&concept_ids, ResourceKind::Collection), (&scheme_ids, ResourceKind::Collection)] {
            if let Some(id) = first_stored::<collections::Entity, _>(&txn, collections::Column::Iri, ids).await? {
                return duplicate(id, bound);
            }
        }

        for chunk in concept_ids.chunks(CHUNK) {
            concepts::Entity::delete_many()
                .filter(concepts::Column::Iri.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?;
            labels::Entity::delete_many()
                .filter(labels::Column::ConceptIri.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?;
            links::Entity::delete_many()
                .filter(links::Column::Subject.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?;
        }
        for chunk in scheme_ids.chunks(CHUNK) {
            schemes::Entity::delete_many()
                .filter(schemes::Column::Iri.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?;
            memberships::Entity::delete_many()
                .filter(memberships::Column::ContainerKind.eq(memberships::SCHEME))
                .filter(memberships::Column::Container.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?;
        }
        for chunk in collection_ids.chunks(CHUNK) {
            collections::Entity::delete_many()
                .filter(collections::Column::Iri.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?;
            memberships::Entity::delete_many()
                .filter(memberships::Column::ContainerKind.eq(memberships::COLLECTION))
                .filter(memberships::Column::Container.is_in(chunk.iter().cloned()))
                .exec(&txn)
                .await?;
        }

        let mut concept_models = Vec::new();
        let mut label_models = Vec::new();
        let mut link_models = Vec::new();
        for concept in vocabulary.concepts() {
            let (row, label_rows, link_rows) = concept_rows(concept);
            concept_models.push(row);
            label_models.extend(label_rows);
            link_models.extend(link_rows);
        }

        let mut scheme_models = Vec::new();
        let mut membership_models = Vec::new();
        for scheme in vocabulary.schemes() {
            scheme_models.push(schemes::ActiveModel {
                iri: Set(scheme.id().as_str().to_owned()),
                title: Set(scheme.title().map(|title| title.value().to_owned())),
                title_language: Set(scheme.title().and_then(Label::language).map(str::to_owned)),
                description: Set(scheme.description().map(str::to_owned)),
                created: Set(scheme.created()),
            });
            for (position, concept) in scheme.concepts().iter().enumerate() {
                let top = scheme.declared_top_concepts().contains(concept);
                membership_models.push(membership(scheme.id(), memberships::SCHEME, concept, top, position));
            }
        }

        let mut collection_models = Vec::new();
        for collection in vocabulary.collections() {
            collection_models.push(collections::ActiveModel {
                iri: Set(collection.id().as_str().to_owned()),
                title: Set(collection.title().map(|title| title.value().to_owned())),
                title_language: Set(collection.title().and_then(Label::language).map(str::to_owned)),
                description: Set(collection.description().map(str::to_owned)),
                date: Set(collection.date()),
                ordered: Set(collection.is_ordered()),
            });
            for (position, member) in collection.members().iter().enumerate() {
                membership_models.push(membership(collection.id(), memberships::COLLECTION, member, false, position));
            }
        }

        insert_all(&txn, concept_models).await?;
        insert_all(&txn, label_models).await?;
        insert_all(&txn, link_models).await?;
        insert_all(&txn, scheme_models).await?;
        insert_all(&txn, collection_models).await?;
        insert_all(&txn, membership_models).await?;

        txn.commit().await?;
        let summary = vocabulary.summary();
        tracing::debug!(
            concepts = summary.concept_count,
            schemes = summary.scheme_count,
            collections = summary.collection_count,
            "vocabulary stored"
        );
        Ok(())
    }

    async fn load(&self) -> Result<Vocabulary> {
        let mut vocabulary = Vocabulary::new();

        let concept_rows = concepts::Entity::find()
            .order_by_asc(concepts::Column::Iri)
            .all(&self.db)
            .await?;
        for row in concept_rows {
            vocabulary.add_concept(concept_from_row(row)?)?;
        }

        let label_rows = labels::Entity::find()
            .order_by_asc(labels::Column::Id)
            .all(&self.db)
            .await?;
        for row in label_rows {
            let concept = Iri::new(row.concept_iri)?;
            let kind: LabelKind = row.kind.parse()?;
            let label = Label::from_parts(row.value, row.language.as_deref())?;
            if vocabulary.concept(&concept).is_none() {
                tracing::warn!(%concept, "label of a missing concept");
                continue;
            }
            match vocabulary.add_label(&concept, kind, label) {
                Ok(_) => {}
                Err(err @ VocabularyError::LabelClash { .. }) => {
                    tracing::warn!(%err, "stored label skipped");
                }
                Err(err) => return Err(err.into()),
            }
        }

        let link_rows = links::Entity::find()
            .order_by_asc(links::Column::Id)
            .all(&self.db)
            .await?;
        for row in link_rows {
            let subject = Iri::new(row.subject)?;
            let object = Iri::new(row.object)?;
            if vocabulary.concept(&subject).is_none() {
                tracing::warn!(%subject, relation = row.relation, "link of a missing concept");
                continue;
            }
            if let Ok(relation) = row.relation.parse::<SemanticRelation>() {
                if vocabulary.concept(&object).is_some() {
                    vocabulary.relate(&subject, relation, &object)?;
                } else {
                    tracing::warn!(%subject, %relation, %object, "link to a missing concept");
                }
            } else {
                let relation: MappingRelation = row.relation.parse()?;
                vocabulary.add_mapping(&subject, relation, object)?;
            }
        }

        let scheme_rows = schemes::Entity::find()
            .order_by_asc(schemes::Column::Iri)
            .all(&self.db)
            .await?;
        for row in scheme_rows {
            let mut scheme = ConceptScheme::new(Iri::new(row.iri)?);
            if let Some(title) = title(row.title, row.title_language)? {
                scheme = scheme.with_title(title);
            }
            if let Some(description) = row.description {
                scheme = scheme.with_description(description);
            }
            if let Some(created) = row.created {
                scheme = scheme.with_created(created);
            }
            vocabulary.add_scheme(scheme)?;
        }

        let collection_rows = collections::Entity::find()
            .order_by_asc(collections::Column::Iri)
            .all(&self.db)
            .await?;
        for row in collection_rows {
            let mut collection = Collection::new(Iri::new(row.iri)?);
            if let Some(title) = title(row.title, row.title_language)? {
                collection = collection.with_title(title);
            }
            if let Some(description) = row.description {
                collection = collection.with_description(description);
            }
            if let Some(date) = row.date {
                collection = collection.with_date(date);
            }
            if row.ordered {
                collection = collection.ordered();
            }
            vocabulary.add_collection(collection)?;
        }

        let membership_rows = memberships::Entity::find()
            .order_by_asc(memberships::Column::Container)
            .order_by_asc(memberships::Column::Position)
            .order_by_asc(memberships::Column::Id)
            .all(&self.db)
            .await?;
        for row in membership_rows {
            let container = Iri::new(row.container)?;
            let member = Iri::new(row.member)?;
            match row.container_kind.as_str() {
                memberships::SCHEME => {
                    if vocabulary.scheme(&container).is_none() || vocabulary.concept(&member).is_none() {
                        tracing::warn!(%container, %member, "scheme membership skipped");
                        continue;
                    }
                    vocabulary.add_to_scheme(&container, &member, row.top)?;
                }
                memberships::COLLECTION => {
                    if vocabulary.collection(&container).is_none() {
                        tracing::warn!(%container, %member, "membership of a missing collection");
                        continue;
                    }
                    match vocabulary.add_member(&container, member) {
                        Ok(_) => {}
                        Err(
                            err @ (VocabularyError::InvalidMember { .. }
                            | VocabularyError::CollectionCycle { .. }),
                        ) => tracing::warn!(%err, "collection membership skipped"),
                        Err(err) => return Err(err.into()),
                    }
                }
                other => tracing::warn!(kind = other, %container, "unknown membership kind"),
            }
        }

        Ok(vocabulary)
    }

    async fn concept(&self, iri: &Iri) -> Result<Option<ConceptSnapshot>> {
        let Some(row) = concepts::Entity::find_by_id(iri.as_str())
            .one(&self.db)
            .await?
        else {
            return Ok(None);
        };
        let mut concept = concept_from_row(row)?;

        let label_rows = labels::Entity::find()
            .filter(labels::Column::ConceptIri.eq(iri.as_str()))
            .order_by_asc(labels::Column::Id)
            .all(&self.db)
            .await?;
        for row in label_rows {
            let kind: LabelKind = row.kind.parse()?;
            let label = Label::from_parts(row.value, row.language.as_deref())?;
            if kind == LabelKind::Preferred {
                concept.set_pref_label(label);
            } else {
                concept.insert_label(kind, label);
            }
        }

        let outgoing = links::Entity::find()
            .filter(links::Column::Subject.eq(iri.as_str()))
            .all(&self.db)
            .await?;
        for row in outgoing {
            let object = Iri::new(row.object)?;
            if let Ok(relation) = row.relation.parse::<SemanticRelation>() {
                concept.link(relation, object);
            } else {
                concept.map(row.relation.parse()?, object);
            }
        }
        let incoming = links::Entity::find()
            .filter(links::Column::Object.eq(iri.as_str()))
            .all(&self.db)
            .await?;
        for row in incoming {
            if let Ok(relation) = row.relation.parse::<SemanticRelation>() {
                concept.link(relation.inverse(), Iri::new(row.subject)?);
            }
        }

        let mut schemes = BTreeSet::new();
        let mut collections = BTreeSet::new();
        let membership_rows = memberships::Entity::find()
            .filter(memberships::Column::Member.eq(iri.as_str()))
            .all(&self.db)
            .await?;
        for row in membership_rows {
            let container = Iri::new(row.container)?;
            if row.container_kind == memberships::SCHEME {
                schemes.insert(container);
            } else {
                collections.insert(container);
            }
        }

        Ok(Some(ConceptSnapshot {
            concept,
            schemes: schemes.into_iter().collect(),
            collections: collections.into_iter().collect(),
        }))
    }

    async fn delete_concept(&self, iri: &Iri) -> Result<()> {
        let txn = self.db.begin().await?;
        let deleted = concepts::Entity::delete_by_id(iri.as_str()).exec(&txn).await?;
        if deleted.rows_affected == 0 {
            return Err(Error::NotFound(iri.clone()));
        }
        labels::Entity::delete_many()
            .filter(labels::Column::ConceptIri.eq(iri.as_str()))
            .exec(&txn)
            .await?;
        links::Entity::delete_many()
            .filter(
                links::Column::Subject
                    .eq(iri.as_str())
                    .or(links::Column::Object.eq(iri.as_str())),
            )
            .exec(&txn)
            .await?;
        memberships::Entity::delete_many()
            .filter(memberships::Column::Member.eq(iri.as_str()))
            .exec(&txn)
            .await?;
        txn.commit().await?;
        tracing::debug!(%iri, "concept deleted");
        Ok(())
    }

    async fn search(&self, text: &str, language: Option<&str>) -> Result<Vec<Iri>> {
        let pattern = format!("%{}%", escape_like(&text.to_lowercase()));
        let mut query = labels::Entity::find()
            .select_only()
            .column(labels::Column::ConceptIri)
            .distinct()
            .filter(labels::Column::Folded.like(LikeExpr::new(pattern).escape('\\')))
            .order_by_asc(labels::Column::ConceptIri);
        if let Some(language) = language {
            query = query.filter(labels::Column::Language.eq(language.to_lowercase()));
        }
        let found: Vec<String> = query.into_tuple().all(&self.db).await?;
        found.into_iter().map(|iri| Ok(Iri::new(iri)?)).collect()
    }

    async fn summary(&self) -> Result<VocabularySummary> {
        Ok(VocabularySummary {
            concept_count: to_count(concepts::Entity::find().count(&self.db).await?),
            scheme_count: to_count(schemes::Entity::find().count(&self.db).await?),
            collection_count: to_count(collections::Entity::find().count(&self.db).await?),
        })
    }

    async fn clear(&self) -> Result<()> {
        let txn = self.db.begin().await?;
        memberships::Entity::delete_many().exec(&txn).await?;
        links::Entity::delete_many().exec(&txn).await?;
        labels::Entity::delete_many().exec(&txn).await?;
        collections::Entity::delete_many().exec(&txn).await?;
        schemes::Entity::delete_many().exec(&txn).await?;
        concepts::Entity::delete_many().exec(&txn).await?;
        txn.commit().await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("cat"), "cat");
        assert_eq!(escape_like("100%_a\\b"), "100\\%\\_a\\\\b");
    }
}
