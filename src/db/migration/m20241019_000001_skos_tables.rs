use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SkosConcepts::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SkosConcepts::Iri).string().not_null().primary_key())
                    .col(ColumnDef::new(SkosConcepts::Notation).string().null())
                    .col(ColumnDef::new(SkosConcepts::Definition).text().null())
                    .col(ColumnDef::new(SkosConcepts::ScopeNote).text().null())
                    .col(ColumnDef::new(SkosConcepts::Modified).timestamp_with_time_zone().null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SkosLabels::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SkosLabels::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SkosLabels::ConceptIri).string().not_null())
                    .col(ColumnDef::new(SkosLabels::Kind).string().not_null())
                    .col(ColumnDef::new(SkosLabels::Value).string().not_null())
                    .col(ColumnDef::new(SkosLabels::Folded).string().not_null())
                    .col(ColumnDef::new(SkosLabels::Language).string().null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-skos_labels-concept_iri")
                    .table(SkosLabels::Table)
                    .col(SkosLabels::ConceptIri)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SkosConceptSchemes::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SkosConceptSchemes::Iri).string().not_null().primary_key())
                    .col(ColumnDef::new(SkosConceptSchemes::Title).string().null())
                    .col(ColumnDef::new(SkosConceptSchemes::TitleLanguage).string().null())
                    .col(ColumnDef::new(SkosConceptSchemes::Description).text().null())
                    .col(
                        ColumnDef::new(SkosConceptSchemes::Created)
                            .timestamp_with_time_zone()
                            .null(),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SkosCollections::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(SkosCollections::Iri).string().not_null().primary_key())
                    .col(ColumnDef::new(SkosCollections::Title).string().null())
                    .col(ColumnDef::new(SkosCollections::TitleLanguage).string().null())
                    .col(ColumnDef::new(SkosCollections::Description).text().null())
                    .col(ColumnDef::new(SkosCollections::Date).timestamp_with_time_zone().null())
                    .col(
                        ColumnDef::new(SkosCollections::Ordered)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SkosConceptLinks::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SkosConceptLinks::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SkosConceptLinks::Subject).string().not_null())
                    .col(ColumnDef::new(SkosConceptLinks::Relation).string().not_null())
                    .col(ColumnDef::new(SkosConceptLinks::Object).string().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-skos_concept_links-subject")
                    .table(SkosConceptLinks::Table)
                    .col(SkosConceptLinks::Subject)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-skos_concept_links-object")
                    .table(SkosConceptLinks::Table)
                    .col(SkosConceptLinks::Object)
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(SkosMemberships::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SkosMemberships::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SkosMemberships::Container).string().not_null())
                    .col(ColumnDef::new(SkosMemberships::ContainerKind).string().not_null())
                    .col(ColumnDef::new(SkosMemberships::Member).string().not_null())
                    .col(
                        ColumnDef::new(SkosMemberships::Top)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(SkosMemberships::Position).integer().not_null())
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-skos_memberships-container")
                    .table(SkosMemberships::Table)
                    .col(SkosMemberships::Container)
                    .to_owned(),
            )
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx-skos_memberships-member")
                    .table(SkosMemberships::Table)
                    .col(SkosMemberships::Member)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SkosMemberships::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SkosConceptLinks::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SkosCollections::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SkosConceptSchemes::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SkosLabels::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(SkosConcepts::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum SkosConcepts {
    Table,
    Iri,
    Notation,
    Definition,
    ScopeNote,
    Modified,
}

#[derive(DeriveIden)]
enum SkosLabels {
    Table,
    Id,
    ConceptIri,
    Kind,
    Value,
    Folded,
    Language,
}

#[derive(DeriveIden)]
enum SkosConceptSchemes {
    Table,
    Iri,
    Title,
    TitleLanguage,
    Description,
    Created,
}

#[derive(DeriveIden)]
enum SkosCollections {
    Table,
    Iri,
    Title,
    TitleLanguage,
    Description,
    Date,
    Ordered,
}

#[derive(DeriveIden)]
enum SkosConceptLinks {
    Table,
    Id,
    Subject,
    Relation,
    Object,
}

#[derive(DeriveIden)]
enum SkosMemberships {
    Table,
    Id,
    Container,
    ContainerKind,
    Member,
    Top,
    Position,
}
