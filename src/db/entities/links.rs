use sea_orm::entity::prelude::*;

/// A semantic or mapping link as declared by its subject concept.
///
/// Both ends of a semantic link are stored, each owned by its subject, so
/// replacing one concept leaves the links held by the other in place.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "skos_concept_links")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub subject: String,
    /// Relation name, `broader` or `exactMatch` for instance.
    pub relation: String,
    pub object: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
