use sea_orm::entity::prelude::*;

/// Preferred, alternative and hidden labels of a concept.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "skos_labels")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub concept_iri: String,
    /// `pref`, `alt` or `hidden`.
    pub kind: String,
    pub value: String,
    /// `value` lowercased with Unicode rules, matched by label search.
    pub folded: String,
    pub language: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
