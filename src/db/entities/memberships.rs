use sea_orm::entity::prelude::*;

pub const SCHEME: &str = "scheme";
pub const COLLECTION: &str = "collection";

/// Membership of a concept in a scheme, or of a concept or collection in a
/// collection.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "skos_memberships")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub container: String,
    /// [`SCHEME`] or [`COLLECTION`].
    pub container_kind: String,
    pub member: String,
    /// Declared top concept of the scheme.
    pub top: bool,
    pub position: i32,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
