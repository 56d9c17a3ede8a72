//! `SeaORM` entities backing [`super::SeaOrmSkosRepository`].
pub mod collections;
pub mod concepts;
pub mod labels;
pub mod links;
pub mod memberships;
pub mod schemes;
