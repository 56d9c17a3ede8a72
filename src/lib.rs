//! A basic implementation of some core elements of the SKOS object model.
//!
//! RDF documents are read with `oxrdfio` into a [`skos::Vocabulary`] of
//! concepts, concept schemes and collections, which can be stored through a
//! [`skos::SkosRepository`] (in memory or, with the `with-db` feature, in a
//! relational database via `SeaORM`).

pub use self::errors::Error;

pub mod config;
pub mod dates;
pub mod errors;
pub mod logger;
pub mod rdf;
pub mod skos;

#[cfg(feature = "with-db")]
pub mod db;

#[cfg(feature = "cli")]
pub mod cli;

/// Application results options list
pub type Result<T, E = Error> = std::result::Result<T, E>;

/// Crate version, as published.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
