//! RDF input and output for SKOS vocabularies.
mod export;
mod format;
mod loader;
mod resolver;

pub use export::{to_triples, write_vocabulary};
pub use format::{parse_graph, parse_path, SourceFormat};
pub use loader::RdfLoader;
pub use resolver::{DocumentResolver, GraphResolver, NoopResolver};
