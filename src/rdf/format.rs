use std::{fmt, fs::File, io::BufReader, io::Read, path::Path};

use oxrdf::{Graph, Triple};
use oxrdfio::{RdfFormat, RdfParser};
use serde::{Deserialize, Serialize};

use crate::{skos::IriError, Error, Result};

/// RDF syntaxes a vocabulary can be read from or written to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum SourceFormat {
    Turtle,
    #[cfg_attr(feature = "cli", value(name = "ntriples"))]
    NTriples,
    #[cfg_attr(feature = "cli", value(name = "nquads"))]
    NQuads,
    #[cfg_attr(feature = "cli", value(name = "trig"))]
    TriG,
    #[cfg_attr(feature = "cli", value(name = "rdfxml"))]
    RdfXml,
    N3,
}

impl SourceFormat {
    /// Guesses the syntax from a file extension, ignoring case.
    #[must_use]
    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.to_ascii_lowercase().as_str() {
            "ttl" | "turtle" => Some(Self::Turtle),
            "nt" | "ntriples" => Some(Self::NTriples),
            "nq" | "nquads" => Some(Self::NQuads),
            "trig" => Some(Self::TriG),
            "rdf" | "xml" | "owl" | "rdfxml" => Some(Self::RdfXml),
            "n3" => Some(Self::N3),
            _ => None,
        }
    }

    /// Guesses the syntax of a file from its extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        path.extension()
            .and_then(|extension| extension.to_str())
            .and_then(Self::from_extension)
            .ok_or_else(|| Error::UnsupportedFormat(path.display().to_string()))
    }

    /// Canonical file extension.
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Turtle => "ttl",
            Self::NTriples => "nt",
            Self::NQuads => "nq",
            Self::TriG => "trig",
            Self::RdfXml => "rdf",
            Self::N3 => "n3",
        }
    }

    pub(crate) fn as_rdf_format(self) -> RdfFormat {
        match self {
            Self::Turtle => RdfFormat::Turtle,
            Self::NTriples => RdfFormat::NTriples,
            Self::NQuads => RdfFormat::NQuads,
            Self::TriG => RdfFormat::TriG,
            Self::RdfXml => RdfFormat::RdfXml,
            Self::N3 => RdfFormat::N3,
        }
    }
}

impl fmt::Display for SourceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Parses a document into a graph.
///
/// Named graphs of quad syntaxes are folded into the default graph.
pub fn parse_graph(reader: impl Read, format: SourceFormat, base_iri: Option<&str>) -> Result<Graph> {
    let mut parser = RdfParser::from_format(format.as_rdf_format());
    if let Some(base_iri) = base_iri {
        parser = parser.with_base_iri(base_iri).map_err(|_| {
            Error::Iri(IriError::Invalid {
                value: base_iri.to_owned(),
            })
        })?;
    }

    let mut graph = Graph::new();
    for quad in parser.for_reader(reader) {
        let quad = quad.map_err(|err| Error::RdfParse(err.to_string()))?;
        graph.insert(&Triple::from(quad));
    }
    tracing::trace!(%format, triples = graph.len(), "parsed rdf document");
    Ok(graph)
}

/// Parses a file, guessing its syntax from the extension.
pub fn parse_path(path: &Path, base_iri: Option<&str>) -> Result<Graph> {
    let format = SourceFormat::from_path(path)?;
    let file = File::open(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_graph(BufReader::new(file), format, base_iri).map_err(|err| match err {
        Error::RdfParse(message) => Error::RdfParse(format!("{}: {message}", path.display())),
        other => other,
    })
}
