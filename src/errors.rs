//! # Application Error Handling

use std::path::PathBuf;

use crate::{
    dates::DateParseError,
    skos::{entities::UnknownRelation, value_objects::IriError, vocabulary::VocabularyError, Iri},
};

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("{0}")]
    Message(String),

    #[error(transparent)]
    Iri(#[from] IriError),

    #[error(transparent)]
    Vocabulary(#[from] VocabularyError),

    #[error(transparent)]
    Date(#[from] DateParseError),

    #[error(transparent)]
    UnknownRelation(#[from] UnknownRelation),

    #[error("cannot parse RDF: {0}")]
    RdfParse(String),

    #[error("cannot serialize RDF: {0}")]
    RdfSerialize(String),

    #[error("unsupported RDF format `{0}`")]
    UnsupportedFormat(String),

    #[error("`{0}` not found")]
    NotFound(Iri),

    /// Opening or reading a named file.
    #[error("failed to access `{path}`: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Writing to a stream without a path, such as standard output.
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error(transparent)]
    YAMLFile(#[from] serde_yaml::Error),

    #[error(transparent)]
    JSON(#[from] serde_json::Error),

    #[cfg(feature = "with-db")]
    #[error(transparent)]
    DB(#[from] sea_orm::DbErr),

    #[error("the `{0}` store backend is not available in this build")]
    BackendUnavailable(&'static str),
}

#[cfg(test)]
mod tests {
    use std::{io, path::PathBuf};

    use super::Error;

    fn flush(result: io::Result<()>) -> crate::Result<()> {
        result?;
        Ok(())
    }

    #[test]
    fn file_errors_name_the_path() {
        let err = Error::Io {
            path: PathBuf::from("thesaurus.ttl"),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        };
        assert_eq!(err.to_string(), "failed to access `thesaurus.ttl`: missing");

        let err = flush(Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed")))
            .expect_err("stream error");
        assert!(matches!(err, Error::IO(_)));
    }
}
