use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use oxrdf::{Literal, NamedNode, NamedNodeRef};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Value object ensuring that supplied text represents a valid IRI.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Iri {
    value: String,
}

impl Iri {
    /// Validates and constructs a new [`Iri`] value object.
    ///
    /// Every SKOS resource is identified by one of these, so malformed
    /// identifiers are rejected here rather than deep inside the loader.
    pub fn new(value: impl Into<String>) -> Result<Self, IriError> {
        let value = value.into();
        NamedNode::new(value.as_str()).map_err(|_| IriError::Invalid {
            value: value.clone(),
        })?;
        Ok(Self { value })
    }

    /// Returns the underlying textual representation.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// Borrows the identifier as an RDF named node.
    #[must_use]
    pub fn as_named_node(&self) -> NamedNodeRef<'_> {
        NamedNodeRef::new_unchecked(&self.value)
    }

    /// Returns the trailing segment after the last `#` or `/`.
    ///
    /// Falls back to the whole IRI when the segment would be empty.
    #[must_use]
    pub fn local_name(&self) -> &str {
        let trimmed = self.value.trim_end_matches(['/', '#']);
        match trimmed.rfind(['#', '/']) {
            Some(index) if index + 1 < trimmed.len() => &trimmed[index + 1..],
            _ => &self.value,
        }
    }
}

impl Display for Iri {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl FromStr for Iri {
    type Err = IriError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s.to_owned())
    }
}

impl TryFrom<String> for Iri {
    type Error = IriError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Iri> for String {
    fn from(value: Iri) -> Self {
        value.value
    }
}

impl From<NamedNodeRef<'_>> for Iri {
    fn from(node: NamedNodeRef<'_>) -> Self {
        Self {
            value: node.as_str().to_owned(),
        }
    }
}

/// Literal text with an optional language tag.
///
/// Tags are stored lower-case so `en-GB` and `en-gb` compare equal.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    language: Option<String>,
}

impl Label {
    /// Creates an untagged label.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            language: None,
        }
    }

    /// Creates a label tagged with a BCP47 language.
    pub fn with_language(
        value: impl Into<String>,
        language: impl Into<String>,
    ) -> Result<Self, IriError> {
        let value = value.into();
        let language = language.into();
        Literal::new_language_tagged_literal(value.as_str(), language.as_str())
            .map_err(|_| IriError::InvalidLanguageTag { tag: language.clone() })?;
        Ok(Self {
            value,
            language: Some(language.to_ascii_lowercase()),
        })
    }

    /// Builds a label from an optional tag, treating an empty tag as untagged.
    pub fn from_parts(
        value: impl Into<String>,
        language: Option<&str>,
    ) -> Result<Self, IriError> {
        match language {
            Some(tag) if !tag.is_empty() => Self::with_language(value, tag),
            _ => Ok(Self::new(value)),
        }
    }

    #[must_use]
    pub fn value(&self) -> &str {
        &self.value
    }

    #[must_use]
    pub fn language(&self) -> Option<&str> {
        self.language.as_deref()
    }

    /// Returns `true` when the label carries the requested tag.
    ///
    /// `None` matches only untagged labels.
    #[must_use]
    pub fn matches_language(&self, language: Option<&str>) -> bool {
        match (self.language.as_deref(), language) {
            (Some(own), Some(wanted)) => own.eq_ignore_ascii_case(wanted),
            (None, None) => true,
            _ => false,
        }
    }
}

impl Display for Label {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match &self.language {
            Some(language) => write!(f, "\"{}\"@{language}", self.value),
            None => write!(f, "\"{}\"", self.value),
        }
    }
}

/// Errors produced when validating an [`Iri`] or a [`Label`].
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum IriError {
    /// The provided text could not be parsed as an IRI.
    #[error("invalid IRI: {value}")]
    Invalid { value: String },
    /// The provided language tag is not a well formed BCP47 tag.
    #[error("invalid language tag: {tag}")]
    InvalidLanguageTag { tag: String },
}

#[cfg(test)]
mod tests {
    use super::{Iri, IriError, Label};

    #[test]
    fn accepts_valid_iri() {
        let iri = Iri::new("https://example.org/resource").expect("valid IRI");
        assert_eq!(iri.as_str(), "https://example.org/resource");
    }

    #[test]
    fn rejects_invalid_iri() {
        let err = Iri::new("not an iri").expect_err("invalid IRI");
        assert!(matches!(err, IriError::Invalid { value } if value == "not an iri"));
    }

    #[test]
    fn local_name_uses_fragment_or_last_segment() {
        let hash = Iri::new("http://www.w3.org/2004/02/skos/core#Concept").expect("iri");
        assert_eq!(hash.local_name(), "Concept");
        let slash = Iri::new("http://example.org/animals/cat/").expect("iri");
        assert_eq!(slash.local_name(), "cat");
        let bare = Iri::new("urn:isbn:123").expect("iri");
        assert_eq!(bare.local_name(), "urn:isbn:123");
    }

    #[test]
    fn iri_serializes_as_plain_string() {
        let iri = Iri::new("http://example.org/a").expect("iri");
        let json = serde_json::to_string(&iri).expect("json");
        assert_eq!(json, "\"http://example.org/a\"");
        let back: Iri = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, iri);
        assert!(serde_json::from_str::<Iri>("\"not an iri\"").is_err());
    }

    #[test]
    fn language_tags_are_validated_and_normalised() {
        let label = Label::with_language("Colour", "en-GB").expect("label");
        assert_eq!(label.language(), Some("en-gb"));
        assert!(label.matches_language(Some("EN-gb")));
        assert!(!label.matches_language(None));

        let err = Label::with_language("x", "not a tag").expect_err("bad tag");
        assert!(matches!(err, IriError::InvalidLanguageTag { .. }));
    }

    #[test]
    fn empty_tag_means_untagged() {
        let label = Label::from_parts("cat", Some("")).expect("label");
        assert_eq!(label.language(), None);
        assert_eq!(label.to_string(), "\"cat\"");
    }
}
