use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The entity kinds tracked by the index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Location,
    Person,
    Organization,
}

impl EntityKind {
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Location => "location",
            Self::Person => "person",
            Self::Organization => "organization",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("invalid entity kind: {0}")]
pub struct ParseEntityKindError(String);

impl std::str::FromStr for EntityKind {
    type Err = ParseEntityKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "location" | "loc" => Ok(Self::Location),
            "person" | "per" => Ok(Self::Person),
            "organization" | "org" => Ok(Self::Organization),
            _ => Err(ParseEntityKindError(s.to_string())),
        }
    }
}

/// A single entity mention found in article text.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mention {
    /// Surface form of the span, as it appeared in the text.
    pub text: String,
    pub kind: EntityKind,
    /// Verb lemma when this mention is the grammatical subject of a verb.
    pub subject_of: Option<String>,
}

impl Mention {
    #[must_use]
    pub fn new(text: impl Into<String>, kind: EntityKind) -> Self {
        Self {
            text: text.into(),
            kind,
            subject_of: None,
        }
    }

    #[must_use]
    pub fn with_subject_of(mut self, verb_lemma: impl Into<String>) -> Self {
        self.subject_of = Some(verb_lemma.into());
        self
    }
}
