//! Entity extraction boundary.
//!
//! The production system runs a pretrained NLP pipeline behind this interface.
//! [`LexiconExtractor`] is a deterministic dictionary-driven implementation of
//! the same contract: good enough for wiring, testing, and small curated
//! domains, with no model download.

use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::entity::{EntityKind, Mention};

#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("extraction failed: {0}")]
    Failed(String),
}

pub type ExtractResult<T> = Result<T, ExtractError>;

/// Token-level lemmatization capability.
///
/// Exposed separately from [`EntityExtractor`] so the normalizer can borrow
/// the extractor's linguistic machinery without depending on the full
/// extraction interface.
pub trait Lemmatizer: Send + Sync {
    /// Lowercased base forms for every token in `text`, in order.
    fn lemmas(&self, text: &str) -> Vec<String>;
}

/// Finds entity mentions in article text.
#[async_trait::async_trait]
pub trait EntityExtractor: Lemmatizer {
    async fn extract(&self, text: &str) -> ExtractResult<Vec<Mention>>;
}

/// Dictionary-backed extractor.
///
/// Lexicons hold *lemma* forms: a span matches when the lemmatized,
/// lowercased form of its tokens is present. Longest phrase wins, up to
/// three tokens. A capitalized token whose lemma is a known surname is a
/// person mention; when the following token lemmatizes to a known verb the
/// person is recorded as its grammatical subject.
#[derive(Default)]
pub struct LexiconExtractor {
    lemma_overrides: HashMap<String, String>,
    locations: HashSet<String>,
    organizations: HashSet<String>,
    surnames: HashSet<String>,
    verbs: HashSet<String>,
}

const MAX_PHRASE_TOKENS: usize = 3;

impl LexiconExtractor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Map a surface token (lowercased) to its base form.
    #[must_use]
    pub fn with_lemma(mut self, surface: impl Into<String>, lemma: impl Into<String>) -> Self {
        self.lemma_overrides
            .insert(surface.into().to_lowercase(), lemma.into());
        self
    }

    #[must_use]
    pub fn with_location(mut self, lemma_phrase: impl Into<String>) -> Self {
        self.locations.insert(lemma_phrase.into());
        self
    }

    #[must_use]
    pub fn with_organization(mut self, lemma_phrase: impl Into<String>) -> Self {
        self.organizations.insert(lemma_phrase.into());
        self
    }

    #[must_use]
    pub fn with_surname(mut self, lemma: impl Into<String>) -> Self {
        self.surnames.insert(lemma.into());
        self
    }

    #[must_use]
    pub fn with_verb(mut self, lemma: impl Into<String>) -> Self {
        self.verbs.insert(lemma.into());
        self
    }

    /// A small starter lexicon for Russian news text.
    #[must_use]
    pub fn with_default_lexicon() -> Self {
        Self::new()
            .with_location("москва")
            .with_location("санкт-петербург")
            .with_location("россия")
            .with_lemma("москвы", "москва")
            .with_lemma("москве", "москва")
            .with_lemma("москву", "москва")
            .with_lemma("москвой", "москва")
            .with_lemma("россии", "россия")
            .with_lemma("россию", "россия")
            .with_verb("сказать")
            .with_lemma("сказал", "сказать")
            .with_lemma("сказала", "сказать")
            .with_lemma("сказали", "сказать")
            .with_verb("заявить")
            .with_lemma("заявил", "заявить")
            .with_lemma("заявила", "заявить")
            .with_lemma("заявили", "заявить")
            .with_verb("сообщить")
            .with_lemma("сообщил", "сообщить")
            .with_lemma("сообщила", "сообщить")
            .with_lemma("сообщили", "сообщить")
    }

    fn lemma(&self, token: &str) -> String {
        let lowered = token.to_lowercase();
        self.lemma_overrides
            .get(&lowered)
            .cloned()
            .unwrap_or(lowered)
    }

    fn phrase_kind(&self, lemma_phrase: &str) -> Option<EntityKind> {
        if self.locations.contains(lemma_phrase) {
            Some(EntityKind::Location)
        } else if self.organizations.contains(lemma_phrase) {
            Some(EntityKind::Organization)
        } else {
            None
        }
    }
}

fn tokens(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '-'))
        .filter(|s| !s.is_empty())
        .collect()
}

fn starts_uppercase(word: &str) -> bool {
    word.chars().next().is_some_and(char::is_uppercase)
}

impl Lemmatizer for LexiconExtractor {
    fn lemmas(&self, text: &str) -> Vec<String> {
        tokens(text).into_iter().map(|t| self.lemma(t)).collect()
    }
}

#[async_trait::async_trait]
impl EntityExtractor for LexiconExtractor {
    async fn extract(&self, text: &str) -> ExtractResult<Vec<Mention>> {
        let words = tokens(text);
        let mut mentions = Vec::new();

        let mut i = 0;
        while i < words.len() {
            let mut advanced = None;
            for len in (1..=MAX_PHRASE_TOKENS.min(words.len() - i)).rev() {
                let span = &words[i..i + len];
                let lemma_phrase = span
                    .iter()
                    .map(|w| self.lemma(w))
                    .collect::<Vec<_>>()
                    .join(" ");
                if let Some(kind) = self.phrase_kind(&lemma_phrase) {
                    mentions.push(Mention::new(span.join(" "), kind));
                    advanced = Some(len);
                    break;
                }
            }
            if let Some(len) = advanced {
                i += len;
                continue;
            }

            let word = words[i];
            if starts_uppercase(word) && self.surnames.contains(&self.lemma(word)) {
                let mut mention = Mention::new(word, EntityKind::Person);
                if let Some(next) = words.get(i + 1) {
                    let verb_lemma = self.lemma(next);
                    if self.verbs.contains(&verb_lemma) {
                        mention = mention.with_subject_of(verb_lemma);
                    }
                }
                mentions.push(mention);
            }
            i += 1;
        }

        Ok(mentions)
    }
}
