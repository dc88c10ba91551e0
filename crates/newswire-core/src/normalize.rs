//! Canonical entity keys.
//!
//! Every index lookup and every index write goes through
//! [`EntityNormalizer::normalize`], so two spellings of the same entity meet
//! at the same key.

use std::sync::Arc;

use regex::Regex;

use crate::entity::EntityKind;
use crate::extract::Lemmatizer;

/// One pattern-to-canonical-form rule for location aliases.
///
/// Patterns are matched against the lemmatized, lowercased span. Rules are
/// checked in insertion order and the first match wins.
#[derive(Debug, Clone)]
pub struct AliasRule {
    pattern: Regex,
    canonical: String,
}

impl AliasRule {
    pub fn new(pattern: &str, canonical: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            canonical: canonical.into(),
        })
    }
}

/// Canonicalizes raw entity mentions into stable index keys.
///
/// Pure and deterministic: the same input always yields the same key.
/// Lemmatization is delegated to the extractor's linguistic capability.
#[derive(Clone)]
pub struct EntityNormalizer {
    rules: Vec<AliasRule>,
    lemmatizer: Arc<dyn Lemmatizer>,
}

impl EntityNormalizer {
    /// Normalizer with the default location alias table.
    #[must_use]
    pub fn new(lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self {
            rules: default_rules(),
            lemmatizer,
        }
    }

    /// Normalizer with no alias rules.
    #[must_use]
    pub fn bare(lemmatizer: Arc<dyn Lemmatizer>) -> Self {
        Self {
            rules: Vec::new(),
            lemmatizer,
        }
    }

    /// Append an alias rule. Lower priority than all existing rules.
    #[must_use]
    pub fn with_rule(mut self, rule: AliasRule) -> Self {
        self.rules.push(rule);
        self
    }

    /// Compute the canonical key for a raw span.
    ///
    /// - `Location`: lemmatized lowercase form, folded through the alias
    ///   rules (first match wins).
    /// - `Person`: title-cased lemma of the *last* token only. "FirstName
    ///   Surname" and "Surname" collapse to one key; distinct people sharing
    ///   a surname collapse too. Known limitation, kept deliberately.
    /// - `Organization` or no kind: lemmatized lowercase full span.
    #[must_use]
    pub fn normalize(&self, raw: &str, kind: Option<EntityKind>) -> String {
        let lemmas = self.lemmatizer.lemmas(raw);
        match kind {
            Some(EntityKind::Location) => {
                let span = lemmas.join(" ");
                for rule in &self.rules {
                    if rule.pattern.is_match(&span) {
                        return rule.canonical.clone();
                    }
                }
                span
            }
            Some(EntityKind::Person) => lemmas.last().map(|s| title_case(s)).unwrap_or_default(),
            Some(EntityKind::Organization) | None => lemmas.join(" "),
        }
    }
}

fn title_case(word: &str) -> String {
    let mut chars = word.chars();
    chars.next().map_or_else(String::new, |first| {
        first.to_uppercase().chain(chars).collect()
    })
}

fn default_rules() -> Vec<AliasRule> {
    [
        (r"\bмоскв[а-я]*\b", "москва"),
        (r"\b(mosk|msk|mosc)\w*\b", "москва"),
        (r"\bмск\b", "москва"),
    ]
    .into_iter()
    .map(|(pattern, canonical)| {
        AliasRule::new(pattern, canonical).expect("default alias rule must compile")
    })
    .collect()
}
