//! Keyword field normalization.
//!
//! Turns one raw delimited keyword field into the ordered, deduplicated token
//! sequence for that document. Duplicates within a document are dropped so
//! they never inflate co-occurrence weight.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use evolution_types::{Language, TaggedDocument};

use crate::stopwords::StopTerms;

/// Tokens shorter than this (in characters) are discarded.
const MIN_TOKEN_CHARS: usize = 2;

/// A document reduced to its year and normalized keyword tokens.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedDocument {
    pub year: i32,
    pub keywords: Vec<String>,
}

/// Splits and filters raw keyword fields for one language.
#[derive(Debug, Clone)]
pub struct KeywordNormalizer {
    language: Language,
    stop_terms: StopTerms,
}

impl KeywordNormalizer {
    pub fn new(language: Language, stop_terms: StopTerms) -> Self {
        Self {
            language,
            stop_terms,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn stop_terms(&self) -> &StopTerms {
        &self.stop_terms
    }

    /// Normalize one raw field. Missing or empty input yields no tokens.
    pub fn normalize(&self, field: &str) -> Vec<String> {
        let separators = self.language.separators();
        let mut seen: HashSet<String> = HashSet::new();
        let mut tokens = Vec::new();

        for raw in field.split(|c: char| separators.contains(&c)) {
            let trimmed = raw.trim();
            let token = if self.language.folds_case() {
                trimmed.to_lowercase()
            } else {
                trimmed.to_string()
            };
            if token.chars().count() < MIN_TOKEN_CHARS || self.stop_terms.contains(&token) {
                continue;
            }
            if seen.insert(token.clone()) {
                tokens.push(token);
            }
        }

        tokens
    }

    /// Normalize an optional field.
    pub fn normalize_opt(&self, field: Option<&str>) -> Vec<String> {
        field.map(|f| self.normalize(f)).unwrap_or_default()
    }

    /// Normalize a batch of documents, keeping input order.
    pub fn normalize_documents(&self, documents: &[TaggedDocument]) -> Vec<NormalizedDocument> {
        documents
            .iter()
            .map(|doc| NormalizedDocument {
                year: doc.year,
                keywords: self.normalize(&doc.keywords),
            })
            .collect()
    }
}
