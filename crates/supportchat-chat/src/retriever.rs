//! Keyword retrieval over the document store.
//!
//! A document matches when any query keyword appears, ignoring case, as a
//! literal substring of its title or content. No ranking: the first matches
//! in insertion order win.

use std::sync::Arc;

use regex::{Regex, RegexBuilder};
use tracing::debug;

use supportchat_core::config::RetrievalConfig;
use supportchat_core::types::Document;
use supportchat_storage::DocumentRepository;

use crate::error::ChatError;

/// Finds documents relevant to a user query.
pub struct ContextRetriever {
    documents: Arc<DocumentRepository>,
    max_results: usize,
    min_token_len: usize,
}

impl ContextRetriever {
    pub fn new(documents: Arc<DocumentRepository>, config: &RetrievalConfig) -> Self {
        Self {
            documents,
            max_results: config.max_results,
            min_token_len: config.min_token_len,
        }
    }

    /// Return up to `max_results` documents matching any keyword of `query`.
    ///
    /// A query without keywords returns nothing and never touches the store.
    pub fn retrieve(&self, query: &str) -> Result<Vec<Document>, ChatError> {
        let keywords = extract_keywords(query, self.min_token_len);
        if keywords.is_empty() {
            debug!("No keywords in query, skipping retrieval");
            return Ok(Vec::new());
        }

        let matcher = build_matcher(&keywords)?;
        let docs = self
            .documents
            .find_where(self.max_results, |doc| {
                matcher.is_match(&doc.title) || matcher.is_match(&doc.content)
            })
            .map_err(|e| ChatError::Retrieval(e.to_string()))?;

        debug!(keywords = keywords.len(), matched = docs.len(), "Retrieved context");
        Ok(docs)
    }
}

/// Split on whitespace and keep tokens longer than `min_len` characters.
pub fn extract_keywords(query: &str, min_len: usize) -> Vec<String> {
    query
        .split_whitespace()
        .filter(|token| token.chars().count() > min_len)
        .map(str::to_string)
        .collect()
}

/// Case-insensitive alternation of the escaped keywords.
fn build_matcher(keywords: &[String]) -> Result<Regex, ChatError> {
    let pattern = keywords
        .iter()
        .map(|k| regex::escape(k))
        .collect::<Vec<_>>()
        .join("|");

    RegexBuilder::new(&pattern)
        .case_insensitive(true)
        .build()
        .map_err(|e| ChatError::Retrieval(format!("invalid keyword pattern: {}", e)))
}
