/*
    search_index.rs - Full-text lookup over stored records

    Inverted index from lowercased whitespace-delimited tokens to the set of
    record ids whose top-level text fields contain them. Built from plaintext
    at store time; the vault only ever persists it encrypted.

    Maintenance rules:
    - re-indexing an id replaces its previous token set, so overwritten
      content does not leave stale tokens behind
    - a token whose id set becomes empty is removed
    - queries are OR across tokens
*/

use crate::core_vault::model::{Document, RecordId};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// A token extracted from record content
pub type Token = String;

/// Persisted form: token -> ordered list of record ids
pub type IndexLists = BTreeMap<Token, Vec<RecordId>>;

/// In-memory inverted index
#[derive(Debug, Clone, Default)]
pub struct SearchIndex {
    /// Inverted index: token -> set of record IDs
    index: BTreeMap<Token, BTreeSet<RecordId>>,

    /// Reverse map so an id's old tokens can be dropped on re-index
    record_tokens: HashMap<RecordId, BTreeSet<Token>>,
}

impl SearchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index a record's content, replacing anything indexed for the id before
    pub fn index(&mut self, id: &RecordId, content: &Document) {
        self.remove(id);

        let tokens = Self::document_tokens(content);
        if tokens.is_empty() {
            return;
        }

        for token in &tokens {
            self.index
                .entry(token.clone())
                .or_default()
                .insert(id.clone());
        }
        self.record_tokens.insert(id.clone(), tokens);
    }

    /// Remove a record from the index. Returns whether it was indexed.
    pub fn remove(&mut self, id: &RecordId) -> bool {
        let Some(tokens) = self.record_tokens.remove(id) else {
            return false;
        };

        for token in &tokens {
            if let Some(ids) = self.index.get_mut(token) {
                ids.remove(id);
                if ids.is_empty() {
                    self.index.remove(token);
                }
            }
        }
        true
    }

    /// Ids of records containing any query token
    pub fn search(&self, query: &str) -> BTreeSet<RecordId> {
        Self::tokenize(query)
            .iter()
            .filter_map(|token| self.index.get(token))
            .flatten()
            .cloned()
            .collect()
    }

    /// Tokens currently indexed for a record
    pub fn tokens_for(&self, id: &RecordId) -> Option<&BTreeSet<Token>> {
        self.record_tokens.get(id)
    }

    pub fn contains_token(&self, token: &str) -> bool {
        self.index.contains_key(token)
    }

    /// Replace the whole index with one built from `records`
    pub fn rebuild<'a, I>(&mut self, records: I)
    where
        I: IntoIterator<Item = (&'a RecordId, &'a Document)>,
    {
        self.clear();
        for (id, content) in records {
            self.index(id, content);
        }
    }

    /// Drop ids for which `keep` is false. Returns how many ids were dropped.
    pub fn retain_records<F>(&mut self, keep: F) -> usize
    where
        F: Fn(&RecordId) -> bool,
    {
        let dangling: Vec<RecordId> = self
            .record_tokens
            .keys()
            .filter(|id| !keep(id))
            .cloned()
            .collect();

        for id in &dangling {
            self.remove(id);
        }
        dangling.len()
    }

    /// Tokenize text into search tokens
    pub fn tokenize(text: &str) -> BTreeSet<Token> {
        text.to_lowercase()
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }

    fn document_tokens(content: &Document) -> BTreeSet<Token> {
        content
            .text_fields()
            .flat_map(|(_, text)| Self::tokenize(text))
            .collect()
    }

    /// Ordered-list form for persistence
    pub fn to_lists(&self) -> IndexLists {
        self.index
            .iter()
            .map(|(token, ids)| (token.clone(), ids.iter().cloned().collect()))
            .collect()
    }

    /// Restore from the persisted form. Empty lists are skipped.
    pub fn from_lists(lists: IndexLists) -> Self {
        let mut index = SearchIndex::new();
        for (token, ids) in lists {
            if ids.is_empty() {
                continue;
            }
            for id in &ids {
                index
                    .record_tokens
                    .entry(id.clone())
                    .or_default()
                    .insert(token.clone());
            }
            index.index.insert(token, ids.into_iter().collect());
        }
        index
    }

    /// Get statistics about the index
    pub fn stats(&self) -> IndexStats {
        IndexStats {
            total_tokens: self.index.len(),
            indexed_records: self.record_tokens.len(),
        }
    }

    /// Clear the entire index
    pub fn clear(&mut self) {
        self.index.clear();
        self.record_tokens.clear();
    }
}

/// Index statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexStats {
    pub total_tokens: usize,
    pub indexed_records: usize,
}
