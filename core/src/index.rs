use serde::{Deserialize, Serialize};

use crate::dictionary::Dictionary;
use crate::postings::{intersect_many, positional_intersect, ProximityMatch};

pub type TermId = u32;
pub type DocId = u32;
/// Zero-based ordinal of a token within its document.
pub type Position = u32;

/// All occurrences of one term in one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Posting {
    pub doc_id: DocId,
    /// Number of occurrences, counted before duplicate positions collapse.
    pub frequency: u32,
    /// Strictly increasing.
    pub positions: Vec<Position>,
}

/// Postings of one term, strictly ascending by `doc_id`.
pub type PostingList = Vec<Posting>;

/// The finished index: both dictionaries plus one posting list per term, indexed by `TermId`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Index {
    pub terms: Dictionary,
    pub documents: Dictionary,
    pub postings: Vec<PostingList>,
}

impl Index {
    pub fn new() -> Self { Self::default() }

    pub fn num_docs(&self) -> usize { self.documents.len() }

    pub fn num_terms(&self) -> usize { self.terms.len() }

    pub fn postings_for_id(&self, term_id: TermId) -> Option<&[Posting]> {
        self.postings.get(term_id as usize).map(Vec::as_slice)
    }

    pub fn postings(&self, term: &str) -> Option<&[Posting]> {
        self.terms.id(term).and_then(|id| self.postings_for_id(id))
    }

    /// Documents containing every term. An unknown term matches nothing.
    pub fn documents_with_all(&self, terms: &[&str]) -> Vec<DocId> {
        let mut lists = Vec::with_capacity(terms.len());
        for term in terms {
            match self.postings(term) {
                Some(list) => lists.push(list),
                None => return Vec::new(),
            }
        }
        intersect_many(&lists)
    }

    /// Occurrences of `left` within `k` positions of `right`.
    pub fn near(&self, left: &str, right: &str, k: u32) -> Vec<ProximityMatch> {
        match (self.postings(left), self.postings(right)) {
            (Some(p1), Some(p2)) => positional_intersect(p1, p2, k),
            _ => Vec::new(),
        }
    }
}
