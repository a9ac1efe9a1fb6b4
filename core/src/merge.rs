//! K-way merge of sorted runs.
//!
//! A min-heap holds the head entry of every run, keyed by `(term, doc)`. Each
//! call to `next` drains every head belonging to the smallest term, so a term's
//! posting list comes out whole and in document order while the merger itself
//! only ever buffers one entry per run.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::{Error, Result};
use crate::run::RunEntry;
use crate::{DocId, Posting, PostingList, TermId};

struct Head {
    term_id: TermId,
    doc_id: DocId,
    run: usize,
    posting: Posting,
}

impl Head {
    fn key(&self) -> (TermId, DocId, usize) { (self.term_id, self.doc_id, self.run) }
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool { self.key() == other.key() }
}

impl Eq for Head {}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> { Some(self.cmp(other)) }
}

impl Ord for Head {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap; reverse for smallest-first.
        other.key().cmp(&self.key())
    }
}

pub struct RunMerger<S> {
    streams: Vec<S>,
    heap: BinaryHeap<Head>,
    done: bool,
}

impl<S> RunMerger<S>
where
    S: Iterator<Item = Result<RunEntry>>,
{
    pub fn new(streams: Vec<S>) -> Result<Self> {
        let heap = BinaryHeap::with_capacity(streams.len());
        let mut merger = Self { streams, heap, done: false };
        for run in 0..merger.streams.len() {
            merger.advance(run, None)?;
        }
        tracing::debug!(runs = merger.streams.len(), "merge started");
        Ok(merger)
    }

    pub fn runs(&self) -> usize { self.streams.len() }

    // Pulls the next entry of `run` into the heap. An exhausted run simply
    // stops contributing.
    fn advance(&mut self, run: usize, prev: Option<(TermId, DocId)>) -> Result<()> {
        let Some(entry) = self.streams[run].next() else { return Ok(()) };
        let entry = entry?;
        if let Some(prev) = prev {
            if entry.key() <= prev {
                return Err(Error::Consistency(format!(
                    "run {run} is not sorted: {:?} follows {:?}",
                    entry.key(),
                    prev
                )));
            }
        }
        self.heap.push(Head { term_id: entry.term_id, doc_id: entry.posting.doc_id, run, posting: entry.posting });
        Ok(())
    }

    fn pop(&mut self) -> Result<Option<Head>> {
        let Some(head) = self.heap.pop() else { return Ok(None) };
        self.advance(head.run, Some((head.term_id, head.doc_id)))?;
        if let Some(next) = self.heap.peek() {
            // Runs are strictly sorted, so an equal key here came from another run.
            if (next.term_id, next.doc_id) == (head.term_id, head.doc_id) {
                return Err(Error::Consistency(format!(
                    "runs {} and {} both hold postings for term {} in document {}",
                    head.run, next.run, head.term_id, head.doc_id
                )));
            }
        }
        Ok(Some(head))
    }

    fn next_term(&mut self) -> Result<Option<(TermId, PostingList)>> {
        let Some(first) = self.pop()? else { return Ok(None) };
        let term_id = first.term_id;
        let mut list = vec![first.posting];
        while self.heap.peek().is_some_and(|head| head.term_id == term_id) {
            if let Some(head) = self.pop()? {
                list.push(head.posting);
            }
        }
        Ok(Some((term_id, list)))
    }
}

impl<S> Iterator for RunMerger<S>
where
    S: Iterator<Item = Result<RunEntry>>,
{
    type Item = Result<(TermId, PostingList)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.next_term() {
            Ok(Some(term)) => Some(Ok(term)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(err) => {
                self.done = true;
                Some(Err(err))
            }
        }
    }
}
