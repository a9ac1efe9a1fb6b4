use std::path::PathBuf;

use crate::config::BuildConfig;
use crate::dictionary::Dictionary;
use crate::error::{Error, Result};
use crate::run::{RunEntry, RunStore};
use crate::{DocId, Position, Posting, TermId};

// Field order gives the (term, doc, position) sort the runs need.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Occurrence {
    term_id: TermId,
    doc_id: DocId,
    position: Position,
}

/// Output of a finished builder: the dictionaries plus either the spilled runs
/// or, when nothing was ever spilled, the single block still in memory.
pub enum Blocks {
    InMemory(Vec<RunEntry>),
    Spilled(RunStore),
}

pub struct FinishedBlocks {
    pub terms: Dictionary,
    pub documents: Dictionary,
    pub blocks: Blocks,
}

/// Accumulates occurrences for a bounded number of documents and spills each
/// full block as a sorted run. A block is only cut between documents, so every
/// document lives in exactly one run.
pub struct BlockBuilder {
    terms: Dictionary,
    documents: Dictionary,
    buffer: Vec<Occurrence>,
    block_size: usize,
    run_dir: Option<PathBuf>,
    store: Option<RunStore>,
    last_added: Option<DocId>,
}

impl BlockBuilder {
    pub fn new(config: &BuildConfig) -> Self {
        Self {
            terms: Dictionary::new(),
            documents: Dictionary::new(),
            buffer: Vec::new(),
            block_size: config.effective_block_size(),
            run_dir: config.run_dir.clone(),
            store: None,
            last_added: None,
        }
    }

    pub fn terms(&self) -> &Dictionary { &self.terms }

    pub fn documents(&self) -> &Dictionary { &self.documents }

    /// Occurrences waiting in the current block.
    pub fn buffered(&self) -> usize { self.buffer.len() }

    pub fn runs_written(&self) -> usize { self.store.as_ref().map_or(0, RunStore::len) }

    pub fn intern_document(&mut self, path: &str) -> Result<DocId> {
        self.documents.intern(path)
    }

    /// Interns `path` and indexes its terms in one step.
    pub fn ingest<S: AsRef<str>>(&mut self, path: &str, terms: &[S]) -> Result<DocId> {
        let doc_id = self.intern_document(path)?;
        self.add_document(doc_id, terms)?;
        Ok(doc_id)
    }

    /// Appends one occurrence per term, positions counting from zero, and
    /// spills the block if it has reached the configured size. Documents must
    /// arrive in increasing DocID order, each at most once.
    pub fn add_document<S: AsRef<str>>(&mut self, doc_id: DocId, terms: &[S]) -> Result<()> {
        if doc_id as usize >= self.documents.len() {
            return Err(Error::Consistency(format!("document {doc_id} was never interned")));
        }
        if let Some(last) = self.last_added.filter(|&last| doc_id <= last) {
            return Err(Error::Consistency(format!("document {doc_id} added after document {last}")));
        }
        self.last_added = Some(doc_id);
        self.buffer.reserve(terms.len());
        for (position, term) in terms.iter().enumerate() {
            let position = Position::try_from(position).map_err(|_| Error::IdSpaceExhausted("position"))?;
            let term_id = self.terms.intern(term.as_ref())?;
            self.buffer.push(Occurrence { term_id, doc_id, position });
        }
        if self.buffer.len() >= self.block_size {
            self.flush()?;
        }
        Ok(())
    }

    /// Sorts and writes the current block as a run. An empty block writes nothing.
    pub fn flush(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let occurrences = self.buffer.len();
        let entries = aggregate(std::mem::take(&mut self.buffer));
        let store = match self.store.take() {
            Some(store) => store,
            None => RunStore::new(self.run_dir.as_deref())?,
        };
        let store = self.store.insert(store);
        let path = store.write_run(&entries)?;
        tracing::debug!(run = %path.display(), occurrences, postings = entries.len(), "flushed block");
        Ok(())
    }

    pub fn finish(mut self) -> Result<FinishedBlocks> {
        let blocks = if let Some(mut store) = self.store.take() {
            if !self.buffer.is_empty() {
                let entries = aggregate(std::mem::take(&mut self.buffer));
                let path = store.write_run(&entries)?;
                tracing::debug!(run = %path.display(), postings = entries.len(), "flushed final block");
            }
            Blocks::Spilled(store)
        } else {
            Blocks::InMemory(aggregate(std::mem::take(&mut self.buffer)))
        };
        Ok(FinishedBlocks { terms: self.terms, documents: self.documents, blocks })
    }
}

/// Sorts occurrences and folds each (term, doc) group into one posting.
fn aggregate(mut occurrences: Vec<Occurrence>) -> Vec<RunEntry> {
    occurrences.sort_unstable();
    let mut entries: Vec<RunEntry> = Vec::new();
    for occ in occurrences {
        match entries.last_mut() {
            Some(last) if last.key() == (occ.term_id, occ.doc_id) => {
                last.posting.frequency += 1;
                if last.posting.positions.last() != Some(&occ.position) {
                    last.posting.positions.push(occ.position);
                }
            }
            _ => entries.push(RunEntry {
                term_id: occ.term_id,
                posting: Posting { doc_id: occ.doc_id, frequency: 1, positions: vec![occ.position] },
            }),
        }
    }
    entries
}
