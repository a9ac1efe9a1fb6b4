use serde::Serialize;

use crate::block::{BlockBuilder, Blocks, FinishedBlocks};
use crate::config::{BuildConfig, SourceErrorPolicy};
use crate::error::{Error, Result, SourceReadError};
use crate::merge::RunMerger;
use crate::run::RunEntry;
use crate::{Index, PostingList, TermId};

/// One document as handed over by a document source: its path and its
/// already-normalized terms in reading order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceDocument {
    pub path: String,
    pub terms: Vec<String>,
}

impl SourceDocument {
    pub fn new(path: impl Into<String>, terms: Vec<String>) -> Self {
        Self { path: path.into(), terms }
    }
}

/// What a build did, beyond the index itself.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildReport {
    pub documents: usize,
    pub skipped: usize,
    pub terms: usize,
    pub runs: usize,
}

pub fn build_index<I>(documents: I, config: &BuildConfig) -> Result<Index>
where
    I: IntoIterator<Item = std::result::Result<SourceDocument, SourceReadError>>,
{
    build_index_with_report(documents, config).map(|(index, _)| index)
}

/// Runs the whole pipeline: block building over `documents`, then the merge.
/// Run files live in a scratch directory that is removed when this returns,
/// whether or not the build succeeded.
pub fn build_index_with_report<I>(documents: I, config: &BuildConfig) -> Result<(Index, BuildReport)>
where
    I: IntoIterator<Item = std::result::Result<SourceDocument, SourceReadError>>,
{
    let mut builder = BlockBuilder::new(config);
    let mut skipped = 0usize;
    for doc in documents {
        match doc {
            Ok(doc) => {
                builder.ingest(&doc.path, &doc.terms)?;
            }
            Err(err) => match config.on_source_error {
                SourceErrorPolicy::Abort => return Err(err.into()),
                SourceErrorPolicy::Skip => {
                    tracing::warn!(path = %err.path.display(), error = %err.source, "skipping unreadable document");
                    skipped += 1;
                }
            },
        }
    }

    let finished = builder.finish()?;
    let runs = match &finished.blocks {
        Blocks::Spilled(store) => store.len(),
        Blocks::InMemory(_) => 0,
    };
    tracing::info!(docs = finished.documents.len(), terms = finished.terms.len(), runs, "merging blocks");
    let index = merge_blocks(finished)?;
    let report = BuildReport { documents: index.num_docs(), skipped, terms: index.num_terms(), runs };
    Ok((index, report))
}

fn merge_blocks(finished: FinishedBlocks) -> Result<Index> {
    let FinishedBlocks { terms, documents, blocks } = finished;
    let postings = match blocks {
        Blocks::InMemory(entries) => {
            let stream = entries.into_iter().map(Ok::<RunEntry, Error>);
            collect_postings(RunMerger::new(vec![stream])?, terms.len())?
        }
        Blocks::Spilled(store) => collect_postings(RunMerger::new(store.open_all()?)?, terms.len())?,
    };
    Ok(Index { terms, documents, postings })
}

// Every interned term occurs at least once, so the merge must yield exactly
// term ids 0..num_terms in order.
fn collect_postings<I>(merged: I, num_terms: usize) -> Result<Vec<PostingList>>
where
    I: Iterator<Item = Result<(TermId, PostingList)>>,
{
    let mut postings = Vec::with_capacity(num_terms);
    for item in merged {
        let (term_id, list) = item?;
        if term_id as usize != postings.len() {
            return Err(Error::Consistency(format!(
                "merge produced term {term_id} where term {} was expected",
                postings.len()
            )));
        }
        postings.push(list);
    }
    if postings.len() != num_terms {
        return Err(Error::Consistency(format!(
            "{num_terms} terms interned but only {} have postings",
            postings.len()
        )));
    }
    Ok(postings)
}
