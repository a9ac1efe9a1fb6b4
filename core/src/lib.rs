//! Block sort-based inverted indexing.
//!
//! Documents are folded into bounded-memory blocks ([`block`]), each block is
//! spilled as a sorted run ([`run`]), the runs are k-way merged ([`merge`]) and
//! the result is persisted as a single file ([`store`]). [`postings`] answers
//! boolean and proximity queries over the decoded lists.

pub mod block;
pub mod build;
pub mod config;
pub mod dictionary;
pub mod error;
mod index;
pub mod merge;
pub mod postings;
pub mod run;
pub mod store;
pub mod tokenizer;

pub use build::{build_index, build_index_with_report, BuildReport, SourceDocument};
pub use config::{BuildConfig, SourceErrorPolicy};
pub use dictionary::Dictionary;
pub use error::{Corruption, Error, Result, SourceReadError};
pub use index::{DocId, Index, Position, Posting, PostingList, TermId};
pub use postings::{intersect, intersect_many, positional_intersect, ProximityMatch};
pub use store::{read_index, write_index, IndexReader};
