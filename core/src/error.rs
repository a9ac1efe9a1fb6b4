use std::io;
use std::path::PathBuf;
use thiserror::Error;

use crate::{DocId, TermId};

/// A document (or directory) handed out by a document source could not be read.
#[derive(Error, Debug)]
#[error("could not read {path}: {source}")]
pub struct SourceReadError {
    pub path: PathBuf,
    #[source]
    pub source: io::Error,
}

impl SourceReadError {
    pub fn new(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self { path: path.into(), source }
    }
}

/// The specific way an index file failed validation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Corruption {
    #[error("file truncated: need {needed} bytes, have {available}")]
    Truncated { needed: u64, available: u64 },

    #[error("bad magic bytes {0:?}")]
    BadMagic([u8; 4]),

    #[error("unsupported format version {0}")]
    UnsupportedVersion(u32),

    #[error("directory entry for term {term_id} spans {offset}..{offset}+{len}, outside postings section {start}..{end}")]
    DirectoryOutOfBounds { term_id: TermId, offset: u64, len: u64, start: u64, end: u64 },

    #[error("{what}: header declares {declared}, file holds {actual}")]
    CountMismatch { what: &'static str, declared: u64, actual: u64 },

    #[error("{what} dictionary repeats key {key:?}")]
    DuplicateKey { what: &'static str, key: String },

    #[error("postings for term {term_id} reference unknown document {doc_id}")]
    UnknownDocument { term_id: TermId, doc_id: DocId },

    #[error("postings for term {term_id} are not strictly ordered")]
    UnorderedPostings { term_id: TermId },

    #[error("undecodable section: {0}")]
    Decode(String),
}

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    SourceRead(#[from] SourceReadError),

    #[error("could not write {path}: {source}")]
    StorageWrite {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("could not read {path}: {source}")]
    StorageRead {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("corrupt index: {0}")]
    CorruptIndex(#[from] Corruption),

    #[error("consistency violation: {0}")]
    Consistency(String),

    #[error("{0} identifier space exhausted")]
    IdSpaceExhausted(&'static str),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn write(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| Error::StorageWrite { path, source }
    }

    pub(crate) fn read(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> Error {
        let path = path.into();
        move |source| Error::StorageRead { path, source }
    }
}
