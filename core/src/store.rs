//! Single-file index format (version 1).
//!
//! ```text
//! 0   magic "BSBI" | version u32 | term_count u64 | doc_count u64
//! 24  docs_offset u64 | postings_offset u64 | directory_offset u64
//! 48  term dictionary   bincode Vec<String>, TermID order
//!     doc dictionary    bincode Vec<String>, DocID order
//!     posting lists     bincode Vec<Posting>, one per term
//!     directory         term_count x (offset u64, len u64)
//! ```
//! Integers are little-endian. The directory lets a reader fetch one term's
//! postings with a single seek.

use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use crate::dictionary::Dictionary;
use crate::error::{Corruption, Error, Result};
use crate::run::bincode_io;
use crate::{DocId, Index, PostingList, TermId};

const MAGIC: &[u8; 4] = b"BSBI";
pub const FORMAT_VERSION: u32 = 1;
const HEADER_LEN: u64 = 48;
const DIRECTORY_ENTRY_LEN: u64 = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Header {
    term_count: u64,
    doc_count: u64,
    docs_offset: u64,
    postings_offset: u64,
    directory_offset: u64,
}

impl Header {
    fn encode(&self) -> [u8; HEADER_LEN as usize] {
        let mut out = [0u8; HEADER_LEN as usize];
        out[0..4].copy_from_slice(MAGIC);
        out[4..8].copy_from_slice(&FORMAT_VERSION.to_le_bytes());
        let fields = [self.term_count, self.doc_count, self.docs_offset, self.postings_offset, self.directory_offset];
        for (i, field) in fields.iter().enumerate() {
            let at = 8 + i * 8;
            out[at..at + 8].copy_from_slice(&field.to_le_bytes());
        }
        out
    }

    fn decode(raw: &[u8; HEADER_LEN as usize]) -> Result<Self> {
        let mut magic = [0u8; 4];
        magic.copy_from_slice(&raw[0..4]);
        if &magic != MAGIC {
            return Err(Corruption::BadMagic(magic).into());
        }
        let version = u32::from_le_bytes([raw[4], raw[5], raw[6], raw[7]]);
        if version != FORMAT_VERSION {
            return Err(Corruption::UnsupportedVersion(version).into());
        }
        let field = |i: usize| {
            let mut buf = [0u8; 8];
            buf.copy_from_slice(&raw[8 + i * 8..16 + i * 8]);
            u64::from_le_bytes(buf)
        };
        Ok(Self {
            term_count: field(0),
            doc_count: field(1),
            docs_offset: field(2),
            postings_offset: field(3),
            directory_offset: field(4),
        })
    }

    fn validate(&self, file_len: u64) -> Result<()> {
        let ordered = HEADER_LEN <= self.docs_offset
            && self.docs_offset <= self.postings_offset
            && self.postings_offset <= self.directory_offset;
        if !ordered {
            return Err(Corruption::Decode("section offsets out of order".into()).into());
        }
        if self.directory_offset > file_len {
            return Err(Corruption::Truncated { needed: self.directory_offset, available: file_len }.into());
        }
        let expected = self.term_count.checked_mul(DIRECTORY_ENTRY_LEN).ok_or(Corruption::CountMismatch {
            what: "directory entries",
            declared: self.term_count,
            actual: (file_len - self.directory_offset) / DIRECTORY_ENTRY_LEN,
        })?;
        let actual = file_len - self.directory_offset;
        if actual < expected {
            return Err(Corruption::Truncated { needed: self.directory_offset + expected, available: file_len }.into());
        }
        if actual > expected {
            return Err(Corruption::CountMismatch {
                what: "directory entries",
                declared: self.term_count,
                actual: actual / DIRECTORY_ENTRY_LEN,
            }
            .into());
        }
        Ok(())
    }
}

/// Where one term's encoded posting list lives in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectoryEntry {
    pub offset: u64,
    pub len: u64,
}

/// Writes `index` to `path`. The bytes go to a temporary file beside `path`
/// first, which is renamed over `path` only once complete.
pub fn write_index(index: &Index, path: &Path) -> Result<()> {
    if index.postings.len() != index.terms.len() {
        return Err(Error::Consistency(format!(
            "{} terms but {} posting lists",
            index.terms.len(),
            index.postings.len()
        )));
    }
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let tmp = NamedTempFile::new_in(dir).map_err(Error::write(dir))?;
    let header = write_sections(index, tmp.as_file()).map_err(Error::write(tmp.path()))?;
    tmp.persist(path).map_err(|e| Error::write(path)(e.error))?;
    tracing::info!(
        path = %path.display(),
        terms = header.term_count,
        docs = header.doc_count,
        bytes = header.directory_offset + header.term_count * DIRECTORY_ENTRY_LEN,
        "index written"
    );
    Ok(())
}

fn write_sections(index: &Index, file: &File) -> io::Result<Header> {
    let mut w = BufWriter::new(file);
    w.write_all(&[0u8; HEADER_LEN as usize])?;

    let terms = bincode::serialize(index.terms.keys()).map_err(bincode_io)?;
    w.write_all(&terms)?;
    let docs_offset = HEADER_LEN + terms.len() as u64;
    let docs = bincode::serialize(index.documents.keys()).map_err(bincode_io)?;
    w.write_all(&docs)?;
    let postings_offset = docs_offset + docs.len() as u64;

    let mut directory = Vec::with_capacity(index.postings.len());
    let mut offset = postings_offset;
    for list in &index.postings {
        let bytes = bincode::serialize(list).map_err(bincode_io)?;
        w.write_all(&bytes)?;
        directory.push(DirectoryEntry { offset, len: bytes.len() as u64 });
        offset += bytes.len() as u64;
    }
    for entry in &directory {
        w.write_all(&entry.offset.to_le_bytes())?;
        w.write_all(&entry.len.to_le_bytes())?;
    }

    let header = Header {
        term_count: index.terms.len() as u64,
        doc_count: index.documents.len() as u64,
        docs_offset,
        postings_offset,
        directory_offset: offset,
    };
    w.seek(SeekFrom::Start(0))?;
    w.write_all(&header.encode())?;
    w.flush()?;
    w.get_ref().sync_all()?;
    Ok(header)
}

/// Reads and validates the whole index.
pub fn read_index(path: &Path) -> Result<Index> {
    IndexReader::open(path)?.into_index()
}

/// An open index file. Opening loads the dictionaries and the directory;
/// posting lists are read on demand. Lookups may run from several threads.
pub struct IndexReader {
    path: PathBuf,
    file: Mutex<File>,
    terms: Dictionary,
    documents: Dictionary,
    directory: Vec<DirectoryEntry>,
}

impl IndexReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut file = File::open(path).map_err(Error::read(path))?;
        let file_len = file.metadata().map_err(Error::read(path))?.len();
        if file_len < HEADER_LEN {
            return Err(Corruption::Truncated { needed: HEADER_LEN, available: file_len }.into());
        }
        let mut raw = [0u8; HEADER_LEN as usize];
        file.read_exact(&mut raw).map_err(Error::read(path))?;
        let header = Header::decode(&raw)?;
        header.validate(file_len)?;

        let bytes = read_range(&file, path, HEADER_LEN, header.docs_offset - HEADER_LEN)?;
        let terms = decode_dictionary(&bytes, "terms", header.term_count)?;
        let bytes = read_range(&file, path, header.docs_offset, header.postings_offset - header.docs_offset)?;
        let documents = decode_dictionary(&bytes, "documents", header.doc_count)?;

        let bytes = read_range(&file, path, header.directory_offset, header.term_count * DIRECTORY_ENTRY_LEN)?;
        let mut directory = Vec::with_capacity(terms.len());
        for (term_id, chunk) in bytes.chunks_exact(DIRECTORY_ENTRY_LEN as usize).enumerate() {
            let mut offset = [0u8; 8];
            let mut len = [0u8; 8];
            offset.copy_from_slice(&chunk[..8]);
            len.copy_from_slice(&chunk[8..]);
            let entry = DirectoryEntry { offset: u64::from_le_bytes(offset), len: u64::from_le_bytes(len) };
            let in_bounds = entry.offset >= header.postings_offset
                && entry.offset.checked_add(entry.len).is_some_and(|end| end <= header.directory_offset);
            if !in_bounds {
                return Err(Corruption::DirectoryOutOfBounds {
                    term_id: term_id as TermId,
                    offset: entry.offset,
                    len: entry.len,
                    start: header.postings_offset,
                    end: header.directory_offset,
                }
                .into());
            }
            directory.push(entry);
        }

        tracing::debug!(path = %path.display(), terms = terms.len(), docs = documents.len(), "index opened");
        Ok(Self { path: path.to_path_buf(), file: Mutex::new(file), terms, documents, directory })
    }

    pub fn terms(&self) -> &Dictionary { &self.terms }

    pub fn documents(&self) -> &Dictionary { &self.documents }

    pub fn directory(&self) -> &[DirectoryEntry] { &self.directory }

    /// Reads one posting list by seeking to its directory entry.
    pub fn postings_for_id(&self, term_id: TermId) -> Result<Option<PostingList>> {
        let Some(entry) = self.directory.get(term_id as usize) else { return Ok(None) };
        let bytes = {
            let file = self.file.lock();
            read_range(&file, &self.path, entry.offset, entry.len)?
        };
        let list: PostingList = decode_exact(&bytes)?;
        self.check_postings(term_id, &list)?;
        Ok(Some(list))
    }

    pub fn postings(&self, term: &str) -> Result<Option<PostingList>> {
        match self.terms.id(term) {
            Some(term_id) => self.postings_for_id(term_id),
            None => Ok(None),
        }
    }

    pub fn into_index(self) -> Result<Index> {
        let mut postings = Vec::with_capacity(self.directory.len());
        for term_id in 0..self.directory.len() as TermId {
            postings.push(self.postings_for_id(term_id)?.unwrap_or_default());
        }
        Ok(Index { terms: self.terms, documents: self.documents, postings })
    }

    fn check_postings(&self, term_id: TermId, list: &PostingList) -> Result<()> {
        let mut prev: Option<DocId> = None;
        for posting in list {
            if posting.doc_id as usize >= self.documents.len() {
                return Err(Corruption::UnknownDocument { term_id, doc_id: posting.doc_id }.into());
            }
            let positions_sorted = posting.positions.windows(2).all(|w| w[0] < w[1]);
            if prev.is_some_and(|p| p >= posting.doc_id) || !positions_sorted {
                return Err(Corruption::UnorderedPostings { term_id }.into());
            }
            prev = Some(posting.doc_id);
        }
        Ok(())
    }
}

fn read_range(file: &File, path: &Path, offset: u64, len: u64) -> Result<Vec<u8>> {
    let mut file = file;
    let len = usize::try_from(len).map_err(|_| Corruption::Decode(format!("section of {len} bytes")))?;
    let mut buf = vec![0u8; len];
    file.seek(SeekFrom::Start(offset)).map_err(Error::read(path))?;
    file.read_exact(&mut buf).map_err(Error::read(path))?;
    Ok(buf)
}

// Decodes `bytes` and insists the value accounts for every byte.
fn decode_exact<T: DeserializeOwned + Serialize>(bytes: &[u8]) -> Result<T> {
    let value: T = bincode::deserialize(bytes).map_err(|e| Corruption::Decode(e.to_string()))?;
    let used = bincode::serialized_size(&value).map_err(|e| Corruption::Decode(e.to_string()))?;
    if used != bytes.len() as u64 {
        return Err(Corruption::Decode(format!("{} trailing bytes", bytes.len() as u64 - used)).into());
    }
    Ok(value)
}

fn decode_dictionary(bytes: &[u8], what: &'static str, declared: u64) -> Result<Dictionary> {
    let keys: Vec<String> = decode_exact(bytes)?;
    if keys.len() as u64 != declared {
        return Err(Corruption::CountMismatch { what, declared, actual: keys.len() as u64 }.into());
    }
    Dictionary::from_keys(keys, what)
}
