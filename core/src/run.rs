//! Sorted run files. Each run is one flushed block:
//! `b"BRUN"`, a little-endian `u64` entry count, then that many bincode
//! `RunEntry` records ordered by `(term_id, doc_id)`.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

use crate::error::{Error, Result};
use crate::{DocId, Posting, TermId};

const RUN_MAGIC: &[u8; 4] = b"BRUN";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunEntry {
    pub term_id: TermId,
    pub posting: Posting,
}

impl RunEntry {
    pub fn key(&self) -> (TermId, DocId) { (self.term_id, self.posting.doc_id) }
}

pub(crate) fn bincode_io(err: bincode::Error) -> io::Error {
    match *err {
        bincode::ErrorKind::Io(e) => e,
        other => io::Error::new(io::ErrorKind::InvalidData, other.to_string()),
    }
}

/// Scratch directory owning every run of one build. Dropping it removes the
/// runs, which is also how a failed build discards its partial output.
pub struct RunStore {
    dir: TempDir,
    runs: Vec<PathBuf>,
}

impl RunStore {
    pub fn new(parent: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("bsbi-runs-");
        let dir = match parent {
            Some(parent) => builder.tempdir_in(parent).map_err(Error::write(parent))?,
            None => builder.tempdir().map_err(Error::write(std::env::temp_dir()))?,
        };
        Ok(Self { dir, runs: Vec::new() })
    }

    pub fn path(&self) -> &Path { self.dir.path() }

    pub fn runs(&self) -> &[PathBuf] { &self.runs }

    pub fn len(&self) -> usize { self.runs.len() }

    pub fn is_empty(&self) -> bool { self.runs.is_empty() }

    /// Writes `entries`, which must already be sorted, as the next run.
    pub fn write_run(&mut self, entries: &[RunEntry]) -> Result<&Path> {
        let path = self.dir.path().join(format!("run-{:05}.bin", self.runs.len()));
        write_entries(&path, entries).map_err(Error::write(&path))?;
        self.runs.push(path);
        Ok(self.runs[self.runs.len() - 1].as_path())
    }

    pub fn open_all(&self) -> Result<Vec<RunReader>> {
        self.runs.iter().map(|path| RunReader::open(path)).collect()
    }
}

fn write_entries(path: &Path, entries: &[RunEntry]) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    w.write_all(RUN_MAGIC)?;
    w.write_all(&(entries.len() as u64).to_le_bytes())?;
    for entry in entries {
        bincode::serialize_into(&mut w, entry).map_err(bincode_io)?;
    }
    w.flush()
}

/// Streams the entries of one run file, holding a single record at a time.
pub struct RunReader {
    path: PathBuf,
    reader: BufReader<File>,
    remaining: u64,
}

impl RunReader {
    pub fn open(path: &Path) -> Result<Self> {
        let mut reader = BufReader::new(File::open(path).map_err(Error::read(path))?);
        let mut header = [0u8; 12];
        reader.read_exact(&mut header).map_err(Error::read(path))?;
        if &header[..4] != RUN_MAGIC {
            let err = io::Error::new(io::ErrorKind::InvalidData, "not a run file");
            return Err(Error::read(path)(err));
        }
        let mut count = [0u8; 8];
        count.copy_from_slice(&header[4..]);
        Ok(Self { path: path.to_path_buf(), reader, remaining: u64::from_le_bytes(count) })
    }

    pub fn remaining(&self) -> u64 { self.remaining }
}

impl Iterator for RunReader {
    type Item = Result<RunEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        self.remaining -= 1;
        match bincode::deserialize_from(&mut self.reader) {
            Ok(entry) => Some(Ok(entry)),
            Err(err) => {
                self.remaining = 0;
                Some(Err(Error::read(&self.path)(bincode_io(err))))
            }
        }
    }
}
