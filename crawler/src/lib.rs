//! Document sources for the indexer: a lazy directory walk and a background
//! feed that reads ahead on its own thread.

use bsbi::tokenizer::{tokenize, tokenize_stemmed};
use bsbi::{SourceDocument, SourceReadError};
use std::fs;
use std::io;
use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::thread::{self, JoinHandle};
use walkdir::WalkDir;

pub type SourceItem = Result<SourceDocument, SourceReadError>;

#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlOptions {
    /// Descend into subdirectories instead of reading only the root's files.
    pub recursive: bool,
    /// Stem terms (English) after normalization.
    pub stem: bool,
}

/// Walks a file or directory in file-name order, yielding each regular file
/// as a tokenized document. Unreadable entries come out as errors in their
/// place in the walk; whether to stop is the consumer's call.
pub struct DirectorySource {
    walker: walkdir::IntoIter,
    tokenizer: fn(&str) -> Vec<String>,
}

impl DirectorySource {
    pub fn new(root: impl AsRef<Path>, options: CrawlOptions) -> Self {
        let mut walk = WalkDir::new(root).sort_by_file_name();
        if !options.recursive {
            walk = walk.max_depth(1);
        }
        let tokenizer: fn(&str) -> Vec<String> = if options.stem { tokenize_stemmed } else { tokenize };
        Self { walker: walk.into_iter(), tokenizer }
    }
}

impl Iterator for DirectorySource {
    type Item = SourceItem;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => return Some(Err(walk_error(err))),
            };
            if entry.file_type().is_file() {
                return Some(read_document(entry.path(), self.tokenizer));
            }
        }
    }
}

fn read_document(path: &Path, tokenizer: fn(&str) -> Vec<String>) -> SourceItem {
    let bytes = fs::read(path).map_err(|e| SourceReadError::new(path, e))?;
    let terms = tokenizer(&String::from_utf8_lossy(&bytes));
    tracing::trace!(path = %path.display(), terms = terms.len(), "read document");
    Ok(SourceDocument::new(path.to_string_lossy(), terms))
}

fn walk_error(err: walkdir::Error) -> SourceReadError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let message = err.to_string();
    let source = err.into_io_error().unwrap_or_else(|| io::Error::new(io::ErrorKind::Other, message));
    SourceReadError { path, source }
}

/// Receiving end of [`spawn_feed`]. Items arrive in exactly the order the
/// source produced them.
pub struct Feed {
    receiver: Receiver<SourceItem>,
    handle: Option<JoinHandle<()>>,
}

/// Drains `source` on a background thread into a bounded channel holding at
/// most `capacity` documents. Dropping the feed stops the thread at its next send.
pub fn spawn_feed<I>(source: I, capacity: usize) -> io::Result<Feed>
where
    I: Iterator<Item = SourceItem> + Send + 'static,
{
    let (tx, receiver) = mpsc::sync_channel(capacity.max(1));
    let handle = thread::Builder::new().name("crawler-feed".into()).spawn(move || {
        for item in source {
            if tx.send(item).is_err() {
                break;
            }
        }
    })?;
    Ok(Feed { receiver, handle: Some(handle) })
}

impl Iterator for Feed {
    type Item = SourceItem;

    fn next(&mut self) -> Option<Self::Item> {
        match self.receiver.recv() {
            Ok(item) => Some(item),
            Err(_) => {
                if let Some(handle) = self.handle.take() {
                    if handle.join().is_err() {
                        tracing::error!("document feed thread panicked");
                    }
                }
                None
            }
        }
    }
}
