use bsbi::tokenizer::tokenize;
use bsbi::{build_index, read_index, write_index, BuildConfig, Corruption, Error, Index, IndexReader, SourceDocument};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

fn sample_index() -> Index {
    let texts = [
        ("/docs/a.txt", "alpha beta alpha"),
        ("/docs/b.txt", "beta gamma"),
        ("/docs/c.txt", "gamma gamma delta alpha"),
    ];
    let docs = texts.iter().map(|(path, text)| Ok(SourceDocument::new(*path, tokenize(text))));
    build_index(docs, &BuildConfig::with_block_size(2)).unwrap()
}

fn written(dir: &Path) -> (Index, std::path::PathBuf) {
    let index = sample_index();
    let path = dir.join("index.bsbi");
    write_index(&index, &path).unwrap();
    (index, path)
}

fn corruption(path: &Path) -> Corruption {
    match read_index(path) {
        Err(Error::CorruptIndex(c)) => c,
        other => panic!("expected corrupt index, got {other:?}"),
    }
}

#[test]
fn round_trip_preserves_everything() {
    let dir = tempdir().unwrap();
    let (index, path) = written(dir.path());
    let back = read_index(&path).unwrap();
    assert_eq!(back, index);
    assert_eq!(back.documents.key(2), Some("/docs/c.txt"));
    assert_eq!(back.postings("gamma").unwrap()[1].frequency, 2);
}

#[test]
fn empty_index_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("empty.bsbi");
    write_index(&Index::new(), &path).unwrap();
    assert_eq!(read_index(&path).unwrap(), Index::new());
}

#[test]
fn reader_fetches_single_terms() {
    let dir = tempdir().unwrap();
    let (index, path) = written(dir.path());
    let reader = IndexReader::open(&path).unwrap();
    assert_eq!(reader.terms(), &index.terms);
    assert_eq!(reader.directory().len(), index.num_terms());
    assert_eq!(reader.postings("beta").unwrap().unwrap(), index.postings("beta").unwrap());
    assert!(reader.postings("omega").unwrap().is_none());
    assert!(reader.postings_for_id(99).unwrap().is_none());
}

#[test]
fn rewriting_replaces_the_previous_index() {
    let dir = tempdir().unwrap();
    let (_, path) = written(dir.path());
    write_index(&Index::new(), &path).unwrap();
    assert_eq!(read_index(&path).unwrap(), Index::new());
    // only the published file remains, no temporary leftovers
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[test]
fn truncated_files_are_detected() {
    let dir = tempdir().unwrap();
    let (_, path) = written(dir.path());
    let bytes = fs::read(&path).unwrap();

    fs::write(&path, &bytes[..bytes.len() - 5]).unwrap();
    assert!(matches!(corruption(&path), Corruption::Truncated { .. }));

    fs::write(&path, &bytes[..20]).unwrap();
    assert!(matches!(corruption(&path), Corruption::Truncated { needed: 48, available: 20 }));

    fs::write(&path, &bytes[..60]).unwrap();
    assert!(matches!(corruption(&path), Corruption::Truncated { .. }));
}

#[test]
fn directory_pointing_outside_the_postings_is_detected() {
    let dir = tempdir().unwrap();
    let (_, path) = written(dir.path());
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 16;
    let out_of_bounds = bytes.len() as u64 * 4;
    bytes[last..last + 8].copy_from_slice(&out_of_bounds.to_le_bytes());
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(corruption(&path), Corruption::DirectoryOutOfBounds { term_id: 3, .. }));
}

#[test]
fn count_mismatches_are_detected() {
    let dir = tempdir().unwrap();
    let (_, path) = written(dir.path());
    let original = fs::read(&path).unwrap();

    // header claims one more document than the dictionary holds
    let mut bytes = original.clone();
    bytes[16..24].copy_from_slice(&4u64.to_le_bytes());
    fs::write(&path, &bytes).unwrap();
    assert_eq!(corruption(&path), Corruption::CountMismatch { what: "documents", declared: 4, actual: 3 });

    // a stray directory entry past the declared term count
    let mut bytes = original;
    bytes.extend_from_slice(&[0u8; 16]);
    fs::write(&path, &bytes).unwrap();
    assert!(matches!(corruption(&path), Corruption::CountMismatch { what: "directory entries", .. }));
}

#[test]
fn foreign_files_are_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("not-an-index");
    fs::write(&path, vec![b'x'; 64]).unwrap();
    assert_eq!(corruption(&path), Corruption::BadMagic(*b"xxxx"));
}

#[test]
fn missing_files_are_read_errors() {
    let dir = tempdir().unwrap();
    let err = read_index(&dir.path().join("nope.bsbi")).unwrap_err();
    assert!(matches!(err, Error::StorageRead { .. }));
}

#[test]
fn unwritable_destination_leaves_nothing_behind() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("missing-subdir").join("index.bsbi");
    let err = write_index(&sample_index(), &path).unwrap_err();
    assert!(matches!(err, Error::StorageWrite { .. }));
    assert!(!path.exists());
}

#[test]
fn inconsistent_index_is_not_written() {
    let dir = tempdir().unwrap();
    let mut index = sample_index();
    index.postings.pop();
    let path = dir.path().join("index.bsbi");
    assert!(matches!(write_index(&index, &path), Err(Error::Consistency(_))));
    assert!(!path.exists());
}

#[test]
fn concurrent_lookups_return_the_right_lists() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("wide.bsbi");
    let docs = (0..200).map(|i| {
        let text = format!("w{} w{} w{} shared", i % 37, i % 11, i % 5);
        Ok(SourceDocument::new(format!("/docs/{i}.txt"), tokenize(&text)))
    });
    let index = build_index(docs, &BuildConfig::with_block_size(64)).unwrap();
    write_index(&index, &path).unwrap();
    let reader = IndexReader::open(&path).unwrap();

    std::thread::scope(|s| {
        for worker in 0..8u32 {
            let (reader, index) = (&reader, &index);
            s.spawn(move || {
                for round in 0..500u32 {
                    let term_id = (worker * 7 + round) % index.num_terms() as u32;
                    let list = reader.postings_for_id(term_id).unwrap().unwrap();
                    assert_eq!(list, index.postings_for_id(term_id).unwrap());
                }
            });
        }
    });
}
