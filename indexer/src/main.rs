use anyhow::{bail, Context, Result};
use bsbi::store::FORMAT_VERSION;
use bsbi::tokenizer::{tokenize, tokenize_stemmed};
use bsbi::{build_index_with_report, intersect_many, positional_intersect, write_index, BuildConfig, IndexReader, PostingList, SourceErrorPolicy};
use clap::{Parser, Subcommand};
use crawler::{spawn_feed, CrawlOptions, DirectorySource};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "indexer")]
#[command(about = "Build and query a block sort-based positional inverted index", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Index a file or directory into a single index file
    Build {
        /// Input path (file or directory)
        #[arg(long)]
        input: PathBuf,
        /// Output index file
        #[arg(long)]
        output: PathBuf,
        /// Occurrences buffered per block before spilling a sorted run
        #[arg(long, default_value_t = 1_000_000)]
        block_size: usize,
        /// Descend into subdirectories
        #[arg(short, long, default_value_t = false)]
        recursive: bool,
        /// Stop at the first unreadable file or directory instead of skipping it
        #[arg(short, long, default_value_t = false)]
        abort: bool,
        /// Apply English stemming to terms
        #[arg(long, default_value_t = false)]
        stem: bool,
        /// Directory for temporary run files
        #[arg(long)]
        run_dir: Option<PathBuf>,
        /// Documents read ahead of the indexer
        #[arg(long, default_value_t = 64)]
        feed_capacity: usize,
    },
    /// Find documents containing all terms, or two terms within a distance
    Query {
        /// Index file
        #[arg(long)]
        index: PathBuf,
        /// Query terms, normalized the same way as at build time
        #[arg(required = true)]
        terms: Vec<String>,
        /// Report positions where the two terms occur at most this far apart
        #[arg(long)]
        within: Option<u32>,
        /// Stem query terms (use when the index was built with --stem)
        #[arg(long, default_value_t = false)]
        stem: bool,
    },
    /// Print dictionary sizes of an index file
    Stats {
        #[arg(long)]
        index: PathBuf,
    },
}

#[derive(Debug, Serialize)]
struct MetaFile {
    version: u32,
    num_docs: usize,
    num_terms: usize,
    block_size: usize,
    runs: usize,
    skipped: usize,
    created_at: String,
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Build { input, output, block_size, recursive, abort, stem, run_dir, feed_capacity } => {
            let on_source_error = if abort { SourceErrorPolicy::Abort } else { SourceErrorPolicy::Skip };
            let config = BuildConfig { block_size, on_source_error, run_dir };
            build(&input, &output, &config, CrawlOptions { recursive, stem }, feed_capacity)
        }
        Commands::Query { index, terms, within, stem } => query(&index, &terms, within, stem),
        Commands::Stats { index } => stats(&index),
    }
}

fn build(input: &Path, output: &Path, config: &BuildConfig, options: CrawlOptions, feed_capacity: usize) -> Result<()> {
    let root = input.canonicalize().with_context(|| format!("input {}", input.display()))?;
    tracing::info!(input = %root.display(), block_size = config.block_size, recursive = options.recursive, "building index");

    let feed = spawn_feed(DirectorySource::new(&root, options), feed_capacity)?;
    let (index, report) = build_index_with_report(feed, config)?;
    write_index(&index, output)?;

    let meta = MetaFile {
        version: FORMAT_VERSION,
        num_docs: report.documents,
        num_terms: report.terms,
        block_size: config.block_size,
        runs: report.runs,
        skipped: report.skipped,
        created_at: time::OffsetDateTime::now_utc().format(&time::format_description::well_known::Rfc3339).unwrap_or_else(|_| "".into()),
    };
    save_meta(output, &meta)?;

    tracing::info!(output = %output.display(), docs = report.documents, terms = report.terms, runs = report.runs, skipped = report.skipped, "index build complete");
    Ok(())
}

fn meta_path(index: &Path) -> PathBuf {
    let mut name = index.as_os_str().to_owned();
    name.push(".meta.json");
    PathBuf::from(name)
}

fn save_meta(index: &Path, meta: &MetaFile) -> Result<()> {
    let mut f = File::create(meta_path(index))?;
    let json = serde_json::to_string_pretty(meta)?;
    f.write_all(json.as_bytes())?;
    Ok(())
}

fn query(index: &Path, raw_terms: &[String], within: Option<u32>, stem: bool) -> Result<()> {
    let reader = IndexReader::open(index)?;
    let normalize = if stem { tokenize_stemmed } else { tokenize };
    let terms: Vec<String> = raw_terms.iter().flat_map(|t| normalize(t)).collect();
    if terms.is_empty() {
        bail!("query has no terms left after normalization");
    }

    let mut lists: Vec<PostingList> = Vec::with_capacity(terms.len());
    for term in &terms {
        match reader.postings(term)? {
            Some(list) => lists.push(list),
            None => {
                tracing::info!(term = %term, "term not in index");
                return Ok(());
            }
        }
    }

    let path_of = |doc_id: u32| reader.documents().key(doc_id).unwrap_or("?").to_string();
    match within {
        Some(k) => {
            if lists.len() != 2 {
                bail!("--within needs exactly two terms, got {}", lists.len());
            }
            for hit in positional_intersect(&lists[0], &lists[1], k) {
                println!("{}\t{}\t{}", path_of(hit.doc_id), hit.left, hit.right);
            }
        }
        None => {
            let slices: Vec<&[bsbi::Posting]> = lists.iter().map(Vec::as_slice).collect();
            for doc_id in intersect_many(&slices) {
                println!("{}", path_of(doc_id));
            }
        }
    }
    Ok(())
}

fn stats(index: &Path) -> Result<()> {
    let reader = IndexReader::open(index)?;
    let postings_bytes: u64 = reader.directory().iter().map(|e| e.len).sum();
    println!("documents\t{}", reader.documents().len());
    println!("terms\t{}", reader.terms().len());
    println!("postings_bytes\t{}", postings_bytes);
    Ok(())
}
