use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// What the build does when the document source reports an unreadable document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceErrorPolicy {
    /// Fail the whole build on the first unreadable document.
    Abort,
    /// Log the failure and keep going without the document.
    #[default]
    Skip,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    /// Occurrences buffered before a block is sorted and spilled. Checked at
    /// document boundaries, so a single large document may overshoot it.
    pub block_size: usize,
    pub on_source_error: SourceErrorPolicy,
    /// Where temporary run files go; the system temp dir when unset.
    pub run_dir: Option<PathBuf>,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self { block_size: 1_000_000, on_source_error: SourceErrorPolicy::Skip, run_dir: None }
    }
}

impl BuildConfig {
    pub fn with_block_size(block_size: usize) -> Self {
        Self { block_size, ..Self::default() }
    }

    pub(crate) fn effective_block_size(&self) -> usize { self.block_size.max(1) }
}
