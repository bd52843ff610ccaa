//! Batch results and statistics.

use crate::error::FileError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Outcome for one discovered file — success or failure, exactly one per
/// input, created after processing and then never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileResult {
    /// Source file name including extension.
    pub file_name: String,
    /// Where the Markdown was written; `None` when the file failed.
    pub output_path: Option<PathBuf>,
    /// Source size in bytes (0 when the file could not be inspected).
    pub size_bytes: u64,
    /// Page count, when inspection got that far.
    pub page_count: Option<usize>,
    /// Byte length of the written Markdown (0 on failure).
    pub markdown_bytes: usize,
    /// Images saved to the file's resource folder (`<out>/<stem>/`).
    #[serde(default)]
    pub images_written: usize,
    /// Wall-clock processing time for this file.
    pub duration_ms: u64,
    /// The failure, if any. `None` means the output file exists.
    pub error: Option<FileError>,
}

impl FileResult {
    /// True when the file produced an output document.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Aggregate counts for a completed batch.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BatchStats {
    /// PDF files found in the input directory.
    pub discovered: usize,
    /// Files converted and written.
    pub converted: usize,
    /// Files skipped by the precondition check (size/pages/corrupt).
    pub failed_validation: usize,
    /// Files that passed validation but failed OCR or output write.
    pub failed_conversion: usize,
    /// Wall-clock time for the whole batch.
    pub total_duration_ms: u64,
}

/// Full result of one batch invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutput {
    /// One entry per discovered file, in batch (sorted-name) order.
    pub results: Vec<FileResult>,
    /// Aggregate counts.
    pub stats: BatchStats,
}
