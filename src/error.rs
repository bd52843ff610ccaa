//! Error types for the mocr library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BatchError`] — **Fatal**: the batch cannot run at all (input directory
//!   missing, output directory uncreatable, no API credential outside dry-run).
//!   Returned as `Err(BatchError)` from [`crate::batch::process_batch`].
//!
//! * [`FileError`] — **Non-fatal**: a single document failed (over the size or
//!   page limit, corrupt file, OCR API error) but the rest of the batch is
//!   fine. Stored inside [`crate::output::FileResult`] so callers can inspect
//!   partial success rather than losing the whole batch to one bad file.
//!
//! The separation lets callers decide their own tolerance: abort on the first
//! file failure, log and continue, or collect all errors for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the mocr library.
///
/// Per-file failures use [`FileError`] and are stored in
/// [`crate::output::FileResult`] rather than propagated here.
#[derive(Debug, Error)]
pub enum BatchError {
    /// The input directory does not exist.
    #[error("Input directory not found: '{path}'\nCreate it and place your PDF files inside.")]
    InputDirNotFound { path: PathBuf },

    /// The input directory exists but cannot be listed.
    #[error("Failed to read input directory '{path}': {source}")]
    InputDirUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The output directory could not be created.
    #[error("Failed to create output directory '{path}': {source}")]
    OutputDirCreateFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No API credential available and the batch is not a dry run.
    #[error(
        "MISTRAL_API_KEY environment variable not set.\n\
         Export it, or run with --dry-run to test without network calls."
    )]
    MissingApiKey,

    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// A non-fatal error for a single document.
///
/// Stored in [`crate::output::FileResult`] when a file fails. The batch
/// always continues with the next file.
#[derive(Debug, Clone, Error, serde::Serialize, serde::Deserialize)]
pub enum FileError {
    /// Document exceeds the byte-size limit; skipped before upload.
    #[error("'{file}' is {size_bytes} bytes, over the {limit}-byte limit")]
    TooLarge {
        file: String,
        size_bytes: u64,
        limit: u64,
    },

    /// Document exceeds the page-count limit; skipped before upload.
    #[error("'{file}' has {pages} pages, over the {limit}-page limit")]
    TooManyPages {
        file: String,
        pages: usize,
        limit: usize,
    },

    /// The file does not start with the `%PDF` magic bytes.
    #[error("'{file}' is not a valid PDF (first bytes: {magic:?})")]
    NotAPdf { file: String, magic: [u8; 4] },

    /// The file could not be read from disk.
    #[error("Failed to read '{file}': {detail}")]
    Unreadable { file: String, detail: String },

    /// The PDF could not be parsed for a page count.
    #[error("'{file}' could not be parsed: {detail}")]
    CorruptPdf { file: String, detail: String },

    /// Uploading the document to the OCR service failed.
    #[error("Upload failed for '{file}': {detail}")]
    UploadFailed { file: String, detail: String },

    /// The OCR API rejected the credential (401/403).
    #[error("OCR authentication error: {detail}\nCheck MISTRAL_API_KEY.")]
    OcrAuth { detail: String },

    /// The OCR API returned HTTP 429.
    #[error("OCR quota exceeded: {detail}")]
    OcrQuota { detail: String },

    /// The OCR API returned some other non-success status.
    #[error("OCR API error (HTTP {status}): {detail}")]
    OcrApi { status: u16, detail: String },

    /// The OCR call exceeded the configured timeout.
    #[error("OCR call timed out after {secs}s")]
    OcrTimeout { secs: u64 },

    /// Network-level failure talking to the OCR service.
    #[error("OCR request failed: {detail}")]
    OcrTransport { detail: String },

    /// The output Markdown file could not be written.
    #[error("Failed to write '{path}': {detail}")]
    WriteFailed { path: PathBuf, detail: String },
}

impl FileError {
    /// True for failures of the pre-upload precondition check (size, pages,
    /// readability, PDF structure); false for remote-call and write failures.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            FileError::TooLarge { .. }
                | FileError::TooManyPages { .. }
                | FileError::NotAPdf { .. }
                | FileError::Unreadable { .. }
                | FileError::CorruptPdf { .. }
        )
    }
}
