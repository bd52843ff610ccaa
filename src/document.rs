//! Input discovery and the pre-upload validation check.
//!
//! Every document goes through the same three steps before any network I/O:
//! byte size from filesystem metadata, a `%PDF` magic-byte check, and a page
//! count parsed with `lopdf`. Catching oversized or over-long documents here
//! avoids uploading tens of megabytes only to have the service reject them.

use crate::error::{BatchError, FileError};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// One PDF file discovered at batch start.
///
/// Discovered once, read once, never mutated.
#[derive(Debug, Clone)]
pub struct InputDocument {
    /// Full path to the source file.
    pub path: PathBuf,
    /// File name including extension, e.g. `sample.pdf`.
    pub file_name: String,
    /// File name without extension; the output file is `<stem>.md`.
    pub stem: String,
    /// Size on disk in bytes.
    pub size_bytes: u64,
    /// Number of pages in the document.
    pub page_count: usize,
}

impl InputDocument {
    /// Check the document against the batch limits.
    ///
    /// A document exactly at a limit passes; only exceeding it fails.
    pub fn validate(&self, max_file_bytes: u64, max_pages: usize) -> Result<(), FileError> {
        if self.size_bytes > max_file_bytes {
            return Err(FileError::TooLarge {
                file: self.file_name.clone(),
                size_bytes: self.size_bytes,
                limit: max_file_bytes,
            });
        }
        if self.page_count > max_pages {
            return Err(FileError::TooManyPages {
                file: self.file_name.clone(),
                pages: self.page_count,
                limit: max_pages,
            });
        }
        Ok(())
    }
}

/// List the PDF files in `dir`, sorted by file name.
///
/// Directory-listing order is filesystem-dependent, so results are sorted to
/// make batch order (and therefore logs and reports) deterministic.
/// Extension matching is case-insensitive (`.pdf` / `.PDF`).
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    if !dir.is_dir() {
        return Err(BatchError::InputDirNotFound {
            path: dir.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(dir).map_err(|e| BatchError::InputDirUnreadable {
        path: dir.to_path_buf(),
        source: e,
    })?;

    let mut pdfs: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BatchError::InputDirUnreadable {
            path: dir.to_path_buf(),
            source: e,
        })?;
        let path = entry.path();
        let is_pdf = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
        if is_pdf && path.is_file() {
            pdfs.push(path);
        }
    }

    pdfs.sort();
    debug!("Discovered {} PDF files in {}", pdfs.len(), dir.display());
    Ok(pdfs)
}

/// Inspect a single PDF: size, magic bytes, page count.
pub fn inspect(path: &Path) -> Result<InputDocument, FileError> {
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.clone());

    let meta = std::fs::metadata(path).map_err(|e| FileError::Unreadable {
        file: file_name.clone(),
        detail: e.to_string(),
    })?;
    let size_bytes = meta.len();

    // Magic-byte check before handing the file to the parser: a .pdf that is
    // really something else should say so, not surface as a parse error.
    let mut f = std::fs::File::open(path).map_err(|e| FileError::Unreadable {
        file: file_name.clone(),
        detail: e.to_string(),
    })?;
    let mut magic = [0u8; 4];
    f.read_exact(&mut magic).map_err(|e| FileError::Unreadable {
        file: file_name.clone(),
        detail: e.to_string(),
    })?;
    if &magic != b"%PDF" {
        return Err(FileError::NotAPdf {
            file: file_name,
            magic,
        });
    }

    let doc = lopdf::Document::load(path).map_err(|e| FileError::CorruptPdf {
        file: file_name.clone(),
        detail: e.to_string(),
    })?;
    let page_count = doc.get_pages().len();

    debug!(
        "Inspected {}: {} bytes, {} pages",
        file_name, size_bytes, page_count
    );

    Ok(InputDocument {
        path: path.to_path_buf(),
        file_name,
        stem,
        size_bytes,
        page_count,
    })
}
