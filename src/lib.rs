//! # mocr
//!
//! Batch-convert PDF documents to Markdown using the Mistral OCR API.
//!
//! ## Why this crate?
//!
//! Local text extraction (pdftotext, pdf-extract) falls apart on scanned
//! documents and complex layouts. mocr does none of that work itself: it
//! delegates the optical character recognition and document understanding
//! entirely to the Mistral OCR service, and concentrates on being a reliable
//! batch harness around the call — discovery, a size/page-count precondition
//! check, per-file failure isolation, and atomic output writes.
//!
//! ## Pipeline Overview
//!
//! ```text
//! ./in/*.pdf
//!  │
//!  ├─ 1. Discover   list PDFs, sorted for deterministic batch order
//!  ├─ 2. Inspect    byte size, %PDF magic, page count (lopdf)
//!  ├─ 3. Validate   skip > 50 MiB or > 1000 pages; batch continues
//!  ├─ 4. OCR        upload → signed URL → /v1/ocr   (or dry-run placeholder)
//!  ├─ 5. Clean      rewrite image links, normalise whitespace
//!  └─ 6. Persist    atomic write to ./out/<stem>.md, images to ./out/<stem>/
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mocr::{process_batch, BatchConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from MISTRAL_API_KEY; use .dry_run(true) to test
//!     // the whole pipeline without network calls.
//!     let config = BatchConfig::default();
//!     let output = process_batch(&config).await?;
//!     eprintln!(
//!         "{}/{} files converted",
//!         output.stats.converted, output.stats.discovered
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `mocr` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! mocr = { version = "0.3", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod batch;
pub mod config;
pub mod document;
pub mod error;
pub mod ocr;
pub mod output;
pub mod postprocess;
pub mod progress;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use batch::{process_batch, process_batch_sync};
pub use config::{BatchConfig, BatchConfigBuilder, DEFAULT_MAX_FILE_BYTES, DEFAULT_MAX_PAGES};
pub use document::InputDocument;
pub use error::{BatchError, FileError};
pub use ocr::{MistralOcr, OcrEngine, OcrImage, OcrOutput};
pub use output::{BatchOutput, BatchStats, FileResult};
pub use progress::{BatchProgress, ProgressCallback};
