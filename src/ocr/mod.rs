//! The remote OCR capability behind a trait.
//!
//! The contract is deliberately opaque: send document bytes, receive
//! Markdown plus any embedded images the service extracted, or an error.
//! Putting a trait at this seam keeps the batch loop free of HTTP details
//! and lets tests inject a mock backend instead of a live API.

pub mod mistral;

pub use mistral::MistralOcr;

use crate::document::InputDocument;
use crate::error::FileError;
use async_trait::async_trait;

/// An image extracted from a document by the OCR service.
///
/// `id` is the identifier the service uses in Markdown image references
/// (`![...](id)`); the batch writer derives the on-disk file name from it
/// and rewrites those references to the saved location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrImage {
    /// Reference id as it appears in the page Markdown.
    pub id: String,
    /// Decoded image bytes.
    pub bytes: Vec<u8>,
}

impl OcrImage {
    /// On-disk file name: the id itself when it already carries an
    /// extension, `<id>.jpeg` otherwise.
    pub fn file_name(&self) -> String {
        if self.id.contains('.') {
            self.id.clone()
        } else {
            format!("{}.jpeg", self.id)
        }
    }
}

/// What an engine returns for one document: the combined Markdown and the
/// images it references.
#[derive(Debug, Clone, Default)]
pub struct OcrOutput {
    /// Combined per-page Markdown, pages separated by blank lines.
    pub markdown: String,
    /// Extracted images, in page order. Empty when the document has none
    /// or the service returned no image data.
    pub images: Vec<OcrImage>,
}

impl OcrOutput {
    /// A text-only result with no images.
    pub fn text(markdown: impl Into<String>) -> Self {
        Self {
            markdown: markdown.into(),
            images: Vec::new(),
        }
    }
}

/// An OCR backend: document bytes in, Markdown (and images) out.
///
/// Implementations must be `Send + Sync` so the engine can be shared via
/// `Arc` across the batch. Errors are per-file [`FileError`]s; an engine
/// failure never aborts the batch.
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Convert one document.
    ///
    /// `doc` carries the already-inspected metadata (name, size, page count);
    /// `bytes` is the full file content.
    async fn convert(&self, doc: &InputDocument, bytes: Vec<u8>) -> Result<OcrOutput, FileError>;
}
