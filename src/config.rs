//! Configuration for a batch OCR run.
//!
//! All behaviour is controlled through [`BatchConfig`], built via its
//! [`BatchConfigBuilder`]. Keeping every knob in one struct makes it trivial
//! to share configs across calls and to diff two runs to understand why their
//! outputs differ.

use crate::error::BatchError;
use crate::ocr::OcrEngine;
use crate::progress::ProgressCallback;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Byte-size limit above which a document is skipped (50 MiB).
pub const DEFAULT_MAX_FILE_BYTES: u64 = 50 * 1024 * 1024;

/// Page-count limit above which a document is skipped.
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// Default OCR model identifier.
pub const DEFAULT_MODEL: &str = "mistral-ocr-latest";

/// Configuration for a batch conversion.
///
/// Built via [`BatchConfig::builder()`] or using [`BatchConfig::default()`].
///
/// # Example
/// ```rust
/// use mocr::BatchConfig;
///
/// let config = BatchConfig::builder()
///     .input_dir("./in")
///     .output_dir("./out")
///     .dry_run(true)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct BatchConfig {
    /// Directory scanned for `*.pdf` files. Default: `./in`.
    pub input_dir: PathBuf,

    /// Directory receiving one `.md` file per converted PDF. Default: `./out`.
    /// Created if absent; re-runs overwrite existing output files.
    pub output_dir: PathBuf,

    /// Simulate processing without network calls. Default: false.
    ///
    /// In dry-run mode no API credential is required and every valid file
    /// produces a deterministic placeholder instead of real OCR output.
    pub dry_run: bool,

    /// Skip documents larger than this many bytes. Default: 50 MiB.
    ///
    /// The OCR service rejects oversized uploads anyway; checking locally
    /// saves the bandwidth and reports a clearer error.
    pub max_file_bytes: u64,

    /// Skip documents with more pages than this. Default: 1000.
    pub max_pages: usize,

    /// OCR model identifier. Default: `mistral-ocr-latest`.
    pub model: String,

    /// API credential. When `None` and not in dry-run mode, the
    /// `MISTRAL_API_KEY` environment variable is consulted at batch start;
    /// a missing credential is a fatal error.
    pub api_key: Option<String>,

    /// Per-document request timeout in seconds. Default: 120.
    ///
    /// There is deliberately no retry logic: the batch is sequential, so a
    /// hung connection would stall every remaining file. One timeout per
    /// request is the only guard.
    pub api_timeout_secs: u64,

    /// Pre-constructed OCR backend. Takes precedence over the built-in
    /// Mistral client; the main use is injecting a mock in tests.
    pub engine: Option<Arc<dyn OcrEngine>>,

    /// Optional per-file progress callback for UIs and progress bars.
    pub progress: Option<ProgressCallback>,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("./in"),
            output_dir: PathBuf::from("./out"),
            dry_run: false,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_pages: DEFAULT_MAX_PAGES,
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_timeout_secs: 120,
            engine: None,
            progress: None,
        }
    }
}

impl fmt::Debug for BatchConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchConfig")
            .field("input_dir", &self.input_dir)
            .field("output_dir", &self.output_dir)
            .field("dry_run", &self.dry_run)
            .field("max_file_bytes", &self.max_file_bytes)
            .field("max_pages", &self.max_pages)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("engine", &self.engine.as_ref().map(|_| "<dyn OcrEngine>"))
            .field(
                "progress",
                &self.progress.as_ref().map(|_| "<dyn BatchProgress>"),
            )
            .finish()
    }
}

impl BatchConfig {
    /// Create a new builder for `BatchConfig`.
    pub fn builder() -> BatchConfigBuilder {
        BatchConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`BatchConfig`].
pub struct BatchConfigBuilder {
    config: BatchConfig,
}

impl BatchConfigBuilder {
    pub fn input_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.input_dir = dir.into();
        self
    }

    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.output_dir = dir.into();
        self
    }

    pub fn dry_run(mut self, v: bool) -> Self {
        self.config.dry_run = v;
        self
    }

    pub fn max_file_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_bytes = bytes;
        self
    }

    pub fn max_pages(mut self, pages: usize) -> Self {
        self.config.max_pages = pages;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn engine(mut self, engine: Arc<dyn OcrEngine>) -> Self {
        self.config.engine = Some(engine);
        self
    }

    pub fn progress(mut self, cb: ProgressCallback) -> Self {
        self.config.progress = Some(cb);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BatchConfig, BatchError> {
        let c = &self.config;
        if c.max_file_bytes == 0 {
            return Err(BatchError::InvalidConfig(
                "max_file_bytes must be ≥ 1".into(),
            ));
        }
        if c.max_pages == 0 {
            return Err(BatchError::InvalidConfig("max_pages must be ≥ 1".into()));
        }
        if c.model.trim().is_empty() {
            return Err(BatchError::InvalidConfig("model must not be empty".into()));
        }
        if c.api_timeout_secs == 0 {
            return Err(BatchError::InvalidConfig(
                "api_timeout_secs must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}
