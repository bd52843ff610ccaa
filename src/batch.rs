//! The batch converter: discover, validate, convert, persist.
//!
//! ## Failure semantics
//!
//! A bad *file* never aborts the batch: inspection, validation, OCR, and
//! output-write failures are captured per file as [`FileError`]s inside the
//! returned [`BatchOutput`], and the loop moves on. A bad *setup* — missing
//! input directory, uncreatable output directory, no API credential outside
//! dry-run — is fatal and returns `Err(BatchError)` before any file is
//! touched.
//!
//! Files are processed strictly one at a time in sorted-name order. The OCR
//! API meters per account, not per connection, so concurrency would buy
//! little here; sequential keeps logs readable and memory flat at one
//! document's bytes.

use crate::config::BatchConfig;
use crate::document;
use crate::error::{BatchError, FileError};
use crate::ocr::{MistralOcr, OcrEngine, OcrImage};
use crate::output::{BatchOutput, BatchStats, FileResult};
use crate::postprocess;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

/// Run a batch conversion.
///
/// This is the primary entry point for the library.
///
/// # Returns
/// `Ok(BatchOutput)` whenever the batch ran to completion, even if every
/// individual file failed (check `output.stats`).
///
/// # Errors
/// Returns `Err(BatchError)` only for fatal setup errors:
/// - Input directory missing or unreadable
/// - Output directory could not be created
/// - No API credential and not a dry run
pub async fn process_batch(config: &BatchConfig) -> Result<BatchOutput, BatchError> {
    let batch_start = Instant::now();

    // ── Fatal preconditions ──────────────────────────────────────────────
    if !config.input_dir.is_dir() {
        return Err(BatchError::InputDirNotFound {
            path: config.input_dir.clone(),
        });
    }
    tokio::fs::create_dir_all(&config.output_dir)
        .await
        .map_err(|e| BatchError::OutputDirCreateFailed {
            path: config.output_dir.clone(),
            source: e,
        })?;

    // Dry runs never touch the network, so no credential and no client.
    let engine: Option<Arc<dyn OcrEngine>> = if config.dry_run {
        None
    } else {
        Some(resolve_engine(config)?)
    };

    // ── Discovery ────────────────────────────────────────────────────────
    let pdf_files = document::discover(&config.input_dir)?;
    if pdf_files.is_empty() {
        info!("No PDF files found in {}", config.input_dir.display());
        return Ok(BatchOutput {
            results: Vec::new(),
            stats: BatchStats {
                total_duration_ms: batch_start.elapsed().as_millis() as u64,
                ..Default::default()
            },
        });
    }
    info!(
        "Found {} PDF files to process in {}",
        pdf_files.len(),
        config.input_dir.display()
    );
    if let Some(ref cb) = config.progress {
        cb.on_batch_start(pdf_files.len());
    }

    // ── Sequential per-file loop ─────────────────────────────────────────
    let mut results = Vec::with_capacity(pdf_files.len());
    for (index, path) in pdf_files.iter().enumerate() {
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        if let Some(ref cb) = config.progress {
            cb.on_file_start(index, pdf_files.len(), &file_name);
        }

        let result = process_file(path, engine.as_ref(), config).await;

        if let Some(ref cb) = config.progress {
            match &result.error {
                None => cb.on_file_complete(&result.file_name, result.markdown_bytes),
                Some(e) => cb.on_file_error(&result.file_name, &e.to_string()),
            }
        }
        results.push(result);
    }

    // ── Stats ────────────────────────────────────────────────────────────
    let converted = results.iter().filter(|r| r.is_success()).count();
    let failed_validation = results
        .iter()
        .filter(|r| r.error.as_ref().is_some_and(|e| e.is_validation()))
        .count();
    let failed_conversion = results.len() - converted - failed_validation;

    let stats = BatchStats {
        discovered: results.len(),
        converted,
        failed_validation,
        failed_conversion,
        total_duration_ms: batch_start.elapsed().as_millis() as u64,
    };

    info!(
        "Batch complete: {}/{} files converted in {}ms",
        stats.converted, stats.discovered, stats.total_duration_ms
    );
    if let Some(ref cb) = config.progress {
        cb.on_batch_complete(converted, results.len() - converted);
    }

    Ok(BatchOutput { results, stats })
}

/// Synchronous wrapper around [`process_batch`].
///
/// Creates a temporary tokio runtime internally.
pub fn process_batch_sync(config: &BatchConfig) -> Result<BatchOutput, BatchError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| BatchError::Internal(format!("Failed to create tokio runtime: {e}")))?
        .block_on(process_batch(config))
}

// ── Internal helpers ─────────────────────────────────────────────────────

/// Resolve the OCR backend, from most-specific to least-specific:
/// an injected engine, an explicit `api_key`, then `MISTRAL_API_KEY`.
fn resolve_engine(config: &BatchConfig) -> Result<Arc<dyn OcrEngine>, BatchError> {
    if let Some(ref engine) = config.engine {
        return Ok(Arc::clone(engine));
    }

    let api_key = match config.api_key.as_deref() {
        Some(k) if !k.is_empty() => k.to_string(),
        _ => std::env::var("MISTRAL_API_KEY")
            .ok()
            .filter(|k| !k.is_empty())
            .ok_or(BatchError::MissingApiKey)?,
    };

    Ok(Arc::new(MistralOcr::new(
        api_key,
        config.model.clone(),
        config.api_timeout_secs,
    )?))
}

/// Process one file end to end; always returns a [`FileResult`].
///
/// `engine` is `None` exactly when the batch is a dry run.
async fn process_file(
    path: &Path,
    engine: Option<&Arc<dyn OcrEngine>>,
    config: &BatchConfig,
) -> FileResult {
    let start = Instant::now();
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    info!("Processing: {}", file_name);

    // ── Inspect ──────────────────────────────────────────────────────────
    let doc = match document::inspect(path) {
        Ok(doc) => doc,
        Err(e) => {
            warn!("Skipping {}: {}", file_name, e);
            return failed(file_name, 0, None, e, start);
        }
    };

    // ── Validate ─────────────────────────────────────────────────────────
    if let Err(e) = doc.validate(config.max_file_bytes, config.max_pages) {
        warn!("Validation failed for {}: {}", doc.file_name, e);
        return failed(doc.file_name, doc.size_bytes, Some(doc.page_count), e, start);
    }

    // ── Convert ──────────────────────────────────────────────────────────
    let (markdown, images) = match engine {
        None => {
            info!("[DRY RUN] Would process {}", doc.file_name);
            (placeholder_markdown(&doc.file_name), Vec::new())
        }
        Some(engine) => {
            let bytes = match tokio::fs::read(&doc.path).await {
                Ok(b) => b,
                Err(e) => {
                    let err = FileError::Unreadable {
                        file: doc.file_name.clone(),
                        detail: e.to_string(),
                    };
                    warn!("{}", err);
                    return failed(doc.file_name, doc.size_bytes, Some(doc.page_count), err, start);
                }
            };
            match engine.convert(&doc, bytes).await {
                Ok(ocr) => {
                    let images = sanitize_images(ocr.images, &doc.file_name);
                    let linked = rewrite_image_links(&ocr.markdown, &doc.stem, &images);
                    (postprocess::clean_markdown(&linked), images)
                }
                Err(e) => {
                    warn!("Error processing {}: {}", doc.file_name, e);
                    return failed(doc.file_name, doc.size_bytes, Some(doc.page_count), e, start);
                }
            }
        }
    };

    // ── Persist ──────────────────────────────────────────────────────────
    // Images first: if the resource folder cannot be written, no `.md`
    // pointing into it appears either.
    let images_written = match write_images(&config.output_dir, &doc.stem, &images).await {
        Ok(n) => n,
        Err(e) => {
            warn!("{}", e);
            return failed(doc.file_name, doc.size_bytes, Some(doc.page_count), e, start);
        }
    };
    let output_path = config.output_dir.join(format!("{}.md", doc.stem));
    if let Err(e) = write_atomic(&output_path, &markdown).await {
        warn!("{}", e);
        return failed(doc.file_name, doc.size_bytes, Some(doc.page_count), e, start);
    }

    info!("Saved {} -> {}", doc.file_name, output_path.display());
    FileResult {
        file_name: doc.file_name,
        output_path: Some(output_path),
        size_bytes: doc.size_bytes,
        page_count: Some(doc.page_count),
        markdown_bytes: markdown.len(),
        images_written,
        duration_ms: start.elapsed().as_millis() as u64,
        error: None,
    }
}

/// Deterministic placeholder emitted in dry-run mode.
fn placeholder_markdown(file_name: &str) -> String {
    format!("# Dummy content for {file_name}\n\nThis is a dry run test.")
}

/// Drop images whose id is not a plain file name.
///
/// Ids come from the OCR response and end up as on-disk names under the
/// output directory; anything with a path separator or a `..` component
/// must not reach the filesystem.
fn sanitize_images(images: Vec<OcrImage>, file_name: &str) -> Vec<OcrImage> {
    images
        .into_iter()
        .filter(|img| {
            let plain = !img.id.is_empty()
                && !img.id.contains(&['/', '\\'][..])
                && !img.id.contains("..");
            if !plain {
                warn!(
                    "{}: image id {:?} is not a plain file name, skipping",
                    file_name, img.id
                );
            }
            plain
        })
        .collect()
}

static IMAGE_LINK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"!\[([^\]]*)\]\(([^)\s]+)\)")
        .unwrap_or_else(|e| panic!("invalid image-link regex: {e}"))
});

/// Point Markdown image references at the saved resource files.
///
/// The OCR service writes `![alt](<id>)`; after the images land in
/// `<out>/<stem>/`, those references become `![alt](<stem>/<file>)`.
/// References to images that were not saved are left untouched.
fn rewrite_image_links(markdown: &str, stem: &str, images: &[OcrImage]) -> String {
    if images.is_empty() {
        return markdown.to_string();
    }

    let mut targets: HashMap<&str, String> = HashMap::new();
    for img in images {
        let file_name = img.file_name();
        // References may use the full id or the id minus its extension.
        if let Some((base, _)) = img.id.rsplit_once('.') {
            targets.insert(base, file_name.clone());
        }
        targets.insert(img.id.as_str(), file_name);
    }

    IMAGE_LINK
        .replace_all(markdown, |caps: &regex::Captures| {
            match targets.get(&caps[2]) {
                Some(file_name) => format!("![{}]({}/{})", &caps[1], stem, file_name),
                None => caps[0].to_string(),
            }
        })
        .into_owned()
}

/// Write extracted images into `<out>/<stem>/`, one file per image.
///
/// Returns the number of files written; zero images means the resource
/// folder is never created.
async fn write_images(
    output_dir: &Path,
    stem: &str,
    images: &[OcrImage],
) -> Result<usize, FileError> {
    if images.is_empty() {
        return Ok(0);
    }

    let resource_dir = output_dir.join(stem);
    tokio::fs::create_dir_all(&resource_dir)
        .await
        .map_err(|e| FileError::WriteFailed {
            path: resource_dir.clone(),
            detail: e.to_string(),
        })?;

    for img in images {
        let path = resource_dir.join(img.file_name());
        tokio::fs::write(&path, &img.bytes)
            .await
            .map_err(|e| FileError::WriteFailed {
                path: path.clone(),
                detail: e.to_string(),
            })?;
    }
    Ok(images.len())
}

/// Atomic write: temp file in the same directory, then rename.
///
/// A crash mid-write leaves at worst a stray `.md.tmp`, never a truncated
/// `.md` the next run would mistake for real output.
async fn write_atomic(path: &Path, markdown: &str) -> Result<(), FileError> {
    let tmp_path = path.with_extension("md.tmp");
    tokio::fs::write(&tmp_path, markdown)
        .await
        .map_err(|e| FileError::WriteFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(|e| FileError::WriteFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })
}

fn failed(
    file_name: String,
    size_bytes: u64,
    page_count: Option<usize>,
    error: FileError,
    start: Instant,
) -> FileResult {
    FileResult {
        file_name,
        output_path: None,
        size_bytes,
        page_count,
        markdown_bytes: 0,
        images_written: 0,
        duration_ms: start.elapsed().as_millis() as u64,
        error: Some(error),
    }
}
