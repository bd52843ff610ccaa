//! Integration tests for the batch converter.
//!
//! Unlike a live-API suite, everything here runs hermetically: fixture PDFs
//! are generated with `lopdf` into a per-test tempdir, and the OCR backend
//! is a mock [`OcrEngine`] so no network is ever touched.
//!
//! Run with:
//!   cargo test --test batch -- --nocapture

use async_trait::async_trait;
use lopdf::{dictionary, Document, Object};
use mocr::{
    process_batch, BatchConfig, BatchError, FileError, InputDocument, OcrEngine, OcrImage,
    OcrOutput,
};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tempfile::TempDir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// An input/output directory pair inside one tempdir.
struct BatchDirs {
    _root: TempDir,
    input: std::path::PathBuf,
    output: std::path::PathBuf,
}

fn batch_dirs() -> BatchDirs {
    let root = TempDir::new().expect("create tempdir");
    let input = root.path().join("in");
    let output = root.path().join("out");
    std::fs::create_dir_all(&input).expect("create input dir");
    // The output dir is deliberately NOT created: process_batch must do it.
    BatchDirs {
        _root: root,
        input,
        output,
    }
}

/// Build a minimal n-page PDF on disk with lopdf.
fn write_pdf(path: &Path, pages: usize) {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let kids: Vec<Object> = (0..pages)
        .map(|_| {
            doc.add_object(dictionary! {
                "Type" => "Page",
                "Parent" => pages_id,
                "MediaBox" => vec![0.into(), 0.into(), 595.into(), 842.into()],
            })
            .into()
        })
        .collect();
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);
    doc.save(path).expect("write fixture PDF");
}

/// Mock OCR backend: returns a canned result or a canned error, and counts
/// how many times it was called.
struct MockOcr {
    response: Result<OcrOutput, FileError>,
    calls: AtomicUsize,
}

impl MockOcr {
    fn ok(markdown: &str) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(OcrOutput::text(markdown)),
            calls: AtomicUsize::new(0),
        })
    }

    fn ok_with_images(markdown: &str, images: Vec<OcrImage>) -> Arc<Self> {
        Arc::new(Self {
            response: Ok(OcrOutput {
                markdown: markdown.to_string(),
                images,
            }),
            calls: AtomicUsize::new(0),
        })
    }

    fn failing(error: FileError) -> Arc<Self> {
        Arc::new(Self {
            response: Err(error),
            calls: AtomicUsize::new(0),
        })
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl OcrEngine for MockOcr {
    async fn convert(
        &self,
        _doc: &InputDocument,
        _bytes: Vec<u8>,
    ) -> Result<OcrOutput, FileError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.response.clone()
    }
}

fn dry_run_config(dirs: &BatchDirs) -> BatchConfig {
    BatchConfig::builder()
        .input_dir(dirs.input.clone())
        .output_dir(dirs.output.clone())
        .dry_run(true)
        .build()
        .expect("valid config")
}

fn engine_config(dirs: &BatchDirs, engine: Arc<dyn OcrEngine>) -> BatchConfig {
    BatchConfig::builder()
        .input_dir(dirs.input.clone())
        .output_dir(dirs.output.clone())
        .engine(engine)
        .build()
        .expect("valid config")
}

// ── Dry-run behaviour ────────────────────────────────────────────────────────

#[tokio::test]
async fn dry_run_writes_one_placeholder_per_file() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("alpha.pdf"), 2);
    write_pdf(&dirs.input.join("beta.pdf"), 1);

    let output = process_batch(&dry_run_config(&dirs))
        .await
        .expect("batch should complete");

    assert_eq!(output.stats.discovered, 2);
    assert_eq!(output.stats.converted, 2);
    assert_eq!(output.stats.failed_validation, 0);
    assert_eq!(output.stats.failed_conversion, 0);

    let alpha = std::fs::read_to_string(dirs.output.join("alpha.md")).expect("alpha.md exists");
    assert_eq!(
        alpha,
        "# Dummy content for alpha.pdf\n\nThis is a dry run test."
    );
    assert!(dirs.output.join("beta.md").exists());
}

#[tokio::test]
async fn dry_run_needs_no_api_key() {
    // No api_key in the config and no engine; dry-run must still work even
    // though a real run would require a credential.
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("doc.pdf"), 1);

    let output = process_batch(&dry_run_config(&dirs)).await.expect("dry run");
    assert_eq!(output.stats.converted, 1);
}

#[tokio::test]
async fn rerun_is_idempotent() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("doc.pdf"), 1);
    let config = dry_run_config(&dirs);

    process_batch(&config).await.expect("first run");
    let first = std::fs::read_to_string(dirs.output.join("doc.md")).unwrap();

    process_batch(&config).await.expect("second run");
    let second = std::fs::read_to_string(dirs.output.join("doc.md")).unwrap();

    assert_eq!(first, second, "re-running must overwrite, not alter");
    // Exactly one output file, no duplicates or leftovers.
    let entries: Vec<_> = std::fs::read_dir(&dirs.output)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    assert_eq!(entries, vec!["doc.md"]);
}

// ── Validation limits ────────────────────────────────────────────────────────

#[tokio::test]
async fn oversized_file_is_skipped_without_output() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("big.pdf"), 1);

    // A 64-byte limit makes any real PDF oversized; the default 50 MiB limit
    // would need a multi-megabyte fixture to trip.
    let config = BatchConfig::builder()
        .input_dir(dirs.input.clone())
        .output_dir(dirs.output.clone())
        .dry_run(true)
        .max_file_bytes(64)
        .build()
        .unwrap();

    let output = process_batch(&config).await.expect("batch completes");

    assert_eq!(output.stats.discovered, 1);
    assert_eq!(output.stats.converted, 0);
    assert_eq!(output.stats.failed_validation, 1);
    assert!(matches!(
        output.results[0].error,
        Some(FileError::TooLarge { .. })
    ));
    assert!(!dirs.output.join("big.md").exists());
}

#[tokio::test]
async fn over_page_limit_is_skipped_without_output() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("long.pdf"), 3);

    let config = BatchConfig::builder()
        .input_dir(dirs.input.clone())
        .output_dir(dirs.output.clone())
        .dry_run(true)
        .max_pages(2)
        .build()
        .unwrap();

    let output = process_batch(&config).await.expect("batch completes");

    assert_eq!(output.stats.failed_validation, 1);
    match &output.results[0].error {
        Some(FileError::TooManyPages { pages, limit, .. }) => {
            assert_eq!(*pages, 3);
            assert_eq!(*limit, 2);
        }
        other => panic!("expected TooManyPages, got {other:?}"),
    }
    assert!(!dirs.output.join("long.md").exists());
}

#[tokio::test]
async fn mixed_batch_converts_only_the_valid_file() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("good.pdf"), 1);
    write_pdf(&dirs.input.join("long.pdf"), 5);

    let config = BatchConfig::builder()
        .input_dir(dirs.input.clone())
        .output_dir(dirs.output.clone())
        .dry_run(true)
        .max_pages(2)
        .build()
        .unwrap();

    let output = process_batch(&config).await.expect("batch completes");

    assert_eq!(output.stats.discovered, 2);
    assert_eq!(output.stats.converted, 1);
    assert_eq!(output.stats.failed_validation, 1);
    assert!(dirs.output.join("good.md").exists());
    assert!(!dirs.output.join("long.md").exists());
}

#[tokio::test]
async fn non_pdf_content_fails_validation() {
    let dirs = batch_dirs();
    std::fs::write(dirs.input.join("fake.pdf"), b"plain text masquerading").unwrap();

    let output = process_batch(&dry_run_config(&dirs)).await.expect("batch");

    assert_eq!(output.stats.failed_validation, 1);
    assert!(matches!(
        output.results[0].error,
        Some(FileError::NotAPdf { .. })
    ));
    assert!(!dirs.output.join("fake.md").exists());
}

// ── Engine (remote-call) behaviour via the mock ──────────────────────────────

#[tokio::test]
async fn engine_markdown_is_cleaned_and_written() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("scan.pdf"), 2);

    let engine = MockOcr::ok("# Heading  \r\n\r\n\r\n\r\nBody text");
    let config = engine_config(&dirs, engine.clone());

    let output = process_batch(&config).await.expect("batch completes");

    assert_eq!(output.stats.converted, 1);
    assert_eq!(engine.call_count(), 1);

    let md = std::fs::read_to_string(dirs.output.join("scan.md")).unwrap();
    assert_eq!(md, "# Heading\n\nBody text\n");
}

#[tokio::test]
async fn engine_images_land_in_a_resource_folder_with_links_rewritten() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("report.pdf"), 1);

    let engine = MockOcr::ok_with_images(
        "# Findings\n\n![chart](img-0.jpeg)\n\nSee above.",
        vec![OcrImage {
            id: "img-0.jpeg".into(),
            bytes: b"\xff\xd8fakejpeg".to_vec(),
        }],
    );
    let config = engine_config(&dirs, engine.clone());

    let output = process_batch(&config).await.expect("batch completes");

    assert_eq!(output.stats.converted, 1);
    assert_eq!(output.results[0].images_written, 1);

    let saved = std::fs::read(dirs.output.join("report/img-0.jpeg")).expect("image saved");
    assert_eq!(saved, b"\xff\xd8fakejpeg");

    let md = std::fs::read_to_string(dirs.output.join("report.md")).unwrap();
    assert_eq!(md, "# Findings\n\n![chart](report/img-0.jpeg)\n\nSee above.\n");
}

#[tokio::test]
async fn text_only_document_creates_no_resource_folder() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("plain.pdf"), 1);

    let engine = MockOcr::ok("Just text.");
    let config = engine_config(&dirs, engine);

    let output = process_batch(&config).await.expect("batch completes");

    assert_eq!(output.results[0].images_written, 0);
    assert!(dirs.output.join("plain.md").exists());
    assert!(!dirs.output.join("plain").exists());
}

#[tokio::test]
async fn engine_failure_produces_no_output_and_batch_continues() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("first.pdf"), 1);
    write_pdf(&dirs.input.join("second.pdf"), 1);

    let engine = MockOcr::failing(FileError::OcrApi {
        status: 503,
        detail: "service unavailable".into(),
    });
    let config = engine_config(&dirs, engine.clone());

    let output = process_batch(&config).await.expect("batch still completes");

    assert_eq!(output.stats.discovered, 2);
    assert_eq!(output.stats.converted, 0);
    assert_eq!(output.stats.failed_conversion, 2);
    // Both files were attempted: one failure did not abort the loop.
    assert_eq!(engine.call_count(), 2);
    assert!(!dirs.output.join("first.md").exists());
    assert!(!dirs.output.join("second.md").exists());
}

#[tokio::test]
async fn validation_failure_never_reaches_the_engine() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("long.pdf"), 4);

    let engine = MockOcr::ok("unused");
    let config = BatchConfig::builder()
        .input_dir(dirs.input.clone())
        .output_dir(dirs.output.clone())
        .engine(engine.clone())
        .max_pages(1)
        .build()
        .unwrap();

    let output = process_batch(&config).await.expect("batch completes");

    assert_eq!(output.stats.failed_validation, 1);
    assert_eq!(engine.call_count(), 0, "oversized files must not be uploaded");
}

// ── Fatal setup errors ───────────────────────────────────────────────────────

#[tokio::test]
async fn missing_input_dir_is_fatal() {
    let root = TempDir::new().unwrap();
    let config = BatchConfig::builder()
        .input_dir(root.path().join("does-not-exist"))
        .output_dir(root.path().join("out"))
        .dry_run(true)
        .build()
        .unwrap();

    let result = process_batch(&config).await;
    assert!(matches!(result, Err(BatchError::InputDirNotFound { .. })));
}

#[tokio::test]
async fn empty_input_dir_is_a_successful_noop() {
    let dirs = batch_dirs();

    let output = process_batch(&dry_run_config(&dirs)).await.expect("batch");
    assert_eq!(output.stats.discovered, 0);
    assert_eq!(output.stats.converted, 0);
}

// ── Report shape ─────────────────────────────────────────────────────────────

#[tokio::test]
async fn batch_output_serialises_to_json() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("doc.pdf"), 1);

    let output = process_batch(&dry_run_config(&dirs)).await.expect("batch");

    let json = serde_json::to_string_pretty(&output).expect("report must serialise");
    let back: mocr::BatchOutput = serde_json::from_str(&json).expect("and round-trip");
    assert_eq!(back.stats.discovered, output.stats.discovered);
    assert_eq!(back.results[0].file_name, "doc.pdf");
}

#[test]
fn sync_wrapper_runs_a_dry_run_batch() {
    // Plain #[test]: process_batch_sync builds its own runtime and would
    // panic inside an outer tokio runtime.
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("doc.pdf"), 1);

    let output = mocr::process_batch_sync(&dry_run_config(&dirs)).expect("sync batch");
    assert_eq!(output.stats.converted, 1);
    assert!(dirs.output.join("doc.md").exists());
}

#[tokio::test]
async fn results_are_in_sorted_name_order() {
    let dirs = batch_dirs();
    write_pdf(&dirs.input.join("zeta.pdf"), 1);
    write_pdf(&dirs.input.join("alpha.pdf"), 1);
    write_pdf(&dirs.input.join("mid.pdf"), 1);

    let output = process_batch(&dry_run_config(&dirs)).await.expect("batch");

    let names: Vec<_> = output.results.iter().map(|r| r.file_name.as_str()).collect();
    assert_eq!(names, vec!["alpha.pdf", "mid.pdf", "zeta.pdf"]);
}
