//! Progress-callback trait for per-file batch events.
//!
//! Inject an [`Arc<dyn BatchProgress>`] via
//! [`crate::config::BatchConfigBuilder::progress`] to receive events as the
//! batch works through its files. Callbacks keep the library free of any
//! opinion about presentation: the CLI forwards them to a progress bar, a
//! host application might forward them to a channel or a database row.
//!
//! All methods have default no-op implementations so callers only override
//! what they care about. The batch is sequential, so callbacks are never
//! invoked concurrently; `Send + Sync` is still required because the config
//! holding the callback is `Clone` and may cross task boundaries.

use std::sync::Arc;

/// Convenience alias for the injectable callback handle.
pub type ProgressCallback = Arc<dyn BatchProgress>;

/// Called by the batch loop as it processes each file.
pub trait BatchProgress: Send + Sync {
    /// Called once after discovery, before any file is processed.
    fn on_batch_start(&self, total_files: usize) {
        let _ = total_files;
    }

    /// Called just before a file is inspected.
    fn on_file_start(&self, index: usize, total_files: usize, file_name: &str) {
        let _ = (index, total_files, file_name);
    }

    /// Called when a file was converted and its output written.
    fn on_file_complete(&self, file_name: &str, markdown_bytes: usize) {
        let _ = (file_name, markdown_bytes);
    }

    /// Called when a file failed validation or conversion.
    fn on_file_error(&self, file_name: &str, error: &str) {
        let _ = (file_name, error);
    }

    /// Called once after the last file, with the final tallies.
    fn on_batch_complete(&self, converted: usize, failed: usize) {
        let _ = (converted, failed);
    }
}
