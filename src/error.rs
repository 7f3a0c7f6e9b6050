//! Error types for the anyconvert library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`ConvertError`] — **Fatal**: the orchestrator cannot operate at all
//!   (invalid configuration, HTTP client construction failed, store snapshot
//!   unreadable). Returned as `Err(ConvertError)` from top-level entry points.
//!
//! * [`ItemError`] — **Non-fatal**: a single item failed (transport error,
//!   malformed response, remote job failed) but all other items are fine.
//!   Folded into the item's terminal [`crate::item::ItemStatus::Error`] state
//!   and reported in [`crate::convert::ItemOutcome`] so callers can inspect
//!   partial success rather than losing the whole batch to one bad item.
//!
//! The separation lets callers decide their own tolerance: abort when any
//! item fails, log and continue, or collect all outcomes for a post-run report.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the anyconvert library.
///
/// Per-item failures use [`ItemError`] and resolve the affected item to
/// `error` status rather than propagating here.
#[derive(Debug, Error)]
pub enum ConvertError {
    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The reqwest client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    HttpClientBuild(String),

    // ── Store errors ──────────────────────────────────────────────────────
    /// An existing store snapshot exists but cannot be parsed.
    #[error("Store snapshot '{path}' is corrupt: {detail}\nDelete the file to start with an empty store.")]
    CorruptSnapshot { path: PathBuf, detail: String },

    /// The store snapshot could not be read.
    #[error("Failed to read store snapshot '{path}': {source}")]
    SnapshotReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not write a downloaded artifact to disk.
    #[error("Failed to write downloaded file '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The input file for an upload was not found at the given path.
    #[error("File not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// The input file for an upload could not be read.
    #[error("Failed to read '{path}': {source}")]
    FileReadFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// An upload request failed; the item was never created.
    #[error("Upload failed for '{name}': {source}")]
    UploadFailed {
        name: String,
        #[source]
        source: ItemError,
    },

    /// A download request failed.
    #[error("Download failed for '{file_id}': {source}")]
    DownloadFailed {
        file_id: String,
        #[source]
        source: ItemError,
    },
}

/// A non-fatal error that resolves a single item to its terminal `error`
/// state.
///
/// Carried in [`crate::convert::ItemOutcome`] after a conversion run. The
/// overall run continues regardless of how many items fail.
#[derive(Debug, Clone, Error)]
pub enum ItemError {
    /// The request never produced a usable response (connection refused,
    /// DNS failure, timeout at the socket level).
    #[error("Transport error: {detail}")]
    Transport { detail: String },

    /// The service answered with a non-2xx status.
    #[error("Service returned HTTP {status}: {detail}")]
    HttpStatus { status: u16, detail: String },

    /// The response body did not match the expected shape.
    #[error("Malformed response from service: {detail}")]
    MalformedResponse { detail: String },

    /// Website bundling completed but returned no artifact id, so the
    /// second conversion phase has no source to work from.
    #[error("Website bundling for '{url}' completed without a result file id")]
    MissingBundleId { url: String },

    /// The remote operation reached terminal `failed` status.
    #[error("Conversion failed remotely{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    RemoteFailed { message: Option<String> },

    /// Polling did not observe a terminal status within the deadline.
    #[error("Operation '{operation_id}' did not finish within {secs}s")]
    PollTimeout { operation_id: String, secs: u64 },

    /// The item has no target format chosen; nothing to convert.
    #[error("Item '{id}' has no target format selected")]
    NoTargetFormat { id: String },
}

impl ItemError {
    /// Classify a reqwest error at a call site.
    ///
    /// Status-bearing errors keep their HTTP status so logs distinguish
    /// "network down" from "service said no".
    pub(crate) fn from_reqwest(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => ItemError::HttpStatus {
                status: status.as_u16(),
                detail: err.to_string(),
            },
            None => ItemError::Transport {
                detail: err.to_string(),
            },
        }
    }
}
